use reqwest::StatusCode;

/// Why one poll cycle was dropped. None of these stop the scheduler.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("server returned error {status} while handling {operation}")]
    Status { status: StatusCode, operation: &'static str },

    #[error("transport error while handling {operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed payload from {operation}: {source}")]
    Payload {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status(),
            Self::Payload { .. } => None,
        }
    }
}

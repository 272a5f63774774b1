use serde::{Deserialize, Deserializer};

pub type EntityId = String;

/// Wire code the server uses for a finished download.
pub const DONE_CODE: &str = "D";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum EntityState {
    InProgress,
    Done,
}

impl EntityState {
    /// Only `"D"` is terminal; added (`"A"`), got-metadata (`"M"`) and any
    /// other code are still in progress.
    pub fn from_code(code: &str) -> Self {
        if code.trim() == DONE_CODE {
            Self::Done
        } else {
            Self::InProgress
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Done => DONE_CODE,
            Self::InProgress => "P",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl From<String> for EntityState {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

/// One record of the `/download-progress` batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntityStatus {
    #[serde(rename = "info_hash")]
    pub id: EntityId,
    pub state: EntityState,
    #[serde(default, deserialize_with = "clamped_percent")]
    pub progress: u8,
    #[serde(default)]
    pub stats: String,
}

impl EntityStatus {
    pub fn percent_label(&self) -> String {
        format!("{}%", self.progress)
    }
}

fn clamped_percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if raw.is_nan() {
        return Ok(0);
    }
    Ok(raw.clamp(0.0, 100.0) as u8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Compact row in a list; carries the recorded status.
    Summary,
    /// Expanded view, only present while the user has it open.
    Detail,
}

/// The single place that knows how rendering targets are named.
pub fn target_id(kind: TargetKind, entity_id: &str) -> String {
    match kind {
        TargetKind::Summary => format!("r{}", entity_id),
        TargetKind::Detail => format!("download-progress-{}", entity_id),
    }
}

/// Sub-elements of a region the reconciler may patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// Percentage text, e.g. `40%`.
    Percent,
    /// Server-rendered stats fragment.
    Stats,
    /// Numeric value of the progress widget.
    Progress,
}

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::core::error::FetchError;
use crate::core::model::EntityStatus;
use crate::plugins::registry::{FetcherContext, StatusFetcher};

pub const PROGRESS_PATH: &str = "/download-progress";

const OPERATION: &str = "download progress request";

pub struct HttpStatusFetcher {
    client: reqwest::Client,
    endpoint: Url,
    headers: HeaderMap,
    timeout: Duration,
}

impl HttpStatusFetcher {
    pub fn new(base_url: &Url, extra_headers: &HashMap<String, String>, ctx: &FetcherContext) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: base_url.join(PROGRESS_PATH)?,
            headers: Self::build_headers(extra_headers, ctx)?,
            timeout: Duration::from_secs(ctx.timeout_secs.max(1)),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn build_headers(extra: &HashMap<String, String>, ctx: &FetcherContext) -> anyhow::Result<HeaderMap> {
        let mut h = HeaderMap::new();
        h.insert(USER_AGENT, HeaderValue::from_str(&ctx.user_agent)?);
        h.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (k, v) in extra {
            let name = HeaderName::from_bytes(k.as_bytes())?;
            let value = HeaderValue::from_str(v)?;
            h.insert(name, value);
        }
        Ok(h)
    }
}

#[async_trait]
impl StatusFetcher for HttpStatusFetcher {
    fn name(&self) -> &'static str {
        "http-fetcher"
    }

    async fn fetch_batch_status(&self) -> Result<Vec<EntityStatus>, FetchError> {
        let resp = self.client
            .get(self.endpoint.clone())
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| FetchError::Transport { operation: OPERATION, source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { status, operation: OPERATION });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|source| FetchError::Transport { operation: OPERATION, source })?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Payload { operation: OPERATION, source })
    }
}

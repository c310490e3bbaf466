#![forbid(unsafe_code)]

//! HTTPS transport seam. The API client only ever sees `Transport`, which keeps
//! tests off the network and lets the blocking `ureq` agent live on tokio's
//! blocking pool.

use crate::error::UpstreamError;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

pub trait Transport: Send + Sync {
    /// Issues `GET {base}/{path}?{query}` and returns the body of a 2xx answer.
    /// Non-success answers come back as classified `UpstreamError`s.
    fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> impl Future<Output = Result<String, UpstreamError>> + Send;
}

/// Production transport built on a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    base_url: String,
}

impl UreqTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("tubesort/", env!("CARGO_PKG_VERSION")))
            .build();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { agent, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Transport for UreqTransport {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, UpstreamError> {
        let url = self.endpoint(path);
        let agent = self.agent.clone();
        let query: Vec<(String, String)> = query
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect();

        tokio::task::spawn_blocking(move || fetch_blocking(&agent, &url, &query))
            .await
            .map_err(|err| UpstreamError::network(format!("request task failed: {err}")))?
    }
}

fn fetch_blocking(
    agent: &ureq::Agent,
    url: &str,
    query: &[(String, String)],
) -> Result<String, UpstreamError> {
    let mut request = agent.get(url);
    for (key, value) in query {
        request = request.query(key, value);
    }

    match request.call() {
        Ok(response) => response
            .into_string()
            .map_err(|err| UpstreamError::network(format!("reading response from {url}: {err}"))),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(UpstreamError::from_status(status, &body))
        }
        // The transport error's Display embeds the full URL, key included.
        Err(ureq::Error::Transport(transport)) => Err(UpstreamError::network(format!(
            "{url}: {}{}",
            transport.kind(),
            transport
                .message()
                .map(|message| format!(" ({message})"))
                .unwrap_or_default()
        ))),
    }
}

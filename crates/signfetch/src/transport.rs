//! `ureq` adapter for [`RemoteContentFetcher`].

use std::time::Duration;

use signfetch_config::TransportConfig;
use ureq::Agent;
use ureq::http::Method;

use crate::fetcher::RemoteContentFetcher;
use crate::rebuild::SignedRequest;

/// Content type of rebuilt POST bodies.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Response returned by [`UreqFetcher`]. Error statuses are not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Sends requests with a shared `ureq` agent.
pub struct UreqFetcher {
    agent: Agent,
}

impl UreqFetcher {
    /// Agent with a global timeout.
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self::with_agent(agent)
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(Duration::from_secs(config.timeout_secs))
    }

    /// Use a preconfigured agent. It should not treat HTTP status codes as errors.
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl RemoteContentFetcher for UreqFetcher {
    type Response = RemoteResponse;
    type Error = ureq::Error;

    fn fetch_request(&self, request: SignedRequest) -> Result<RemoteResponse, ureq::Error> {
        let headers = parse_header_block(request.headers().unwrap_or_default());

        let response = if *request.method() == Method::POST {
            let mut builder = self.agent.post(request.url());
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            let has_content_type = headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
            if !has_content_type {
                builder = builder.header("Content-Type", FORM_CONTENT_TYPE);
            }
            builder.send(request.body().unwrap_or_default().as_bytes())?
        } else {
            let mut builder = self.agent.get(request.url());
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call()?
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned()))
            })
            .collect();
        let mut body_reader = response.into_body();
        let body = body_reader.read_to_string()?;

        tracing::debug!(status, url = request.url(), "Remote content fetched");

        Ok(RemoteResponse {
            status,
            headers,
            body,
        })
    }
}

/// Split a raw `Name: value` header block into pairs; malformed lines are skipped.
fn parse_header_block(block: &str) -> Vec<(String, String)> {
    block
        .lines()
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_owned(), value.trim().to_owned()))
        })
        .collect()
}

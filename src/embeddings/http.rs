use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::provider::ProviderError;

/// Longest error body echoed back in an error message
const MAX_ERROR_BODY: usize = 500;

/// Blocking JSON client shared by the provider implementations.
///
/// Non-2xx statuses are returned as responses rather than transport errors so
/// the body can be reported.
#[derive(Debug, Clone)]
pub(crate) struct JsonClient {
    agent: ureq::Agent,
    provider: &'static str,
}

impl JsonClient {
    pub(crate) fn new(provider: &'static str, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self { agent, provider }
    }

    pub(crate) fn post<B, R>(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<R, ProviderError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let request_json = serde_json::to_string(body)
            .map_err(|e| ProviderError::malformed(self.provider, format!("invalid request: {e}")))?;

        debug!("POST {} ({} bytes)", redact(url), request_json.len());

        let mut request = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        self.finish(request.send(&request_json))
    }

    pub(crate) fn get<R>(&self, url: &Url, headers: &[(&str, &str)]) -> Result<R, ProviderError>
    where
        R: DeserializeOwned,
    {
        debug!("GET {}", redact(url));

        let mut request = self.agent.get(url.as_str());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        self.finish(request.call())
    }

    fn finish<R>(
        &self,
        result: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    ) -> Result<R, ProviderError>
    where
        R: DeserializeOwned,
    {
        let mut response = result.map_err(|e| self.transport_error(e))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| self.transport_error(e))?;

        match status {
            200..=299 => serde_json::from_str(&body).map_err(|e| {
                ProviderError::malformed(self.provider, format!("unexpected response body: {e}"))
            }),
            401 | 403 => {
                warn!("{} rejected credentials (HTTP {})", self.provider, status);
                Err(ProviderError::Authentication {
                    provider: self.provider,
                    status,
                })
            }
            _ => {
                warn!("{} returned HTTP {}", self.provider, status);
                Err(ProviderError::Api {
                    provider: self.provider,
                    status,
                    message: body.chars().take(MAX_ERROR_BODY).collect(),
                })
            }
        }
    }

    fn transport_error(&self, error: ureq::Error) -> ProviderError {
        warn!("Transport error talking to {}: {}", self.provider, error);
        match error {
            ureq::Error::StatusCode(status) => ProviderError::Api {
                provider: self.provider,
                status,
                message: String::new(),
            },
            other => ProviderError::Connectivity {
                provider: self.provider,
                message: other.to_string(),
            },
        }
    }
}

/// Drop the query string, which may carry an API key
fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

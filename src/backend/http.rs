use super::*;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left intact when the identity is placed in a path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Answer service reached over HTTP
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for the given base URL (trailing slashes are ignored)
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        // No request timeout: calls resolve or fail per the transport
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn check_url(&self, identity: &Identity) -> String {
        format!(
            "{}/check/{}",
            self.base_url,
            utf8_percent_encode(identity.as_str(), PATH_SEGMENT)
        )
    }

    fn submit_url(&self) -> String {
        format!("{}/submit", self.base_url)
    }
}

#[async_trait]
impl QuizBackend for HttpBackend {
    async fn check(&self, identity: &Identity) -> BackendResult<CheckResponse> {
        let url = self.check_url(identity);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    async fn submit(&self, request: &SubmitRequest) -> BackendResult<SubmitResponse> {
        let url = self.submit_url();
        tracing::debug!(
            "POST {} (username={}, timer_ended={})",
            url,
            request.username,
            request.timer_ended
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    fn name(&self) -> &str {
        "http"
    }
}

//! Probe transport for icon sources.
//!
//! The fetcher only needs an opaque success/failure signal per source URL,
//! so the transport sits behind a trait and tests script it directly.

use async_trait::async_trait;
use reqwest::Client;

/// Error type for probe failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    /// Request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Response arrived with a non-success status.
    #[error("status {0}")]
    Status(u16),
}

/// One outbound existence check against an icon source URL.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<(), ProbeError>;
}

/// HTTP probe backed by a shared reqwest client.
pub struct HttpProbe {
    http: Client,
}

impl HttpProbe {
    /// Build the probe client.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Transport`] if the TLS backend fails to
    /// initialize.
    pub fn new(user_agent: &str) -> Result<Self, ProbeError> {
        let http = Client::builder()
            .user_agent(user_agent)
            .use_rustls_tls()
            .build()
            .map_err(|e| ProbeError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, url: &str) -> Result<(), ProbeError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        tracing::trace!(%url, "icon source reachable");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_probe_builds() {
        assert!(HttpProbe::new("favlink/0.1").is_ok());
    }

    #[test]
    fn test_probe_error_display() {
        assert!(ProbeError::Status(404).to_string().contains("404"));
        assert!(
            ProbeError::Transport("dns failure".into())
                .to_string()
                .contains("dns failure")
        );
    }
}

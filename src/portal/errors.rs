//! Error types for the portal client.

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("RSA public key not found on the login page")]
    KeyNotFound,
    #[error("RSA public key is malformed")]
    KeyFormat(#[source] rsa::pkcs8::spki::Error),
    #[error("Failed to encrypt credentials")]
    Encryption(#[from] rsa::Error),
    #[error("Login rejected for user {username}: wrong username or password")]
    AuthenticationRejected { username: String },
    #[error("Expected element not found: {0}")]
    ElementNotFound(String),
    #[error("Enrollment system redirect link not found")]
    RedirectNotFound,
    #[error("Course catalog is empty")]
    CatalogEmpty,
    #[error("None of the target courses appear in the catalog")]
    NoResolvableTargets,
    #[error("Request to {url} failed with status {status}")]
    Status { status: StatusCode, url: String },
    #[error("Invalid URL")]
    InvalidUrl(#[from] url::ParseError),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

impl PortalError {
    /// Whether a failure during polling should be retried on the next cycle
    /// instead of ending the run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    pub(crate) fn missing(what: impl Into<String>) -> Self {
        Self::ElementNotFound(what.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> PortalError {
        PortalError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            url: "https://example.com/".to_owned(),
        }
    }

    #[test]
    fn test_server_errors_are_recoverable() {
        assert!(status(500).is_recoverable());
        assert!(status(502).is_recoverable());
        assert!(status(503).is_recoverable());
        assert!(status(429).is_recoverable());
    }

    #[test]
    fn test_client_errors_are_fatal() {
        assert!(!status(403).is_recoverable());
        assert!(!status(404).is_recoverable());
    }

    #[test]
    fn test_workflow_errors_are_fatal() {
        assert!(!PortalError::KeyNotFound.is_recoverable());
        assert!(!PortalError::RedirectNotFound.is_recoverable());
        assert!(!PortalError::CatalogEmpty.is_recoverable());
        assert!(
            !PortalError::AuthenticationRejected {
                username: "alice".to_owned()
            }
            .is_recoverable()
        );
        assert!(!PortalError::missing("form#sepform").is_recoverable());
    }

    #[tokio::test]
    async fn test_connection_refused_is_recoverable() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let err = client
            .get(format!("http://{addr}/"))
            .send()
            .await
            .unwrap_err();
        assert!(err.is_connect());
        assert!(PortalError::from(err).is_recoverable());
    }
}

//! Errors surfaced by capability provider calls.

use std::time::Duration;

/// Error from a capability provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    /// HTTP status, when the provider answered at all
    pub status_code: Option<u16>,
    pub message: String,
    /// Delay the provider asked for before trying again
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    fn new(kind: ProviderErrorKind, status_code: Option<u16>, message: String) -> Self {
        Self {
            kind,
            status_code,
            message,
            retry_after: None,
        }
    }

    pub fn rate_limited(message: String, retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::new(ProviderErrorKind::RateLimited, Some(429), message)
        }
    }

    pub fn server_error(status_code: u16, message: String) -> Self {
        Self::new(ProviderErrorKind::ServerError, Some(status_code), message)
    }

    pub fn client_error(status_code: u16, message: String) -> Self {
        Self::new(ProviderErrorKind::ClientError, Some(status_code), message)
    }

    pub fn network_error(message: String) -> Self {
        Self::new(ProviderErrorKind::NetworkError, None, message)
    }

    /// The caller's time bound elapsed before the provider answered.
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ProviderErrorKind::Timeout,
            None,
            format!("no response within {:?}", after),
        )
    }

    /// The provider answered with something that could not be interpreted.
    pub fn parse_error(message: String) -> Self {
        Self::new(ProviderErrorKind::ParseError, None, message)
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// 429
    RateLimited,
    /// 5xx, or any status the adapter does not recognize
    ServerError,
    /// 4xx other than 429
    ClientError,
    NetworkError,
    Timeout,
    ParseError,
}

impl ProviderErrorKind {
    /// Whether the same call may succeed if tried again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimited
                | ProviderErrorKind::ServerError
                | ProviderErrorKind::NetworkError
                | ProviderErrorKind::Timeout
        )
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderErrorKind::RateLimited => write!(f, "Rate limited"),
            ProviderErrorKind::ServerError => write!(f, "Server error"),
            ProviderErrorKind::ClientError => write!(f, "Client error"),
            ProviderErrorKind::NetworkError => write!(f, "Network error"),
            ProviderErrorKind::Timeout => write!(f, "Timeout"),
            ProviderErrorKind::ParseError => write!(f, "Parse error"),
        }
    }
}

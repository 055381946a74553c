//! Error taxonomy for remote fetches

use std::fmt;

/// Network-level failure before any HTTP status was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    /// Body read or protocol failure after the connection was established
    Other,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a reqwest error. Builder errors are not transport failures and
    /// must be handled by the caller before reaching here.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        // Strip URL from error to keep query strings out of logs
        Self::new(kind, e.without_url().to_string())
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Other => "transport",
        };
        write!(f, "{label}: {}", self.message)
    }
}

impl std::error::Error for TransportError {}

/// Last condition observed by a retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Status(u16),
    Transport(TransportError),
}

impl Condition {
    /// 429, 5xx and every transport failure are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status(s) => *s == 429 || (500..=599).contains(s),
            Self::Transport(_) => true,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(s) => write!(f, "HTTP {s}"),
            Self::Transport(e) => write!(f, "{e}"),
        }
    }
}

/// Terminal failure of a fetch call, returned once retries are over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Every attempt hit a retryable condition.
    Exhausted { attempts: u32, last: Condition },
    /// Server rejected the request with a non-retryable status.
    Rejected { status: u16, message: String },
    /// Success status but the body could not be decoded.
    Malformed(String),
    /// The request could not be built (bad URL, bad header).
    Request(String),
}

impl FetchError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts, last: {last}")
            }
            Self::Rejected { status, message } if message.is_empty() => {
                write!(f, "rejected: HTTP {status}")
            }
            Self::Rejected { status, message } => write!(f, "rejected: HTTP {status}: {message}"),
            Self::Malformed(msg) => write!(f, "malformed response: {msg}"),
            Self::Request(msg) => write!(f, "invalid request: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(kind: TransportErrorKind) -> Condition {
        Condition::Transport(TransportError::new(kind, "boom"))
    }

    #[test]
    fn status_429_retryable() {
        assert!(Condition::Status(429).is_retryable());
    }

    #[test]
    fn status_5xx_retryable() {
        assert!(Condition::Status(500).is_retryable());
        assert!(Condition::Status(503).is_retryable());
        assert!(Condition::Status(599).is_retryable());
    }

    #[test]
    fn status_4xx_not_retryable() {
        for s in [400, 401, 403, 404, 410, 422] {
            assert!(!Condition::Status(s).is_retryable(), "{s}");
        }
    }

    #[test]
    fn transport_always_retryable() {
        assert!(transport(TransportErrorKind::Timeout).is_retryable());
        assert!(transport(TransportErrorKind::Connect).is_retryable());
        assert!(transport(TransportErrorKind::Other).is_retryable());
    }

    #[test]
    fn exhausted_vs_rejected() {
        let exhausted = FetchError::Exhausted {
            attempts: 5,
            last: Condition::Status(503),
        };
        let rejected = FetchError::Rejected {
            status: 404,
            message: String::new(),
        };
        assert!(exhausted.is_exhausted());
        assert!(!rejected.is_exhausted());
    }

    #[test]
    fn display_exhausted() {
        let err = FetchError::Exhausted {
            attempts: 3,
            last: Condition::Status(502),
        };
        assert_eq!(format!("{err}"), "gave up after 3 attempts, last: HTTP 502");
    }

    #[test]
    fn display_rejected_with_body() {
        let err = FetchError::Rejected {
            status: 400,
            message: "bad jql".to_string(),
        };
        assert_eq!(format!("{err}"), "rejected: HTTP 400: bad jql");
    }

    #[test]
    fn display_transport() {
        let err = FetchError::Exhausted {
            attempts: 2,
            last: transport(TransportErrorKind::Timeout),
        };
        assert!(format!("{err}").contains("timeout: boom"));
    }
}

use serde::{Serialize, Serializer};

use crate::targets::Target;

pub mod http;

/// Coarse health class of one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Warning,
    Error,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Healthy => write!(f, "healthy"),
            Status::Warning => write!(f, "warning"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// Why a probe failed to get a usable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ConnectionRefused,
    DomainNotFound,
    Timeout,
    /// Server-side failure, carrying the 5xx status.
    Http(u16),
    Unknown,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::ConnectionRefused => write!(f, "CONNECTION_REFUSED"),
            ErrorCode::DomainNotFound => write!(f, "DOMAIN_NOT_FOUND"),
            ErrorCode::Timeout => write!(f, "TIMEOUT"),
            ErrorCode::Http(status) => write!(f, "HTTP_{}", status),
            ErrorCode::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Status-specific payload of an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Verdict {
    Healthy { http_status: u16 },
    Warning { http_status: u16 },
    Error { message: String, code: ErrorCode },
}

/// Classified result of probing one target once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub target_name: String,
    #[serde(flatten)]
    pub verdict: Verdict,
}

impl CheckOutcome {
    pub fn healthy(target_name: impl Into<String>, http_status: u16) -> Self {
        Self {
            target_name: target_name.into(),
            verdict: Verdict::Healthy { http_status },
        }
    }

    pub fn warning(target_name: impl Into<String>, http_status: u16) -> Self {
        Self {
            target_name: target_name.into(),
            verdict: Verdict::Warning { http_status },
        }
    }

    pub fn error(target_name: impl Into<String>, message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            target_name: target_name.into(),
            verdict: Verdict::Error {
                message: message.into(),
                code,
            },
        }
    }

    /// Classify a received HTTP status.
    ///
    /// Exactly 200 is healthy; anything else below 500 is a warning. A 5xx is
    /// not a valid response at all and lands on the error path.
    pub fn from_http_status(target_name: impl Into<String>, status: u16) -> Self {
        match status {
            200 => Self::healthy(target_name, status),
            s if s < 500 => Self::warning(target_name, s),
            s => Self::error(
                target_name,
                format!("Request failed with status code {}", s),
                ErrorCode::Http(s),
            ),
        }
    }

    pub fn status(&self) -> Status {
        match self.verdict {
            Verdict::Healthy { .. } => Status::Healthy,
            Verdict::Warning { .. } => Status::Warning,
            Verdict::Error { .. } => Status::Error,
        }
    }

    pub(crate) fn log(&self) {
        match &self.verdict {
            Verdict::Healthy { http_status } => {
                tracing::info!(target_name = %self.target_name, %http_status, "Target healthy")
            }
            Verdict::Warning { http_status } => tracing::warn!(
                target_name = %self.target_name,
                %http_status,
                "Target answered with unexpected status"
            ),
            Verdict::Error { message, code } => tracing::error!(
                target_name = %self.target_name,
                %code,
                %message,
                "Target check failed"
            ),
        }
    }
}

/// Something that can check one target and classify the result.
///
/// Implementations never fail: every problem is folded into the returned
/// [`CheckOutcome`].
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, target: &Target) -> CheckOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_200_is_healthy() {
        let outcome = CheckOutcome::from_http_status("a", 200);
        assert_eq!(outcome.status(), Status::Healthy);
        assert_eq!(outcome.verdict, Verdict::Healthy { http_status: 200 });
    }

    #[test]
    fn test_non_200_below_500_is_warning() {
        for code in [201, 204, 301, 404, 429, 499] {
            let outcome = CheckOutcome::from_http_status("a", code);
            assert_eq!(outcome.verdict, Verdict::Warning { http_status: code });
        }
    }

    #[test]
    fn test_5xx_is_error() {
        let outcome = CheckOutcome::from_http_status("a", 503);
        match outcome.verdict {
            Verdict::Error { message, code } => {
                assert_eq!(code, ErrorCode::Http(503));
                assert_eq!(message, "Request failed with status code 503");
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::ConnectionRefused.to_string(), "CONNECTION_REFUSED");
        assert_eq!(ErrorCode::DomainNotFound.to_string(), "DOMAIN_NOT_FOUND");
        assert_eq!(ErrorCode::Timeout.to_string(), "TIMEOUT");
        assert_eq!(ErrorCode::Http(502).to_string(), "HTTP_502");
        assert_eq!(ErrorCode::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let json = serde_json::to_value(CheckOutcome::error("a", "boom", ErrorCode::Timeout)).unwrap();
        assert_eq!(json["target_name"], "a");
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "TIMEOUT");
        assert_eq!(json["message"], "boom");
    }
}

use super::{CheckOutcome, ErrorCode, Probe};
use crate::targets::Target;
use reqwest::Client;
use std::error::Error as StdError;
use std::time::{Duration, Instant};

/// Default bound on a single health check.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP probe: one `GET` against the target's URL, classified by status code.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("botwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait::async_trait]
impl Probe for HttpProbe {
    async fn check(&self, target: &Target) -> CheckOutcome {
        tracing::debug!(target_name = %target.name, url = %target.url, "Checking target");

        let start = Instant::now();
        let result = self.client.get(&target.url).send().await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                tracing::debug!(target_name = %target.name, %status, %elapsed_ms, "Response received");
                CheckOutcome::from_http_status(&target.name, status)
            }
            Err(e) => {
                let (message, code) = classify_error(&e, self.timeout);
                tracing::debug!(target_name = %target.name, %code, %elapsed_ms, error = %e, "Request failed");
                CheckOutcome::error(&target.name, message, code)
            }
        }
    }
}

/// Map a transport failure onto a human-readable message and an error code.
fn classify_error(err: &reqwest::Error, timeout: Duration) -> (String, ErrorCode) {
    if err.is_timeout() {
        return (
            format!("timeout of {}ms exceeded", timeout.as_millis()),
            ErrorCode::Timeout,
        );
    }

    // Walk down to the root cause; hyper wraps the io error a few layers deep.
    let mut root: &dyn StdError = err;
    let mut chain = err.to_string();
    while let Some(source) = root.source() {
        root = source;
        chain.push_str(": ");
        chain.push_str(&source.to_string());

        if let Some(io) = source.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => {
                    return (io.to_string(), ErrorCode::ConnectionRefused);
                }
                std::io::ErrorKind::TimedOut => {
                    return (
                        format!("timeout of {}ms exceeded", timeout.as_millis()),
                        ErrorCode::Timeout,
                    );
                }
                _ => {}
            }
        }
    }

    let message = root.to_string();
    (message, classify_text(&chain))
}

fn classify_text(chain: &str) -> ErrorCode {
    let lower = chain.to_lowercase();
    if lower.contains("dns error")
        || lower.contains("failed to lookup address")
        || lower.contains("name or service not known")
        || lower.contains("no such host")
    {
        ErrorCode::DomainNotFound
    } else if lower.contains("connection refused") {
        ErrorCode::ConnectionRefused
    } else if lower.contains("timed out") {
        ErrorCode::Timeout
    } else {
        ErrorCode::Unknown
    }
}

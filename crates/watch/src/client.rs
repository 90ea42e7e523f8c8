#![forbid(unsafe_code)]

//! HTTP access to the read API.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport error on {path}: {message}")]
    Transport { path: String, message: String },
    #[error("{path} answered {status}{}", code_suffix(.code))]
    Http {
        path: String,
        status: u16,
        code: Option<String>,
    },
    #[error("unexpected body from {path}: {message}")]
    Decode { path: String, message: String },
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|code| format!(" ({code})"))
        .unwrap_or_default()
}

impl FetchError {
    /// Transport failures and 5xx may clear up on their own; a 4xx or a body
    /// we cannot read will not.
    pub fn retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Http { status, .. } => *status >= 500,
            FetchError::Decode { .. } => false,
        }
    }
}

/// Anything that can GET a path of the read API as JSON.
pub trait Fetch: Send + Sync {
    fn get_json(&self, path: &str) -> Result<Value, FetchError>;
}

pub fn fetch_as<T: DeserializeOwned>(value: Value, path: &str) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|err| FetchError::Decode {
        path: path.to_string(),
        message: err.to_string(),
    })
}

fn error_code(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("code")?
        .as_str()
        .map(ToString::to_string)
}

pub struct HttpFetcher {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Fetch for HttpFetcher {
    fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");
        let response = match self.agent.get(&url).set("Accept", "application/json").call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let code = response.into_string().ok().and_then(|body| error_code(&body));
                return Err(FetchError::Http {
                    path: path.to_string(),
                    status,
                    code,
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(FetchError::Transport {
                    path: path.to_string(),
                    message: transport.to_string(),
                });
            }
        };
        let body = response.into_string().map_err(|err| FetchError::Transport {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        serde_json::from_str(&body).map_err(|err| FetchError::Decode {
            path: path.to_string(),
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        let transport = FetchError::Transport {
            path: "/api/v1/health".to_string(),
            message: "connection refused".to_string(),
        };
        let server = FetchError::Http {
            path: "/api/v1/health".to_string(),
            status: 503,
            code: Some("SOURCE_UNAVAILABLE".to_string()),
        };
        let client = FetchError::Http {
            path: "/api/v1/activity?limit=0".to_string(),
            status: 400,
            code: Some("INVALID_LIMIT".to_string()),
        };
        assert!(transport.retryable());
        assert!(server.retryable());
        assert!(!client.retryable());
        assert_eq!(
            client.to_string(),
            "/api/v1/activity?limit=0 answered 400 (INVALID_LIMIT)"
        );
    }

    #[test]
    fn error_code_reads_envelope() {
        let body = r#"{"error":{"code":"UNKNOWN_NODE","message":"x","recovery":"y"}}"#;
        assert_eq!(error_code(body).as_deref(), Some("UNKNOWN_NODE"));
        assert_eq!(error_code("not json"), None);
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let fetcher = HttpFetcher::new("http://127.0.0.1:8000/", Duration::from_secs(1));
        assert_eq!(fetcher.base_url(), "http://127.0.0.1:8000");
    }
}

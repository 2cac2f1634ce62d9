// Error types for the rustyclint cache.
// Covers storage backends, the network transport, and controller lifecycle misuse.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Storage backend error: {0}")]
    Storage(String),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network request failed for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Precache of {url} failed with status {status}")]
    Precache { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Cannot {action} while controller is {phase}")]
    Lifecycle {
        action: &'static str,
        phase: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_error_display() {
        let err = CacheError::Lifecycle {
            action: "activate",
            phase: "parsed",
        };
        assert_eq!(err.to_string(), "Cannot activate while controller is parsed");
    }

    #[test]
    fn test_json_error_converts() {
        let parse = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: CacheError = parse.into();
        assert!(err.to_string().starts_with("JSON error"));
    }
}

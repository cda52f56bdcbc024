use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream {url} returned status {status}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("No data available: {0}")]
    NoData(String),

    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Export failed: {0}")]
    Export(String),
}

impl EtlError {
    pub fn invalid_parameter(name: &str, message: impl Into<String>) -> Self {
        EtlError::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Whether a fetch that failed this way is worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            EtlError::Http(_) | EtlError::Json(_) => true,
            EtlError::UpstreamStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_server_side_statuses_retry() {
        let server = EtlError::UpstreamStatus { url: "http://x".into(), status: 503 };
        let client = EtlError::UpstreamStatus { url: "http://x".into(), status: 404 };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(!EtlError::Config("bad".into()).is_retryable());
    }

    #[test]
    fn test_messages() {
        let err = EtlError::invalid_parameter("date", "expected YYYY-MM-DD");
        assert_eq!(err.to_string(), "Invalid parameter 'date': expected YYYY-MM-DD");
    }
}

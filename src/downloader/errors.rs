// Error types for the resolve -> select -> transfer pipeline

use thiserror::Error;

use super::extractors::{classify_failure, FailureReason};

#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// The URL could not be understood by the platform client
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// yt-dlp not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Network timeout while talking to the platform
    #[error("Network timeout: {0}")]
    NetworkTimeout(String),

    /// Failed to parse yt-dlp JSON output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Command execution failed
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Metadata lookup failed, nothing to download
    #[error("{reason}: {message}")]
    Resolution {
        reason: FailureReason,
        message: String,
    },

    /// No stream satisfies the selection policy
    #[error("No matching stream: {0}")]
    NoMatchingStream(String),

    /// Moving bytes into the buffer or onto disk failed
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// Unknown error with details
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DownloadError {
    /// Failure reason shown to the user when a lookup ends in this error
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::InvalidUrl(_) => FailureReason::InvalidUrl,
            Self::ToolNotFound(_) => FailureReason::ToolNotFound,
            Self::NetworkTimeout(_) => FailureReason::NetworkTimeout,
            Self::Resolution { reason, .. } => *reason,
            other => classify_failure(&other.to_string()),
        }
    }

    /// The message without the variant prefix
    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidUrl(m)
            | Self::ToolNotFound(m)
            | Self::NetworkTimeout(m)
            | Self::ParseError(m)
            | Self::ExecutionError(m)
            | Self::NoMatchingStream(m)
            | Self::Transfer(m)
            | Self::Unknown(m) => m,
            Self::Resolution { message, .. } => message,
        }
    }

    /// Re-tag an error raised while resolving a URL as a resolution failure
    pub fn into_resolution(self) -> Self {
        match self {
            resolution @ Self::Resolution { .. } => resolution,
            other => Self::Resolution {
                reason: other.reason(),
                message: other.detail().to_string(),
            },
        }
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::Transfer(err.to_string())
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::NetworkTimeout(err.to_string())
        } else {
            Self::Transfer(err.to_string())
        }
    }
}

// yt-dlp reports everything on stderr; sort it into a variant
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        if lower.contains("timeout") || lower.contains("timed out") {
            return Self::NetworkTimeout(s);
        }

        if lower.contains("is not a valid url") || lower.contains("unsupported url") {
            return Self::InvalidUrl(s);
        }

        if lower.contains("invalid json") || lower.contains("parse") {
            return Self::ParseError(s);
        }

        match classify_failure(&s) {
            FailureReason::Unknown => Self::Unknown(s),
            reason => Self::Resolution { reason, message: s },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_from_stderr() {
        let err = DownloadError::from("ERROR: 'not-a-url' is not a valid URL".to_string());
        assert!(matches!(err, DownloadError::InvalidUrl(_)));
        assert_eq!(err.reason(), FailureReason::InvalidUrl);
    }

    #[test]
    fn test_timeout_from_stderr() {
        let err = DownloadError::from("Timed out after 60s".to_string());
        assert!(matches!(err, DownloadError::NetworkTimeout(_)));
    }

    #[test]
    fn test_unavailable_becomes_resolution() {
        let err = DownloadError::from("ERROR: [youtube] abc: Video unavailable".to_string());
        match err {
            DownloadError::Resolution { reason, .. } => {
                assert_eq!(reason, FailureReason::VideoUnavailable)
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_unrecognised_stays_unknown() {
        let err = DownloadError::from("something odd".to_string());
        assert!(matches!(err, DownloadError::Unknown(_)));
    }

    #[test]
    fn test_missing_input_file_is_not_a_missing_tool() {
        let err = DownloadError::from(
            "ERROR: [Errno 2] No such file or directory: '/tmp/cookies.txt'".to_string(),
        );
        assert!(matches!(err, DownloadError::Unknown(_)));
        assert_ne!(err.into_resolution().reason(), FailureReason::ToolNotFound);
    }

    #[test]
    fn test_into_resolution_keeps_reason() {
        let err = DownloadError::InvalidUrl("no video id in 'x'".to_string()).into_resolution();
        assert_eq!(err.reason(), FailureReason::InvalidUrl);
        assert_eq!(err.to_string(), "Invalid URL: no video id in 'x'");
        assert_eq!(err.clone().into_resolution().to_string(), err.to_string());
    }

    #[test]
    fn test_io_error_is_transfer() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(DownloadError::from(io), DownloadError::Transfer(_)));
    }
}

// Failure diagnostics - turns platform client error text into a reason
//
// The reason is what the UI shows instead of a raw yt-dlp stderr dump.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a URL could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Not a URL the platform client understands
    InvalidUrl,

    /// Deleted, removed or otherwise gone
    VideoUnavailable,

    /// Private video requiring authorization
    PrivateVideo,

    /// Age-restricted content requiring login
    AgeRestricted,

    /// Geographic restriction
    GeoBlocked,

    /// 429, bot checks and similar throttling
    RateLimited,

    /// Network timeout or unreachable host
    NetworkTimeout,

    /// The external client program is missing
    ToolNotFound,

    /// Anything else
    Unknown,
}

impl FailureReason {
    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "Invalid URL",
            Self::VideoUnavailable => "Video unavailable",
            Self::PrivateVideo => "Private video",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Not available in your country",
            Self::RateLimited => "Rate limited by the platform",
            Self::NetworkTimeout => "Network timeout",
            Self::ToolNotFound => "yt-dlp is not installed",
            Self::Unknown => "Lookup failed",
        }
    }

    /// Short suggestion for the user, if there is one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidUrl => Some("Paste a full link such as https://www.youtube.com/watch?v=..."),
            Self::AgeRestricted | Self::PrivateVideo => {
                Some("Configure a cookies file from a logged-in browser (--cookies)")
            }
            Self::GeoBlocked => Some("Try again through a proxy in an allowed region (--proxy)"),
            Self::RateLimited | Self::NetworkTimeout => Some("Wait a few minutes and try again"),
            Self::ToolNotFound => Some("Install yt-dlp or point --ytdlp-path at it"),
            Self::VideoUnavailable | Self::Unknown => None,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

lazy_static! {
    static ref ERROR_LINE: Regex = Regex::new(r"(?m)^ERROR:\s*(.+)$").unwrap();
}

/// Analyze error text and return the failure reason
pub fn classify_failure(error: &str) -> FailureReason {
    let lower = error.to_lowercase();

    if lower.contains("is not a valid url")
        || lower.contains("unsupported url")
        || lower.contains("invalid url")
        || lower.contains("no video id")
    {
        return FailureReason::InvalidUrl;
    }

    if lower.contains("sign in to confirm your age") || lower.contains("age-restricted") {
        return FailureReason::AgeRestricted;
    }

    if lower.contains("private video") || lower.contains("video is private") {
        return FailureReason::PrivateVideo;
    }

    if lower.contains("video unavailable")
        || lower.contains("video is unavailable")
        || lower.contains("has been removed")
        || lower.contains("no longer available")
    {
        return FailureReason::VideoUnavailable;
    }

    if lower.contains("available in your country") || lower.contains("blocked in your country") {
        return FailureReason::GeoBlocked;
    }

    if lower.contains("429")
        || lower.contains("too many requests")
        || lower.contains("rate limit")
        || lower.contains("confirm you're not a bot")
    {
        return FailureReason::RateLimited;
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network is unreachable")
        || lower.contains("name resolution")
    {
        return FailureReason::NetworkTimeout;
    }

    if lower.contains("tool not found") {
        return FailureReason::ToolNotFound;
    }

    FailureReason::Unknown
}

/// First `ERROR:` line of yt-dlp stderr, or the last non-empty line
pub fn summarize_stderr(stderr: &str) -> String {
    if let Some(caps) = ERROR_LINE.captures(stderr) {
        return caps[1].trim().to_string();
    }

    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown error")
        .chars()
        .take(200)
        .collect()
}

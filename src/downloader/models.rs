// Common data models for the downloader

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use time::Date;

use super::extractors::FailureReason;

/// How a stream carries its media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Audio and video muxed together
    Progressive,
    /// Adaptive, video track only
    VideoOnly,
    /// Adaptive, audio track only
    AudioOnly,
}

/// One downloadable encoding of a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Platform format tag (e.g. "18", "140")
    pub itag: String,
    /// e.g. "video/mp4", "audio/webm"
    pub mime_type: String,
    /// Container extension (mp4, webm, m4a)
    pub extension: String,
    /// e.g. "720p", absent for audio
    pub resolution: Option<String>,
    pub height: Option<u32>,
    pub fps: Option<f32>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    /// Audio bitrate in kbps
    pub abr: Option<f32>,
    /// File size in bytes (exact or approximate)
    pub filesize: Option<u64>,
    pub is_progressive: bool,
    pub is_adaptive: bool,
    pub kind: StreamKind,
    /// Direct media URL
    #[serde(skip)]
    pub url: String,
    /// Request headers the platform expects on the media request
    #[serde(skip)]
    pub http_headers: HashMap<String, String>,
}

impl StreamDescriptor {
    /// Container subtype, the part after the slash of the MIME type
    pub fn subtype(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, sub)| sub)
            .unwrap_or(&self.extension)
    }

    /// Resolution as a number for ordering, 0 when unknown
    pub fn resolution_value(&self) -> u32 {
        if let Some(h) = self.height {
            return h;
        }
        self.resolution
            .as_deref()
            .and_then(|r| r.trim_end_matches('p').parse().ok())
            .unwrap_or(0)
    }
}

/// Video metadata, a read-only snapshot taken at lookup time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub author: String,
    /// Duration in seconds
    pub length: u64,
    pub views: Option<u64>,
    pub publish_date: Option<Date>,
    pub streams: Vec<StreamDescriptor>,
}

/// Why a lookup failed, with the client's own words
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionFailure {
    pub reason: FailureReason,
    pub message: String,
}

/// Outcome of a metadata lookup
#[derive(Debug, Clone)]
pub enum MetadataLookup {
    Resolved(VideoMetadata),
    Failed(ResolutionFailure),
}

impl MetadataLookup {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Which stream to pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPolicy {
    /// The single audio-only rendition
    Audio,
    /// Highest-resolution progressive rendition
    Video,
}

/// Where the transferred bytes go before delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferSink {
    /// Straight into memory
    #[default]
    Buffer,
    /// Into the session temp directory, then read back
    File,
}

/// Policy plus sink; together with the URL this keys the result cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchMode {
    pub policy: StreamPolicy,
    pub sink: TransferSink,
}

impl fmt::Display for StreamPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

impl fmt::Display for TransferSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer => write!(f, "buffer"),
            Self::File => write!(f, "file"),
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.policy, self.sink)
    }
}

impl FromStr for StreamPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            other => Err(format!("unknown policy '{}', expected audio or video", other)),
        }
    }
}

/// The chosen stream and its bytes
#[derive(Debug, Clone)]
pub struct SelectedStream {
    pub descriptor: StreamDescriptor,
    pub bytes: Bytes,
}

/// Everything needed to hand a download to the browser
#[derive(Debug, Clone)]
pub struct Delivery {
    pub title: String,
    pub file_name: String,
    pub mime_type: String,
    pub selected: SelectedStream,
}

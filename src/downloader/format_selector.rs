// StreamSelector - picks exactly one stream out of a lookup
//
// Two policies:
// - Audio: best audio-only rendition of the configured subtype
// - Video: highest-resolution progressive rendition with a container extension

use super::errors::DownloadError;
use super::models::{StreamDescriptor, StreamKind, StreamPolicy};

/// Filters applied by the selection policies
#[derive(Debug, Clone)]
pub struct StreamSelector {
    /// Container extension the video policy keeps (e.g. "mp4")
    pub video_extension: String,
    /// MIME subtype the audio policy keeps (e.g. "mp4" for m4a audio)
    pub audio_subtype: String,
}

impl Default for StreamSelector {
    fn default() -> Self {
        Self {
            video_extension: "mp4".to_string(),
            audio_subtype: "mp4".to_string(),
        }
    }
}

impl StreamSelector {
    pub fn new(video_extension: impl Into<String>, audio_subtype: impl Into<String>) -> Self {
        Self {
            video_extension: video_extension.into(),
            audio_subtype: audio_subtype.into(),
        }
    }

    pub fn select<'a>(
        &self,
        policy: StreamPolicy,
        streams: &'a [StreamDescriptor],
    ) -> Result<&'a StreamDescriptor, DownloadError> {
        match policy {
            StreamPolicy::Audio => self.select_audio(streams),
            StreamPolicy::Video => self.select_progressive(streams),
        }
    }

    /// Audio-only stream with the highest bitrate.
    ///
    /// Equal bitrates keep the later stream, matching an ascending sort
    /// followed by taking the last element.
    pub fn select_audio<'a>(
        &self,
        streams: &'a [StreamDescriptor],
    ) -> Result<&'a StreamDescriptor, DownloadError> {
        streams
            .iter()
            .filter(|s| s.kind == StreamKind::AudioOnly && s.subtype() == self.audio_subtype)
            .max_by(|a, b| {
                let a = a.abr.unwrap_or(0.0);
                let b = b.abr.unwrap_or(0.0);
                a.total_cmp(&b)
            })
            .ok_or_else(|| {
                DownloadError::NoMatchingStream(format!(
                    "no audio-only stream of type audio/{}",
                    self.audio_subtype
                ))
            })
    }

    /// First progressive stream after sorting by resolution, descending.
    pub fn select_progressive<'a>(
        &self,
        streams: &'a [StreamDescriptor],
    ) -> Result<&'a StreamDescriptor, DownloadError> {
        let mut candidates: Vec<&StreamDescriptor> = streams
            .iter()
            .filter(|s| s.is_progressive && s.extension == self.video_extension)
            .collect();

        // stable sort: the first listed wins among equal resolutions
        candidates.sort_by_key(|s| std::cmp::Reverse(s.resolution_value()));

        candidates.first().copied().ok_or_else(|| {
            DownloadError::NoMatchingStream(format!(
                "no progressive {} stream",
                self.video_extension
            ))
        })
    }
}

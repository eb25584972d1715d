// Test helpers: descriptor builder and a scripted platform client

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::downloader::errors::DownloadError;
use crate::downloader::extractors::{extract_video_id, VideoPlatformClient};
use crate::downloader::models::{StreamDescriptor, StreamKind, VideoMetadata};

pub const WATCH_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

pub fn descriptor(itag: &str, kind: StreamKind, ext: &str, height: Option<u32>) -> StreamDescriptor {
    let major = match kind {
        StreamKind::AudioOnly => "audio",
        _ => "video",
    };

    StreamDescriptor {
        itag: itag.to_string(),
        mime_type: format!("{}/{}", major, ext),
        extension: ext.to_string(),
        resolution: height.map(|h| format!("{}p", h)),
        height,
        fps: None,
        video_codec: None,
        audio_codec: None,
        abr: None,
        filesize: None,
        is_progressive: kind == StreamKind::Progressive,
        is_adaptive: kind != StreamKind::Progressive,
        kind,
        url: format!("https://media.example/{}", itag),
        http_headers: HashMap::new(),
    }
}

/// Typical stream list: three progressive mp4s, two m4a audio, one adaptive video
pub fn sample_streams() -> Vec<StreamDescriptor> {
    let mut low = descriptor("139", StreamKind::AudioOnly, "m4a", None);
    low.mime_type = "audio/mp4".to_string();
    low.abr = Some(48.0);
    let mut high = descriptor("140", StreamKind::AudioOnly, "m4a", None);
    high.mime_type = "audio/mp4".to_string();
    high.abr = Some(128.0);

    vec![
        low,
        high,
        descriptor("18", StreamKind::Progressive, "mp4", Some(360)),
        descriptor("59", StreamKind::Progressive, "mp4", Some(480)),
        descriptor("22", StreamKind::Progressive, "mp4", Some(720)),
        descriptor("137", StreamKind::VideoOnly, "mp4", Some(1080)),
    ]
}

/// In-memory platform client that counts calls
pub struct FakeClient {
    pub metadata: VideoMetadata,
    pub payload: Bytes,
    pub fail_transfers: bool,
    pub delay: Option<Duration>,
    resolves: AtomicUsize,
    transfers: AtomicUsize,
}

impl FakeClient {
    pub fn with_payload(payload: &[u8]) -> Self {
        Self {
            metadata: VideoMetadata {
                title: "My Video! Title##2024".to_string(),
                author: "Someone".to_string(),
                length: 212,
                views: Some(42),
                publish_date: None,
                streams: sample_streams(),
            },
            payload: Bytes::copy_from_slice(payload),
            fail_transfers: false,
            delay: None,
            resolves: AtomicUsize::new(0),
            transfers: AtomicUsize::new(0),
        }
    }

    pub fn with_streams(mut self, streams: Vec<StreamDescriptor>) -> Self {
        self.metadata.streams = streams;
        self
    }

    pub fn failing_transfers(mut self) -> Self {
        self.fail_transfers = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn transfers(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }

    async fn fetch(&self) -> Result<Bytes, DownloadError> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_transfers {
            return Err(DownloadError::Transfer("connection reset".to_string()));
        }
        Ok(self.payload.clone())
    }
}

#[async_trait]
impl VideoPlatformClient for FakeClient {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn resolve(&self, url: &str) -> Result<VideoMetadata, DownloadError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if extract_video_id(url).is_none() {
            return Err(DownloadError::InvalidUrl(format!("no video id in '{}'", url)));
        }
        Ok(self.metadata.clone())
    }

    async fn stream_to_buffer(&self, _stream: &StreamDescriptor) -> Result<Bytes, DownloadError> {
        self.fetch().await
    }

    async fn download_to_file(
        &self,
        _stream: &StreamDescriptor,
        dest: &Path,
    ) -> Result<u64, DownloadError> {
        let bytes = self.fetch().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}

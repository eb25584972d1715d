// VideoPlatformClient trait and its configuration

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{StreamDescriptor, VideoMetadata};

/// Configuration for the platform client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Explicit yt-dlp binary; located on common paths when absent
    pub ytdlp_path: Option<String>,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// Path to cookies.txt file
    pub cookies_path: Option<String>,
    /// Metadata lookup timeout in seconds
    pub timeout_seconds: u64,
    /// Connect timeout for the stream transfer in seconds
    pub connect_timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            proxy: None,
            cookies_path: None,
            timeout_seconds: 60,
            connect_timeout_seconds: 15,
        }
    }
}

impl ClientConfig {
    pub fn with_ytdlp_path(mut self, path: Option<String>) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_cookies_path(mut self, path: Option<String>) -> Self {
        self.cookies_path = path;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout_seconds = seconds;
        self
    }
}

/// An opaque video platform: resolves URLs and hands out stream bytes
#[async_trait]
pub trait VideoPlatformClient: Send + Sync {
    /// Name of the client (for logging)
    fn name(&self) -> &'static str;

    /// Resolve a URL into metadata and its stream list
    async fn resolve(&self, url: &str) -> Result<VideoMetadata, DownloadError>;

    /// Fetch a stream fully into memory
    async fn stream_to_buffer(&self, stream: &StreamDescriptor) -> Result<Bytes, DownloadError>;

    /// Fetch a stream into `dest`, returning the number of bytes written
    async fn download_to_file(
        &self,
        stream: &StreamDescriptor,
        dest: &Path,
    ) -> Result<u64, DownloadError>;
}

// YtDlpClient - resolves URLs with the native `yt-dlp` binary
//
// Metadata comes from `yt-dlp --dump-json`; stream bytes are fetched
// directly from the format URL yt-dlp reports, with the headers it asks for.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command as StdCommand;
use std::time::Duration;
use time::Date;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::diagnostics::summarize_stderr;
use super::traits::{ClientConfig, VideoPlatformClient};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{StreamDescriptor, StreamKind, VideoMetadata};
use crate::downloader::utils::run_output_with_timeout;

lazy_static! {
    static ref VIDEO_ID: Regex = Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11}).*").unwrap();
}

/// Extract the 11-character video id from a watch, short or embed URL
pub fn extract_video_id(url: &str) -> Option<&str> {
    VIDEO_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Platform client backed by the yt-dlp binary
pub struct YtDlpClient {
    ytdlp_path: String,
    config: ClientConfig,
    http: reqwest::Client,
}

impl YtDlpClient {
    pub fn new(config: ClientConfig) -> Result<Self, DownloadError> {
        let ytdlp_path = config.ytdlp_path.clone().unwrap_or_else(Self::locate);

        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds));
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| DownloadError::ExecutionError(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .map_err(|e| DownloadError::ExecutionError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            ytdlp_path,
            config,
            http,
        })
    }

    pub fn ytdlp_path(&self) -> &str {
        &self.ytdlp_path
    }

    /// Find yt-dlp binary
    pub fn locate() -> String {
        let common_paths = [
            "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
            "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac, pip --user
            "/usr/bin/yt-dlp",          // System installation
        ];

        for path in common_paths {
            if Path::new(path).exists() {
                return path.to_string();
            }
        }

        if let Ok(output) = StdCommand::new("which").arg("yt-dlp").output() {
            if output.status.success() {
                if let Ok(path) = String::from_utf8(output.stdout) {
                    let trimmed = path.trim();
                    if !trimmed.is_empty() {
                        return trimmed.to_string();
                    }
                }
            }
        }

        "yt-dlp".to_string()
    }

    /// Build command arguments
    fn build_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.config.timeout_seconds.to_string(),
        ];

        if let Some(path) = &self.config.cookies_path {
            args.push("--cookies".to_string());
            args.push(path.clone());
        }

        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args.push(url.to_string());
        args
    }

    /// Parse `--dump-json` output
    fn parse_json(stdout: &[u8]) -> Result<VideoMetadata, DownloadError> {
        let json: serde_json::Value = serde_json::from_slice(stdout)
            .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))?;

        let author = json["uploader"]
            .as_str()
            .or_else(|| json["channel"].as_str())
            .unwrap_or("Unknown");

        Ok(VideoMetadata {
            title: json["title"].as_str().unwrap_or("Unknown").to_string(),
            author: author.to_string(),
            length: json["duration"].as_f64().unwrap_or(0.0) as u64,
            views: json["view_count"].as_u64(),
            publish_date: json["upload_date"].as_str().and_then(parse_upload_date),
            streams: Self::parse_formats(&json)?,
        })
    }

    fn parse_formats(json: &serde_json::Value) -> Result<Vec<StreamDescriptor>, DownloadError> {
        let formats_array = json["formats"]
            .as_array()
            .ok_or_else(|| DownloadError::ParseError("No formats array in JSON".to_string()))?;

        let mut streams = Vec::new();

        for f in formats_array {
            // HLS/DASH manifests and storyboards are not a single fetchable file
            let protocol = f["protocol"].as_str().unwrap_or("https");
            if protocol != "https" && protocol != "http" {
                continue;
            }
            let Some(url) = f["url"].as_str() else {
                continue;
            };

            let vcodec = f["vcodec"].as_str().filter(|v| *v != "none");
            let acodec = f["acodec"].as_str().filter(|a| *a != "none");
            let kind = match (vcodec, acodec) {
                (Some(_), Some(_)) => StreamKind::Progressive,
                (Some(_), None) => StreamKind::VideoOnly,
                (None, Some(_)) => StreamKind::AudioOnly,
                (None, None) => continue,
            };

            let extension = f["ext"].as_str().unwrap_or("").to_string();
            let mime_type = match kind {
                StreamKind::AudioOnly if extension == "m4a" => "audio/mp4".to_string(),
                StreamKind::AudioOnly => format!("audio/{}", extension),
                _ => format!("video/{}", extension),
            };
            let height = f["height"].as_u64().map(|h| h as u32);

            let http_headers: HashMap<String, String> = f["http_headers"]
                .as_object()
                .map(|headers| {
                    headers
                        .iter()
                        .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                        .collect()
                })
                .unwrap_or_default();

            streams.push(StreamDescriptor {
                itag: f["format_id"].as_str().unwrap_or("").to_string(),
                mime_type,
                extension,
                resolution: height.map(|h| format!("{}p", h)),
                height,
                fps: f["fps"].as_f64().map(|fps| fps as f32),
                video_codec: vcodec.map(str::to_string),
                audio_codec: acodec.map(str::to_string),
                abr: f["abr"].as_f64().map(|a| a as f32),
                filesize: f["filesize"].as_u64().or_else(|| f["filesize_approx"].as_u64()),
                is_progressive: kind == StreamKind::Progressive,
                is_adaptive: kind != StreamKind::Progressive,
                kind,
                url: url.to_string(),
                http_headers,
            });
        }

        Ok(streams)
    }

    async fn send(&self, stream: &StreamDescriptor) -> Result<reqwest::Response, DownloadError> {
        let mut request = self.http.get(&stream.url);
        for (name, value) in &stream.http_headers {
            request = request.header(name, value);
        }

        let response = request.send().await?.error_for_status()?;
        debug!(itag = %stream.itag, length = ?response.content_length(), "stream response");
        Ok(response)
    }
}

/// yt-dlp reports dates as YYYYMMDD
fn parse_upload_date(raw: &str) -> Option<Date> {
    let format = time::format_description::parse("[year][month][day]").ok()?;
    Date::parse(raw, &format).ok()
}

#[async_trait]
impl VideoPlatformClient for YtDlpClient {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn resolve(&self, url: &str) -> Result<VideoMetadata, DownloadError> {
        if extract_video_id(url).is_none() {
            return Err(DownloadError::InvalidUrl(format!(
                "no video id in '{}'",
                url
            )));
        }

        let args = self.build_args(url);
        let output =
            run_output_with_timeout(&self.ytdlp_path, &args, self.config.timeout_seconds).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let summary = summarize_stderr(&stderr);
            warn!(url, error = %summary, "yt-dlp lookup failed");
            return Err(DownloadError::from(summary));
        }

        let metadata = Self::parse_json(&output.stdout)?;
        info!(
            url,
            title = %metadata.title,
            streams = metadata.streams.len(),
            "resolved"
        );
        Ok(metadata)
    }

    async fn stream_to_buffer(&self, stream: &StreamDescriptor) -> Result<Bytes, DownloadError> {
        let mut response = self.send(stream).await?;

        let mut buf = BytesMut::with_capacity(response.content_length().unwrap_or(0) as usize);
        while let Some(chunk) = response.chunk().await? {
            buf.extend_from_slice(&chunk);
        }

        Ok(buf.freeze())
    }

    async fn download_to_file(
        &self,
        stream: &StreamDescriptor,
        dest: &Path,
    ) -> Result<u64, DownloadError> {
        let mut response = self.send(stream).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

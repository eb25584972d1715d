// Application configuration: command-line flags with TUBEDROP_* env fallbacks

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::downloader::{ClientConfig, StreamSelector};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {flag}: {message}")]
    Invalid { flag: &'static str, message: String },

    #[error("Temp root {0} is not a directory")]
    TempRoot(PathBuf),

    #[error("Cookies file {0} does not exist")]
    CookiesFile(PathBuf),
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// Address the web UI listens on
    #[arg(long, env = "TUBEDROP_BIND", default_value = "127.0.0.1:8501")]
    pub bind: SocketAddr,

    /// Path to the yt-dlp binary (searched on common paths when unset)
    #[arg(long, env = "TUBEDROP_YTDLP_PATH")]
    pub ytdlp_path: Option<String>,

    /// SOCKS5/HTTP proxy for lookups and transfers
    #[arg(long, env = "TUBEDROP_PROXY")]
    pub proxy: Option<String>,

    /// Netscape cookies.txt passed to yt-dlp
    #[arg(long, env = "TUBEDROP_COOKIES")]
    pub cookies: Option<PathBuf>,

    /// Metadata lookup timeout in seconds
    #[arg(long, env = "TUBEDROP_METADATA_TIMEOUT", default_value_t = 60)]
    pub metadata_timeout: u64,

    /// Connect timeout for stream transfers in seconds
    #[arg(long, env = "TUBEDROP_CONNECT_TIMEOUT", default_value_t = 15)]
    pub connect_timeout: u64,

    /// How long cached lookups and downloads stay valid, in seconds
    #[arg(long, env = "TUBEDROP_CACHE_TTL", default_value_t = 3600)]
    pub cache_ttl: u64,

    /// Maximum cached entries per cache
    #[arg(long, env = "TUBEDROP_CACHE_CAPACITY", default_value_t = 32)]
    pub cache_capacity: usize,

    /// Most browser sessions remembered at once
    #[arg(long, env = "TUBEDROP_MAX_SESSIONS", default_value_t = 1024)]
    pub max_sessions: usize,

    /// Seconds of inactivity after which a session is forgotten
    #[arg(long, env = "TUBEDROP_SESSION_IDLE", default_value_t = 86400)]
    pub session_idle_timeout: u64,

    /// Directory session temp directories are created under
    #[arg(long, env = "TUBEDROP_TEMP_ROOT")]
    pub temp_root: Option<PathBuf>,

    /// MIME type declared for audio downloads
    #[arg(long, env = "TUBEDROP_AUDIO_MIME", default_value = "audio/mpeg")]
    pub audio_mime_type: String,

    /// MIME type declared for video downloads
    #[arg(long, env = "TUBEDROP_VIDEO_MIME", default_value = "video/mp4")]
    pub video_mime_type: String,

    /// Container extension the video policy accepts
    #[arg(long, env = "TUBEDROP_VIDEO_EXTENSION", default_value = "mp4")]
    pub video_extension: String,

    /// MIME subtype the audio policy accepts
    #[arg(long, env = "TUBEDROP_AUDIO_SUBTYPE", default_value = "mp4")]
    pub audio_subtype: String,

    /// tracing filter directive; RUST_LOG wins when set
    #[arg(long, env = "TUBEDROP_LOG", default_value = crate::logging::DEFAULT_LOG_FILTER)]
    pub log_filter: String,
}

impl AppConfig {
    /// Check values clap cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metadata_timeout == 0 {
            return Err(ConfigError::Invalid {
                flag: "--metadata-timeout",
                message: "must be at least 1 second".to_string(),
            });
        }

        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                flag: "--cache-capacity",
                message: "must be at least 1".to_string(),
            });
        }

        if self.max_sessions == 0 {
            return Err(ConfigError::Invalid {
                flag: "--max-sessions",
                message: "must be at least 1".to_string(),
            });
        }

        for (flag, mime) in [
            ("--audio-mime-type", &self.audio_mime_type),
            ("--video-mime-type", &self.video_mime_type),
        ] {
            if !mime.contains('/') {
                return Err(ConfigError::Invalid {
                    flag,
                    message: format!("'{}' is not a MIME type", mime),
                });
            }
        }

        if let Some(root) = &self.temp_root {
            if !root.is_dir() {
                return Err(ConfigError::TempRoot(root.clone()));
            }
        }

        if let Some(cookies) = &self.cookies {
            if !cookies.is_file() {
                return Err(ConfigError::CookiesFile(cookies.clone()));
            }
        }

        Ok(())
    }

    pub fn temp_root(&self) -> PathBuf {
        self.temp_root.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_ytdlp_path(self.ytdlp_path.clone())
            .with_proxy(self.proxy.clone())
            .with_cookies_path(self.cookies.as_ref().map(|p| p.display().to_string()))
            .with_timeout(self.metadata_timeout)
            .with_connect_timeout(self.connect_timeout)
    }

    pub fn selector(&self) -> StreamSelector {
        StreamSelector::new(&self.video_extension, &self.audio_subtype)
    }
}

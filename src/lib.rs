pub mod cache;
pub mod config;
pub mod downloader;
pub mod logging;
pub mod session;
pub mod web;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use tracing::info;

use config::{AppConfig, ConfigError};
use downloader::{DownloadError, FetchService, YtDlpClient};
use session::SessionStore;
use web::AppState;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Platform client: {0}")]
    Client(#[from] DownloadError),

    #[error("Server: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire the yt-dlp client, cache, sessions and web server together and serve.
pub async fn run(config: AppConfig) -> Result<(), RunError> {
    config.validate()?;

    let client = YtDlpClient::new(config.client_config())?;
    info!(ytdlp = client.ytdlp_path(), "platform client ready");

    let service = FetchService::new(
        Arc::new(client),
        config.selector(),
        config.cache_ttl(),
        config.cache_capacity,
    )
    .with_mime_types(&config.audio_mime_type, &config.video_mime_type);

    let temp_root = config.temp_root();
    info!(
        client = service.client_name(),
        temp_root = %temp_root.display(),
        cache_ttl = config.cache_ttl,
        cache_capacity = config.cache_capacity,
        max_sessions = config.max_sessions,
        session_idle_timeout = config.session_idle_timeout,
        "fetch service ready"
    );

    let sessions = SessionStore::new(temp_root)
        .with_limits(config.max_sessions, config.session_idle_timeout());

    let state = AppState {
        service: Arc::new(service),
        sessions: Arc::new(sessions),
    };

    web::serve(config.bind, state).await?;
    Ok(())
}

// Transfer sink - moves the selected stream's bytes into memory or onto disk

use bytes::Bytes;
use std::path::PathBuf;
use tracing::{debug, info};

use super::errors::DownloadError;
use super::extractors::VideoPlatformClient;
use super::models::{StreamDescriptor, StreamPolicy, TransferSink};
use super::utils::make_safe_filename;
use crate::session::SessionContext;

/// Extension of the delivered file: mp3 for audio, the container for video
pub fn file_extension<'a>(policy: StreamPolicy, stream: &'a StreamDescriptor) -> &'a str {
    match policy {
        StreamPolicy::Audio => "mp3",
        StreamPolicy::Video => &stream.extension,
    }
}

/// `<sanitized title>.<ext>`
pub fn delivery_file_name(title: &str, policy: StreamPolicy, stream: &StreamDescriptor) -> String {
    format!("{}.{}", make_safe_filename(title), file_extension(policy, stream))
}

/// Transfer `stream` through `sink`, returning the payload.
///
/// File mode writes `<session dir>/<file_name>` under the session's transfer
/// lock, then reads the file back.
pub async fn transfer(
    client: &dyn VideoPlatformClient,
    stream: &StreamDescriptor,
    sink: TransferSink,
    file_name: &str,
    session: &SessionContext,
) -> Result<Bytes, DownloadError> {
    match sink {
        TransferSink::Buffer => {
            let bytes = client.stream_to_buffer(stream).await?;
            debug!(itag = %stream.itag, size = bytes.len(), "buffered");
            Ok(bytes)
        }
        TransferSink::File => {
            let _guard = session.lock_transfers().await;

            let dir = session.temp_dir().await?;
            let path: PathBuf = dir.join(file_name);
            let written = client.download_to_file(stream, &path).await?;
            info!(path = %path.display(), size = written, "saved to session directory");

            let bytes = tokio::fs::read(&path).await?;
            Ok(Bytes::from(bytes))
        }
    }
}

// FetchService - resolve -> select -> transfer, memoized per URL and mode

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::errors::DownloadError;
use super::extractors::VideoPlatformClient;
use super::format_selector::StreamSelector;
use super::models::{
    Delivery, FetchMode, MetadataLookup, ResolutionFailure, SelectedStream, StreamPolicy,
    TransferSink, VideoMetadata,
};
use super::sink::{delivery_file_name, transfer};
use crate::cache::{cache_key, ResultCache};
use crate::session::SessionContext;

const METADATA_MODE: &str = "metadata";

pub struct FetchService {
    client: Arc<dyn VideoPlatformClient>,
    selector: StreamSelector,
    metadata_cache: ResultCache<VideoMetadata>,
    delivery_cache: ResultCache<Delivery>,
    audio_mime_type: String,
    video_mime_type: String,
}

impl FetchService {
    pub fn new(
        client: Arc<dyn VideoPlatformClient>,
        selector: StreamSelector,
        cache_ttl: Duration,
        cache_capacity: usize,
    ) -> Self {
        Self {
            client,
            selector,
            metadata_cache: ResultCache::new(cache_ttl, cache_capacity),
            delivery_cache: ResultCache::new(cache_ttl, cache_capacity),
            audio_mime_type: "audio/mpeg".to_string(),
            video_mime_type: "video/mp4".to_string(),
        }
    }

    pub fn with_mime_types(
        mut self,
        audio_mime_type: impl Into<String>,
        video_mime_type: impl Into<String>,
    ) -> Self {
        self.audio_mime_type = audio_mime_type.into();
        self.video_mime_type = video_mime_type.into();
        self
    }

    pub fn client_name(&self) -> &'static str {
        self.client.name()
    }

    /// MIME type declared to the browser for a policy
    pub fn mime_type(&self, policy: StreamPolicy) -> &str {
        match policy {
            StreamPolicy::Audio => &self.audio_mime_type,
            StreamPolicy::Video => &self.video_mime_type,
        }
    }

    async fn resolve(&self, url: &str) -> Result<Arc<VideoMetadata>, DownloadError> {
        let key = cache_key(url, METADATA_MODE);
        self.metadata_cache
            .get_or_try_insert_with(&key, || self.client.resolve(url))
            .await
    }

    /// Look a URL up; failures come back as data, never as an error
    pub async fn lookup_metadata(&self, url: &str) -> MetadataLookup {
        match self.resolve(url).await {
            Ok(metadata) => MetadataLookup::Resolved(metadata.as_ref().clone()),
            Err(e) => {
                let reason = e.reason();
                warn!(url, %reason, error = %e, "lookup failed");
                MetadataLookup::Failed(ResolutionFailure {
                    reason,
                    message: e.detail().to_string(),
                })
            }
        }
    }

    /// Produce exactly one selected stream for `url` in `mode`.
    ///
    /// Refuses with `DownloadError::Resolution` when the lookup failed.
    /// File-mode results are cached per session, so every session gets its
    /// own copy on disk.
    pub async fn download(
        &self,
        url: &str,
        mode: FetchMode,
        session: &SessionContext,
    ) -> Result<Arc<Delivery>, DownloadError> {
        let key = match mode.sink {
            TransferSink::Buffer => cache_key(url, &mode.to_string()),
            TransferSink::File => cache_key(url, &format!("{}:{}", mode, session.id())),
        };

        self.delivery_cache
            .get_or_try_insert_with(&key, || async {
                let metadata = self
                    .resolve(url)
                    .await
                    .map_err(DownloadError::into_resolution)?;

                let stream = self.selector.select(mode.policy, &metadata.streams)?.clone();
                let file_name = delivery_file_name(&metadata.title, mode.policy, &stream);
                info!(
                    url,
                    %mode,
                    itag = %stream.itag,
                    session = %session.id(),
                    "transferring"
                );

                let bytes =
                    transfer(self.client.as_ref(), &stream, mode.sink, &file_name, session).await?;
                info!(url, %mode, size = bytes.len(), file = %file_name, "transfer complete");

                Ok::<_, DownloadError>(Delivery {
                    title: metadata.title.clone(),
                    file_name,
                    mime_type: self.mime_type(mode.policy).to_string(),
                    selected: SelectedStream {
                        descriptor: stream,
                        bytes,
                    },
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::extractors::FailureReason;
    use crate::downloader::models::StreamKind;
    use crate::testing::{descriptor, FakeClient, WATCH_URL};

    fn service(client: Arc<FakeClient>) -> FetchService {
        FetchService::new(client, StreamSelector::default(), Duration::from_secs(3600), 32)
    }

    fn mode(policy: StreamPolicy, sink: TransferSink) -> FetchMode {
        FetchMode { policy, sink }
    }

    #[tokio::test]
    async fn test_lookup_resolves_and_caches() {
        let client = Arc::new(FakeClient::with_payload(b"x"));
        let svc = service(client.clone());

        let first = svc.lookup_metadata(WATCH_URL).await;
        let second = svc.lookup_metadata(WATCH_URL).await;

        assert!(first.is_resolved() && second.is_resolved());
        assert_eq!(client.resolves(), 1);
    }

    #[tokio::test]
    async fn test_malformed_url_fails_without_transfer() {
        let client = Arc::new(FakeClient::with_payload(b"x"));
        let svc = service(client.clone());
        let session = SessionContext::new(std::env::temp_dir());

        match svc.lookup_metadata("not-a-url").await {
            MetadataLookup::Failed(f) => assert_eq!(f.reason, FailureReason::InvalidUrl),
            MetadataLookup::Resolved(_) => panic!("lookup should fail"),
        }

        let err = svc
            .download("not-a-url", mode(StreamPolicy::Video, TransferSink::Buffer), &session)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DownloadError::Resolution {
                reason: FailureReason::InvalidUrl,
                ..
            }
        ));
        assert_eq!(client.transfers(), 0);
    }

    #[tokio::test]
    async fn test_failed_lookups_not_cached() {
        let client = Arc::new(FakeClient::with_payload(b"x"));
        let svc = service(client.clone());

        svc.lookup_metadata("not-a-url").await;
        svc.lookup_metadata("not-a-url").await;
        assert_eq!(client.resolves(), 2);
    }

    #[tokio::test]
    async fn test_video_download_picks_highest_progressive() {
        let client = Arc::new(FakeClient::with_payload(b"video-bytes"));
        let svc = service(client.clone());
        let session = SessionContext::new(std::env::temp_dir());

        let delivery = svc
            .download(WATCH_URL, mode(StreamPolicy::Video, TransferSink::Buffer), &session)
            .await
            .unwrap();

        assert_eq!(delivery.selected.descriptor.itag, "22");
        assert_eq!(delivery.file_name, "My_Video_Title_2024.mp4");
        assert_eq!(delivery.mime_type, "video/mp4");
        assert_eq!(&delivery.selected.bytes[..], b"video-bytes");
    }

    #[tokio::test]
    async fn test_repeated_download_is_one_transfer() {
        let client = Arc::new(FakeClient::with_payload(b"audio-bytes"));
        let svc = service(client.clone());
        let session = SessionContext::new(std::env::temp_dir());
        let audio = mode(StreamPolicy::Audio, TransferSink::Buffer);

        let first = svc.download(WATCH_URL, audio, &session).await.unwrap();
        let second = svc.download(WATCH_URL, audio, &session).await.unwrap();

        assert_eq!(first.selected.descriptor.itag, "140");
        assert_eq!(first.selected.descriptor, second.selected.descriptor);
        assert_eq!(first.selected.bytes, second.selected.bytes);
        assert_eq!(first.file_name, "My_Video_Title_2024.mp3");
        assert_eq!(first.mime_type, "audio/mpeg");
        assert_eq!(client.transfers(), 1);
        assert_eq!(client.resolves(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_downloads_share_one_transfer() {
        let client = Arc::new(
            FakeClient::with_payload(b"shared").with_delay(Duration::from_millis(50)),
        );
        let svc = service(client.clone());
        let session = SessionContext::new(std::env::temp_dir());
        let video = mode(StreamPolicy::Video, TransferSink::Buffer);

        let (a, b) = tokio::join!(
            svc.download(WATCH_URL, video, &session),
            svc.download(WATCH_URL, video, &session)
        );

        assert_eq!(a.unwrap().selected.bytes, b.unwrap().selected.bytes);
        assert_eq!(client.transfers(), 1);
    }

    #[tokio::test]
    async fn test_modes_are_cached_separately() {
        let client = Arc::new(FakeClient::with_payload(b"x"));
        let svc = service(client.clone());
        let session = SessionContext::new(std::env::temp_dir());

        svc.download(WATCH_URL, mode(StreamPolicy::Audio, TransferSink::Buffer), &session)
            .await
            .unwrap();
        svc.download(WATCH_URL, mode(StreamPolicy::Video, TransferSink::Buffer), &session)
            .await
            .unwrap();

        assert_eq!(client.transfers(), 2);
        assert_eq!(client.resolves(), 1);
    }

    #[tokio::test]
    async fn test_no_progressive_stream_is_explicit() {
        let client = Arc::new(FakeClient::with_payload(b"x").with_streams(vec![
            descriptor("137", StreamKind::VideoOnly, "mp4", Some(1080)),
            descriptor("43", StreamKind::Progressive, "webm", Some(360)),
        ]));
        let svc = service(client.clone());
        let session = SessionContext::new(std::env::temp_dir());

        let err = svc
            .download(WATCH_URL, mode(StreamPolicy::Video, TransferSink::Buffer), &session)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::NoMatchingStream(_)));
        assert_eq!(client.transfers(), 0);
    }

    #[tokio::test]
    async fn test_file_mode_lands_in_session_dir() {
        let root = tempfile::tempdir().unwrap();
        let client = Arc::new(FakeClient::with_payload(b"file-bytes"));
        let svc = service(client.clone());
        let session = SessionContext::new(root.path());

        let delivery = svc
            .download(WATCH_URL, mode(StreamPolicy::Audio, TransferSink::File), &session)
            .await
            .unwrap();

        let path = session.temp_dir_path().join(&delivery.file_name);
        assert_eq!(std::fs::read(path).unwrap(), b"file-bytes");
        assert_eq!(&delivery.selected.bytes[..], b"file-bytes");
    }

    #[tokio::test]
    async fn test_file_mode_writes_for_every_session() {
        let root = tempfile::tempdir().unwrap();
        let client = Arc::new(FakeClient::with_payload(b"file-bytes"));
        let svc = service(client.clone());
        let first = SessionContext::new(root.path());
        let second = SessionContext::new(root.path());
        let audio_file = mode(StreamPolicy::Audio, TransferSink::File);

        let a = svc.download(WATCH_URL, audio_file, &first).await.unwrap();
        let b = svc.download(WATCH_URL, audio_file, &second).await.unwrap();
        svc.download(WATCH_URL, audio_file, &second).await.unwrap();

        for (session, delivery) in [(&first, &a), (&second, &b)] {
            let path = session.temp_dir_path().join(&delivery.file_name);
            assert_eq!(std::fs::read(path).unwrap(), b"file-bytes");
        }
        assert_eq!(client.transfers(), 2);
        assert_eq!(client.resolves(), 1);
    }

    #[tokio::test]
    async fn test_buffer_mode_shared_across_sessions() {
        let client = Arc::new(FakeClient::with_payload(b"x"));
        let svc = service(client.clone());
        let video = mode(StreamPolicy::Video, TransferSink::Buffer);

        svc.download(WATCH_URL, video, &SessionContext::new(std::env::temp_dir()))
            .await
            .unwrap();
        svc.download(WATCH_URL, video, &SessionContext::new(std::env::temp_dir()))
            .await
            .unwrap();

        assert_eq!(client.transfers(), 1);
    }

    #[tokio::test]
    async fn test_transfer_failure_is_not_cached() {
        let client = Arc::new(FakeClient::with_payload(b"x").failing_transfers());
        let svc = service(client.clone());
        let session = SessionContext::new(std::env::temp_dir());
        let video = mode(StreamPolicy::Video, TransferSink::Buffer);

        for _ in 0..2 {
            let err = svc.download(WATCH_URL, video, &session).await.unwrap_err();
            assert!(matches!(err, DownloadError::Transfer(_)));
        }
        assert_eq!(client.transfers(), 2);
    }

    #[tokio::test]
    async fn test_configured_mime_types() {
        let client = Arc::new(FakeClient::with_payload(b"x"));
        let svc = service(client).with_mime_types("audio/mp4", "video/webm");

        assert_eq!(svc.mime_type(StreamPolicy::Audio), "audio/mp4");
        assert_eq!(svc.mime_type(StreamPolicy::Video), "video/webm");
    }
}

// Downloader module - resolve a URL, pick one stream, move its bytes

pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod sink;
pub mod utils;

pub use errors::DownloadError;
pub use extractors::{ClientConfig, FailureReason, VideoPlatformClient, YtDlpClient};
pub use format_selector::StreamSelector;
pub use models::{
    Delivery, FetchMode, MetadataLookup, ResolutionFailure, SelectedStream, StreamDescriptor,
    StreamKind, StreamPolicy, TransferSink, VideoMetadata,
};
pub use orchestrator::FetchService;

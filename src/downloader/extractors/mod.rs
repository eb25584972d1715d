// Platform client module
//
// The video platform is an opaque collaborator behind `VideoPlatformClient`.
// The production client drives the `yt-dlp` binary; failures are sorted
// into a `FailureReason` the UI can show.

mod cli;
mod diagnostics;
mod traits;

pub use cli::{extract_video_id, YtDlpClient};
pub use diagnostics::{classify_failure, summarize_stderr, FailureReason};
pub use traits::{ClientConfig, VideoPlatformClient};

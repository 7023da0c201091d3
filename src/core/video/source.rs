use std::path::Path;

use super::error::ExtractError;
use super::frame::Frame;

/// A forward-only stream of decoded frames for one video.
pub trait FrameSource {
    /// Next frame in decode order, `Ok(None)` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, ExtractError>;
}

/// Opens videos into frame streams. Shared by every worker of a batch.
pub trait VideoOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, ExtractError>;

    fn name(&self) -> &str {
        "unnamed"
    }
}

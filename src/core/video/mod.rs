pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod sink;
pub mod source;

pub use error::ExtractError;
pub use ffmpeg::{FfmpegOpener, StreamInfo};
pub use frame::Frame;
pub use sink::{JpegSink, OutputSink, SinkConfig};
pub use source::{FrameSource, VideoOpener};

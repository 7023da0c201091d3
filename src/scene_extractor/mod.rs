//! Scene-based keyframe extraction.
//!
//! Each video is split into scenes by a pluggable detector, short scenes are
//! merged, and the sharpest frame of every scene is written out. Videos with
//! no cuts fall back to their middle frame.

pub mod batch;
pub mod config;
pub mod content;
pub mod detector;
pub mod fallback;
pub mod histogram;
pub mod length_filter;
pub mod pipeline;
pub mod scene;
pub mod sharpness;
pub mod state_machine;
pub mod threshold;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchOrchestrator, BatchReport, BatchStats};
pub use config::{DetectorConfig, DetectorKind, VideoJob};
pub use detector::{create_detector, detect_boundaries, SceneDetector};
pub use length_filter::{filter_boundaries, SceneLengthFilter};
pub use pipeline::{JobResult, JobStatus, VideoPipeline};
pub use scene::{Scene, SceneBoundary};
pub use sharpness::{laplacian_variance, BestFrame};
pub use state_machine::PipelineStage;

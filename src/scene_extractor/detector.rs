use log::debug;

use crate::core::video::{ExtractError, Frame, FrameSource};

use super::config::{DetectorConfig, DetectorKind};
use super::content::ContentDetector;
use super::histogram::HistogramDetector;
use super::scene::{boundaries_from_cuts, SceneBoundary};
use super::threshold::ThresholdDetector;

/// Incremental scene-cut detector.
///
/// Frames must be fed in decode order. Each call compares the frame with the
/// one fed before it and returns the frame's index when it starts a new scene.
/// The first frame never does.
pub trait SceneDetector: Send {
    fn feed(&mut self, frame: &Frame) -> Result<Option<u64>, ExtractError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }

    /// Forgets the previous frame.
    fn reset(&mut self);
}

pub fn create_detector(config: &DetectorConfig) -> Box<dyn SceneDetector> {
    match config.kind {
        DetectorKind::Content => Box::new(ContentDetector::new(config.threshold)),
        DetectorKind::Threshold => Box::new(ThresholdDetector::new(config.threshold)),
        DetectorKind::Histogram => Box::new(HistogramDetector::new(config.threshold)),
    }
}

/// Runs a detector over a whole source and returns the raw boundaries,
/// before any length filtering. Empty when no cut was found.
pub fn detect_boundaries(
    source: &mut dyn FrameSource,
    config: &DetectorConfig,
) -> Result<Vec<SceneBoundary>, ExtractError> {
    let mut detector = create_detector(config);
    let mut cuts = Vec::new();
    let mut total_frames = 0u64;

    while let Some(frame) = source.next_frame()? {
        if let Some(cut) = detector.feed(&frame)? {
            debug!("{}: raw cut at frame {}", detector.name(), cut);
            cuts.push(cut);
        }
        total_frames += 1;
    }

    Ok(boundaries_from_cuts(&cuts, total_frames))
}

/// Remembers the first frame's size and rejects frames that disagree.
#[derive(Debug, Default)]
pub(crate) struct GeometryGuard {
    expected: Option<(u32, u32)>,
}

impl GeometryGuard {
    pub fn check(&mut self, frame: &Frame) -> Result<(), ExtractError> {
        frame.validate()?;
        match self.expected {
            Some((w, h)) if (w, h) != (frame.width, frame.height) => Err(ExtractError::decode(
                frame.index,
                format!(
                    "frame size changed from {}x{} to {}x{}",
                    w, h, frame.width, frame.height
                ),
            )),
            Some(_) => Ok(()),
            None => {
                self.expected = Some((frame.width, frame.height));
                Ok(())
            }
        }
    }

    pub fn reset(&mut self) {
        self.expected = None;
    }
}

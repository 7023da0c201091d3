use log::trace;

use crate::core::video::{ExtractError, Frame};

use super::detector::{GeometryGuard, SceneDetector};

/// Luma change a pixel must exceed to count as changed.
pub const PIXEL_DELTA: u8 = 30;

/// Changed-pixel detector. The threshold is the percentage of pixels that
/// must move by more than [`PIXEL_DELTA`] for the frame to start a scene, so
/// slow uniform brightness drift stays below it.
pub struct ThresholdDetector {
    threshold: f64,
    last_luma: Option<Vec<u8>>,
    guard: GeometryGuard,
}

impl ThresholdDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_luma: None,
            guard: GeometryGuard::default(),
        }
    }

    fn changed_percent(prev: &[u8], cur: &[u8]) -> f64 {
        if cur.is_empty() {
            return 0.0;
        }
        let changed = prev
            .iter()
            .zip(cur)
            .filter(|&(a, b)| a.abs_diff(*b) > PIXEL_DELTA)
            .count();
        changed as f64 * 100.0 / cur.len() as f64
    }
}

impl SceneDetector for ThresholdDetector {
    fn feed(&mut self, frame: &Frame) -> Result<Option<u64>, ExtractError> {
        self.guard.check(frame)?;
        let luma = frame.luma();

        let cut = match &self.last_luma {
            Some(prev) => {
                let percent = Self::changed_percent(prev, &luma);
                trace!(
                    "frame {} changed {:.2}% of pixels (threshold {}%)",
                    frame.index,
                    percent,
                    self.threshold
                );
                percent > self.threshold
            }
            None => false,
        };

        self.last_luma = Some(luma);
        Ok(cut.then_some(frame.index))
    }

    fn name(&self) -> &str {
        "threshold"
    }

    fn reset(&mut self) {
        self.last_luma = None;
        self.guard.reset();
    }
}

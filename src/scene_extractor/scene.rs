use serde::{Deserialize, Serialize};

/// Half-open frame range `[start_frame, end_frame)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneBoundary {
    pub start_frame: u64,
    pub end_frame: u64,
}

impl SceneBoundary {
    pub fn new(start_frame: u64, end_frame: u64) -> Self {
        debug_assert!(start_frame <= end_frame);
        Self {
            start_frame,
            end_frame,
        }
    }

    pub fn len(&self) -> u64 {
        self.end_frame - self.start_frame
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: u64) -> bool {
        (self.start_frame..self.end_frame).contains(&index)
    }
}

/// Turns cut positions into contiguous boundaries covering `[0, total_frames)`.
/// No cuts means no boundaries.
pub fn boundaries_from_cuts(cuts: &[u64], total_frames: u64) -> Vec<SceneBoundary> {
    if cuts.is_empty() {
        return Vec::new();
    }
    let mut boundaries = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for &cut in cuts {
        boundaries.push(SceneBoundary::new(start, cut));
        start = cut;
    }
    boundaries.push(SceneBoundary::new(start, total_frames));
    boundaries
}

/// A finalized scene with its representative frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(flatten)]
    pub boundary: SceneBoundary,
    pub selected_frame_index: u64,
    pub sharpness_score: f64,
    /// Timestamp of the selected frame, in seconds.
    pub timestamp: f64,
}

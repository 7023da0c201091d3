use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Where a single video is in its pipeline.
///
/// Detection streams, so `Detecting` and `Writing` alternate while scenes
/// finalize mid-video. Everything else moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Discovering,
    Decoding,
    Detecting,
    Filtering,
    Scoring,
    Fallback,
    Writing,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn new() -> Self {
        PipelineStage::Discovering
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    pub fn can_advance_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;

        if self == next {
            return !self.is_terminal();
        }
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Discovering, Decoding) => true,
            (Decoding, Detecting) => true,
            (Detecting, Writing) | (Writing, Detecting) => true,
            (Detecting, Filtering) => true,
            (Filtering, Scoring) | (Filtering, Fallback) => true,
            (Scoring, Writing) => true,
            // an empty video has nothing to write
            (Fallback, Writing) | (Fallback, Done) => true,
            (Writing, Done) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Discovering => "discovering",
            PipelineStage::Decoding => "decoding",
            PipelineStage::Detecting => "detecting",
            PipelineStage::Filtering => "filtering",
            PipelineStage::Scoring => "scoring",
            PipelineStage::Fallback => "fallback",
            PipelineStage::Writing => "writing",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

impl Default for PipelineStage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the stage of one video and rejects out-of-order moves.
pub struct StageTracker {
    video_id: String,
    stage: PipelineStage,
    transitions: u32,
}

impl StageTracker {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            stage: PipelineStage::new(),
            transitions: 0,
        }
    }

    /// Moves to `next`. Returns false and stays put when the move is not
    /// allowed from the current stage.
    pub fn advance(&mut self, next: PipelineStage) -> bool {
        if self.stage == next && !next.is_terminal() {
            return true;
        }
        if !self.stage.can_advance_to(next) {
            warn!(
                "{}: ignoring stage change {} -> {}",
                self.video_id, self.stage, next
            );
            return false;
        }

        debug!("{}: {} -> {}", self.video_id, self.stage, next);
        self.stage = next;
        self.transitions += 1;
        true
    }

    pub fn current(&self) -> PipelineStage {
        self.stage
    }

    pub fn transition_count(&self) -> u32 {
        self.transitions
    }
}

//! Minimum scene length policy.
//!
//! Scenes shorter than `min_scene_len` are merged forward: the cut that would
//! close them is dropped, so the following scene starts where the short one
//! did. A short trailing scene has nothing to merge into and is folded into
//! the scene before it. Scene starts therefore only ever disappear; they are
//! never moved or reordered.

use super::scene::SceneBoundary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutDecision {
    /// The cut stands; the returned scene is closed and long enough.
    Split(SceneBoundary),
    /// The would-be scene was too short; the open scene keeps its start.
    MergedForward(SceneBoundary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterEnd {
    /// The detector never cut. This is the fallback trigger.
    NoCuts,
    /// The open scene is final as is.
    Tail(SceneBoundary),
    /// The open scene is too short and extends the last split scene to its end.
    MergeIntoPrevious(SceneBoundary),
}

/// Streaming form of the policy, fed one raw cut at a time.
#[derive(Debug, Clone)]
pub struct SceneLengthFilter {
    min_scene_len: u64,
    open_start: u64,
    saw_cut: bool,
    split_any: bool,
}

impl SceneLengthFilter {
    pub fn new(min_scene_len: u64) -> Self {
        Self {
            min_scene_len: min_scene_len.max(1),
            open_start: 0,
            saw_cut: false,
            split_any: false,
        }
    }

    pub fn open_start(&self) -> u64 {
        self.open_start
    }

    pub fn push_cut(&mut self, cut: u64) -> CutDecision {
        debug_assert!(cut >= self.open_start, "cuts must arrive in order");
        self.saw_cut = true;

        let candidate = SceneBoundary::new(self.open_start, cut);
        if candidate.len() < self.min_scene_len {
            return CutDecision::MergedForward(candidate);
        }

        self.open_start = cut;
        self.split_any = true;
        CutDecision::Split(candidate)
    }

    pub fn finish(&self, total_frames: u64) -> FilterEnd {
        if !self.saw_cut {
            return FilterEnd::NoCuts;
        }

        let tail = SceneBoundary::new(self.open_start, total_frames);
        if tail.len() < self.min_scene_len && self.split_any {
            FilterEnd::MergeIntoPrevious(tail)
        } else {
            FilterEnd::Tail(tail)
        }
    }
}

/// Applies the policy to a complete raw boundary list.
pub fn filter_boundaries(raw: &[SceneBoundary], min_scene_len: u64) -> Vec<SceneBoundary> {
    let (first, last) = match (raw.first(), raw.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Vec::new(),
    };

    let mut filter = SceneLengthFilter::new(min_scene_len);
    filter.open_start = first.start_frame;

    let mut scenes = Vec::with_capacity(raw.len());
    for boundary in &raw[1..] {
        if let CutDecision::Split(scene) = filter.push_cut(boundary.start_frame) {
            scenes.push(scene);
        }
    }

    match filter.finish(last.end_frame) {
        FilterEnd::NoCuts => scenes.push(*first),
        FilterEnd::Tail(tail) => scenes.push(tail),
        FilterEnd::MergeIntoPrevious(tail) => {
            if let Some(prev) = scenes.last_mut() {
                prev.end_frame = tail.end_frame;
            }
        }
    }
    scenes
}

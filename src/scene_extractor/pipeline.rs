use std::mem;
use std::path::Path;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::core::video::{ExtractError, Frame, OutputSink, VideoOpener};

use super::config::VideoJob;
use super::detector::create_detector;
use super::fallback::select_fallback;
use super::length_filter::{CutDecision, FilterEnd, SceneLengthFilter};
use super::scene::{Scene, SceneBoundary};
use super::sharpness::BestFrame;
use super::state_machine::{PipelineStage, StageTracker};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum JobStatus {
    Ok,
    Failed(String),
}

/// Outcome of one video. A failed job carries no scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub video_id: String,
    pub scenes: Vec<Scene>,
    #[serde(flatten)]
    pub status: JobStatus,
}

impl JobResult {
    pub fn ok(video_id: impl Into<String>, scenes: Vec<Scene>) -> Self {
        Self {
            video_id: video_id.into(),
            scenes,
            status: JobStatus::Ok,
        }
    }

    pub fn failed(video_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            scenes: Vec::new(),
            status: JobStatus::Failed(reason.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == JobStatus::Ok
    }
}

/// Writes finalized scenes in order and numbers their images.
struct SceneWriter<'a> {
    sink: &'a dyn OutputSink,
    video_id: &'a str,
    video_dir: &'a Path,
    scenes: Vec<Scene>,
}

impl SceneWriter<'_> {
    fn emit(&mut self, boundary: SceneBoundary, best: BestFrame) -> Result<(), ExtractError> {
        let (frame, score) = best.into_best().ok_or_else(|| {
            ExtractError::decode(
                boundary.start_frame,
                format!(
                    "scene {}..{} finished without frames",
                    boundary.start_frame, boundary.end_frame
                ),
            )
        })?;

        let scene = Scene {
            boundary,
            selected_frame_index: frame.index,
            sharpness_score: score,
            timestamp: frame.timestamp_secs(),
        };
        self.write(scene, &frame)
    }

    fn write(&mut self, scene: Scene, frame: &Frame) -> Result<(), ExtractError> {
        let seq = self.scenes.len();
        self.sink.write_frame(self.video_dir, seq, frame)?;
        info!(
            "{}: scene {} [{}, {}) -> frame {} (sharpness {:.2})",
            self.video_id,
            seq,
            scene.boundary.start_frame,
            scene.boundary.end_frame,
            scene.selected_frame_index,
            scene.sharpness_score
        );
        self.scenes.push(scene);
        Ok(())
    }
}

/// Turns one video into its ordered keyframes.
///
/// The video is decoded once, front to back. Each frame goes through the
/// detector, the length filter and the sharpness scorer before the next one
/// is read, so only the best frame of the open scene and of the last closed
/// scene are held at any time. A closed scene is written as soon as the next
/// cut confirms it can no longer absorb a short trailing scene.
pub struct VideoPipeline<'a> {
    opener: &'a dyn VideoOpener,
    sink: &'a dyn OutputSink,
}

impl<'a> VideoPipeline<'a> {
    pub fn new(opener: &'a dyn VideoOpener, sink: &'a dyn OutputSink) -> Self {
        Self { opener, sink }
    }

    pub fn run(&self, job: &VideoJob) -> JobResult {
        let video_id = job.video_id();
        let video_dir = job.video_dir();
        let mut stages = StageTracker::new(video_id.clone());

        match self.extract(job, &video_id, &video_dir, &mut stages) {
            Ok(scenes) => {
                stages.advance(PipelineStage::Done);
                JobResult::ok(video_id, scenes)
            }
            Err(err) => {
                let stage = stages.current();
                stages.advance(PipelineStage::Failed);
                self.sink.discard(&video_dir);
                let reason = format!("{stage} failed: {err}");
                error!("{}: {}", video_id, reason);
                JobResult::failed(video_id, reason)
            }
        }
    }

    fn extract(
        &self,
        job: &VideoJob,
        video_id: &str,
        video_dir: &Path,
        stages: &mut StageTracker,
    ) -> Result<Vec<Scene>, ExtractError> {
        stages.advance(PipelineStage::Decoding);
        self.sink.prepare(video_dir)?;
        let mut source = self.opener.open(&job.path)?;

        stages.advance(PipelineStage::Detecting);
        let mut detector = create_detector(&job.config);
        let mut filter = SceneLengthFilter::new(job.config.min_scene_len);
        let mut writer = SceneWriter {
            sink: self.sink,
            video_id,
            video_dir,
            scenes: Vec::new(),
        };

        let mut open = BestFrame::new();
        let mut pending: Option<(SceneBoundary, BestFrame)> = None;
        let mut total_frames = 0u64;

        while let Some(frame) = source.next_frame()? {
            if frame.index != total_frames {
                return Err(ExtractError::decode(
                    frame.index,
                    format!("out of order, expected frame {total_frames}"),
                ));
            }

            if let Some(cut) = detector.feed(&frame)? {
                debug!("{}: {} cut at frame {}", video_id, detector.name(), cut);
                match filter.push_cut(cut) {
                    CutDecision::Split(closed) => {
                        let window = mem::take(&mut open);
                        if let Some((boundary, best)) = pending.replace((closed, window)) {
                            stages.advance(PipelineStage::Writing);
                            writer.emit(boundary, best)?;
                            stages.advance(PipelineStage::Detecting);
                        }
                    }
                    CutDecision::MergedForward(short) => {
                        debug!(
                            "{}: scene [{}, {}) shorter than {} frames, merged forward",
                            video_id, short.start_frame, short.end_frame, job.config.min_scene_len
                        );
                    }
                }
            }

            open.offer(frame);
            total_frames += 1;
        }
        drop(source);

        stages.advance(PipelineStage::Filtering);
        match filter.finish(total_frames) {
            FilterEnd::NoCuts => {
                stages.advance(PipelineStage::Fallback);
                drop(open);
                if total_frames == 0 {
                    warn!("{}: no frames decoded, nothing to extract", video_id);
                    return Ok(writer.scenes);
                }

                info!(
                    "{}: no scene cuts in {} frames, using middle frame",
                    video_id, total_frames
                );
                let mut rewound = self.opener.open(&job.path)?;
                if let Some((scene, frame)) = select_fallback(rewound.as_mut(), total_frames)? {
                    stages.advance(PipelineStage::Writing);
                    writer.write(scene, &frame)?;
                }
            }
            FilterEnd::Tail(tail) => {
                stages.advance(PipelineStage::Scoring);
                stages.advance(PipelineStage::Writing);
                if let Some((boundary, best)) = pending.take() {
                    writer.emit(boundary, best)?;
                }
                writer.emit(tail, open)?;
            }
            FilterEnd::MergeIntoPrevious(tail) => {
                stages.advance(PipelineStage::Scoring);
                match pending.take() {
                    Some((mut boundary, mut best)) => {
                        debug!(
                            "{}: trailing scene [{}, {}) too short, folded into previous",
                            video_id, tail.start_frame, tail.end_frame
                        );
                        boundary.end_frame = tail.end_frame;
                        best.absorb(open);
                        stages.advance(PipelineStage::Writing);
                        writer.emit(boundary, best)?;
                    }
                    None => {
                        stages.advance(PipelineStage::Writing);
                        writer.emit(tail, open)?;
                    }
                }
            }
        }

        Ok(writer.scenes)
    }
}

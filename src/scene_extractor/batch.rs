use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use log::{error, info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

use crate::core::video::{ExtractError, OutputSink, VideoOpener};

use super::config::{assign_unique_ids, VideoJob};
use super::pipeline::{JobResult, JobStatus, VideoPipeline};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub scenes: usize,
}

/// Runs the per-video pipeline over many jobs on a bounded worker pool.
///
/// Each worker takes one job at a time and runs it to completion. A failing
/// or panicking job becomes a `Failed` result; the other jobs are unaffected.
pub struct BatchOrchestrator<'a> {
    opener: &'a dyn VideoOpener,
    sink: &'a dyn OutputSink,
    workers: usize,
    stats: Mutex<BatchStats>,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(opener: &'a dyn VideoOpener, sink: &'a dyn OutputSink, workers: usize) -> Self {
        Self {
            opener,
            sink,
            workers: workers.max(1),
            stats: Mutex::new(BatchStats::default()),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn get_stats(&self) -> BatchStats {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    /// One result per job, in job order.
    ///
    /// Jobs whose output folders would clash are renamed first, so a failing
    /// job never discards a neighbour's keyframes.
    pub fn run(&self, jobs: &[VideoJob]) -> Result<Vec<JobResult>, ExtractError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("scene-worker-{i}"))
            .build()?;

        let jobs = assign_unique_ids(jobs.to_vec());
        let total = jobs.len();
        info!(
            "🎬 processing {} videos with {} workers ({} decoder)",
            total,
            self.workers,
            self.opener.name()
        );

        let pipeline = VideoPipeline::new(self.opener, self.sink);
        let results: Vec<JobResult> = pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let result = self.run_isolated(&pipeline, job);
                    self.record(&result, total);
                    result
                })
                .collect()
        });

        let stats = self.get_stats();
        info!(
            "✅ batch finished: {} ok, {} failed, {} keyframes",
            stats.succeeded, stats.failed, stats.scenes
        );
        Ok(results)
    }

    fn run_isolated(&self, pipeline: &VideoPipeline<'_>, job: &VideoJob) -> JobResult {
        match panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(job))) {
            Ok(result) => result,
            Err(payload) => {
                let reason = format!("worker panicked: {}", panic_message(payload.as_ref()));
                error!("{}: {}", job.video_id(), reason);
                self.sink.discard(&job.video_dir());
                JobResult::failed(job.video_id(), reason)
            }
        }
    }

    fn record(&self, result: &JobResult, total: usize) {
        let done = match self.stats.lock() {
            Ok(mut stats) => {
                stats.completed += 1;
                stats.scenes += result.scenes.len();
                if result.is_ok() {
                    stats.succeeded += 1;
                } else {
                    stats.failed += 1;
                }
                stats.completed
            }
            Err(_) => 0,
        };

        match &result.status {
            JobStatus::Ok => info!(
                "[{}/{}] {}: {} keyframes",
                done,
                total,
                result.video_id,
                result.scenes.len()
            ),
            JobStatus::Failed(reason) => {
                warn!("[{}/{}] {}: {}", done, total, result.video_id, reason)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Batch summary, ordered by video id so it does not depend on scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub videos: Vec<JobResult>,
    pub succeeded: usize,
    pub failed: usize,
    pub scenes: usize,
}

impl BatchReport {
    pub fn from_results(mut results: Vec<JobResult>) -> Self {
        results.sort_by(|a, b| a.video_id.cmp(&b.video_id));
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let scenes = results.iter().map(|r| r.scenes.len()).sum();
        Self {
            failed: results.len() - succeeded,
            succeeded,
            scenes,
            videos: results,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

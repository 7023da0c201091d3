use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Weighted HSV difference against the previous frame.
    #[default]
    Content,
    /// Percentage of pixels whose luma moved past a fixed delta.
    Threshold,
    /// Chi-squared distance between consecutive RGB histograms.
    Histogram,
}

impl DetectorKind {
    pub fn default_threshold(self) -> f64 {
        match self {
            DetectorKind::Content => 27.0,
            DetectorKind::Threshold => 20.0,
            DetectorKind::Histogram => 0.15,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DetectorKind::Content => "content",
            DetectorKind::Threshold => "threshold",
            DetectorKind::Histogram => "histogram",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detector settings, fixed for the lifetime of a job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub kind: DetectorKind,
    pub threshold: f64,
    pub min_scene_len: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new(DetectorKind::default())
    }
}

impl DetectorConfig {
    pub fn new(kind: DetectorKind) -> Self {
        Self {
            kind,
            threshold: kind.default_threshold(),
            min_scene_len: 1,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_min_scene_len(mut self, min_scene_len: u64) -> Self {
        self.min_scene_len = min_scene_len.max(1);
        self
    }
}

/// One video to process. Built once by discovery and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoJob {
    pub path: PathBuf,
    pub config: DetectorConfig,
    pub output_dir: PathBuf,
    id: String,
}

impl VideoJob {
    pub fn new(path: impl Into<PathBuf>, config: DetectorConfig, output_dir: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: video_id_of(&path),
            path,
            config,
            output_dir: output_dir.into(),
        }
    }

    /// Overrides the output folder name, which defaults to the file stem.
    pub fn with_video_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn video_id(&self) -> String {
        self.id.clone()
    }

    pub fn video_dir(&self) -> PathBuf {
        self.output_dir.join(&self.id)
    }

    fn folder_key(&self) -> (PathBuf, String) {
        (self.output_dir.clone(), self.id.to_lowercase())
    }
}

pub fn video_id_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Gives every job its own output folder.
///
/// Jobs whose ids clash (ignoring case, so `clip.mp4` and `clip.MP4` clash)
/// are renamed to `<stem>_<ext>`, with a numeric suffix if that is taken too.
/// Jobs without a clash keep their stem. Order is preserved.
pub fn assign_unique_ids(jobs: Vec<VideoJob>) -> Vec<VideoJob> {
    let mut counts: HashMap<(PathBuf, String), usize> = HashMap::new();
    for job in &jobs {
        *counts.entry(job.folder_key()).or_default() += 1;
    }
    let clashes = |job: &VideoJob| counts.get(&job.folder_key()).copied().unwrap_or(0) > 1;

    let mut taken: HashSet<(PathBuf, String)> = jobs
        .iter()
        .filter(|job| !clashes(*job))
        .map(VideoJob::folder_key)
        .collect();

    jobs.into_iter()
        .map(|job| {
            if !clashes(&job) {
                return job;
            }
            let base = match job.path.extension() {
                Some(ext) => format!("{}_{}", job.id, ext.to_string_lossy().to_lowercase()),
                None => job.id.clone(),
            };
            let mut candidate = base.clone();
            let mut n = 2;
            while !taken.insert((job.output_dir.clone(), candidate.to_lowercase())) {
                candidate = format!("{base}_{n}");
                n += 1;
            }
            warn!(
                "{} shares its output folder name with another video, writing to {}",
                job.path.display(),
                candidate
            );
            job.with_video_id(candidate)
        })
        .collect()
}

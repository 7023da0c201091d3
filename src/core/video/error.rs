use std::path::PathBuf;

use thiserror::Error;

/// Everything that can fail a single video. All variants are video-scoped:
/// the batch records them and moves on.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot open video {}: {reason}", path.display())]
    VideoOpen { path: PathBuf, reason: String },
    #[error("cannot decode frame {frame}: {reason}")]
    Decode { frame: u64, reason: String },
    #[error("cannot write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },
    #[error("worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ExtractError {
    pub fn open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::VideoOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(frame: u64, reason: impl ToString) -> Self {
        Self::Decode {
            frame,
            reason: reason.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

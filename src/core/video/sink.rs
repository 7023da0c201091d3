use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use image::{ImageOutputFormat, RgbImage};
use log::{debug, warn};

use super::error::ExtractError;
use super::frame::Frame;

/// Persists selected keyframes, one directory per video.
pub trait OutputSink: Send + Sync {
    /// Clears output left in `video_dir` by an earlier run.
    fn prepare(&self, video_dir: &Path) -> Result<(), ExtractError>;

    /// Writes `frame` as image number `seq` under `video_dir`.
    fn write_frame(&self, video_dir: &Path, seq: usize, frame: &Frame) -> Result<(), ExtractError>;

    /// Drops whatever a failed job already wrote.
    fn discard(&self, video_dir: &Path);
}

#[derive(Debug, Clone, Copy)]
pub struct SinkConfig {
    pub jpeg_quality: u8,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self { jpeg_quality: 95 }
    }
}

/// Writes `<video_dir>/<seq>.jpg`.
pub struct JpegSink {
    quality: u8,
}

impl JpegSink {
    pub fn new(config: SinkConfig) -> Self {
        Self {
            quality: config.jpeg_quality.clamp(1, 100),
        }
    }

    pub fn frame_path(video_dir: &Path, seq: usize) -> PathBuf {
        video_dir.join(format!("{seq}.jpg"))
    }
}

impl Default for JpegSink {
    fn default() -> Self {
        Self::new(SinkConfig::default())
    }
}

impl OutputSink for JpegSink {
    fn prepare(&self, video_dir: &Path) -> Result<(), ExtractError> {
        match fs::remove_dir_all(video_dir) {
            Ok(()) => {
                debug!("cleared previous output {}", video_dir.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ExtractError::write(video_dir, e)),
        }
    }

    fn write_frame(&self, video_dir: &Path, seq: usize, frame: &Frame) -> Result<(), ExtractError> {
        fs::create_dir_all(video_dir).map_err(|e| ExtractError::write(video_dir, e))?;

        let path = Self::frame_path(video_dir, seq);
        let img = RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| ExtractError::write(&path, "pixel buffer does not match frame size"))?;

        let file = File::create(&path).map_err(|e| ExtractError::write(&path, e))?;
        let mut writer = BufWriter::new(file);
        img.write_to(&mut writer, ImageOutputFormat::Jpeg(self.quality))
            .map_err(|e| ExtractError::write(&path, e))?;

        debug!("wrote frame {} to {}", frame.index, path.display());
        Ok(())
    }

    fn discard(&self, video_dir: &Path) {
        match fs::remove_dir_all(video_dir) {
            Ok(()) => debug!("discarded partial output {}", video_dir.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to discard {}: {}", video_dir.display(), e),
        }
    }
}

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use crate::core::video::{FfmpegOpener, JpegSink, SinkConfig, VideoOpener};
use crate::scene_extractor::{BatchOrchestrator, BatchReport, DetectorConfig, DetectorKind, VideoJob};

#[derive(Parser, Debug, Clone)]
#[command(name = "scene-keyframes", version, about = "Extract the sharpest frame of every scene from a folder of videos")]
pub struct Args {
    /// Directory holding the videos (not searched recursively)
    #[arg(default_value = "videos")]
    pub input_dir: PathBuf,

    /// Scene detection algorithm
    #[arg(short, long, value_enum, default_value_t = DetectorKind::Content)]
    pub detector: DetectorKind,

    /// Detector sensitivity; each detector has its own default
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Minimum scene length in frames
    #[arg(long, default_value_t = 1)]
    pub min_scene_len: u64,

    /// Videos processed in parallel
    #[arg(short, long, default_value_t = num_cpus::get())]
    pub workers: usize,

    /// Root directory for the keyframe folders
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Video file extensions to pick up, comma separated
    #[arg(long, value_delimiter = ',', default_value = "mp4")]
    pub extensions: Vec<String>,

    /// JPEG quality of the written keyframes
    #[arg(long, default_value_t = 95, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub jpeg_quality: u8,

    /// Write a JSON report of every video's scenes to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl Args {
    pub fn detector_config(&self) -> DetectorConfig {
        let config = DetectorConfig::new(self.detector).with_min_scene_len(self.min_scene_len);
        match self.threshold {
            Some(threshold) => config.with_threshold(threshold),
            None => config,
        }
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            jpeg_quality: self.jpeg_quality,
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Files directly inside `dir` whose extension is in `extensions`, sorted.
pub fn discover_videos(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|ext| normalize_extension(ext))
        .filter(|ext| !ext.is_empty())
        .collect();

    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read video directory '{}'", dir.display()))?;

    let mut videos = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list '{}'", dir.display()))?
            .path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .map(|ext| wanted.contains(&ext.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or(false);
        if matches {
            videos.push(path);
        }
    }

    videos.sort();
    Ok(videos)
}

pub fn build_jobs(videos: Vec<PathBuf>, config: DetectorConfig, output_dir: &Path) -> Vec<VideoJob> {
    videos
        .into_iter()
        .map(|path| VideoJob::new(path, config, output_dir))
        .collect()
}

pub fn write_report(path: &Path, report: &BatchReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create report '{}'", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Failed to write report '{}'", path.display()))?;
    info!("📝 report written to {}", path.display());
    Ok(())
}

/// Runs the whole tool with ffmpeg decoding and JPEG output.
pub fn run(args: &Args) -> Result<BatchReport> {
    run_with(args, &FfmpegOpener::default())
}

pub fn run_with(args: &Args, opener: &dyn VideoOpener) -> Result<BatchReport> {
    let config = args.detector_config();
    let videos = discover_videos(&args.input_dir, &args.extensions)?;
    if videos.is_empty() {
        warn!(
            "no videos with extensions {:?} in {}",
            args.extensions,
            args.input_dir.display()
        );
    }

    info!(
        "🔍 {} videos, detector {} (threshold {}, min scene length {})",
        videos.len(),
        config.kind,
        config.threshold,
        config.min_scene_len
    );

    let jobs = build_jobs(videos, config, &args.output_dir);
    let sink = JpegSink::new(args.sink_config());
    let results = BatchOrchestrator::new(opener, &sink, args.workers)
        .run(&jobs)
        .context("Failed to start the worker pool")?;

    let report = BatchReport::from_results(results);
    if let Some(path) = &args.report {
        write_report(path, &report)?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_extractor::testing::{cut_video, SyntheticOpener};
    use crate::scene_extractor::JobStatus;

    fn args_for(input: &Path, output: &Path) -> Args {
        Args::parse_from([
            "scene-keyframes",
            input.to_str().unwrap(),
            "--output-dir",
            output.to_str().unwrap(),
            "--extensions",
            "mp4,.MOV",
            "--workers",
            "2",
        ])
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["scene-keyframes"]);
        assert_eq!(args.input_dir, PathBuf::from("videos"));
        assert_eq!(args.output_dir, PathBuf::from("output"));
        assert_eq!(args.extensions, vec!["mp4".to_string()]);
        assert_eq!(args.min_scene_len, 1);
        assert_eq!(args.jpeg_quality, 95);
        assert!(args.workers >= 1);
        assert_eq!(args.detector_config(), DetectorConfig::default());
    }

    #[test]
    fn test_detector_flags() {
        let args = Args::parse_from([
            "scene-keyframes",
            "--detector",
            "histogram",
            "--min-scene-len",
            "15",
        ]);
        let config = args.detector_config();
        assert_eq!(config.kind, DetectorKind::Histogram);
        assert_eq!(config.threshold, 0.15);
        assert_eq!(config.min_scene_len, 15);

        let args = Args::parse_from(["scene-keyframes", "-d", "threshold", "-t", "35"]);
        assert_eq!(args.detector_config().threshold, 35.0);
    }

    #[test]
    fn test_rejects_out_of_range_quality() {
        assert!(Args::try_parse_from(["scene-keyframes", "--jpeg-quality", "0"]).is_err());
        assert!(Args::try_parse_from(["scene-keyframes", "--detector", "magic"]).is_err());
    }

    #[test]
    fn test_discovery_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp4", "a.MP4", "c.mov", "notes.txt", "noext"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let found = discover_videos(dir.path(), &["mp4".into(), ".mov".into()]).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.MP4", "b.mp4", "c.mov"]);
    }

    #[test]
    fn test_discovery_of_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_videos(&dir.path().join("nope"), &["mp4".into()]).is_err());
    }

    #[test]
    fn test_run_writes_keyframes_and_report() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let cuts = input.path().join("cuts.mp4");
        let still = input.path().join("still.mov");
        let broken = input.path().join("broken.mp4");
        for path in [&cuts, &still, &broken] {
            fs::write(path, b"").unwrap();
        }

        let opener = SyntheticOpener::new()
            .with_video(&cuts, cut_video(90, &[40]))
            .with_video(&still, cut_video(60, &[]));

        let mut args = args_for(input.path(), output.path());
        let report_path = output.path().join("reports/report.json");
        args.report = Some(report_path.clone());

        let report = run_with(&args, &opener).unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.scenes, 3);
        assert!(matches!(report.videos[0].status, JobStatus::Failed(_)));

        assert!(output.path().join("cuts/0.jpg").is_file());
        assert!(output.path().join("cuts/1.jpg").is_file());
        assert!(output.path().join("still/0.jpg").is_file());
        assert!(!output.path().join("broken").exists());

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(json["succeeded"], 2);
        assert_eq!(json["videos"][1]["video_id"], "cuts");
        assert_eq!(json["videos"][1]["scenes"][1]["start_frame"], 40);
        assert_eq!(json["videos"][2]["scenes"][0]["selected_frame_index"], 29);
    }

    #[test]
    fn test_second_run_leaves_no_stale_keyframes() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let clip = input.path().join("clip.mp4");
        fs::write(&clip, b"").unwrap();
        let args = args_for(input.path(), output.path());

        let busy = SyntheticOpener::new().with_video(&clip, cut_video(80, &[20, 40, 60]));
        assert_eq!(run_with(&args, &busy).unwrap().scenes, 4);

        let still = SyntheticOpener::new().with_video(&clip, cut_video(80, &[]));
        assert_eq!(run_with(&args, &still).unwrap().scenes, 1);

        let names: Vec<_> = fs::read_dir(output.path().join("clip"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["0.jpg"]);
    }

    #[test]
    fn test_run_with_empty_directory() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let report = run_with(&args_for(input.path(), output.path()), &SyntheticOpener::new()).unwrap();
        assert!(report.videos.is_empty());
        assert!(!report.has_failures());
    }
}

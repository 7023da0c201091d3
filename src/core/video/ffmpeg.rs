//! ffmpeg-backed frame source.
//!
//! `ffprobe` reports the geometry of the first video stream, then an `ffmpeg`
//! child decodes it to packed RGB24 on stdout, read back one frame at a time.

use std::ffi::OsString;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

use super::error::ExtractError;
use super::frame::{Frame, CHANNELS};
use super::source::{FrameSource, VideoOpener};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl StreamInfo {
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * CHANNELS
    }

    pub fn timestamp_of(&self, index: u64) -> Duration {
        if self.fps > 0.0 {
            Duration::from_secs_f64(index as f64 / self.fps)
        } else {
            Duration::ZERO
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

/// Parses `ffprobe -of json` output for the first video stream.
pub fn parse_probe(json: &str) -> Result<StreamInfo, String> {
    let probe: ProbeOutput =
        serde_json::from_str(json).map_err(|e| format!("unreadable ffprobe output: {e}"))?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream".to_string())?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err("video stream has no usable dimensions".into()),
    };

    // avg_frame_rate is "0/0" for some containers; r_frame_rate is the fallback
    let fps = [stream.avg_frame_rate, stream.r_frame_rate]
        .iter()
        .flatten()
        .find_map(|rate| parse_rate(rate))
        .unwrap_or(0.0);

    Ok(StreamInfo { width, height, fps })
}

fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = match rate.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (rate.trim().parse::<f64>().ok()?, 1.0),
    };
    let fps = num / den;
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

pub struct FfmpegOpener {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegOpener {
    pub fn new() -> Self {
        Self::with_binaries("ffmpeg", "ffprobe")
    }

    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn probe(&self, path: &Path) -> Result<StreamInfo, ExtractError> {
        if !path.is_file() {
            return Err(ExtractError::open(path, "no such file"));
        }

        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height,avg_frame_rate,r_frame_rate"])
            .args(["-of", "json"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ExtractError::open(path, format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ExtractError::open(
                path,
                format!(
                    "ffprobe exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        parse_probe(&String::from_utf8_lossy(&output.stdout))
            .map_err(|reason| ExtractError::open(path, reason))
    }
}

impl Default for FfmpegOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoOpener for FfmpegOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, ExtractError> {
        let info = self.probe(path)?;
        debug!(
            "probed {}: {}x{} @ {:.3} fps",
            path.display(),
            info.width,
            info.height,
            info.fps
        );

        let mut child = Command::new(&self.ffmpeg)
            .args(decode_args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExtractError::open(path, format!("failed to spawn ffmpeg: {e}")))?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExtractError::open(path, "ffmpeg stdout unavailable"));
            }
        };

        // drained on its own thread so a chatty decoder cannot block on a full pipe
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        Ok(Box::new(FfmpegFrameSource {
            path: path.to_path_buf(),
            child,
            stdout: BufReader::new(stdout),
            stderr,
            info,
            next_index: 0,
            finished: false,
        }))
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

pub struct FfmpegFrameSource {
    path: PathBuf,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    info: StreamInfo,
    next_index: u64,
    finished: bool,
}

impl FfmpegFrameSource {
    /// Stops the decoder early and reaps it.
    fn abort(&mut self) {
        self.finished = true;
        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    fn finish(&mut self) -> Result<(), ExtractError> {
        self.finished = true;
        let status = self
            .child
            .wait()
            .map_err(|e| ExtractError::decode(self.next_index, e))?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(ExtractError::decode(
                self.next_index,
                format!("ffmpeg exited with {status}: {}", stderr.trim()),
            ));
        }
        if !stderr.trim().is_empty() {
            warn!("ffmpeg reported for {}: {}", self.path.display(), stderr.trim());
        }
        debug!(
            "decoded {} frames from {}",
            self.next_index,
            self.path.display()
        );
        Ok(())
    }
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, ExtractError> {
        if self.finished {
            return Ok(None);
        }

        let index = self.next_index;
        let frame_len = self.info.frame_len();
        let mut data = vec![0u8; frame_len];
        let filled = read_full(&mut self.stdout, &mut data).map_err(|e| {
            self.abort();
            ExtractError::decode(index, e)
        })?;

        if filled == 0 {
            self.finish()?;
            return Ok(None);
        }
        if filled < frame_len {
            self.abort();
            return Err(ExtractError::decode(
                index,
                format!("truncated frame: got {filled} of {frame_len} bytes"),
            ));
        }

        self.next_index += 1;
        Ok(Some(Frame::new(
            self.info.width,
            self.info.height,
            data,
            self.info.timestamp_of(index),
            index,
        )))
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if !self.finished {
            self.abort();
        }
    }
}

/// ffmpeg arguments that stream the first video stream as rgb24.
///
/// Display-matrix rotation is not applied, so frames keep the coded
/// width and height that ffprobe reported.
fn decode_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-noautorotate", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_owned());
    args.extend(
        ["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"]
            .iter()
            .map(OsString::from),
    );
    args
}

/// Reads until `buf` is full or the stream ends; returns the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe() {
        let json = r#"{
            "programs": [],
            "streams": [
                { "width": 1280, "height": 720, "r_frame_rate": "30/1", "avg_frame_rate": "30000/1001" }
            ]
        }"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(info.width, 1280);
        assert_eq!(info.height, 720);
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.frame_len(), 1280 * 720 * 3);
    }

    #[test]
    fn test_parse_probe_falls_back_to_r_frame_rate() {
        let json = r#"{"streams":[{"width":64,"height":48,"avg_frame_rate":"0/0","r_frame_rate":"25/1"}]}"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(info.fps, 25.0);
        assert_eq!(info.timestamp_of(50), Duration::from_secs(2));
    }

    #[test]
    fn test_decode_keeps_coded_orientation() {
        let args = decode_args(Path::new("clips/portrait.mov"));
        let position = |flag: &str| args.iter().position(|a| a == flag);

        let input = position("-i").unwrap();
        assert!(position("-noautorotate").unwrap() < input);
        assert_eq!(args[input + 1], OsString::from("clips/portrait.mov"));
        assert_eq!(args.last().unwrap(), "-");
    }

    #[test]
    fn test_parse_probe_without_stream() {
        assert!(parse_probe(r#"{"streams":[]}"#).is_err());
        assert!(parse_probe(r#"{"streams":[{"width":0,"height":10}]}"#).is_err());
        assert!(parse_probe("not json").is_err());
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("24/1"), Some(24.0));
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("12.5"), Some(12.5));
        assert_eq!(parse_rate("abc"), None);
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let opener = FfmpegOpener::new();
        let result = opener.open(Path::new("/definitely/not/here.mp4"));
        assert!(matches!(result, Err(ExtractError::VideoOpen { .. })));
    }

    #[test]
    fn test_read_full_reports_short_reads() {
        let mut reader = io::Cursor::new(vec![1u8; 5]);
        let mut buf = [0u8; 8];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 5);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_abort_reaps_decoder() {
        let mut child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let stdout = child.stdout.take().unwrap();
        let pid = child.id();
        let mut source = FfmpegFrameSource {
            path: PathBuf::from("sleep"),
            child,
            stdout: BufReader::new(stdout),
            stderr: None,
            info: StreamInfo { width: 2, height: 2, fps: 25.0 },
            next_index: 0,
            finished: false,
        };

        source.abort();

        assert!(source.finished);
        assert!(!Path::new(&format!("/proc/{pid}")).exists());
        assert!(source.next_frame().unwrap().is_none());
    }
}

//! In-memory videos and sinks shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::core::video::{ExtractError, Frame, FrameSource, OutputSink, VideoOpener};

pub const WIDTH: u32 = 16;
pub const HEIGHT: u32 = 12;
pub const FPS: u64 = 25;

/// Colours far enough apart that every detector cuts between neighbours.
const PALETTE: [[u8; 3]; 5] = [
    [20, 20, 20],
    [230, 40, 40],
    [30, 60, 160],
    [240, 220, 120],
    [60, 140, 60],
];

pub fn solid_frame(index: u64, width: u32, height: u32, rgb: [u8; 3]) -> Frame {
    let data = rgb.repeat(width as usize * height as usize);
    let timestamp = Duration::from_millis(index * 1000 / FPS);
    Frame::new(width, height, data, timestamp, index)
}

/// `total` flat frames with a colour change at each index in `cuts`.
pub fn cut_video(total: u64, cuts: &[u64]) -> Vec<Frame> {
    (0..total)
        .map(|i| {
            let scene = cuts.iter().filter(|&&c| c <= i).count();
            solid_frame(i, WIDTH, HEIGHT, PALETTE[scene % PALETTE.len()])
        })
        .collect()
}

/// Adds a +-`amplitude` checkerboard on every channel. Sharpness grows with
/// the amplitude.
pub fn checkered(mut frame: Frame, amplitude: u8) -> Frame {
    let width = frame.width as usize;
    for (i, px) in frame.data.chunks_exact_mut(3).enumerate() {
        let (x, y) = (i % width, i / width);
        for value in px.iter_mut() {
            *value = if (x + y) % 2 == 0 {
                value.saturating_add(amplitude)
            } else {
                value.saturating_sub(amplitude)
            };
        }
    }
    frame
}

pub struct SyntheticSource {
    frames: VecDeque<Frame>,
}

impl SyntheticSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, ExtractError> {
        Ok(self.frames.pop_front())
    }
}

/// Serves registered frame lists by path. Unknown paths fail to open.
#[derive(Default)]
pub struct SyntheticOpener {
    videos: HashMap<PathBuf, Vec<Frame>>,
    panicking: HashSet<PathBuf>,
    opens: AtomicUsize,
}

impl SyntheticOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, path: impl Into<PathBuf>, frames: Vec<Frame>) -> Self {
        self.videos.insert(path.into(), frames);
        self
    }

    pub fn with_panic(mut self, path: impl Into<PathBuf>) -> Self {
        self.panicking.insert(path.into());
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl VideoOpener for SyntheticOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, ExtractError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.panicking.contains(path) {
            panic!("synthetic decoder crash on {}", path.display());
        }
        match self.videos.get(path) {
            Some(frames) => Ok(Box::new(SyntheticSource::new(frames.clone()))),
            None => Err(ExtractError::open(path, "no such synthetic video")),
        }
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Records `(video_dir, seq, frame index)` for every write.
#[derive(Default)]
pub struct MemorySink {
    writes: Mutex<Vec<(PathBuf, usize, u64)>>,
    discarded: Mutex<Vec<PathBuf>>,
    fail_at: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every write whose sequence number is `seq`.
    pub fn failing_at(seq: usize) -> Self {
        Self {
            fail_at: Some(seq),
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<(PathBuf, usize, u64)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn written_indices(&self, video_dir: &Path) -> Vec<u64> {
        self.writes()
            .into_iter()
            .filter(|(dir, _, _)| dir == video_dir)
            .map(|(_, _, index)| index)
            .collect()
    }

    pub fn discarded(&self) -> Vec<PathBuf> {
        self.discarded.lock().unwrap().clone()
    }
}

impl OutputSink for MemorySink {
    fn prepare(&self, video_dir: &Path) -> Result<(), ExtractError> {
        self.writes.lock().unwrap().retain(|(dir, _, _)| dir != video_dir);
        Ok(())
    }

    fn write_frame(&self, video_dir: &Path, seq: usize, frame: &Frame) -> Result<(), ExtractError> {
        if self.fail_at == Some(seq) {
            return Err(ExtractError::write(video_dir.join(format!("{seq}.jpg")), "disk full"));
        }
        self.writes
            .lock()
            .unwrap()
            .push((video_dir.to_path_buf(), seq, frame.index));
        Ok(())
    }

    fn discard(&self, video_dir: &Path) {
        self.writes.lock().unwrap().retain(|(dir, _, _)| dir != video_dir);
        self.discarded.lock().unwrap().push(video_dir.to_path_buf());
    }
}

use log::trace;

use crate::core::video::{ExtractError, Frame};

use super::detector::{GeometryGuard, SceneDetector};

const NUM_BINS: usize = 32;

type ChannelHistogram = [f64; NUM_BINS];

/// Histogram scene-change detector.
///
/// Builds a normalized 32-bin histogram per RGB channel and compares it with
/// the previous frame's via chi-squared distance, averaged over channels
/// (0 for identical, 2 for disjoint). Insensitive to where pixels moved, so
/// it tracks overall colour content rather than per-pixel motion.
pub struct HistogramDetector {
    threshold: f64,
    last_histogram: Option<[ChannelHistogram; 3]>,
    guard: GeometryGuard,
}

impl HistogramDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_histogram: None,
            guard: GeometryGuard::default(),
        }
    }

    fn compute_histogram(frame: &Frame) -> [ChannelHistogram; 3] {
        let mut bins = [[0u64; NUM_BINS]; 3];
        for pixel in frame.pixels() {
            for (channel, &value) in pixel.iter().enumerate() {
                bins[channel][value as usize * NUM_BINS / 256] += 1;
            }
        }

        let total = frame.pixel_count().max(1) as f64;
        let mut hist = [[0.0f64; NUM_BINS]; 3];
        for (channel, counts) in bins.iter().enumerate() {
            for (i, &count) in counts.iter().enumerate() {
                hist[channel][i] = count as f64 / total;
            }
        }
        hist
    }

    fn chi_squared(a: &ChannelHistogram, b: &ChannelHistogram) -> f64 {
        let mut sum = 0.0;
        for i in 0..NUM_BINS {
            let denom = a[i] + b[i];
            if denom > 1e-10 {
                let diff = a[i] - b[i];
                sum += (diff * diff) / denom;
            }
        }
        sum
    }

    fn distance(a: &[ChannelHistogram; 3], b: &[ChannelHistogram; 3]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| Self::chi_squared(x, y))
            .sum::<f64>()
            / 3.0
    }
}

impl SceneDetector for HistogramDetector {
    fn feed(&mut self, frame: &Frame) -> Result<Option<u64>, ExtractError> {
        self.guard.check(frame)?;
        let hist = Self::compute_histogram(frame);

        let cut = match &self.last_histogram {
            Some(prev) => {
                let distance = Self::distance(prev, &hist);
                trace!(
                    "frame {} histogram distance {:.4} (threshold {:.4})",
                    frame.index,
                    distance,
                    self.threshold
                );
                distance > self.threshold
            }
            None => false,
        };

        self.last_histogram = Some(hist);
        Ok(cut.then_some(frame.index))
    }

    fn name(&self) -> &str {
        "histogram"
    }

    fn reset(&mut self) {
        self.last_histogram = None;
        self.guard.reset();
    }
}

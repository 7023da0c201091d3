use log::trace;

use crate::core::video::{ExtractError, Frame};

use super::detector::{GeometryGuard, SceneDetector};

/// Weight of each HSV component in the content score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentWeights {
    pub delta_hue: f64,
    pub delta_sat: f64,
    pub delta_lum: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            delta_hue: 1.0,
            delta_sat: 1.0,
            delta_lum: 1.0,
        }
    }
}

impl ComponentWeights {
    pub fn luma_only() -> Self {
        Self {
            delta_hue: 0.0,
            delta_sat: 0.0,
            delta_lum: 1.0,
        }
    }

    fn sum_abs(&self) -> f64 {
        self.delta_hue.abs() + self.delta_sat.abs() + self.delta_lum.abs()
    }
}

/// 8-bit HSV planes of one frame (hue halved into 0..=180).
struct HsvPlanes {
    hue: Vec<u8>,
    sat: Vec<u8>,
    lum: Vec<u8>,
}

impl HsvPlanes {
    fn from_frame(frame: &Frame) -> Self {
        let n = frame.pixel_count();
        let mut planes = Self {
            hue: Vec::with_capacity(n),
            sat: Vec::with_capacity(n),
            lum: Vec::with_capacity(n),
        };
        for [r, g, b] in frame.pixels() {
            let (h, s, v) = rgb_to_hsv(r, g, b);
            planes.hue.push(h);
            planes.sat.push(s);
            planes.lum.push(v);
        }
        planes
    }
}

pub(crate) fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = (v - min) as f32;

    let s = if v == 0 {
        0.0
    } else {
        delta * 255.0 / v as f32
    };

    let (r, g, b) = (r as f32, g as f32, b as f32);
    let mut h = if delta == 0.0 {
        0.0
    } else if v as f32 == r {
        60.0 * (g - b) / delta
    } else if v as f32 == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    ((h / 2.0).round() as u8, s.round() as u8, v)
}

fn mean_pixel_distance(left: &[u8], right: &[u8]) -> f64 {
    if left.is_empty() {
        return 0.0;
    }
    let sum: u64 = left
        .iter()
        .zip(right)
        .map(|(&a, &b)| a.abs_diff(b) as u64)
        .sum();
    sum as f64 / left.len() as f64
}

/// Content-change detector: weighted mean HSV difference against the
/// previous frame. Catches hard cuts; a lower threshold yields more scenes.
pub struct ContentDetector {
    threshold: f64,
    weights: ComponentWeights,
    last: Option<HsvPlanes>,
    guard: GeometryGuard,
}

impl ContentDetector {
    pub fn new(threshold: f64) -> Self {
        Self::with_weights(threshold, ComponentWeights::default())
    }

    pub fn with_weights(threshold: f64, weights: ComponentWeights) -> Self {
        Self {
            threshold,
            weights,
            last: None,
            guard: GeometryGuard::default(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(&self, prev: &HsvPlanes, cur: &HsvPlanes) -> f64 {
        let weight_sum = self.weights.sum_abs();
        if weight_sum == 0.0 {
            return 0.0;
        }
        let weighted = mean_pixel_distance(&prev.hue, &cur.hue) * self.weights.delta_hue
            + mean_pixel_distance(&prev.sat, &cur.sat) * self.weights.delta_sat
            + mean_pixel_distance(&prev.lum, &cur.lum) * self.weights.delta_lum;
        weighted / weight_sum
    }
}

impl SceneDetector for ContentDetector {
    fn feed(&mut self, frame: &Frame) -> Result<Option<u64>, ExtractError> {
        self.guard.check(frame)?;
        let planes = HsvPlanes::from_frame(frame);

        let cut = match &self.last {
            Some(prev) => {
                let score = self.score(prev, &planes);
                trace!(
                    "frame {} content score {:.3} (threshold {})",
                    frame.index,
                    score,
                    self.threshold
                );
                score > self.threshold
            }
            None => false,
        };

        self.last = Some(planes);
        Ok(cut.then_some(frame.index))
    }

    fn name(&self) -> &str {
        "content"
    }

    fn reset(&mut self) {
        self.last = None;
        self.guard.reset();
    }
}

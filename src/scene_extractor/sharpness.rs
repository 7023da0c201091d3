use crate::core::video::Frame;

/// Variance of the 4-neighbour Laplacian over the interior of the luma plane.
/// Higher means more in-focus detail. Frames under 3x3 score 0.
pub fn laplacian_variance(frame: &Frame) -> f64 {
    let w = frame.width as usize;
    let h = frame.height as usize;
    if w < 3 || h < 3 || frame.data.len() < w * h * 3 {
        return 0.0;
    }

    let luma = frame.luma();
    let mut sum: i64 = 0;
    let mut sum_sq: i64 = 0;

    for y in 1..h - 1 {
        let row = y * w;
        for x in 1..w - 1 {
            let i = row + x;
            let lap = luma[i - 1] as i64 + luma[i + 1] as i64 + luma[i - w] as i64
                + luma[i + w] as i64
                - 4 * luma[i] as i64;
            sum += lap;
            sum_sq += lap * lap;
        }
    }

    let n = ((w - 2) * (h - 2)) as f64;
    let mean = sum as f64 / n;
    (sum_sq as f64 / n - mean * mean).max(0.0)
}

/// Running sharpest frame of one scene window.
///
/// Keeps only the current best frame; every other frame offered is dropped
/// on the spot. On equal scores the earlier frame stays.
#[derive(Debug, Default)]
pub struct BestFrame {
    best: Option<(Frame, f64)>,
}

impl BestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scores `frame` and keeps it if it beats the current best.
    pub fn offer(&mut self, frame: Frame) -> f64 {
        let score = laplacian_variance(&frame);
        self.offer_scored(frame, score);
        score
    }

    fn offer_scored(&mut self, frame: Frame, score: f64) {
        match &self.best {
            Some((_, best)) if score <= *best => {}
            _ => self.best = Some((frame, score)),
        }
    }

    /// Folds a later window into this one.
    pub fn absorb(&mut self, later: BestFrame) {
        if let Some((frame, score)) = later.best {
            self.offer_scored(frame, score);
        }
    }

    pub fn best_index(&self) -> Option<u64> {
        self.best.as_ref().map(|(frame, _)| frame.index)
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best.as_ref().map(|(_, score)| *score)
    }

    pub fn into_best(self) -> Option<(Frame, f64)> {
        self.best
    }
}

use std::time::Duration;

use super::error::ExtractError;

/// Bytes per pixel of the packed RGB24 layout every frame uses.
pub const CHANNELS: usize = 3;

/// A decoded video frame.
///
/// Frames are owned by the streaming loop that decoded them and are dropped
/// as soon as they stop being the best candidate of the open scene.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB24, row-major
    pub timestamp: Duration,
    pub index: u64,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, timestamp: Duration, index: u64) -> Self {
        Self {
            width,
            height,
            data,
            timestamp,
            index,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp.as_secs_f64()
    }

    /// Rejects frames whose buffer does not match their dimensions.
    pub fn validate(&self) -> Result<(), ExtractError> {
        let expected = self.pixel_count() * CHANNELS;
        if self.data.len() != expected {
            return Err(ExtractError::decode(
                self.index,
                format!(
                    "pixel buffer holds {} bytes, expected {} for {}x{}",
                    self.data.len(),
                    expected,
                    self.width,
                    self.height
                ),
            ));
        }
        Ok(())
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data
            .chunks_exact(CHANNELS)
            .map(|rgb| [rgb[0], rgb[1], rgb[2]])
    }

    /// Integer BT.601 luma plane.
    pub fn luma(&self) -> Vec<u8> {
        self.pixels().map(|[r, g, b]| luma_of(r, g, b)).collect()
    }
}

#[inline]
pub fn luma_of(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

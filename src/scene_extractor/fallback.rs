use crate::core::video::{ExtractError, Frame, FrameSource};

use super::scene::{Scene, SceneBoundary};
use super::sharpness::laplacian_variance;

/// Index of the middle frame, `None` for an empty video.
pub fn fallback_index(total_frames: u64) -> Option<u64> {
    (total_frames > 0).then(|| (total_frames - 1) / 2)
}

/// Builds the single synthetic scene used when detection found no cuts.
///
/// `source` must be a fresh stream of the same video. It is decoded forward
/// to the middle frame, one frame at a time, and that frame is scored the
/// same way as any scene's best frame.
pub fn select_fallback(
    source: &mut dyn FrameSource,
    total_frames: u64,
) -> Result<Option<(Scene, Frame)>, ExtractError> {
    let middle = match fallback_index(total_frames) {
        Some(middle) => middle,
        None => return Ok(None),
    };

    let mut position = 0u64;
    while let Some(frame) = source.next_frame()? {
        if frame.index != position {
            return Err(ExtractError::decode(
                frame.index,
                format!("out of order, expected frame {position}"),
            ));
        }
        if position == middle {
            frame.validate()?;
            let scene = Scene {
                boundary: SceneBoundary::new(0, total_frames),
                selected_frame_index: middle,
                sharpness_score: laplacian_variance(&frame),
                timestamp: frame.timestamp_secs(),
            };
            return Ok(Some((scene, frame)));
        }
        position += 1;
    }

    Err(ExtractError::decode(
        position,
        format!("stream ended before middle frame {middle}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_extractor::testing::{checkered, cut_video, SyntheticSource};

    #[test]
    fn test_fallback_index() {
        assert_eq!(fallback_index(0), None);
        assert_eq!(fallback_index(1), Some(0));
        assert_eq!(fallback_index(2), Some(0));
        assert_eq!(fallback_index(60), Some(29));
        assert_eq!(fallback_index(61), Some(30));
    }

    #[test]
    fn test_selects_middle_frame_of_static_video() {
        let mut frames = cut_video(60, &[]);
        frames[29] = checkered(frames[29].clone(), 4);
        let mut source = SyntheticSource::new(frames);

        let (scene, frame) = select_fallback(&mut source, 60).unwrap().unwrap();
        assert_eq!(scene.boundary, SceneBoundary::new(0, 60));
        assert_eq!(scene.selected_frame_index, 29);
        assert_eq!(frame.index, 29);
        assert!(scene.sharpness_score > 0.0);
    }

    #[test]
    fn test_empty_video_has_no_fallback() {
        let mut source = SyntheticSource::new(Vec::new());
        assert!(select_fallback(&mut source, 0).unwrap().is_none());
    }

    #[test]
    fn test_truncated_second_pass_is_decode_error() {
        let mut source = SyntheticSource::new(cut_video(10, &[]));
        let result = select_fallback(&mut source, 60);
        assert!(matches!(result, Err(ExtractError::Decode { frame: 10, .. })));
    }

    #[test]
    fn test_skipped_frame_on_second_pass_is_decode_error() {
        let frames: Vec<Frame> = cut_video(60, &[])
            .into_iter()
            .filter(|frame| frame.index != 12)
            .collect();
        let mut source = SyntheticSource::new(frames);

        let result = select_fallback(&mut source, 60);
        assert!(matches!(result, Err(ExtractError::Decode { frame: 13, .. })));
    }
}

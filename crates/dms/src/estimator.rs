//! Eye-openness estimation from eye bounding boxes

use crate::detector::Rect;
use crate::DmsError;

/// Fully closed
pub const MIN_SCORE: f32 = 0.15;
/// Wide open
pub const MAX_SCORE: f32 = 0.35;
/// Substituted for boxes with no usable geometry
pub const DEFAULT_SCORE: f32 = 0.25;
/// Reported for frames where no eye was found
pub const CLOSED_SCORE: f32 = MIN_SCORE;

/// Box area at which the size damping stops (20x20 px)
const FULL_CONFIDENCE_AREA: f32 = 400.0;

/// Height/width breakpoints, most open first
const LEVELS: [(f32, f32); 4] = [(0.4, 0.35), (0.3, 0.28), (0.2, 0.22), (0.1, 0.18)];

/// Openness score for a single eye box.
///
/// Taller boxes relative to their width map to higher scores. Small boxes are
/// damped by up to 20% since tiny detections are mostly noise, large ones
/// boosted by up to 20%; the result is clamped to `[MIN_SCORE, MAX_SCORE]`.
pub fn eye_openness(eye: &Rect) -> Result<f32, DmsError> {
    if !eye.is_valid() {
        return Err(DmsError::DegenerateGeometry {
            width: eye.width,
            height: eye.height,
        });
    }

    let ratio = eye.height / eye.width;
    let level = LEVELS
        .iter()
        .find(|(min_ratio, _)| ratio > *min_ratio)
        .map(|(_, score)| *score)
        .unwrap_or(MIN_SCORE);

    let size_factor = (eye.area() / FULL_CONFIDENCE_AREA).min(1.0);
    let score = level * (0.8 + 0.4 * size_factor);

    Ok(clamp_score(score))
}

/// Mean openness over every eye found in a frame, `CLOSED_SCORE` when none.
pub fn frame_openness(eyes: &[Rect]) -> f32 {
    if eyes.is_empty() {
        return CLOSED_SCORE;
    }

    let total: f32 = eyes
        .iter()
        .map(|eye| eye_openness(eye).unwrap_or(DEFAULT_SCORE))
        .sum();
    total / eyes.len() as f32
}

/// Clamp into the valid score range; NaN maps to the default score
pub fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        DEFAULT_SCORE
    } else {
        score.clamp(MIN_SCORE, MAX_SCORE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn eye(width: f32, height: f32) -> Rect {
        Rect::new(0.0, 0.0, width, height)
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_breakpoints_on_large_boxes() {
        // area >= 400: factor 1.2
        assert!(approx(eye_openness(&eye(100.0, 45.0)).unwrap(), 0.35));
        assert!(approx(eye_openness(&eye(100.0, 35.0)).unwrap(), 0.336));
        assert!(approx(eye_openness(&eye(100.0, 25.0)).unwrap(), 0.264));
        assert!(approx(eye_openness(&eye(100.0, 15.0)).unwrap(), 0.216));
        assert!(approx(eye_openness(&eye(100.0, 5.0)).unwrap(), 0.18));
    }

    #[test]
    fn test_breakpoint_is_exclusive() {
        // ratio exactly 0.4 falls into the next level down
        assert!(approx(eye_openness(&eye(50.0, 20.0)).unwrap(), 0.336));
    }

    #[test]
    fn test_small_box_is_damped() {
        // 10x5: ratio 0.5 -> 0.35, area 50 -> factor 0.85
        assert!(approx(eye_openness(&eye(10.0, 5.0)).unwrap(), 0.2975));
    }

    #[test]
    fn test_tall_box_saturates_open() {
        assert!(approx(eye_openness(&eye(30.0, 3000.0)).unwrap(), MAX_SCORE));
    }

    #[test]
    fn test_flat_box_saturates_closed() {
        // 100x1: ratio 0.01 -> 0.15, area 100 -> 0.135 -> clamped
        assert!(approx(eye_openness(&eye(100.0, 1.0)).unwrap(), MIN_SCORE));
    }

    #[test]
    fn test_degenerate_geometry() {
        assert!(matches!(
            eye_openness(&eye(0.0, 10.0)),
            Err(DmsError::DegenerateGeometry { .. })
        ));
        assert!(eye_openness(&eye(10.0, -1.0)).is_err());
        assert!(eye_openness(&eye(f32::NAN, 10.0)).is_err());
    }

    #[test]
    fn test_frame_openness_mean() {
        let eyes = [eye(100.0, 45.0), eye(100.0, 5.0)];
        assert!(approx(frame_openness(&eyes), (0.35 + 0.18) / 2.0));
    }

    #[test]
    fn test_frame_openness_no_eyes_is_closed() {
        assert_eq!(frame_openness(&[]), CLOSED_SCORE);
    }

    #[test]
    fn test_frame_openness_substitutes_degenerate() {
        let eyes = [eye(0.0, 0.0), eye(100.0, 45.0)];
        assert!(approx(frame_openness(&eyes), (DEFAULT_SCORE + 0.35) / 2.0));
    }

    proptest! {
        #[test]
        fn prop_score_in_range(w in 0.01f32..10_000.0, h in 0.01f32..10_000.0) {
            let score = eye_openness(&eye(w, h)).unwrap();
            prop_assert!((MIN_SCORE..=MAX_SCORE).contains(&score));
        }

        #[test]
        fn prop_taller_is_never_less_open(w in 20.0f32..200.0, h in 20.0f32..200.0, extra in 0.0f32..100.0) {
            let low = eye_openness(&eye(w, h)).unwrap();
            let high = eye_openness(&eye(w, h + extra)).unwrap();
            prop_assert!(high >= low - 1e-6);
        }
    }
}

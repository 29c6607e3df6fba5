//! Face and eye detector interface

use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::DmsError;

/// Eye band starts this far down the face
pub const EYE_BAND_TOP: f32 = 0.2;
/// Eye band height as a fraction of the face
pub const EYE_BAND_HEIGHT: f32 = 0.4;

/// Axis-aligned rectangle in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Finite, strictly positive extent
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Band of the face where eyes are searched (rows 20%..60%)
    pub fn eye_band(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y + (self.height * EYE_BAND_TOP).floor(),
            width: self.width,
            height: (self.height * EYE_BAND_HEIGHT).floor(),
        }
    }

    /// True when `other` lies entirely inside this rectangle
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }

    /// Width-over-height in the range real eyes occupy
    pub fn has_eye_aspect(&self) -> bool {
        if !(self.height > 0.0) {
            return false;
        }
        let aspect = self.width / self.height;
        aspect > 0.5 && aspect < 3.0
    }
}

/// Detector output for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detections {
    /// Largest face, if any
    #[serde(default)]
    pub face: Option<Rect>,

    /// Eyes inside the face's eye band, frame coordinates
    #[serde(default)]
    pub eyes: Vec<Rect>,
}

impl Detections {
    pub fn no_face() -> Self {
        Self::default()
    }

    pub fn face_only(face: Rect) -> Self {
        Self {
            face: Some(face),
            eyes: Vec::new(),
        }
    }

    /// Keep the largest face and drop eyes outside its eye band
    pub fn from_candidates(faces: &[Rect], eyes: Vec<Rect>) -> Self {
        let face = largest(faces);
        let eyes = match face {
            Some(face) => {
                let band = face.eye_band();
                eyes.into_iter().filter(|e| band.contains(e)).collect()
            }
            None => Vec::new(),
        };
        Self { face, eyes }
    }

    pub fn face_detected(&self) -> bool {
        self.face.is_some()
    }
}

/// Largest rectangle by area
pub fn largest(rects: &[Rect]) -> Option<Rect> {
    rects
        .iter()
        .copied()
        .max_by(|a, b| a.area().total_cmp(&b.area()))
}

/// Detections stamped with the capture time
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Monotonic time since the stream started
    pub timestamp: Duration,
    pub detections: Detections,
}

/// Black-box face/eye localizer.
///
/// Implementations may use any algorithm; the pipeline only relies on the
/// geometric contract of [`Detections`].
pub trait Detector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Detections, DmsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eye_band() {
        let face = Rect::new(100.0, 50.0, 200.0, 200.0);
        let band = face.eye_band();
        assert_eq!(band, Rect::new(100.0, 90.0, 200.0, 80.0));
    }

    #[test]
    fn test_largest_face_wins() {
        let faces = [
            Rect::new(0.0, 0.0, 120.0, 120.0),
            Rect::new(300.0, 0.0, 200.0, 200.0),
            Rect::new(0.0, 300.0, 150.0, 150.0),
        ];
        assert_eq!(largest(&faces), Some(faces[1]));
        assert_eq!(largest(&[]), None);
    }

    #[test]
    fn test_from_candidates_confines_eyes() {
        let face = Rect::new(0.0, 0.0, 200.0, 200.0);
        let inside = Rect::new(30.0, 50.0, 40.0, 20.0);
        let mouth = Rect::new(70.0, 150.0, 60.0, 30.0);
        let det = Detections::from_candidates(&[face], vec![inside, mouth]);
        assert_eq!(det.face, Some(face));
        assert_eq!(det.eyes, vec![inside]);
    }

    #[test]
    fn test_no_face_drops_eyes() {
        let det = Detections::from_candidates(&[], vec![Rect::new(0.0, 0.0, 10.0, 10.0)]);
        assert!(!det.face_detected());
        assert!(det.eyes.is_empty());
    }

    #[test]
    fn test_eye_aspect_filter() {
        assert!(Rect::new(0.0, 0.0, 30.0, 20.0).has_eye_aspect());
        assert!(!Rect::new(0.0, 0.0, 90.0, 20.0).has_eye_aspect());
        assert!(!Rect::new(0.0, 0.0, 10.0, 20.0).has_eye_aspect());
        assert!(!Rect::new(0.0, 0.0, 10.0, 0.0).has_eye_aspect());
    }

    #[test]
    fn test_validity() {
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!Rect::new(0.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!Rect::new(0.0, 0.0, f32::INFINITY, 1.0).is_valid());
    }
}

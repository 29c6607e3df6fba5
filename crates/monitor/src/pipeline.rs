//! Camera frames to detections

use camera_capture::{FrameSource, VideoFrame};
use dms::{DmsError, Detector, Observation};
use tracing::debug;

/// One loop item: detections, plus the frame when it came from a camera
#[derive(Debug, Clone)]
pub struct Captured {
    pub observation: Observation,
    pub frame: Option<VideoFrame>,
}

impl From<Observation> for Captured {
    fn from(observation: Observation) -> Self {
        Self {
            observation,
            frame: None,
        }
    }
}

/// Runs every captured frame through a [`Detector`].
///
/// A failed capture is reported as [`DmsError::Acquisition`] and ends the
/// stream; detector failures are per-frame.
pub struct CameraObservations {
    source: Box<dyn FrameSource>,
    detector: Box<dyn Detector>,
    finished: bool,
}

impl CameraObservations {
    pub fn new(source: Box<dyn FrameSource>, detector: Box<dyn Detector>) -> Self {
        debug!("Detecting on {}", source.describe());
        Self {
            source,
            detector,
            finished: false,
        }
    }
}

impl Iterator for CameraObservations {
    type Item = Result<Captured, DmsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let frame = match self.source.next()? {
            Ok(frame) => frame,
            Err(e) => {
                self.finished = true;
                return Some(Err(DmsError::Acquisition(e.to_string())));
            }
        };
        Some(self.detector.detect(&frame).map(|detections| Captured {
            observation: Observation {
                timestamp: frame.timestamp(),
                detections,
            },
            frame: Some(frame),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_capture::{CameraError, MemorySource, VideoFrame};
    use dms::{Detections, Rect};
    use std::time::Duration;

    /// Reports a face on frames with even sequence numbers
    struct EvenFrames;

    impl Detector for EvenFrames {
        fn detect(&mut self, frame: &VideoFrame) -> Result<Detections, DmsError> {
            if frame.sequence % 2 == 0 {
                Ok(Detections::face_only(Rect::new(0.0, 0.0, 120.0, 120.0)))
            } else {
                Ok(Detections::no_face())
            }
        }
    }

    fn frame(sequence: u32) -> VideoFrame {
        VideoFrame::filled(4, 4, [0, 0, 0], sequence as u64 * 33_000_000, sequence)
    }

    #[test]
    fn test_stamps_detections_with_capture_time() {
        let source = MemorySource::new(vec![frame(0), frame(1)]);
        let captured: Vec<Captured> =
            CameraObservations::new(Box::new(source), Box::new(EvenFrames))
                .collect::<Result<_, _>>()
                .unwrap();

        assert_eq!(captured.len(), 2);
        assert!(captured[0].observation.detections.face_detected());
        assert!(!captured[1].observation.detections.face_detected());
        assert_eq!(captured[1].observation.timestamp, Duration::from_millis(33));
        assert_eq!(captured[1].frame.as_ref().map(|f| f.sequence), Some(1));
    }

    struct Failing;

    impl Iterator for Failing {
        type Item = Result<VideoFrame, CameraError>;

        fn next(&mut self) -> Option<Self::Item> {
            Some(Err(CameraError::Stream("device unplugged".into())))
        }
    }

    impl FrameSource for Failing {
        fn width(&self) -> u32 {
            0
        }

        fn height(&self) -> u32 {
            0
        }

        fn describe(&self) -> String {
            "failing".into()
        }
    }

    #[test]
    fn test_capture_failure_ends_stream() {
        let mut observations = CameraObservations::new(Box::new(Failing), Box::new(EvenFrames));
        assert!(matches!(
            observations.next(),
            Some(Err(DmsError::Acquisition(_)))
        ));
        assert!(observations.next().is_none());
    }
}

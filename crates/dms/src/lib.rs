//! Driver Monitoring System (DMS)
//!
//! Drowsiness detection from a stream of face/eye detections:
//! - Eye openness estimation from eye bounding boxes
//! - Per-user baseline calibration
//! - Moving-average smoothing
//! - Blink, drowsiness and alarm decisions

pub mod analysis;
pub mod calibration;
#[cfg(feature = "cascade")]
pub mod cascade;
pub mod config;
pub mod detector;
pub mod estimator;
pub mod replay;
pub mod smoothing;
pub mod state;

pub use analysis::{DriverStatus, FrameResult};
pub use calibration::Calibrator;
#[cfg(feature = "cascade")]
pub use cascade::CascadeDetector;
pub use config::DmsConfig;
pub use detector::{Detections, Detector, Observation, Rect};
pub use replay::ReplaySource;
pub use smoothing::Smoother;
pub use state::{DrowsinessStateMachine, EyeState, SessionState, Transition};

use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Score reported before the first frame with a face
pub const INITIAL_SCORE: f32 = 0.30;

/// Step applied by the threshold up/down commands
pub const THRESHOLD_STEP: f32 = 0.01;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Degenerate eye geometry: {width}x{height}")]
    DegenerateGeometry { width: f32, height: f32 },

    #[error("Detector unavailable: {0}")]
    DetectorUnavailable(String),

    #[error("Frame acquisition failed: {0}")]
    Acquisition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Replay line {line}: {message}")]
    Replay { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only view of the session for info and debug output
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub threshold: f32,
    pub consec_frames: u32,
    pub consecutive_closed_frames: u32,
    pub blink_count: u32,
    pub alarm_triggered: bool,
    pub calibrated: bool,
    pub baseline: Option<f32>,
    pub calibration_progress: (usize, usize),
    pub frames_processed: u64,
}

/// Driver monitoring pipeline: estimator -> calibrator -> smoother -> state machine
pub struct DmsModule {
    calibrator: Calibrator,
    smoother: Smoother,
    machine: DrowsinessStateMachine,
    last_score: f32,
    frames_processed: u64,
}

impl DmsModule {
    /// Create a new DMS module with configuration
    pub fn new(config: DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        info!(
            "DMS ready: threshold {:.3}, {} consecutive frames, {} ms alarm delay",
            config.ear_threshold, config.consec_frames, config.drowsiness_threshold_ms
        );
        Ok(Self {
            calibrator: Calibrator::new(config.calibration_frames, config.reference_ear),
            smoother: Smoother::new(config.smoothing_window),
            machine: DrowsinessStateMachine::new(config),
            last_score: INITIAL_SCORE,
            frames_processed: 0,
        })
    }

    /// Run one frame's detections through the pipeline
    pub fn process(&mut self, detections: &Detections, now: Duration) -> FrameResult {
        self.frames_processed += 1;

        if !detections.face_detected() {
            return FrameResult {
                face_detected: false,
                eyes_detected: 0,
                ear: self.last_score,
                eye_state: EyeState::Unknown,
                is_drowsy: false,
                is_blinking: false,
                blink_count: self.machine.state().blink_count,
            };
        }

        let eyes = &detections.eyes;
        let score = if eyes.is_empty() {
            estimator::CLOSED_SCORE
        } else {
            self.calibrator.ingest(estimator::frame_openness(eyes))
        };
        self.last_score = score;

        let smoothed = self.smoother.push(score);
        let transition = self.machine.step(smoothed, eyes.len(), true, now);

        FrameResult {
            face_detected: true,
            eyes_detected: eyes.len(),
            ear: smoothed,
            eye_state: transition.eye_state,
            is_drowsy: transition.is_drowsy,
            is_blinking: transition.is_blinking,
            blink_count: self.machine.state().blink_count,
        }
    }

    /// Convenience wrapper over [`DmsModule::process`]
    pub fn observe(&mut self, observation: &Observation) -> FrameResult {
        self.process(&observation.detections, observation.timestamp)
    }

    /// Reset driver state (user command); blinks and calibration are kept
    pub fn reset_state(&mut self) {
        self.machine.reset();
        info!("Driver state reset");
    }

    /// Set the EAR threshold, clamped to the score range
    pub fn set_threshold(&mut self, threshold: f32) -> f32 {
        let applied = self.machine.set_threshold(threshold);
        info!("EAR threshold set to {:.3}", applied);
        applied
    }

    /// Nudge the threshold by `delta`, clamped
    pub fn adjust_threshold(&mut self, delta: f32) -> f32 {
        self.set_threshold(self.machine.threshold() + delta)
    }

    pub fn threshold(&self) -> f32 {
        self.machine.threshold()
    }

    pub fn consecutive_closed_frames(&self) -> u32 {
        self.machine.state().consecutive_closed_frames
    }

    pub fn alarm_triggered(&self) -> bool {
        self.machine.state().alarm_triggered
    }

    pub fn blink_count(&self) -> u32 {
        self.machine.state().blink_count
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrator.is_calibrated()
    }

    pub fn calibration_progress(&self) -> (usize, usize) {
        self.calibrator.progress()
    }

    pub fn baseline(&self) -> Option<f32> {
        self.calibrator.baseline()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn config(&self) -> &DmsConfig {
        self.machine.config()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.machine.state();
        SessionSnapshot {
            threshold: self.machine.threshold(),
            consec_frames: self.machine.config().consec_frames,
            consecutive_closed_frames: state.consecutive_closed_frames,
            blink_count: state.blink_count,
            alarm_triggered: state.alarm_triggered,
            calibrated: self.calibrator.is_calibrated(),
            baseline: self.calibrator.baseline(),
            calibration_progress: self.calibrator.progress(),
            frames_processed: self.frames_processed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face() -> Rect {
        Rect::new(100.0, 100.0, 200.0, 200.0)
    }

    fn open_eyes() -> Detections {
        Detections {
            face: Some(face()),
            eyes: vec![
                Rect::new(130.0, 150.0, 40.0, 18.0),
                Rect::new(230.0, 150.0, 40.0, 18.0),
            ],
        }
    }

    #[test]
    fn test_no_face_reports_unknown_and_last_score() {
        let mut dms = DmsModule::new(DmsConfig::default()).unwrap();
        let result = dms.process(&Detections::no_face(), Duration::ZERO);
        assert!(!result.face_detected);
        assert_eq!(result.eye_state, EyeState::Unknown);
        assert_eq!(result.ear, INITIAL_SCORE);
        assert_eq!(dms.calibration_progress().0, 0);
    }

    #[test]
    fn test_open_eyes_feed_calibration() {
        let mut dms = DmsModule::new(DmsConfig::default()).unwrap();
        let result = dms.process(&open_eyes(), Duration::ZERO);
        assert_eq!(result.eye_state, EyeState::Open);
        assert_eq!(result.eyes_detected, 2);
        assert_eq!(dms.calibration_progress(), (1, 30));
    }

    #[test]
    fn test_face_without_eyes_skips_calibration() {
        let mut dms = DmsModule::new(DmsConfig::default()).unwrap();
        let result = dms.process(&Detections::face_only(face()), Duration::ZERO);
        assert_eq!(result.eye_state, EyeState::Closed);
        assert_eq!(result.ear, estimator::CLOSED_SCORE);
        assert_eq!(dms.calibration_progress().0, 0);
        assert_eq!(dms.consecutive_closed_frames(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DmsConfig {
            consec_frames: 0,
            ..Default::default()
        };
        assert!(matches!(DmsModule::new(config), Err(DmsError::Config(_))));
    }

    #[test]
    fn test_adjust_threshold_clamps() {
        let mut dms = DmsModule::new(DmsConfig::default()).unwrap();
        for _ in 0..50 {
            dms.adjust_threshold(THRESHOLD_STEP);
        }
        assert_eq!(dms.threshold(), estimator::MAX_SCORE);
        for _ in 0..50 {
            dms.adjust_threshold(-THRESHOLD_STEP);
        }
        assert_eq!(dms.threshold(), estimator::MIN_SCORE);
    }
}

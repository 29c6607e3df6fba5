//! DMS configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::estimator::{MAX_SCORE, MIN_SCORE};
use crate::DmsError;

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Smoothed EAR below this counts as a closed frame
    pub ear_threshold: f32,

    /// Consecutive closed frames before the driver is considered drowsy
    pub consec_frames: u32,

    /// Drowsiness must hold this long before the alarm fires (milliseconds)
    pub drowsiness_threshold_ms: u64,

    /// Closed frames that must precede a reopen to count as a blink
    pub blink_min_frames: u32,

    /// Moving-average window length
    pub smoothing_window: usize,

    /// Frames with visible eyes used to establish the baseline
    pub calibration_frames: usize,

    /// Population-average open-eye score the baseline is referenced to
    pub reference_ear: f32,

    /// Smallest face side accepted by the detector (pixels)
    pub min_face_size: u32,

    /// Largest face side accepted by the detector (pixels)
    pub max_face_size: u32,

    /// SeetaFace model used by the cascade detector
    pub face_model_path: Option<String>,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.20,
            consec_frames: 10,
            drowsiness_threshold_ms: 1500,
            blink_min_frames: 2,
            smoothing_window: 5,
            calibration_frames: 30,
            reference_ear: 0.28,
            min_face_size: 100,
            max_face_size: 400,
            face_model_path: None,
        }
    }
}

impl DmsConfig {
    /// Create strict config (reacts sooner)
    pub fn strict() -> Self {
        Self {
            ear_threshold: 0.22,
            consec_frames: 8,
            drowsiness_threshold_ms: 1000,
            ..Default::default()
        }
    }

    /// Create lenient config (fewer false alarms)
    pub fn lenient() -> Self {
        Self {
            ear_threshold: 0.18,
            consec_frames: 15,
            drowsiness_threshold_ms: 2500,
            ..Default::default()
        }
    }

    /// Set the EAR threshold, clamped to the score range
    pub fn set_ear_threshold(&mut self, threshold: f32) -> f32 {
        self.ear_threshold = if threshold.is_nan() {
            self.ear_threshold
        } else {
            threshold.clamp(MIN_SCORE, MAX_SCORE)
        };
        self.ear_threshold
    }

    /// Alarm delay as a duration
    pub fn drowsiness_delay(&self) -> Duration {
        Duration::from_millis(self.drowsiness_threshold_ms)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), DmsError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&self.ear_threshold) {
            return Err(DmsError::Config(format!(
                "ear_threshold {} outside [{}, {}]",
                self.ear_threshold, MIN_SCORE, MAX_SCORE
            )));
        }
        if self.consec_frames == 0 {
            return Err(DmsError::Config("consec_frames must be > 0".into()));
        }
        if self.smoothing_window == 0 {
            return Err(DmsError::Config("smoothing_window must be > 0".into()));
        }
        if self.calibration_frames == 0 {
            return Err(DmsError::Config("calibration_frames must be > 0".into()));
        }
        if !(self.reference_ear > 0.0) {
            return Err(DmsError::Config("reference_ear must be positive".into()));
        }
        if self.min_face_size > self.max_face_size {
            return Err(DmsError::Config(format!(
                "min_face_size {} > max_face_size {}",
                self.min_face_size, self.max_face_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(DmsConfig::default().validate().is_ok());
        assert!(DmsConfig::strict().validate().is_ok());
        assert!(DmsConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_threshold_setter_clamps() {
        let mut config = DmsConfig::default();
        assert_eq!(config.set_ear_threshold(0.5), 0.35);
        assert_eq!(config.set_ear_threshold(0.01), 0.15);
        assert_eq!(config.set_ear_threshold(0.23), 0.23);
        assert_eq!(config.set_ear_threshold(f32::NAN), 0.23);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let config = DmsConfig {
            ear_threshold: 0.4,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DmsError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_window() {
        let config = DmsConfig {
            smoothing_window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

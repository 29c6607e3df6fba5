//! Driver state tracking

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::DmsConfig;

/// Per-frame eye classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EyeState {
    Open,
    Closed,
    /// No face in view
    #[default]
    Unknown,
}

impl EyeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EyeState::Open => "OPEN",
            EyeState::Closed => "CLOSED",
            EyeState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for EyeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session counters (tracked over time)
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Frames in a row classified as closed
    pub consecutive_closed_frames: u32,

    /// Blinks seen this session
    pub blink_count: u32,

    /// Start of the current drowsy episode
    pub drowsy_since: Option<Duration>,

    /// Alarm already fired for the current episode
    pub alarm_triggered: bool,
}

impl SessionState {
    /// Clear the closure episode; blinks are kept
    pub fn reset(&mut self) {
        self.consecutive_closed_frames = 0;
        self.drowsy_since = None;
        self.alarm_triggered = false;
    }
}

/// Outcome of one state machine step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    pub eye_state: EyeState,
    pub is_drowsy: bool,
    pub is_blinking: bool,
    /// `alarm_triggered` went false -> true on this frame
    pub alarm_edge: bool,
}

/// Turns the smoothed openness signal into blink, drowsiness and alarm
/// decisions. Timing uses the caller-supplied monotonic timestamps, so frame
/// rate jitter does not stretch or shrink the alarm delay.
#[derive(Debug, Clone)]
pub struct DrowsinessStateMachine {
    config: DmsConfig,
    state: SessionState,
}

impl DrowsinessStateMachine {
    pub fn new(config: DmsConfig) -> Self {
        Self {
            config,
            state: SessionState::default(),
        }
    }

    /// Advance one frame
    pub fn step(
        &mut self,
        smoothed_score: f32,
        eyes_detected: usize,
        face_detected: bool,
        now: Duration,
    ) -> Transition {
        if !face_detected {
            return Transition::default();
        }

        let mut transition = Transition::default();
        let state = &mut self.state;

        if eyes_detected == 0 || smoothed_score < self.config.ear_threshold {
            transition.eye_state = EyeState::Closed;
            state.consecutive_closed_frames += 1;
        } else {
            transition.eye_state = EyeState::Open;
            if state.consecutive_closed_frames >= self.config.blink_min_frames {
                state.blink_count += 1;
                transition.is_blinking = true;
                debug!(
                    "Blink #{} after {} closed frames",
                    state.blink_count, state.consecutive_closed_frames
                );
            }
            state.reset();
        }

        if state.consecutive_closed_frames >= self.config.consec_frames {
            transition.is_drowsy = true;
            let since = *state.drowsy_since.get_or_insert(now);
            if now.saturating_sub(since) >= self.config.drowsiness_delay() && !state.alarm_triggered
            {
                state.alarm_triggered = true;
                transition.alarm_edge = true;
                info!(
                    "Drowsiness alarm triggered after {} closed frames",
                    state.consecutive_closed_frames
                );
            }
        }

        transition
    }

    /// Zero the closure counter and alarm; blinks and calibration survive
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Set the EAR threshold (clamped); returns the value in effect
    pub fn set_threshold(&mut self, threshold: f32) -> f32 {
        self.config.set_ear_threshold(threshold)
    }

    pub fn threshold(&self) -> f32 {
        self.config.ear_threshold
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }
}

//! Session statistics

use serde::{Deserialize, Serialize};

use dms::{EyeState, FrameResult};

/// Running totals for the end-of-session summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_frames: u64,
    pub face_frames: u64,
    pub closed_frames: u64,
    pub drowsy_frames: u64,
    pub blinks: u32,
    pub alarms: usize,
}

impl SessionStats {
    pub fn record(&mut self, result: &FrameResult) {
        self.total_frames += 1;
        if result.face_detected {
            self.face_frames += 1;
        }
        if result.eye_state == EyeState::Closed {
            self.closed_frames += 1;
        }
        if result.is_drowsy {
            self.drowsy_frames += 1;
        }
        self.blinks = result.blink_count;
    }

    pub fn record_alarm(&mut self) {
        self.alarms += 1;
    }

    /// Share of face-visible frames classified closed (PERCLOS-like)
    pub fn closed_ratio(&self) -> f32 {
        if self.face_frames == 0 {
            return 0.0;
        }
        self.closed_frames as f32 / self.face_frames as f32
    }
}

//! DMS per-frame results and status labels

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::EyeState;

/// Snapshot handed to rendering and logging for one processed frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameResult {
    /// Whether a face was detected
    pub face_detected: bool,

    /// Number of eyes the detector reported
    pub eyes_detected: usize,

    /// Smoothed eye-openness score
    pub ear: f32,

    /// Open / closed / unknown
    pub eye_state: EyeState,

    /// Closed long enough to count as drowsy
    pub is_drowsy: bool,

    /// A blink completed on this frame
    pub is_blinking: bool,

    /// Blinks so far this session
    pub blink_count: u32,
}

impl FrameResult {
    pub fn status(&self) -> DriverStatus {
        DriverStatus::from_result(self)
    }
}

/// Driver status shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverStatus {
    /// Face not visible (camera blocked?)
    NoFace,

    /// Eyes closed past the drowsiness threshold
    Drowsy,

    /// Eyes closed this frame
    EyesClosed,

    /// Eyes open
    Alert,
}

impl DriverStatus {
    /// Priority: NoFace > Drowsy > EyesClosed > Alert.
    ///
    /// A visible face with no eyes is already classified closed.
    pub fn from_result(result: &FrameResult) -> Self {
        if !result.face_detected {
            DriverStatus::NoFace
        } else if result.is_drowsy {
            DriverStatus::Drowsy
        } else if result.eye_state == EyeState::Closed {
            DriverStatus::EyesClosed
        } else {
            DriverStatus::Alert
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DriverStatus::NoFace => "NO FACE",
            DriverStatus::Drowsy => "DROWSY",
            DriverStatus::EyesClosed => "EYES CLOSED",
            DriverStatus::Alert => "ALERT",
        }
    }

    /// Worth surfacing above debug level
    pub fn is_warning(&self) -> bool {
        matches!(self, DriverStatus::Drowsy | DriverStatus::NoFace)
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

//! Camera Capture Library for the Drowsiness Monitor
//!
//! Provides webcam frame acquisition behind the [`FrameSource`] trait.
//! Supports:
//! - V4L2 webcams (640x480 YUYV) via the `v4l` feature
//! - In-memory frame sequences for tests and offline runs

pub mod frame;
pub mod source;
#[cfg(feature = "v4l")]
pub mod v4l_camera;

pub use frame::VideoFrame;
pub use source::{FrameSource, MemorySource};
#[cfg(feature = "v4l")]
pub use v4l_camera::V4lCamera;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Camera support not compiled in (enable the `v4l` feature)")]
    Unsupported,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Number of mmap buffers requested from the driver
    pub buffer_count: u32,
    /// Mirror frames horizontally before detection
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            buffer_count: 4,
            mirror: true,
        }
    }
}

/// Open the camera described by `config`.
///
/// Tries the configured device first, then `/dev/video0..2`.
pub fn open_camera(config: &CameraConfig) -> Result<Box<dyn FrameSource>, CameraError> {
    #[cfg(feature = "v4l")]
    {
        let mut last_err = match V4lCamera::open(config) {
            Ok(cam) => return Ok(Box::new(cam)),
            Err(e) => e,
        };
        for n in 0..3 {
            let candidate = CameraConfig {
                device: format!("/dev/video{}", n),
                ..config.clone()
            };
            if candidate.device == config.device {
                continue;
            }
            match V4lCamera::open(&candidate) {
                Ok(cam) => {
                    tracing::info!("Camera found at index {}", n);
                    return Ok(Box::new(cam));
                }
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    #[cfg(not(feature = "v4l"))]
    {
        let _ = config;
        Err(CameraError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CameraConfig::default();
        assert_eq!(config.device, "/dev/video0");
        assert_eq!((config.width, config.height), (640, 480));
        assert!(config.mirror);
    }
}

//! Frame source abstraction

use std::collections::VecDeque;

use crate::{CameraError, VideoFrame};

/// A stream of captured frames.
///
/// `None` means the stream ended; `Some(Err(_))` is an acquisition failure.
pub trait FrameSource: Iterator<Item = Result<VideoFrame, CameraError>> {
    /// Frame width
    fn width(&self) -> u32;

    /// Frame height
    fn height(&self) -> u32;

    /// Human readable source name for logs
    fn describe(&self) -> String;
}

/// Pre-recorded frames served from memory
pub struct MemorySource {
    frames: VecDeque<VideoFrame>,
    width: u32,
    height: u32,
}

impl MemorySource {
    pub fn new(frames: Vec<VideoFrame>) -> Self {
        let (width, height) = frames
            .first()
            .map(|f| (f.width, f.height))
            .unwrap_or((0, 0));
        Self {
            frames: frames.into(),
            width,
            height,
        }
    }
}

impl Iterator for MemorySource {
    type Item = Result<VideoFrame, CameraError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.frames.pop_front().map(Ok)
    }
}

impl FrameSource for MemorySource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn describe(&self) -> String {
        format!("memory ({} frames left)", self.frames.len())
    }
}

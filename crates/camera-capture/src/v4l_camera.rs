//! V4L2 webcam capture

use std::time::Instant;

use tracing::{debug, info};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

use crate::frame::yuyv_to_rgb;
use crate::{CameraConfig, CameraError, FrameSource, VideoFrame};

/// V4L2 webcam streaming YUYV frames, converted to RGB
pub struct V4lCamera {
    /// Capture stream; dropped before the device
    stream: Option<Stream<'static>>,
    _device: Device,
    device_path: String,
    width: u32,
    height: u32,
    mirror: bool,
    sequence: u32,
    start_time: Instant,
}

impl V4lCamera {
    /// Open and start streaming from the configured device
    pub fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        let device = Device::with_path(&config.device)
            .map_err(|e| CameraError::Open(format!("{}: {}", config.device, e)))?;

        let mut format = device
            .format()
            .map_err(|e| CameraError::Format(e.to_string()))?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = FourCC::new(b"YUYV");
        let format = device
            .set_format(&format)
            .map_err(|e| CameraError::Format(e.to_string()))?;

        if format.fourcc != FourCC::new(b"YUYV") {
            return Err(CameraError::Format(format!(
                "device negotiated {} instead of YUYV",
                format.fourcc
            )));
        }

        let stream = Stream::with_buffers(&device, Type::VideoCapture, config.buffer_count)
            .map_err(|e| CameraError::Stream(e.to_string()))?;

        info!(
            "Camera {} opened: {}x{}",
            config.device, format.width, format.height
        );

        Ok(Self {
            stream: Some(stream),
            _device: device,
            device_path: config.device.clone(),
            width: format.width,
            height: format.height,
            mirror: config.mirror,
            sequence: 0,
            start_time: Instant::now(),
        })
    }
}

impl Drop for V4lCamera {
    fn drop(&mut self) {
        // Stream must go before the device
        self.stream.take();
    }
}

impl Iterator for V4lCamera {
    type Item = Result<VideoFrame, CameraError>;

    fn next(&mut self) -> Option<Self::Item> {
        let stream = self.stream.as_mut()?;

        match stream.next() {
            Ok((buffer, _meta)) => {
                let data = yuyv_to_rgb(buffer, self.width, self.height);
                if data.len() != (self.width * self.height * 3) as usize {
                    return Some(Err(CameraError::Format(format!(
                        "short frame: {} bytes",
                        buffer.len()
                    ))));
                }

                let timestamp_ns = self.start_time.elapsed().as_nanos() as u64;
                let mut frame =
                    VideoFrame::new(data, self.width, self.height, timestamp_ns, self.sequence);
                if self.mirror {
                    frame.flip_horizontal();
                }

                debug!("Captured frame {}", self.sequence);
                self.sequence = self.sequence.wrapping_add(1);
                Some(Ok(frame))
            }
            Err(e) => Some(Err(CameraError::Stream(e.to_string()))),
        }
    }
}

impl FrameSource for V4lCamera {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn describe(&self) -> String {
        format!("V4L2 camera {}", self.device_path)
    }
}

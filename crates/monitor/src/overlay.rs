//! Annotated frames
//!
//! Draws the detections, a dark status panel with the EAR gauge and its
//! threshold marker, a status strip and the blinking alarm lamp onto a copy of
//! the captured frame. Text needs a TrueType font; without one only the shapes
//! are drawn.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut,
};
use imageproc::rect::Rect as PixelRect;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use camera_capture::VideoFrame;
use dms::{Detections, DriverStatus, EyeState, FrameResult, Rect};

/// Height of the darkened panel at the top of the frame
const PANEL_HEIGHT: u32 = 140;
/// Panel keeps this share of the underlying brightness
const PANEL_BRIGHTNESS: f32 = 0.3;
/// Score drawn as a full EAR bar
const BAR_FULL_SCALE: f32 = 0.4;
const BAR_X: i32 = 100;
const BAR_Y: i32 = 77;
const BAR_WIDTH: u32 = 150;
const BAR_HEIGHT: u32 = 10;
const STATUS_STRIP_HEIGHT: u32 = 4;
/// Alarm lamp toggles this many times per second
const LAMP_RATE_HZ: u128 = 3;
const LAMP_RADIUS: i32 = 12;

pub const FACE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const BAND_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
pub const OPEN_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const CLOSED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const WARNING_COLOR: Rgb<u8> = Rgb([255, 165, 0]);
pub const MARKER_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
pub const BAR_BACKGROUND: Rgb<u8> = Rgb([100, 100, 100]);
const DIM_COLOR: Rgb<u8> = Rgb([200, 200, 200]);
const LEGEND_COLOR: Rgb<u8> = Rgb([150, 150, 150]);

/// Annotation errors
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Font error: {0}")]
    Font(String),

    #[error("Frame buffer does not match {width}x{height}")]
    Frame { width: u32, height: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Annotated frame output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotateConfig {
    /// Save annotated frames here; off when unset
    pub directory: Option<PathBuf>,
    /// TrueType font for the text lines
    pub font_path: Option<PathBuf>,
    /// Save every n-th frame
    pub every_n_frames: u64,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            directory: None,
            font_path: None,
            every_n_frames: 1,
        }
    }
}

/// Everything drawn for one frame
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub detections: &'a Detections,
    pub result: &'a FrameResult,
    pub threshold: f32,
    pub alarm_active: bool,
    pub fps: f32,
    /// `(collected, required)` while calibrating
    pub calibration: Option<(usize, usize)>,
    pub timestamp: Duration,
}

pub fn status_color(status: DriverStatus) -> Rgb<u8> {
    match status {
        DriverStatus::NoFace => DIM_COLOR,
        DriverStatus::Drowsy => CLOSED_COLOR,
        DriverStatus::EyesClosed => WARNING_COLOR,
        DriverStatus::Alert => OPEN_COLOR,
    }
}

/// Filled share of the EAR bar for `score`
pub fn bar_fraction(score: f32) -> f32 {
    (score / BAR_FULL_SCALE).clamp(0.0, 1.0)
}

/// Whether the blinking alarm lamp is lit at `timestamp`
pub fn lamp_lit(timestamp: Duration) -> bool {
    (timestamp.as_millis() * LAMP_RATE_HZ / 1000) % 2 == 0
}

fn fill(image: &mut RgbImage, x: i32, y: i32, width: u32, height: u32, color: Rgb<u8>) {
    if width > 0 && height > 0 {
        draw_filled_rect_mut(image, PixelRect::at(x, y).of_size(width, height), color);
    }
}

/// Two-pixel outline
fn outline(image: &mut RgbImage, rect: &Rect, color: Rgb<u8>) {
    for t in 0..2 {
        let width = rect.width as i32 - 2 * t;
        let height = rect.height as i32 - 2 * t;
        if width > 0 && height > 0 {
            draw_hollow_rect_mut(
                image,
                PixelRect::at(rect.x as i32 + t, rect.y as i32 + t)
                    .of_size(width as u32, height as u32),
                color,
            );
        }
    }
}

/// Frame painter
#[derive(Default)]
pub struct Overlay {
    font: Option<FontVec>,
}

impl Overlay {
    /// Shapes only
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font_file(path: &Path) -> Result<Self, OverlayError> {
        let data = std::fs::read(path)?;
        let font = FontVec::try_from_vec(data)
            .map_err(|e| OverlayError::Font(format!("{}: {}", path.display(), e)))?;
        info!("Overlay font loaded from {}", path.display());
        Ok(Self { font: Some(font) })
    }

    /// Annotated copy of `frame`
    pub fn render(&self, frame: &VideoFrame, scene: &Scene) -> Result<RgbImage, OverlayError> {
        let mut image = RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or(
            OverlayError::Frame {
                width: frame.width,
                height: frame.height,
            },
        )?;
        self.draw(&mut image, scene);
        Ok(image)
    }

    pub fn draw(&self, image: &mut RgbImage, scene: &Scene) {
        let width = image.width();
        let status = scene.result.status();
        let ear_color = if scene.result.ear > scene.threshold {
            OPEN_COLOR
        } else {
            CLOSED_COLOR
        };

        self.draw_detections(image, scene.detections, scene.result.eye_state);
        darken_panel(image);
        fill(
            image,
            0,
            (PANEL_HEIGHT - STATUS_STRIP_HEIGHT) as i32,
            width,
            STATUS_STRIP_HEIGHT,
            status_color(status),
        );
        draw_ear_bar(image, scene.result.ear, scene.threshold, ear_color);

        if scene.alarm_active && lamp_lit(scene.timestamp) {
            draw_filled_circle_mut(image, (width as i32 - 40, 30), LAMP_RADIUS, CLOSED_COLOR);
        }

        if let Some(font) = &self.font {
            draw_text_lines(image, font, scene, status, ear_color);
        }
    }

    fn draw_detections(&self, image: &mut RgbImage, detections: &Detections, state: EyeState) {
        let Some(face) = &detections.face else {
            return;
        };
        outline(image, face, FACE_COLOR);
        outline(image, &face.eye_band(), BAND_COLOR);

        let eye_color = if state == EyeState::Open {
            OPEN_COLOR
        } else {
            CLOSED_COLOR
        };
        for eye in &detections.eyes {
            outline(image, eye, eye_color);
        }
    }
}

fn darken_panel(image: &mut RgbImage) {
    for (_, y, pixel) in image.enumerate_pixels_mut() {
        if y < PANEL_HEIGHT {
            pixel.0 = pixel.0.map(|c| (c as f32 * PANEL_BRIGHTNESS) as u8);
        }
    }
}

fn draw_ear_bar(image: &mut RgbImage, ear: f32, threshold: f32, color: Rgb<u8>) {
    fill(image, BAR_X, BAR_Y, BAR_WIDTH, BAR_HEIGHT, BAR_BACKGROUND);
    let filled = (BAR_WIDTH as f32 * bar_fraction(ear)) as u32;
    fill(image, BAR_X, BAR_Y, filled, BAR_HEIGHT, color);

    let marker = BAR_X + (BAR_WIDTH as f32 * bar_fraction(threshold)) as i32;
    fill(image, marker - 1, BAR_Y, 2, BAR_HEIGHT, MARKER_COLOR);
}

fn draw_text_lines(
    image: &mut RgbImage,
    font: &FontVec,
    scene: &Scene,
    status: DriverStatus,
    ear_color: Rgb<u8>,
) {
    let (width, height) = (image.width() as i32, image.height() as i32);
    let mut text = |x: i32, y: i32, size: f32, color: Rgb<u8>, line: &str| {
        draw_text_mut(image, color, x, y, PxScale::from(size), font, line);
    };

    text(10, 10, 22.0, MARKER_COLOR, "DROWSINESS DETECTION");
    text(10, 40, 18.0, status_color(status), &format!("Status: {}", status));
    text(10, 70, 16.0, ear_color, &format!("EAR: {:.3}", scene.result.ear));
    text(
        10,
        92,
        15.0,
        DIM_COLOR,
        &format!("Eyes detected: {}", scene.result.eyes_detected),
    );
    text(
        10,
        112,
        15.0,
        DIM_COLOR,
        &format!("Blinks: {}", scene.result.blink_count),
    );

    let fps_color = if scene.fps > 20.0 {
        OPEN_COLOR
    } else if scene.fps > 10.0 {
        WARNING_COLOR
    } else {
        CLOSED_COLOR
    };
    text(width - 100, 45, 16.0, fps_color, &format!("FPS: {:.1}", scene.fps));

    if scene.alarm_active {
        text(width - 150, 20, 20.0, CLOSED_COLOR, "ALARM!");
    }
    if let Some((collected, required)) = scene.calibration {
        text(
            10,
            height - 50,
            16.0,
            WARNING_COLOR,
            &format!("Calibration: {}/{}", collected, required),
        );
    }
    text(
        10,
        height - 20,
        12.0,
        LEGEND_COLOR,
        "Green=open | Red=closed | Blue=face | Yellow=eye band",
    );
}

/// Saves annotated frames as numbered PNG files
pub struct AnnotationWriter {
    directory: PathBuf,
    overlay: Overlay,
    every_n_frames: u64,
    seen: u64,
    written: u64,
}

impl AnnotationWriter {
    /// `None` when no directory is configured
    pub fn create(config: &AnnotateConfig) -> Result<Option<Self>, OverlayError> {
        let Some(directory) = &config.directory else {
            return Ok(None);
        };
        std::fs::create_dir_all(directory)?;
        let overlay = match &config.font_path {
            Some(path) => Overlay::with_font_file(path)?,
            None => Overlay::new(),
        };
        info!("Saving annotated frames to {}", directory.display());
        Ok(Some(Self {
            directory: directory.clone(),
            overlay,
            every_n_frames: config.every_n_frames.max(1),
            seen: 0,
            written: 0,
        }))
    }

    /// Path of the saved file, `None` for skipped frames
    pub fn write(
        &mut self,
        frame: &VideoFrame,
        scene: &Scene,
    ) -> Result<Option<PathBuf>, OverlayError> {
        let index = self.seen;
        self.seen += 1;
        if index % self.every_n_frames != 0 {
            return Ok(None);
        }

        let image = self.overlay.render(frame, scene)?;
        let path = self.directory.join(format!("frame_{:06}.png", index));
        image.save(&path)?;
        self.written += 1;
        debug!("Annotated frame saved to {}", path.display());
        Ok(Some(path))
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

//! Classical face/eye localizer
//!
//! Faces come from the SeetaFace cascade (`rustface`). Eyes are the dark
//! blobs of the histogram-equalized eye band, split with Otsu's threshold
//! and labelled with connected components.

use camera_capture::VideoFrame;
use image::{GrayImage, Luma};
use imageproc::contrast::{equalize_histogram, otsu_level};
use imageproc::region_labelling::{connected_components, Connectivity};
use rustface::{Detector as _, ImageData};
use std::collections::HashMap;
use tracing::{debug, error, info};

use crate::detector::{Detections, Detector, Rect};
use crate::{DmsConfig, DmsError};

/// At most this many eyes are reported per face
const MAX_EYES: usize = 2;

/// Face detector using SeetaFace plus a blob-based eye finder
pub struct CascadeDetector {
    faces: Box<dyn rustface::Detector>,
    min_face_size: u32,
    max_face_size: u32,
}

impl CascadeDetector {
    /// Load the face model named by `config.face_model_path`
    pub fn new(config: &DmsConfig) -> Result<Self, DmsError> {
        let path = config.face_model_path.as_deref().ok_or_else(|| {
            DmsError::DetectorUnavailable("no face_model_path configured".into())
        })?;

        info!("Loading face detection model from {}", path);
        let mut faces = rustface::create_detector(path).map_err(|e| {
            error!("Failed to load face model: {}", e);
            DmsError::DetectorUnavailable(format!("{}: {}", path, e))
        })?;
        faces.set_min_face_size(config.min_face_size);
        faces.set_score_thresh(2.0);
        faces.set_pyramid_scale_factor(0.8);
        faces.set_slide_window_step(4, 4);

        Ok(Self {
            faces,
            min_face_size: config.min_face_size,
            max_face_size: config.max_face_size,
        })
    }

    fn detect_faces(&mut self, gray: &GrayImage) -> Vec<Rect> {
        let (width, height) = gray.dimensions();
        let image = ImageData::new(gray.as_raw(), width, height);
        let range = self.min_face_size as f32..=self.max_face_size as f32;

        self.faces
            .detect(&image)
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                Rect::new(
                    bbox.x() as f32,
                    bbox.y() as f32,
                    bbox.width() as f32,
                    bbox.height() as f32,
                )
            })
            .filter(|r| range.contains(&r.width) && range.contains(&r.height))
            .collect()
    }
}

impl Detector for CascadeDetector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Detections, DmsError> {
        let gray = frame
            .to_gray_image()
            .ok_or_else(|| DmsError::ImageProcessing("Failed to create image buffer".into()))?;

        let faces = self.detect_faces(&gray);
        let Some(face) = crate::detector::largest(&faces) else {
            return Ok(Detections::no_face());
        };

        let band = face.eye_band();
        let (img_w, img_h) = gray.dimensions();
        let x0 = band.x.max(0.0) as u32;
        let y0 = band.y.max(0.0) as u32;
        let x1 = ((band.x + band.width).max(0.0) as u32).min(img_w);
        let y1 = ((band.y + band.height).max(0.0) as u32).min(img_h);
        if x1 <= x0 || y1 <= y0 {
            return Ok(Detections::face_only(face));
        }

        let roi = image::imageops::crop_imm(&gray, x0, y0, x1 - x0, y1 - y0).to_image();
        let eyes = locate_eyes(&roi)
            .into_iter()
            .map(|e| Rect::new(e.x + x0 as f32, e.y + y0 as f32, e.width, e.height))
            .collect::<Vec<_>>();
        debug!("Face {:?}: {} eye candidates", face, eyes.len());

        Ok(Detections::from_candidates(&[face], eyes))
    }
}

/// Find eye boxes inside an eye-band crop, in crop coordinates.
///
/// Size bounds follow the usual cascade window for a band of height `h`:
/// width at least `max(15, h/12)`, height at most `min(80, h/4)`.
pub fn locate_eyes(band: &GrayImage) -> Vec<Rect> {
    let (width, height) = band.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let min_eye = (height / 12).max(15) as f32;
    let max_eye = (height / 4).min(80) as f32;

    let equalized = equalize_histogram(band);
    let level = otsu_level(&equalized);
    let mask = GrayImage::from_fn(width, height, |x, y| {
        if equalized.get_pixel(x, y).0[0] <= level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });

    let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));
    let mut boxes: HashMap<u32, (u32, u32, u32, u32)> = HashMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let id = label.0[0];
        if id == 0 {
            continue;
        }
        let b = boxes.entry(id).or_insert((x, y, x, y));
        b.0 = b.0.min(x);
        b.1 = b.1.min(y);
        b.2 = b.2.max(x);
        b.3 = b.3.max(y);
    }

    let mut eyes: Vec<Rect> = boxes
        .values()
        .map(|&(x0, y0, x1, y1)| {
            Rect::new(
                x0 as f32,
                y0 as f32,
                (x1 - x0 + 1) as f32,
                (y1 - y0 + 1) as f32,
            )
        })
        .filter(|r| r.width >= min_eye && r.height <= max_eye && r.has_eye_aspect())
        .collect();

    eyes.sort_by(|a, b| b.area().total_cmp(&a.area()));
    eyes.truncate(MAX_EYES);
    eyes.sort_by(|a, b| a.x.total_cmp(&b.x));
    eyes
}

//! Per-user baseline calibration

use tracing::info;

/// Collects the first scores of a session and rescales later ones so the
/// user's own open-eye level lands on the reference operating point.
#[derive(Debug, Clone)]
pub struct Calibrator {
    required: usize,
    reference: f32,
    samples: Vec<f32>,
    baseline: Option<f32>,
}

impl Calibrator {
    pub fn new(required: usize, reference: f32) -> Self {
        Self {
            required: required.max(1),
            reference,
            samples: Vec::with_capacity(required.max(1)),
            baseline: None,
        }
    }

    /// Record a raw score (while calibrating) and return the calibrated one.
    ///
    /// The rescaled value is not clamped back into the score range.
    pub fn ingest(&mut self, raw: f32) -> f32 {
        if self.baseline.is_none() {
            self.samples.push(raw);
            if self.samples.len() >= self.required {
                let baseline = median(&self.samples);
                self.baseline = Some(baseline);
                info!("Calibration complete. Reference EAR: {:.3}", baseline);
            }
        }

        match self.baseline {
            Some(baseline) => raw * (baseline / self.reference),
            None => raw,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn baseline(&self) -> Option<f32> {
        self.baseline
    }

    /// (collected, required)
    pub fn progress(&self) -> (usize, usize) {
        (self.samples.len(), self.required)
    }
}

/// Median; mean of the two middle values for even lengths
fn median(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.is_empty() {
        0.0
    } else if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

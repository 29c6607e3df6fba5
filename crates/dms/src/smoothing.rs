//! Moving-average smoothing of the openness signal

use std::collections::VecDeque;

/// Mean over the most recent `capacity` scores
#[derive(Debug, Clone)]
pub struct Smoother {
    window: VecDeque<f32>,
    capacity: usize,
}

impl Smoother {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a score, evicting the oldest beyond capacity, and return the mean
    pub fn push(&mut self, score: f32) -> f32 {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(score);
        self.mean().unwrap_or(score)
    }

    pub fn mean(&self) -> Option<f32> {
        if self.window.is_empty() {
            return None;
        }
        Some(self.window.iter().sum::<f32>() / self.window.len() as f32)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

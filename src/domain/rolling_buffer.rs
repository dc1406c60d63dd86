// Rolling window buffer backing each live chart
use serde::Serialize;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("expected {expected} values per sample, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
}

/// Ordered view of a buffer's current window, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSnapshot {
    pub labels: Vec<String>,
    pub series: Vec<Vec<f64>>,
}

/// Keeps the most recent `capacity` samples of one or more parallel series,
/// plus one label per sample. All tracks always have the same length.
#[derive(Debug, Clone)]
pub struct RollingSeriesBuffer {
    capacity: usize,
    labels: VecDeque<String>,
    series: Vec<VecDeque<f64>>,
}

impl RollingSeriesBuffer {
    /// Storage grows with the samples actually appended, so `capacity` is
    /// only an upper bound and may be arbitrarily large.
    pub fn new(series_count: usize, capacity: usize) -> Self {
        Self {
            capacity,
            labels: VecDeque::new(),
            series: (0..series_count).map(|_| VecDeque::new()).collect(),
        }
    }

    /// Append one sample per series under `label`, evicting the oldest
    /// sample once the window is full.
    pub fn append(&mut self, values: &[f64], label: impl Into<String>) -> Result<(), BufferError> {
        if values.len() != self.series.len() {
            return Err(BufferError::ArityMismatch {
                expected: self.series.len(),
                actual: values.len(),
            });
        }

        self.labels.push_back(label.into());
        for (track, &value) in self.series.iter_mut().zip(values) {
            track.push_back(value);
        }

        if self.labels.len() > self.capacity {
            self.labels.pop_front();
            for track in &mut self.series {
                track.pop_front();
            }
        }

        Ok(())
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        SeriesSnapshot {
            labels: self.labels.iter().cloned().collect(),
            series: self
                .series
                .iter()
                .map(|track| track.iter().copied().collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

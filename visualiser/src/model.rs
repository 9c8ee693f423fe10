use crate::analyze::workload_stats;
use crate::error::{SampleError, VisualiseError};
use itertools::Itertools;
use polars::prelude::{NamedFrom, Series};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WorkloadStats {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Quantile {
    /// Level in percent, within `[0, 100]`
    pub level: f64,
    pub value: f64,
}

/// Quantile levels in percent, sorted ascending
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileLevels(Vec<f64>);

impl QuantileLevels {
    pub fn try_new(mut levels: Vec<f64>) -> Result<Self, VisualiseError> {
        if let Some(&invalid) = levels
            .iter()
            .find(|level| !(0.0..=100.0).contains(*level))
        {
            return Err(VisualiseError::InvalidQuantile(invalid));
        }
        levels.sort_by(f64::total_cmp);
        levels.dedup();
        Ok(Self(levels))
    }

    pub fn levels(&self) -> &[f64] {
        &self.0
    }
}

impl Default for QuantileLevels {
    fn default() -> Self {
        Self(vec![0.0, 25.0, 50.0, 75.0, 100.0])
    }
}

/// The per-worker workloads of one iteration
///
/// Workers are ordered by their id, so two samples of the same simulation line up element by
/// element. The statistics are computed once, when the sample is built.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadSample {
    worker_ids: Vec<i64>,
    values: Vec<f64>,
    stats: WorkloadStats,
}

impl WorkloadSample {
    pub fn new(worker_ids: Vec<i64>, values: Vec<f64>) -> Result<Self, SampleError> {
        if worker_ids.len() != values.len() {
            return Err(SampleError::LengthMismatch {
                ids: worker_ids.len(),
                values: values.len(),
            });
        }

        if let Some(&value) = values.iter().find(|v| !v.is_finite()) {
            return Err(SampleError::NonFinite(value));
        }

        let series = Series::new("workload".into(), values.as_slice());
        let stats = workload_stats(&series)?.ok_or(SampleError::Empty)?;

        Ok(Self {
            worker_ids,
            values,
            stats,
        })
    }

    /// Build a sample with worker ids `0..values.len()`
    pub fn from_values(values: Vec<f64>) -> Result<Self, SampleError> {
        let worker_ids = (0..values.len() as i64).collect();
        Self::new(worker_ids, values)
    }

    pub fn worker_ids(&self) -> &[i64] {
        &self.worker_ids
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn stats(&self) -> &WorkloadStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sorted_values(&self) -> Vec<f64> {
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        sorted
    }

    /// Element-wise `self - previous`
    ///
    /// `iteration` is the iteration of `self` and is only used for error reporting. Both samples
    /// must list the same workers.
    pub fn deltas_from(
        &self,
        previous: &WorkloadSample,
        iteration: usize,
    ) -> Result<Vec<f64>, VisualiseError> {
        if self.len() != previous.len() {
            return Err(VisualiseError::WorkerCountMismatch {
                iteration,
                expected: previous.len(),
                actual: self.len(),
            });
        }
        if self.worker_ids != previous.worker_ids {
            return Err(VisualiseError::WorkerIdMismatch { iteration });
        }

        Ok(self
            .values
            .iter()
            .zip(&previous.values)
            .map(|(current, previous)| current - previous)
            .collect())
    }
}

/// A workload sample together with the iteration it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct IterationWorkloads {
    pub iteration: usize,
    pub sample: WorkloadSample,
}

/// Bounds over all iterations of a simulation
///
/// Per-iteration plots share these bounds so that their axes stay comparable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GlobalData {
    pub min_workload: f64,
    pub max_workload: f64,
    /// Largest absolute change of a single worker between two consecutive iterations
    pub max_abs_delta: f64,
}

impl GlobalData {
    pub fn from_samples(samples: &[IterationWorkloads]) -> Result<Self, VisualiseError> {
        if samples.is_empty() {
            return Err(VisualiseError::NoIterationLoaded);
        }

        let min_workload = samples
            .iter()
            .map(|s| s.sample.stats().min)
            .fold(f64::INFINITY, f64::min);
        let max_workload = samples
            .iter()
            .map(|s| s.sample.stats().max)
            .fold(f64::NEG_INFINITY, f64::max);

        let mut max_abs_delta = 0.0f64;
        for (previous, current) in samples.iter().tuple_windows() {
            let deltas = current
                .sample
                .deltas_from(&previous.sample, current.iteration)?;
            max_abs_delta = deltas.iter().map(|d| d.abs()).fold(max_abs_delta, f64::max);
        }

        Ok(Self {
            min_workload,
            max_workload,
            max_abs_delta,
        })
    }
}

/// Statistics of one iteration, as written to the run report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationReport {
    pub iteration: usize,
    pub workers: usize,
    pub workloads: WorkloadStats,
    pub quantiles: Vec<Quantile>,
    /// Only present from the second loaded iteration on
    pub delta_quantiles: Option<Vec<Quantile>>,
}

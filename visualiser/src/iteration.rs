use crate::analyze::quantiles;
use crate::error::VisualiseError;
use crate::frame::{load_sample, WorkloadsFormat};
use crate::model::{GlobalData, IterationReport, Quantile, QuantileLevels, WorkloadSample};
use balancer_simulation_model::SimulationConfig;

/// Tracks the workloads of the current iteration and of the one before.
///
/// Starts empty. Every [IterationState::advance] reads the next iteration from disk and shifts the
/// current sample into the previous slot.
#[derive(Debug, Clone)]
pub struct IterationState {
    global: GlobalData,
    format: WorkloadsFormat,
    quantile_levels: QuantileLevels,
    iteration: Option<usize>,
    current: Option<WorkloadSample>,
    previous: Option<WorkloadSample>,
}

impl IterationState {
    pub fn new(
        global: GlobalData,
        format: WorkloadsFormat,
        quantile_levels: QuantileLevels,
    ) -> Self {
        Self {
            global,
            format,
            quantile_levels,
            iteration: None,
            current: None,
            previous: None,
        }
    }

    /// Load the next iteration and return its index.
    ///
    /// The first call loads [SimulationConfig::iteration_0]. On error the state is left as it was.
    pub fn advance(&mut self, sim: &SimulationConfig) -> Result<usize, VisualiseError> {
        let next = match self.iteration {
            None => sim.iteration_0(),
            Some(iteration) if sim.is_last_iteration(iteration) => {
                return Err(VisualiseError::IterationsExhausted {
                    num_iter: sim.num_iter(),
                });
            }
            Some(iteration) => iteration + 1,
        };

        let sample = load_sample(sim, &self.format, next)?;
        if let Some(current) = &self.current {
            if current.len() != sample.len() {
                return Err(VisualiseError::WorkerCountMismatch {
                    iteration: next,
                    expected: current.len(),
                    actual: sample.len(),
                });
            }
        }

        self.previous = self.current.replace(sample);
        self.iteration = Some(next);

        Ok(next)
    }

    /// The iteration loaded last, if any
    pub fn iteration(&self) -> Option<usize> {
        self.iteration
    }

    pub fn global(&self) -> &GlobalData {
        &self.global
    }

    pub fn quantile_levels(&self) -> &QuantileLevels {
        &self.quantile_levels
    }

    pub fn current(&self) -> Result<&WorkloadSample, VisualiseError> {
        self.current.as_ref().ok_or(VisualiseError::NoIterationLoaded)
    }

    pub fn previous(&self) -> Option<&WorkloadSample> {
        self.previous.as_ref()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    /// Element-wise difference between the current and the previous iteration
    pub fn deltas(&self) -> Result<Vec<f64>, VisualiseError> {
        let current = self.current()?;
        let iteration = self.iteration.unwrap_or_default();
        let previous = self
            .previous
            .as_ref()
            .ok_or(VisualiseError::NoPreviousIteration { iteration })?;

        current.deltas_from(previous, iteration)
    }

    pub fn sorted_workloads(&self) -> Result<Vec<f64>, VisualiseError> {
        Ok(self.current()?.sorted_values())
    }

    pub fn sorted_deltas(&self) -> Result<Vec<f64>, VisualiseError> {
        let mut deltas = self.deltas()?;
        deltas.sort_by(f64::total_cmp);
        Ok(deltas)
    }

    pub fn workload_quantiles(&self) -> Result<Vec<Quantile>, VisualiseError> {
        Ok(quantiles(self.current()?.values(), &self.quantile_levels))
    }

    pub fn delta_quantiles(&self) -> Result<Vec<Quantile>, VisualiseError> {
        Ok(quantiles(&self.deltas()?, &self.quantile_levels))
    }

    /// Summary of the current iteration
    pub fn report(&self) -> Result<IterationReport, VisualiseError> {
        let current = self.current()?;
        let delta_quantiles = if self.has_previous() {
            Some(self.delta_quantiles()?)
        } else {
            None
        };

        Ok(IterationReport {
            iteration: self.iteration.unwrap_or_default(),
            workers: current.len(),
            workloads: *current.stats(),
            quantiles: self.workload_quantiles()?,
            delta_quantiles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write_iteration(results_dir: &Path, iteration: usize, values: &[f64]) {
        let dir = results_dir.join(iteration.to_string()).join("stats");
        fs::create_dir_all(&dir).unwrap();
        let mut content = String::from("edge-id new_metric\n");
        for (id, value) in values.iter().enumerate() {
            content.push_str(&format!("{id} {value}\n"));
        }
        fs::write(dir.join("new_metrics.csv"), content).unwrap();
    }

    fn state() -> IterationState {
        let global = GlobalData {
            min_workload: 0.0,
            max_workload: 10.0,
            max_abs_delta: 5.0,
        };
        IterationState::new(global, WorkloadsFormat::default(), QuantileLevels::default())
    }

    #[test]
    fn advance_shifts_current_into_previous() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_iteration(dir.path(), 0, &[1.0, 2.0, 3.0, 4.0]);
        write_iteration(dir.path(), 1, &[2.0, 2.0, 1.0, 7.0]);
        let sim = SimulationConfig::new(dir.path(), 2, 0)?;

        let mut state = state();
        assert!(state.current().is_err());

        assert_eq!(state.advance(&sim)?, 0);
        assert!(!state.has_previous());
        assert_eq!(state.current()?.stats().mean, 2.5);
        assert!(matches!(
            state.deltas(),
            Err(VisualiseError::NoPreviousIteration { iteration: 0 })
        ));

        assert_eq!(state.advance(&sim)?, 1);
        assert_eq!(state.previous().map(|p| p.values().to_vec()), Some(vec![1.0, 2.0, 3.0, 4.0]));
        assert_eq!(state.deltas()?, vec![1.0, 0.0, -2.0, 3.0]);
        assert_eq!(state.sorted_deltas()?, vec![-2.0, 0.0, 1.0, 3.0]);
        Ok(())
    }

    #[test]
    fn advance_starts_at_iteration_0() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_iteration(dir.path(), 3, &[1.0]);
        write_iteration(dir.path(), 4, &[2.0]);
        let sim = SimulationConfig::new(dir.path(), 2, 3)?;

        let mut state = state();
        assert_eq!(state.advance(&sim)?, 3);
        assert_eq!(state.advance(&sim)?, 4);
        assert!(matches!(
            state.advance(&sim),
            Err(VisualiseError::IterationsExhausted { num_iter: 2 })
        ));
        assert_eq!(state.iteration(), Some(4));
        Ok(())
    }

    #[test]
    fn missing_iteration_is_a_load_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_iteration(dir.path(), 0, &[1.0]);
        let sim = SimulationConfig::new(dir.path(), 2, 0)?;

        let mut state = state();
        state.advance(&sim)?;
        assert!(matches!(state.advance(&sim), Err(VisualiseError::DataLoad(_))));
        // the failed advance must not move the state
        assert_eq!(state.iteration(), Some(0));
        assert!(!state.has_previous());
        Ok(())
    }

    #[test]
    fn worker_count_must_not_change() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_iteration(dir.path(), 0, &[1.0, 2.0]);
        write_iteration(dir.path(), 1, &[1.0, 2.0, 3.0]);
        let sim = SimulationConfig::new(dir.path(), 2, 0)?;

        let mut state = state();
        state.advance(&sim)?;
        assert!(matches!(
            state.advance(&sim),
            Err(VisualiseError::WorkerCountMismatch {
                iteration: 1,
                expected: 2,
                actual: 3
            })
        ));
        Ok(())
    }

    #[test]
    fn report_of_second_iteration_has_delta_quantiles() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_iteration(dir.path(), 0, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        write_iteration(dir.path(), 1, &[1.0, 3.0, 5.0, 7.0, 9.0]);
        let sim = SimulationConfig::new(dir.path(), 2, 0)?;

        let mut state = state();
        state.advance(&sim)?;
        let first = state.report()?;
        assert_eq!(first.workers, 5);
        assert!(first.delta_quantiles.is_none());

        state.advance(&sim)?;
        let second = state.report()?;
        assert_eq!(second.iteration, 1);
        let deltas = second
            .delta_quantiles
            .expect("delta quantiles")
            .into_iter()
            .map(|q| q.value)
            .collect::<Vec<_>>();
        assert_eq!(deltas, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        Ok(())
    }
}

use crate::error::VisualiseError;
use crate::iteration::IterationState;
use crate::model::IterationWorkloads;
use balancer_simulation_model::SimulationConfig;

mod machine;

pub use machine::PlotMachine;

/// The plots drawn for a simulation
///
/// The overview plots get the samples of all iterations at once. The per-iteration plots read the
/// current state of the [IterationState] that the driver advances.
pub trait Visualiser {
    /// Sorted workloads of every iteration in one figure
    fn plot_all_sorted_workloads(
        &mut self,
        sim: &SimulationConfig,
        samples: &[IterationWorkloads],
    ) -> Result<(), VisualiseError>;

    /// One boxplot per iteration in one figure
    fn plot_all_boxplot_workloads(
        &mut self,
        sim: &SimulationConfig,
        samples: &[IterationWorkloads],
    ) -> Result<(), VisualiseError>;

    fn plot_workloads(
        &mut self,
        sim: &SimulationConfig,
        state: &IterationState,
    ) -> Result<(), VisualiseError>;

    fn plot_workload_quantiles(
        &mut self,
        sim: &SimulationConfig,
        state: &IterationState,
    ) -> Result<(), VisualiseError>;

    /// Fails with [VisualiseError::NoPreviousIteration] on the first iteration
    fn plot_delta_workloads(
        &mut self,
        sim: &SimulationConfig,
        state: &IterationState,
    ) -> Result<(), VisualiseError>;

    /// Fails with [VisualiseError::NoPreviousIteration] on the first iteration
    fn plot_delta_workload_quantiles(
        &mut self,
        sim: &SimulationConfig,
        state: &IterationState,
    ) -> Result<(), VisualiseError>;

    fn plot_workload_histogram(
        &mut self,
        sim: &SimulationConfig,
        state: &IterationState,
    ) -> Result<(), VisualiseError>;
}

/// Settings of the rendered images
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSettings {
    /// Width and height in pixels
    pub size: (u32, u32),
    pub histogram_bins: usize,
    pub font_size: u32,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            size: (1200, 700),
            histogram_bins: 40,
            font_size: 20,
        }
    }
}

impl PlotSettings {
    /// Builds [`PlotSettings`] with the specified image size.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    /// Builds [`PlotSettings`] with the specified number of histogram bins.
    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = bins;
        self
    }
}

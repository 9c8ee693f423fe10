use crate::error::VisualiseError;
use crate::frame::{load_all_samples, WorkloadsFormat};
use crate::iteration::IterationState;
use crate::model::{GlobalData, IterationReport, QuantileLevels};
use crate::plotting::Visualiser;
use balancer_simulation_model::SimulationConfig;

mod analyze;
pub mod error;
pub mod frame;
pub mod iteration;
pub mod model;
pub mod plotting;

/// Draw every plot for the simulation and return the statistics of each iteration.
///
/// First the overview plots are drawn from all iterations at once. Then the iterations are
/// advanced one by one; delta plots are only drawn once a previous iteration exists. The first
/// error aborts the run.
pub fn run<V: Visualiser>(
    sim: &SimulationConfig,
    format: &WorkloadsFormat,
    quantile_levels: QuantileLevels,
    vis: &mut V,
) -> Result<Vec<IterationReport>, VisualiseError> {
    log::info!("Get global data, e.g. maximum workload");
    let samples = load_all_samples(sim, format)?;
    let global_data = GlobalData::from_samples(&samples)?;
    log::debug!("Global data: {global_data:?}");

    log::info!("Plot all sorted workloads");
    vis.plot_all_sorted_workloads(sim, &samples)?;
    log::info!("Plot all boxplots");
    vis.plot_all_boxplot_workloads(sim, &samples)?;
    drop(samples);

    let mut state = IterationState::new(global_data, format.clone(), quantile_levels);
    let mut reports = Vec::with_capacity(sim.num_iter());
    loop {
        let iteration = state.advance(sim)?;
        log::info!(
            "Prepared iteration {iteration} of {}..={}",
            sim.iteration_0(),
            sim.iteration_max()
        );

        let stats = state.current()?.stats();
        log::info!("mean={}", stats.mean);
        log::info!(" std={}", stats.std);
        log::info!(" min={}", stats.min);
        log::info!(" max={}", stats.max);

        log::info!("Plot workloads");
        vis.plot_workloads(sim, &state)?;
        log::info!("Plot workload-quantiles");
        vis.plot_workload_quantiles(sim, &state)?;
        if state.has_previous() {
            log::info!("Plot delta-workloads");
            vis.plot_delta_workloads(sim, &state)?;
            log::info!("Plot delta-workload-quantiles");
            vis.plot_delta_workload_quantiles(sim, &state)?;
        }
        log::info!("Plot workloads as histogram");
        vis.plot_workload_histogram(sim, &state)?;

        reports.push(state.report()?);

        if sim.is_last_iteration(iteration) {
            break;
        }
    }

    log::info!("Finished {} iterations", reports.len());
    Ok(reports)
}

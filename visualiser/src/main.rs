use anyhow::Context;
use balancer_visualiser::frame::WorkloadsFormat;
use balancer_visualiser::model::QuantileLevels;
use balancer_visualiser::plotting::{PlotMachine, PlotSettings};
use clap::Parser as _;
use std::fs::File;

mod cli;

const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = cli::CliArgs::parse();
    log::info!("{CRATE_NAME} {CRATE_VERSION}");

    let sim = args.simulation_config()?;
    log::info!(
        "Visualising iterations {}..={} from {}",
        sim.iteration_0(),
        sim.iteration_max(),
        sim.results_dir().display()
    );

    let format = WorkloadsFormat::default().file(&args.workloads_file);
    let quantile_levels = QuantileLevels::try_new(args.quantiles.clone())?;

    let out_dir = args.out_dir(&sim);
    let settings = PlotSettings::default().histogram_bins(args.bins as usize);
    let mut machine = PlotMachine::new(&out_dir, settings)
        .with_context(|| format!("Creating plot directory {}", out_dir.display()))?;

    let reports = balancer_visualiser::run(&sim, &format, quantile_levels, &mut machine)
        .context("Visualising simulation")?;

    if let Some(path) = &args.report {
        let report = File::create(path)
            .with_context(|| format!("Creating report file {}", path.display()))?;
        serde_json::to_writer_pretty(report, &reports)?;
        log::info!("Wrote report to {}", path.display());
    }

    log::info!("Plots written to {}", out_dir.display());

    Ok(())
}

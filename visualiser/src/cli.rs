use std::path::PathBuf;

use anyhow::Context;
use balancer_simulation_model::SimulationConfig;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct CliArgs {
    /// Directory the balancer wrote its results to.
    ///
    /// Takes precedence over the results directory named in `--balancing-config`.
    #[arg(long, env = "BALANCER_RESULTS_DIR")]
    pub results_dir: Option<PathBuf>,

    /// Number of iterations to visualise.
    ///
    /// Takes precedence over the iteration count named in `--balancing-config`.
    #[arg(long)]
    pub num_iter: Option<usize>,

    /// First iteration to visualise.
    #[arg(long, default_value_t = 0)]
    pub iteration_0: usize,

    /// Path to the balancing config (yaml) the simulation was run with.
    #[arg(long)]
    pub balancing_config: Option<PathBuf>,

    /// Directory to write the plots to. Defaults to `<results-dir>/plots`.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Path of the workload file, relative to the directory of each iteration.
    #[arg(long, default_value = "stats/new_metrics.csv")]
    pub workloads_file: PathBuf,

    /// Quantile level in percent. Can be given multiple times.
    #[arg(long = "quantile", default_values_t = [0.0, 25.0, 50.0, 75.0, 100.0])]
    pub quantiles: Vec<f64>,

    /// Number of bins of the workload histograms.
    #[arg(long, default_value_t = 40, value_parser = clap::value_parser!(u32).range(1..))]
    pub bins: u32,

    /// Write the statistics of every iteration as JSON to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the simulation from the flags, falling back to the balancing config.
    pub fn simulation_config(&self) -> anyhow::Result<SimulationConfig> {
        let from_yaml = self
            .balancing_config
            .as_ref()
            .map(|path| {
                SimulationConfig::try_from_yaml(path, self.iteration_0)
                    .with_context(|| format!("Loading balancing config {}", path.display()))
            })
            .transpose()?;

        let results_dir = self
            .results_dir
            .clone()
            .or_else(|| from_yaml.as_ref().map(|sim| sim.results_dir().to_path_buf()))
            .context("Either `--results-dir` or `--balancing-config` is required")?;
        let num_iter = self
            .num_iter
            .or_else(|| from_yaml.as_ref().map(|sim| sim.num_iter()))
            .context("Either `--num-iter` or `--balancing-config` is required")?;

        Ok(SimulationConfig::new(
            results_dir,
            num_iter,
            self.iteration_0,
        )?)
    }

    /// The plot directory, `<results-dir>/plots` unless given explicitly
    pub fn out_dir(&self, sim: &SimulationConfig) -> PathBuf {
        self.out_dir
            .clone()
            .unwrap_or_else(|| sim.results_dir().join("plots"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    #[test]
    fn flags_only() -> anyhow::Result<()> {
        let args = CliArgs::try_parse_from([
            "balancer-visualiser",
            "--results-dir",
            "custom/results",
            "--num-iter",
            "3",
            "--iteration-0",
            "2",
        ])?;
        let sim = args.simulation_config()?;
        assert_eq!(sim.results_dir(), Path::new("custom/results"));
        assert_eq!(sim.iteration_0(), 2);
        assert_eq!(sim.iteration_max(), 4);
        assert_eq!(args.out_dir(&sim), PathBuf::from("custom/results/plots"));
        assert_eq!(args.quantiles, vec![0.0, 25.0, 50.0, 75.0, 100.0]);
        assert_eq!(args.bins, 40);
        Ok(())
    }

    #[test]
    fn balancing_config_fills_missing_flags() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(
            file,
            "balancing:\n  results-dir: 'from/yaml'\n  number_of_iterations: 4"
        )?;

        let path = file.path().to_string_lossy().to_string();
        let args = CliArgs::try_parse_from([
            "balancer-visualiser",
            "--balancing-config",
            path.as_str(),
            "--num-iter",
            "2",
        ])?;
        let sim = args.simulation_config()?;
        assert_eq!(sim.num_iter(), 2);
        assert_eq!(sim.iteration_max(), 1);
        Ok(())
    }

    #[test]
    fn zero_iterations_are_rejected() -> anyhow::Result<()> {
        let args = CliArgs::try_parse_from([
            "balancer-visualiser",
            "--results-dir",
            "out",
            "--num-iter",
            "0",
        ])?;
        assert!(args.simulation_config().is_err());
        Ok(())
    }

    #[test]
    fn repeated_quantiles_and_zero_bins() {
        let args = CliArgs::try_parse_from([
            "balancer-visualiser",
            "--quantile",
            "10",
            "--quantile",
            "90",
        ])
        .unwrap();
        assert_eq!(args.quantiles, vec![10.0, 90.0]);

        let result = CliArgs::try_parse_from(["balancer-visualiser", "--bins", "0"]);
        assert!(result.is_err());
    }
}

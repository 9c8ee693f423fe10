use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Description of a finished balancer simulation
///
/// Points at the directory the simulator wrote its results to and names the iterations that should
/// be read from it. The value is immutable once constructed; every constructor validates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    results_dir: PathBuf,
    iteration_0: usize,
    num_iter: usize,
}

impl SimulationConfig {
    /// Create a new simulation config
    ///
    /// Fails if `num_iter` is zero or if the last iteration index would not fit into a `usize`.
    pub fn new(
        results_dir: impl Into<PathBuf>,
        num_iter: usize,
        iteration_0: usize,
    ) -> Result<Self, SimulationConfigError> {
        if num_iter == 0 {
            return Err(SimulationConfigError::NoIterations);
        }
        if iteration_0.checked_add(num_iter - 1).is_none() {
            return Err(SimulationConfigError::IterationOverflow {
                iteration_0,
                num_iter,
            });
        }

        Ok(Self {
            results_dir: results_dir.into(),
            iteration_0,
            num_iter,
        })
    }

    /// Build a config from the balancing config the simulator was run with
    ///
    /// Only `balancing.results-dir` and `balancing.number_of_iterations` are read. Other keys, and
    /// other top-level sections such as the parsing or routing config, are ignored.
    pub fn from_yaml_str(yaml: &str, iteration_0: usize) -> Result<Self, SimulationConfigError> {
        let raw: RawConfig = serde_yaml::from_str(yaml)?;
        Self::new(
            raw.balancing.results_dir,
            raw.balancing.number_of_iterations,
            iteration_0,
        )
    }

    /// Read a balancing config file, see [SimulationConfig::from_yaml_str]
    pub fn try_from_yaml<P: AsRef<Path>>(
        path: P,
        iteration_0: usize,
    ) -> Result<Self, SimulationConfigError> {
        let path = path.as_ref();
        log::debug!("Reading balancing config from {}", path.display());

        let yaml = std::fs::read_to_string(path).map_err(|source| SimulationConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml, iteration_0)
    }

    /// The directory the simulator wrote its results to
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// The first iteration to read
    pub fn iteration_0(&self) -> usize {
        self.iteration_0
    }

    /// The number of iterations to read
    pub fn num_iter(&self) -> usize {
        self.num_iter
    }

    /// The last iteration to read, inclusive
    pub fn iteration_max(&self) -> usize {
        self.iteration_0 + self.num_iter - 1
    }

    /// Whether `iteration` is the last one to read
    pub fn is_last_iteration(&self, iteration: usize) -> bool {
        iteration == self.iteration_max()
    }

    /// All iterations to read, in order
    pub fn iterations(&self) -> RangeInclusive<usize> {
        self.iteration_0..=self.iteration_max()
    }

    /// The directory holding the results of a single iteration
    pub fn iteration_dir(&self, iteration: usize) -> PathBuf {
        self.results_dir.join(iteration.to_string())
    }
}

/// Error type for building a [SimulationConfig]
#[derive(Debug, thiserror::Error)]
pub enum SimulationConfigError {
    #[error("A simulation needs at least one iteration")]
    NoIterations,
    #[error("Iteration range starting at {iteration_0} with {num_iter} iterations overflows")]
    IterationOverflow { iteration_0: usize, num_iter: usize },
    #[error("Could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid balancing config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Unknown fields are allowed so that one yaml file can hold several configs.
#[derive(Debug, Deserialize)]
struct RawConfig {
    balancing: RawBalancing,
}

#[derive(Debug, Deserialize)]
struct RawBalancing {
    #[serde(rename = "results-dir")]
    results_dir: PathBuf,
    number_of_iterations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn iteration_range_matches_num_iter() {
        for (iteration_0, num_iter) in [(0, 1), (0, 3), (5, 1), (7, 10)] {
            let sim = SimulationConfig::new("results", num_iter, iteration_0).unwrap();
            assert_eq!(sim.iteration_max() - sim.iteration_0() + 1, num_iter);
            assert_eq!(sim.iterations().count(), num_iter);
        }
    }

    #[test]
    fn exactly_one_last_iteration() {
        let sim = SimulationConfig::new("results", 4, 2).unwrap();
        let last = sim
            .iterations()
            .filter(|&i| sim.is_last_iteration(i))
            .collect::<Vec<_>>();
        assert_eq!(last, vec![5]);
        assert!(!sim.is_last_iteration(6));
    }

    #[test]
    fn single_iteration_is_last() {
        let sim = SimulationConfig::new("results", 1, 0).unwrap();
        assert_eq!(sim.iteration_max(), 0);
        assert!(sim.is_last_iteration(0));
    }

    #[test]
    fn reject_zero_iterations() {
        let result = SimulationConfig::new("results", 0, 0);
        assert!(matches!(result, Err(SimulationConfigError::NoIterations)));
    }

    #[test]
    fn reject_overflowing_range() {
        let result = SimulationConfig::new("results", 2, usize::MAX);
        assert!(matches!(
            result,
            Err(SimulationConfigError::IterationOverflow { .. })
        ));
    }

    #[test]
    fn iteration_dir_is_below_results_dir() {
        let sim = SimulationConfig::new("custom/results", 3, 0).unwrap();
        assert_eq!(sim.iteration_dir(2), PathBuf::from("custom/results/2"));
    }

    #[test]
    fn parse_balancing_section() {
        let yaml = r#"
parsing:
  map-file: 'resources/maps/simple_stuttgart.fmi'
balancing:
  results-dir: 'custom/results/isle_of_man'
  iter-0-cfg: 'resources/configs/isle-of-man.iter-0.yaml'
  number_of_iterations: 5
  explicit_euler:
    correction: 0.5
"#;
        let sim = SimulationConfig::from_yaml_str(yaml, 1).unwrap();
        assert_eq!(sim.results_dir(), Path::new("custom/results/isle_of_man"));
        assert_eq!(sim.num_iter(), 5);
        assert_eq!(sim.iteration_0(), 1);
        assert_eq!(sim.iteration_max(), 5);
    }

    #[test]
    fn missing_balancing_section_is_an_error() {
        let result = SimulationConfig::from_yaml_str("parsing:\n  map-file: 'a.fmi'\n", 0);
        assert!(matches!(result, Err(SimulationConfigError::Yaml(_))));
    }

    #[test]
    fn zero_iterations_in_yaml_is_an_error() {
        let yaml = "balancing:\n  results-dir: 'out'\n  number_of_iterations: 0\n";
        let result = SimulationConfig::from_yaml_str(yaml, 0);
        assert!(matches!(result, Err(SimulationConfigError::NoIterations)));
    }

    #[test]
    fn read_yaml_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "balancing:\n  results-dir: 'out'\n  number_of_iterations: 2"
        )
        .unwrap();

        let sim = SimulationConfig::try_from_yaml(file.path(), 0).unwrap();
        assert_eq!(sim.results_dir(), Path::new("out"));
        assert_eq!(sim.num_iter(), 2);
    }

    #[test]
    fn missing_yaml_file_is_an_io_error() {
        let result = SimulationConfig::try_from_yaml("does/not/exist.yaml", 0);
        assert!(matches!(result, Err(SimulationConfigError::Io { .. })));
    }
}

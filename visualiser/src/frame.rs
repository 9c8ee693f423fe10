use crate::error::DataLoadError;
use crate::model::{IterationWorkloads, WorkloadSample};
use balancer_simulation_model::SimulationConfig;
use itertools::Itertools;
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// Where the workloads of an iteration live and how they are laid out
///
/// The balancer writes one file per iteration below `<results-dir>/<iteration>/`. Each file is a
/// CSV with a header line, one row per worker, holding the worker id and its workload.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadsFormat {
    /// Path of the workload file relative to the iteration directory
    pub file: PathBuf,
    pub id_column: String,
    pub value_column: String,
    pub separator: u8,
}

impl Default for WorkloadsFormat {
    fn default() -> Self {
        Self {
            file: PathBuf::from("stats").join("new_metrics.csv"),
            id_column: "edge-id".to_string(),
            value_column: "new_metric".to_string(),
            separator: b' ',
        }
    }
}

impl WorkloadsFormat {
    /// Builds a [`WorkloadsFormat`] with the specified file path.
    pub fn file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = file.into();
        self
    }

    /// Builds a [`WorkloadsFormat`] with the specified column names.
    pub fn columns(
        mut self,
        id_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Self {
        self.id_column = id_column.into();
        self.value_column = value_column.into();
        self
    }

    /// Builds a [`WorkloadsFormat`] with the specified field separator.
    pub fn separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// The workload file of `iteration`
    pub fn path(&self, sim: &SimulationConfig, iteration: usize) -> PathBuf {
        sim.iteration_dir(iteration).join(&self.file)
    }
}

/// Load the workloads of a single iteration.
pub fn load_sample(
    sim: &SimulationConfig,
    format: &WorkloadsFormat,
    iteration: usize,
) -> Result<WorkloadSample, DataLoadError> {
    load_from_file(&format.path(sim, iteration), format)
}

/// Load the workloads of every configured iteration, in order.
pub fn load_all_samples(
    sim: &SimulationConfig,
    format: &WorkloadsFormat,
) -> Result<Vec<IterationWorkloads>, DataLoadError> {
    sim.iterations()
        .map(|iteration| {
            load_sample(sim, format, iteration)
                .map(|sample| IterationWorkloads { iteration, sample })
        })
        .collect()
}

pub(crate) fn load_from_file(
    path: &Path,
    format: &WorkloadsFormat,
) -> Result<WorkloadSample, DataLoadError> {
    log::debug!("Loading workloads from {}", path.display());

    if !path.is_file() {
        return Err(DataLoadError::Missing {
            path: path.to_path_buf(),
        });
    }

    let parse_err = |source: PolarsError| DataLoadError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_separator(format.separator))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(parse_err)?
        .finish()
        .map_err(parse_err)?;

    let worker_ids = numeric_column(&frame, path, &format.id_column, &DataType::Int64)?;
    let values = numeric_column(&frame, path, &format.value_column, &DataType::Float64)?;

    // Consecutive iterations are compared worker by worker, so fix the order here
    let frame = DataFrame::new(vec![worker_ids, values])
        .and_then(|frame| frame.sort([format.id_column.as_str()], SortMultipleOptions::default()))
        .map_err(parse_err)?;

    let worker_ids = frame
        .column(&format.id_column)
        .and_then(|c| c.i64().map(|ids| ids.into_no_null_iter().collect::<Vec<_>>()))
        .map_err(parse_err)?;
    let values = frame
        .column(&format.value_column)
        .and_then(|c| c.f64().map(|v| v.into_no_null_iter().collect::<Vec<_>>()))
        .map_err(parse_err)?;

    if values.iter().any(|v| !v.is_finite()) {
        return Err(DataLoadError::InvalidValues {
            path: path.to_path_buf(),
            column: format.value_column.clone(),
        });
    }
    if let Some((id, _)) = worker_ids.iter().tuple_windows().find(|(a, b)| a == b) {
        return Err(DataLoadError::DuplicateWorker {
            path: path.to_path_buf(),
            id: *id,
        });
    }

    WorkloadSample::new(worker_ids, values).map_err(|source| DataLoadError::InvalidSample {
        path: path.to_path_buf(),
        source,
    })
}

/// Fetch a column and cast it to `dtype`, rejecting values that do not cast or are missing.
fn numeric_column(
    frame: &DataFrame,
    path: &Path,
    column: &str,
    dtype: &DataType,
) -> Result<Column, DataLoadError> {
    let raw = frame
        .column(column)
        .map_err(|_| DataLoadError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })?;

    let invalid = || DataLoadError::InvalidValues {
        path: path.to_path_buf(),
        column: column.to_string(),
    };
    let cast = raw.strict_cast(dtype).map_err(|_| invalid())?;
    if cast.null_count() > 0 {
        return Err(invalid());
    }

    Ok(cast)
}

use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Any error that stops a visualisation run
#[derive(Error, Debug)]
pub enum VisualiseError {
    #[error(transparent)]
    DataLoad(#[from] DataLoadError),
    #[error("Deltas need a previous iteration, but iteration {iteration} is the first one loaded")]
    NoPreviousIteration { iteration: usize },
    #[error("No iteration has been loaded yet")]
    NoIterationLoaded,
    #[error(transparent)]
    PlotRender(#[from] PlotRenderError),
    #[error("Iteration {iteration} has {actual} workers, but the iteration before has {expected}")]
    WorkerCountMismatch {
        iteration: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Iteration {iteration} lists other workers than the iteration before")]
    WorkerIdMismatch { iteration: usize },
    #[error("All {num_iter} configured iterations have been loaded already")]
    IterationsExhausted { num_iter: usize },
    #[error("Quantile level {0} is not within [0, 100]")]
    InvalidQuantile(f64),
}

/// The workloads of one iteration could not be loaded
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Workload file {} does not exist", path.display())]
    Missing { path: PathBuf },
    #[error("Could not parse workload file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error("Workload file {} has no column {column:?}", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("Column {column:?} in {} holds empty or non-numeric values", path.display())]
    InvalidValues { path: PathBuf, column: String },
    #[error("Worker {id} is listed more than once in {}", path.display())]
    DuplicateWorker { path: PathBuf, id: i64 },
    #[error("Invalid workloads in {}: {source}", path.display())]
    InvalidSample {
        path: PathBuf,
        #[source]
        source: SampleError,
    },
}

/// A workload sample could not be built from the given values
#[derive(Error, Debug)]
pub enum SampleError {
    #[error("Sample holds no workloads")]
    Empty,
    #[error("Workload {0} is not a finite number")]
    NonFinite(f64),
    #[error("Got {ids} worker ids for {values} workloads")]
    LengthMismatch { ids: usize, values: usize },
    #[error("Statistics failed: {0}")]
    Polars(#[from] PolarsError),
}

/// A plot could not be drawn or written
#[derive(Error, Debug)]
#[error("Failed to render plot {plot} to {}: {source}", path.display())]
pub struct PlotRenderError {
    pub plot: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

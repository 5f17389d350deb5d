//! Error types.
//!
//! The core returns typed errors (`ConfigError`, `DataError`, `EstimationError`).
//! The binary folds them into `AppError`, which carries the process exit code.

use thiserror::Error;

/// Exit code for configuration errors.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code for data/ingest errors.
pub const EXIT_DATA: u8 = 3;
/// Exit code for I/O and export errors.
pub const EXIT_IO: u8 = 4;
/// Exit code when no quantile fit could be produced.
pub const EXIT_FIT_FAILED: u8 = 5;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::new(EXIT_CONFIG, format!("Configuration error: {err}"))
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        Self::new(EXIT_DATA, format!("Data error: {err}"))
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Config(e) => e.into(),
            PipelineError::Data(e) => e.into(),
        }
    }
}

/// A violation of one of the configuration rules.
///
/// Every variant is fatal: the pipeline stops before any data is transformed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("quantiles: at least one quantile level is required")]
    EmptyQuantiles,

    #[error("quantiles: all values must lie strictly between 0 and 1, given {value}")]
    QuantileOutOfRange { value: f64 },

    #[error("quantiles: value {value} is listed more than once")]
    DuplicateQuantile { value: f64 },

    #[error("quantiles: value {level:.2} must be included, given {given:?}")]
    MissingCanonicalQuantile { level: f64, given: Vec<f64> },

    #[error("target: target series name must not be empty")]
    EmptyTarget,

    #[error("horizon: must be a positive number of periods, given {value}")]
    InvalidHorizon { value: i64 },

    #[error(
        "local_projection: range {start}..={end} must satisfy 1 <= start <= horizon ({horizon}) <= end"
    )]
    InvalidHorizonRange { start: i64, end: i64, horizon: usize },

    #[error("local_projection: range {start}..={end} spans more than {max} horizons")]
    HorizonRangeTooWide { start: i64, end: i64, max: usize },

    #[error("regressors[{index}]: series name must not be empty")]
    EmptySeriesName { index: usize },

    #[error("transform for regressor {regressor} was not a valid option, given {given}")]
    UnknownTransform { regressor: String, given: String },

    #[error(
        "option for regressor {regressor} with transform {transform} must not be set, given {given}"
    )]
    UnexpectedOption {
        regressor: String,
        transform: String,
        given: f64,
    },

    #[error(
        "option for regressor {regressor} with transform {transform} must be an int, given {given:?}"
    )]
    NonIntegerOption {
        regressor: String,
        transform: String,
        given: Option<f64>,
    },

    #[error(
        "option for regressor {regressor} with transform {transform} must be at least {min}, given {given}"
    )]
    OptionBelowMinimum {
        regressor: String,
        transform: String,
        given: i64,
        min: i64,
    },

    #[error("{field} specified as {value}, cannot be the same as a necessary input table")]
    ReservedDestination { field: &'static str, value: String },

    #[error("{field} specified as {value}, which is already used by {other}")]
    DuplicateDestination {
        field: &'static str,
        other: &'static str,
        value: String,
    },
}

/// Problems with the supplied data table.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("series {0} not found in data")]
    UnknownSeries(String),

    #[error("column {0} already exists in frame")]
    DuplicateColumn(String),

    #[error("column {name} has {got} values, frame index has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("dates must be strictly increasing: {prev} is followed by {next}")]
    NonMonotonicDates {
        prev: chrono::NaiveDate,
        next: chrono::NaiveDate,
    },

    #[error("data has no date column")]
    MissingDateColumn,

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal errors of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Why a single (quantile, horizon) regression could not be produced.
///
/// These never stop the pipeline; they are recorded per fit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    #[error("estimation sample is empty")]
    EmptySample,

    #[error("estimation sample has {n_obs} observations for {n_params} parameters")]
    InsufficientSample { n_obs: usize, n_params: usize },

    #[error("design matrix is singular")]
    SingularDesign,

    #[error("did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },
}

impl EstimationError {
    /// Short machine-friendly label used in diagnostics tables.
    pub fn label(&self) -> &'static str {
        match self {
            Self::EmptySample => "empty_sample",
            Self::InsufficientSample { .. } => "insufficient_sample",
            Self::SingularDesign => "singular_design",
            Self::NotConverged { .. } => "not_converged",
        }
    }
}

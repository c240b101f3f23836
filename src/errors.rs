use std::path::PathBuf;
use thiserror::Error;

/// Enum for errors in this crate
#[derive(Error, Debug)]
pub enum SmdError {
    /// Error returned when a builder's `build()` was called improperly
    #[error("Could not build analysis: {0}")]
    Builder(String),

    /// Error returned when a user-supplied parameter is out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error returned when the schedule configuration file cannot be read
    #[error("Could not read configuration file '{}': {source}", .path.display())]
    ConfigUnreadable {
        #[allow(missing_docs)]
        path: PathBuf,
        #[allow(missing_docs)]
        #[source]
        source: std::io::Error,
    },

    /// Error returned when one of the required schedule keywords never appears
    #[error("Configuration file '{}' does not set '{key}'", .path.display())]
    ConfigMissingKey {
        #[allow(missing_docs)]
        path: PathBuf,
        #[allow(missing_docs)]
        key: &'static str,
    },

    /// Error returned when a schedule keyword carries an unusable argument
    #[error(
        "Configuration file '{}', line {line}: invalid value '{value}' for '{key}'",
        .path.display()
    )]
    ConfigInvalidValue {
        #[allow(missing_docs)]
        path: PathBuf,
        #[allow(missing_docs)]
        line: usize,
        #[allow(missing_docs)]
        key: &'static str,
        #[allow(missing_docs)]
        value: String,
    },

    /// Error returned when discovery finds no completed trajectory
    #[error("No completed trajectories for job '{jobname}' under '{}'", .root.display())]
    NoTrajectories {
        #[allow(missing_docs)]
        root: PathBuf,
        #[allow(missing_docs)]
        jobname: String,
    },

    /// Error returned when a sample line cannot be parsed
    #[error(
        "Problem parsing {field} (columns {columns}) on line {line} of '{}': '{value}'",
        .path.display()
    )]
    TrajectoryParse {
        #[allow(missing_docs)]
        path: PathBuf,
        #[allow(missing_docs)]
        line: usize,
        #[allow(missing_docs)]
        field: &'static str,
        #[allow(missing_docs)]
        columns: &'static str,
        #[allow(missing_docs)]
        value: String,
    },

    /// Error returned when a sample file fails partway through reading
    #[error("Problem reading trajectory file '{}': {source}", .path.display())]
    TrajectoryIo {
        #[allow(missing_docs)]
        path: PathBuf,
        #[allow(missing_docs)]
        #[source]
        source: std::io::Error,
    },

    /// Error returned when a trajectory holds the wrong number of samples
    #[error(
        "Problem encountered with incomplete trajectory in file '{}': {found} samples, expected {expected}",
        .path.display()
    )]
    TrajectoryShape {
        #[allow(missing_docs)]
        path: PathBuf,
        #[allow(missing_docs)]
        found: usize,
        #[allow(missing_docs)]
        expected: usize,
    },

    /// Error returned when the number of loaded trajectories disagrees with discovery
    #[error("Problem with number of trajectories: loaded {loaded}, expected {expected}")]
    TrajectoryCount {
        #[allow(missing_docs)]
        loaded: usize,
        #[allow(missing_docs)]
        expected: usize,
    },

    /// Error returned when the PMF table cannot be written
    #[error("Could not write PMF to '{}': {source}", .path.display())]
    Output {
        #[allow(missing_docs)]
        path: PathBuf,
        #[allow(missing_docs)]
        #[source]
        source: std::io::Error,
    },
}

impl From<String> for SmdError {
    fn from(s: String) -> Self {
        Self::Builder(s)
    }
}

/// Result type for the analyzesmd crate
pub type Result<T> = std::result::Result<T, SmdError>;

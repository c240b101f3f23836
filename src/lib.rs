#![warn(rust_2018_idioms, missing_docs, missing_debug_implementations)]

//! Potentials of mean force from steered molecular dynamics (SMD) by Jarzynski reweighting.
//!
//! A job is a directory holding `traj1/`, `traj2/`, ... each with the colvars output of one pull
//! along a one-dimensional reaction coordinate. All pulls share the moving harmonic restraint
//! described in `traj1/{jobname}_traj1.colvars.conf`. The samples, restraint centers and
//! accumulated work of every completed pull are combined into a free-energy profile $G(r)$ on an
//! evenly spaced grid (see [`PmfEstimator`]).
//!
//! Please reference the following if you use this code in your research:
//!
//! [1] Hummer G and Szabo A. Free energy reconstruction from nonequilibrium single-molecule
//! pulling experiments. PNAS 98:3658, 2001. <https://doi.org/10.1073/pnas.071034098>

#[macro_use]
extern crate derive_builder;

pub mod discovery;
pub mod errors;
pub mod pmf;
pub mod schedule;
pub mod testsystems;
pub mod trajectory;
pub mod writer;

pub use crate::discovery::TrajectorySet;
pub use crate::errors::*;
pub use crate::pmf::{Grid, Histogram, Pmf, PmfEstimator, PmfEstimatorBuilder, MAX_GRID_POINTS};
pub use crate::schedule::Schedule;
pub use crate::trajectory::{Sample, TrajectoryData};

use std::path::{Path, PathBuf};
use tracing::info;

/// Gas constant in kcal/K/mol
pub const GAS_CONSTANT: f64 = 8.3144626 / 4184.0;

/// One PMF analysis of an SMD job: discovery, schedule, loading and estimation
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate", name = "build_inner", private))]
pub struct SmdAnalysis {
    /// Name of the job, the stem of every input file
    #[builder(setter(into))]
    jobname: String,

    /// Directory holding the `trajN/` subdirectories
    #[builder(setter(into), default = "PathBuf::from(\".\")")]
    root: PathBuf,

    /// Highest trajectory index to consider; probed from the directory tree when unset
    #[builder(setter(strip_option), default)]
    max_traj: Option<usize>,

    /// Grid spacing and bin width in Å
    #[builder(default = "0.1")]
    step_size: f64,

    /// Temperature in K
    #[builder(default = "310.0")]
    temperature: f64,
}

impl SmdAnalysisBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(jobname) = &self.jobname {
            if jobname.is_empty() {
                return Err("jobname must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Build the analysis, checking that the step size and temperature are positive
    pub fn build(&self) -> Result<SmdAnalysis> {
        let analysis = self.build_inner()?;

        if !(analysis.step_size.is_finite() && analysis.step_size > 0.0) {
            return Err(SmdError::InvalidArgument(format!(
                "step size must be positive (not {})",
                analysis.step_size
            )));
        }
        if !(analysis.temperature.is_finite() && analysis.temperature > 0.0) {
            return Err(SmdError::InvalidArgument(format!(
                "temperature must be positive (not {})",
                analysis.temperature
            )));
        }

        Ok(analysis)
    }
}

/// The outcome of an [`SmdAnalysis`]
#[derive(Debug, Clone, PartialEq)]
pub struct PmfReport {
    /// Name of the job
    pub jobname: String,
    /// Number of completed trajectories the PMF was estimated from
    pub num_traj: usize,
    /// Highest trajectory index considered
    pub max_traj: usize,
    /// The steering schedule read from trajectory 1
    pub schedule: Schedule,
    /// The PMF
    pub pmf: Pmf,
}

impl PmfReport {
    /// Write the PMF table to `path`
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        writer::write_pmf_to_path(path, &self.jobname, &self.pmf)
    }
}

impl SmdAnalysis {
    /// Get a new builder for the `SmdAnalysis` struct
    pub fn builder() -> SmdAnalysisBuilder {
        SmdAnalysisBuilder::default()
    }

    /// Name of the job
    pub fn jobname(&self) -> &str {
        &self.jobname
    }

    /// Directory holding the `trajN/` subdirectories
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{jobname}.pmf`
    pub fn default_output(&self) -> PathBuf {
        self.root.join(format!("{}.pmf", self.jobname))
    }

    /// Discover, read and load the job, then estimate its PMF
    pub fn run(&self) -> Result<PmfReport> {
        let set = TrajectorySet::discover(&self.root, &self.jobname, self.max_traj)?;
        let schedule = Schedule::from_path(set.config_path())?;
        let data = TrajectoryData::load(&set, schedule.timesteps())?;

        let pmf = PmfEstimator::builder()
            .trajectories(data)
            .schedule(&schedule)
            .step_size(self.step_size)
            .temperature(self.temperature)
            .build()?
            .compute_pmf()?;
        info!(
            "Estimated {}-point PMF from {} trajectories",
            pmf.len(),
            set.num_traj()
        );

        Ok(PmfReport {
            jobname: self.jobname.clone(),
            num_traj: set.num_traj(),
            max_traj: set.max_traj(),
            schedule,
            pmf,
        })
    }
}

//! Locating the numbered trajectory directories of a job.
//!
//! An SMD job is laid out as `traj1/`, `traj2/`, ... under a common root. A trajectory counts as
//! completed once its colvars sample file `trajN/{jobname}_trajN.colvars.traj` exists; its contents
//! are not inspected here.

use crate::errors::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The trajectories of one job, as found on disk
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectorySet {
    root: PathBuf,
    jobname: String,
    max_traj: usize,
    completed: Vec<usize>,
}

impl TrajectorySet {
    /// Probe `root` for the trajectories of `jobname`.
    ///
    /// With `max_traj` unset (or zero), directories `traj1`, `traj2`, ... are probed until the
    /// first missing one; the number of consecutive directories found becomes `max_traj`. Every
    /// index in `1..=max_traj` whose sample file exists is then recorded as completed.
    ///
    /// Fails with [`SmdError::NoTrajectories`] when nothing is completed.
    pub fn discover(root: impl AsRef<Path>, jobname: &str, max_traj: Option<usize>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        let max_traj = match max_traj {
            Some(n) if n > 0 => n,
            _ => {
                let mut n = 0;
                while traj_dir(&root, n + 1).exists() {
                    n += 1;
                }
                debug!("Found {} consecutive trajectory directories", n);
                n
            }
        };

        let completed: Vec<usize> = (1..=max_traj)
            .filter(|&trajid| sample_path(&root, jobname, trajid).exists())
            .collect();

        info!(
            "{} of {} trajectories completed for job '{}'",
            completed.len(),
            max_traj,
            jobname
        );

        if completed.is_empty() {
            return Err(SmdError::NoTrajectories {
                root,
                jobname: jobname.to_string(),
            });
        }

        Ok(Self {
            root,
            jobname: jobname.to_string(),
            max_traj,
            completed,
        })
    }

    /// The directory the `trajN/` subdirectories live in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the job, used as the file stem of every input file
    pub fn jobname(&self) -> &str {
        &self.jobname
    }

    /// Highest trajectory index considered
    pub fn max_traj(&self) -> usize {
        self.max_traj
    }

    /// `num_traj`, the number of completed trajectories
    pub fn num_traj(&self) -> usize {
        self.completed.len()
    }

    /// Indices (1-based) of the completed trajectories, ascending
    pub fn completed(&self) -> &[usize] {
        &self.completed
    }

    /// Path of the colvars sample file of trajectory `trajid`
    pub fn sample_path(&self, trajid: usize) -> PathBuf {
        sample_path(&self.root, &self.jobname, trajid)
    }

    /// Path of the shared schedule configuration, which is read from trajectory 1
    pub fn config_path(&self) -> PathBuf {
        config_path(&self.root, &self.jobname)
    }
}

fn traj_dir(root: &Path, trajid: usize) -> PathBuf {
    root.join(format!("traj{}", trajid))
}

/// `root/trajN/{jobname}_trajN.colvars.traj`
pub fn sample_path(root: &Path, jobname: &str, trajid: usize) -> PathBuf {
    traj_dir(root, trajid).join(format!("{}_traj{}.colvars.traj", jobname, trajid))
}

/// `root/traj1/{jobname}_traj1.colvars.conf`
pub fn config_path(root: &Path, jobname: &str) -> PathBuf {
    traj_dir(root, 1).join(format!("{}_traj1.colvars.conf", jobname))
}

use crate::discovery::{config_path, sample_path};
use crate::schedule::Schedule;
use crate::trajectory::Sample;
use std::fs;
use std::io;
use std::path::Path;

/// Deterministic constant-velocity pulls written out as a colvars job tree.
///
/// # Examples
///
/// Write three pulls of job `pull` into a directory and analyse them.
///
/// ```
/// use analyzesmd::testsystems::*;
/// use analyzesmd::SmdAnalysis;
///
/// let dir = tempfile::tempdir().unwrap();
/// let testcase = SyntheticPull::builder().num_traj(3).build().unwrap();
/// testcase.write(dir.path(), "pull").unwrap();
///
/// let report = SmdAnalysis::builder()
///     .jobname("pull")
///     .root(dir.path())
///     .build()
///     .unwrap()
///     .run()
///     .unwrap();
/// assert_eq!(report.num_traj, 3);
/// ```
///
/// Sample `t` of trajectory `i` sits at the restraint center displaced by
/// `spread * sin(1.3 (i + 1) + 0.7 t)`; its work is `work_offset` plus the restraint energy at
/// that displacement plus a drift of `0.05 i t` kcal/mol.
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct SyntheticPull {
    /// Number of trajectories
    #[builder(default = "4")]
    num_traj: usize,

    /// Restraint force constant (kcal/mol/Å²)
    #[builder(default = "10.0")]
    force_constant: f64,

    /// Center at the start of the pull
    #[builder(default = "0.0")]
    r_begin: f64,

    /// Center at the end of the pull
    #[builder(default = "1.0")]
    r_end: f64,

    /// Total MD steps
    #[builder(default = "20")]
    num_steps: usize,

    /// Steps between samples
    #[builder(default = "2")]
    cv_frequency: usize,

    /// Amplitude of the deviation from the restraint center
    #[builder(default = "0.05")]
    spread: f64,

    /// Constant added to every work value
    #[builder(default = "0.0")]
    work_offset: f64,
}

impl SyntheticPullBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.cv_frequency == Some(0) {
            return Err("cv_frequency must be positive".to_string());
        }
        Ok(())
    }
}

impl SyntheticPull {
    /// Get a new builder for the `SyntheticPull` struct
    pub fn builder() -> SyntheticPullBuilder {
        SyntheticPullBuilder::default()
    }

    /// The schedule the pulls follow
    pub fn schedule(&self) -> Schedule {
        Schedule {
            cv_frequency: self.cv_frequency,
            force_constant: self.force_constant,
            r_begin: self.r_begin,
            r_end: self.r_end,
            num_steps: self.num_steps,
        }
    }

    /// Samples of trajectory `trajid`; indices are 1-based, and 0 gives the same pull as 1
    pub fn samples(&self, trajid: usize) -> Vec<Sample> {
        let i = trajid.saturating_sub(1) as f64;
        (0..self.schedule().timesteps())
            .map(|t| {
                let step = t * self.cv_frequency;
                let center = self.center(step);
                let dr = self.spread * (1.3 * (i + 1.0) + 0.7 * t as f64).sin();
                Sample {
                    r: center + dr,
                    center,
                    work: self.work_offset
                        + 0.5 * self.force_constant * dr * dr
                        + 0.05 * i * t as f64,
                }
            })
            .collect()
    }

    fn center(&self, step: usize) -> f64 {
        self.r_begin + (self.r_end - self.r_begin) * step as f64 / self.num_steps as f64
    }

    /// Colvars configuration text for the pulls
    pub fn config_text(&self) -> String {
        format!(
            "colvarstrajfrequency {}\n\
             \n\
             colvar {{\n  \
               name dist\n  \
               distance {{\n    \
                 group1 {{ atomNumbers 1 }}\n    \
                 group2 {{ atomNumbers 2 }}\n  \
               }}\n\
             }}\n\
             \n\
             harmonic {{\n  \
               colvars dist\n  \
               forceconstant {}\n  \
               centers {}\n  \
               targetcenters {}\n  \
               targetnumsteps {}\n  \
               outputAccumulatedWork on\n\
             }}\n",
            self.cv_frequency, self.force_constant, self.r_begin, self.r_end, self.num_steps
        )
    }

    /// Colvars sample file text for trajectory `trajid`
    pub fn trajectory_text(&self, trajid: usize) -> String {
        let mut text = String::from(TRAJ_HEADER);
        for (t, sample) in self.samples(trajid).iter().enumerate() {
            text.push_str(&colvars_line(
                t * self.cv_frequency,
                sample.r,
                sample.center,
                sample.work,
            ));
            text.push('\n');
        }
        text
    }

    /// Write `trajN/` directories holding the configuration (in `traj1` only) and sample files
    pub fn write(&self, root: &Path, jobname: &str) -> io::Result<()> {
        for trajid in 1..=self.num_traj {
            let path = sample_path(root, jobname, trajid);
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::write(&path, self.trajectory_text(trajid))?;
        }
        fs::write(config_path(root, jobname), self.config_text())
    }
}

const TRAJ_HEADER: &str = "\
# step                        dist                 r_dist                W_dist
";

/// Format one data line in the fixed-width colvars layout
///
/// The step fills columns 0..12, followed by the reaction coordinate (12..36), the restraint
/// center (36..59) and the accumulated work (59..81), each right-aligned in `%.14e` notation.
pub fn colvars_line(step: usize, r: f64, center: f64, work: f64) -> String {
    format!(
        "{:>12}{:>24}{:>23}{:>22}",
        step,
        colvars_real(r),
        colvars_real(center),
        colvars_real(work)
    )
}

fn colvars_real(x: f64) -> String {
    let sci = format!("{:.14e}", x);
    match sci.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => sci,
    }
}

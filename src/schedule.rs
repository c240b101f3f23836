//! The guiding-potential protocol shared by every trajectory of a job.

use crate::errors::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

const CV_FREQUENCY: &str = "colvarstrajfrequency";
const FORCE_CONSTANT: &str = "forceconstant";
const CENTERS: &str = "centers";
const TARGET_CENTERS: &str = "targetcenters";
const TARGET_NUM_STEPS: &str = "targetnumsteps";

/// The steering schedule, read once from the colvars configuration of trajectory 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    /// Number of MD steps between two colvars samples
    pub cv_frequency: usize,
    /// Force constant $k$ of the moving harmonic restraint (kcal/mol/Å²)
    pub force_constant: f64,
    /// Restraint center at the start of the pull
    pub r_begin: f64,
    /// Restraint center at the end of the pull
    pub r_end: f64,
    /// Total number of MD steps pulled
    pub num_steps: usize,
}

/// A keyword argument together with where it was read from
#[derive(Debug)]
struct Entry<T> {
    value: T,
    line: usize,
    text: String,
}

#[derive(Debug, Default)]
struct PartialSchedule {
    cv_frequency: Option<Entry<usize>>,
    force_constant: Option<Entry<f64>>,
    r_begin: Option<Entry<f64>>,
    r_end: Option<Entry<f64>>,
    num_steps: Option<Entry<usize>>,
}

impl Schedule {
    /// Number of samples each trajectory must hold, counting the one at step 0
    pub fn timesteps(&self) -> usize {
        self.num_steps / self.cv_frequency + 1
    }

    /// Read the schedule from a colvars configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SmdError::ConfigUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let schedule = Self::read_from(BufReader::new(file), path)?;
        info!(
            "Schedule: k = {}, r = {} -> {}, {} steps sampled every {} ({} samples)",
            schedule.force_constant,
            schedule.r_begin,
            schedule.r_end,
            schedule.num_steps,
            schedule.cv_frequency,
            schedule.timesteps()
        );
        Ok(schedule)
    }

    /// Read the schedule from any buffered reader; `path` is only used in diagnostics.
    ///
    /// Leading spaces are stripped and anything after `#` is dropped. A line starting with one of
    /// the recognised keywords has its argument taken from after the keyword and one separator
    /// character. Later occurrences of a keyword override earlier ones; unrecognised lines are
    /// ignored.
    pub fn read_from(mut reader: impl BufRead, path: &Path) -> Result<Self> {
        let mut partial = PartialSchedule::default();
        let mut buf = Vec::new();
        let mut line_num = 0;

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|source| SmdError::ConfigUnreadable {
                    path: path.to_path_buf(),
                    source,
                })?;
            if read == 0 {
                break;
            }
            line_num += 1;

            // Comment text is dropped before decoding, so it may hold any bytes
            let start = buf.iter().position(|&b| b != b' ').unwrap_or(buf.len());
            let end = buf.iter().position(|&b| b == b'#').unwrap_or(buf.len());
            if start >= end {
                continue;
            }
            let decoded = String::from_utf8_lossy(&buf[start..end]);
            let line = decoded.trim_end_matches(&['\n', '\r'][..]);
            if line.is_empty() {
                continue;
            }

            if line.starts_with(CV_FREQUENCY) {
                partial.cv_frequency = Some(argument(line, CV_FREQUENCY, path, line_num)?);
            } else if line.starts_with(FORCE_CONSTANT) {
                partial.force_constant = Some(argument(line, FORCE_CONSTANT, path, line_num)?);
            } else if line.starts_with(CENTERS) {
                partial.r_begin = Some(argument(line, CENTERS, path, line_num)?);
            } else if line.starts_with(TARGET_CENTERS) {
                partial.r_end = Some(argument(line, TARGET_CENTERS, path, line_num)?);
            } else if line.starts_with(TARGET_NUM_STEPS) {
                partial.num_steps = Some(argument(line, TARGET_NUM_STEPS, path, line_num)?);
            }
        }

        partial.finish(path)
    }
}

impl PartialSchedule {
    fn finish(self, path: &Path) -> Result<Schedule> {
        let missing = |key| SmdError::ConfigMissingKey {
            path: path.to_path_buf(),
            key,
        };
        let invalid = |key, line, text: &str| SmdError::ConfigInvalidValue {
            path: path.to_path_buf(),
            line,
            key,
            value: text.to_string(),
        };
        let finite = |key, entry: Option<Entry<f64>>| -> Result<f64> {
            let entry = entry.ok_or_else(|| missing(key))?;
            if entry.value.is_finite() {
                Ok(entry.value)
            } else {
                Err(invalid(key, entry.line, &entry.text))
            }
        };

        let cv_frequency = self.cv_frequency.ok_or_else(|| missing(CV_FREQUENCY))?;
        // A zero sampling frequency leaves the sample count undefined
        if cv_frequency.value == 0 {
            return Err(invalid(CV_FREQUENCY, cv_frequency.line, &cv_frequency.text));
        }

        let schedule = Schedule {
            cv_frequency: cv_frequency.value,
            force_constant: finite(FORCE_CONSTANT, self.force_constant)?,
            r_begin: finite(CENTERS, self.r_begin)?,
            r_end: finite(TARGET_CENTERS, self.r_end)?,
            num_steps: self.num_steps.ok_or_else(|| missing(TARGET_NUM_STEPS))?.value,
        };
        debug!("Parsed schedule {:?}", schedule);
        Ok(schedule)
    }
}

/// Parse the first token after `key` and its separator character
fn argument<T: FromStr>(
    line: &str,
    key: &'static str,
    path: &Path,
    line_num: usize,
) -> Result<Entry<T>> {
    let rest = &line[key.len()..];
    let mut chars = rest.chars();
    chars.next();
    let text = chars.as_str().split_whitespace().next().unwrap_or("");

    let value = text.parse::<T>().map_err(|_| SmdError::ConfigInvalidValue {
        path: path.to_path_buf(),
        line: line_num,
        key,
        value: text.to_string(),
    })?;
    Ok(Entry {
        value,
        line: line_num,
        text: text.to_string(),
    })
}

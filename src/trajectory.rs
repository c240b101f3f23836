//! Reading colvars sample files into dense per-trajectory arrays.
//!
//! Data lines of a `.colvars.traj` file are fixed-width: the reaction coordinate occupies columns
//! 12..36, the restraint center 36..59 and the accumulated work 59..81. Lines starting with `#`
//! are headers and are skipped, as are blank lines.

use crate::discovery::TrajectorySet;
use crate::errors::*;
use ndarray::{Array1, Array2, Axis};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

const R_COLUMNS: (usize, usize) = (12, 36);
const CENTER_COLUMNS: (usize, usize) = (36, 59);
const WORK_COLUMNS: (usize, usize) = (59, 81);

/// One colvars sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Observed reaction coordinate
    pub r: f64,
    /// Programmed restraint center
    pub center: f64,
    /// Work done by the restraint since step 0 (kcal/mol)
    pub work: f64,
}

/// All samples of a job, as `num_traj × timesteps` arrays
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryData {
    /// `r[[i, t]]` is the reaction coordinate of trajectory `i` at sample `t`
    pub r: Array2<f64>,
    /// `centers[t]` is the restraint center at sample `t`, taken from the first trajectory
    pub centers: Array1<f64>,
    /// `work[[i, t]]` is the accumulated work of trajectory `i` at sample `t`
    pub work: Array2<f64>,
}

fn field(
    line: &str,
    columns: (usize, usize),
    name: &'static str,
    label: &'static str,
    path: &Path,
    line_num: usize,
) -> Result<f64> {
    let (start, end) = columns;
    let text = line.get(start..end.min(line.len())).unwrap_or("").trim();
    text.parse().map_err(|_| SmdError::TrajectoryParse {
        path: path.to_path_buf(),
        line: line_num,
        field: name,
        columns: label,
        value: text.to_string(),
    })
}

/// Parse every data line of a colvars sample file; `path` is only used in diagnostics.
///
/// Header lines are skipped before they are decoded, so they may hold any bytes.
pub fn read_samples(mut reader: impl BufRead, path: &Path) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();
    let mut buf = Vec::new();
    let mut line_num = 0;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| SmdError::TrajectoryIo {
                path: path.to_path_buf(),
                source,
            })?;
        if read == 0 {
            break;
        }
        line_num += 1;

        if buf.starts_with(b"#") || buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let decoded = String::from_utf8_lossy(&buf);
        let line = decoded.trim_end_matches(&['\n', '\r'][..]);

        samples.push(Sample {
            r: field(line, R_COLUMNS, "reaction coordinate", "13-36", path, line_num)?,
            center: field(line, CENTER_COLUMNS, "restraint center", "37-59", path, line_num)?,
            work: field(line, WORK_COLUMNS, "work", "60-81", path, line_num)?,
        });
    }

    Ok(samples)
}

impl TrajectoryData {
    /// Load every completed trajectory of `set`, each of which must hold exactly `timesteps`
    /// samples.
    ///
    /// A sample file that cannot be opened or read is logged and skipped, but the number of
    /// trajectories finally loaded must still equal `set.num_traj()`.
    pub fn load(set: &TrajectorySet, timesteps: usize) -> Result<Self> {
        let num_traj = set.num_traj();
        let mut r = Array2::<f64>::zeros((num_traj, timesteps));
        let mut centers = Array1::<f64>::zeros(timesteps);
        let mut work = Array2::<f64>::zeros((num_traj, timesteps));

        let mut trajnum = 0;
        for trajid in 1..=set.max_traj() {
            let path = set.sample_path(trajid);
            let samples = match File::open(&path) {
                Ok(file) => match read_samples(BufReader::new(file), &path) {
                    Err(SmdError::TrajectoryIo { source, .. }) => {
                        warn!(
                            "Problem encountered reading file {} ({}). Skipping...",
                            path.display(),
                            source
                        );
                        continue;
                    }
                    samples => samples?,
                },
                Err(e) => {
                    warn!(
                        "Problem encountered opening file {} ({}). Skipping...",
                        path.display(),
                        e
                    );
                    continue;
                }
            };

            if samples.len() != timesteps {
                return Err(SmdError::TrajectoryShape {
                    path,
                    found: samples.len(),
                    expected: timesteps,
                });
            }
            if trajnum >= num_traj {
                return Err(SmdError::TrajectoryCount {
                    loaded: trajnum + 1,
                    expected: num_traj,
                });
            }

            for (t, sample) in samples.iter().enumerate() {
                r[[trajnum, t]] = sample.r;
                work[[trajnum, t]] = sample.work;
                if trajnum == 0 {
                    centers[t] = sample.center;
                }
            }
            debug!("Loaded {} samples from {}", timesteps, path.display());
            trajnum += 1;
        }

        if trajnum != num_traj {
            return Err(SmdError::TrajectoryCount {
                loaded: trajnum,
                expected: num_traj,
            });
        }

        Ok(Self { r, centers, work })
    }

    /// `num_traj`, the number of trajectories loaded
    pub fn num_traj(&self) -> usize {
        self.r.len_of(Axis(0))
    }

    /// Number of samples per trajectory
    pub fn timesteps(&self) -> usize {
        self.r.len_of(Axis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsystems::colvars_line;
    use ndarray::array;

    const HEADER: &str = "\
# step                       dist                r_dist                W_dist
";

    #[test]
    fn parses_fixed_columns() {
        let text = format!(
            "{}{}\n{}\n",
            HEADER,
            colvars_line(0, 5.0, 5.0, 0.0),
            colvars_line(100, 5.125, 5.1, -0.03125)
        );
        let samples = read_samples(text.as_bytes(), Path::new("x.colvars.traj")).unwrap();
        assert_eq!(
            samples,
            vec![
                Sample {
                    r: 5.0,
                    center: 5.0,
                    work: 0.0
                },
                Sample {
                    r: 5.125,
                    center: 5.1,
                    work: -0.03125
                },
            ]
        );
    }

    #[test]
    fn headers_and_blank_lines_are_skipped() {
        let text = format!(
            "{}{}\n\n{}{}\n",
            HEADER,
            colvars_line(0, 1.0, 1.0, 0.0),
            HEADER,
            colvars_line(10, 2.0, 2.0, 1.0)
        );
        let samples = read_samples(text.as_bytes(), Path::new("x.colvars.traj")).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].work, 1.0);
    }

    #[test]
    fn short_line_reports_columns() {
        let line = colvars_line(0, 1.0, 1.0, 0.0);
        let text = format!("{}\n", &line[..12]);
        match read_samples(text.as_bytes(), Path::new("x.colvars.traj")) {
            Err(SmdError::TrajectoryParse { line, columns, .. }) => {
                assert_eq!(line, 1);
                assert_eq!(columns, "13-36");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn headers_may_hold_any_bytes() {
        let mut text = b"# r (\xC5), W (kcal/mol)\n".to_vec();
        text.extend_from_slice(colvars_line(0, 1.0, 1.0, 0.5).as_bytes());
        text.extend_from_slice(b"\r\n");

        let samples = read_samples(&text[..], Path::new("x.colvars.traj")).unwrap();
        assert_eq!(
            samples,
            vec![Sample {
                r: 1.0,
                center: 1.0,
                work: 0.5
            }]
        );
    }

    #[test]
    fn garbage_field_is_an_error() {
        let mut line = colvars_line(0, 1.0, 1.0, 0.0);
        line.replace_range(70..72, "zz");
        let text = format!("{}\n", line);
        assert!(matches!(
            read_samples(text.as_bytes(), Path::new("x.colvars.traj")),
            Err(SmdError::TrajectoryParse { field: "work", .. })
        ));
    }

    #[test]
    fn loads_arrays_with_centers_from_first_trajectory() {
        let dir = tempfile::tempdir().unwrap();
        let write = |trajid: usize, rows: &[(f64, f64, f64)]| {
            let path = crate::discovery::sample_path(dir.path(), "x", trajid);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            let mut text = String::from(HEADER);
            for (t, &(r, c, w)) in rows.iter().enumerate() {
                text.push_str(&colvars_line(t, r, c, w));
                text.push('\n');
            }
            std::fs::write(path, text).unwrap();
        };
        write(1, &[(0.0, 0.0, 0.0), (1.0, 1.0, 0.5)]);
        write(2, &[(0.25, 9.0, 0.0), (0.75, 9.0, -0.5)]);

        let set = TrajectorySet::discover(dir.path(), "x", None).unwrap();
        let data = TrajectoryData::load(&set, 2).unwrap();
        assert_eq!(data.r, array![[0.0, 1.0], [0.25, 0.75]]);
        assert_eq!(data.centers, array![0.0, 1.0]);
        assert_eq!(data.work, array![[0.0, 0.5], [0.0, -0.5]]);
        assert_eq!(data.num_traj(), 2);
        assert_eq!(data.timesteps(), 2);
    }

    #[test]
    fn wrong_sample_count_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = crate::discovery::sample_path(dir.path(), "x", 1);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("{}\n", colvars_line(0, 0.0, 0.0, 0.0))).unwrap();

        let set = TrajectorySet::discover(dir.path(), "x", None).unwrap();
        match TrajectoryData::load(&set, 2) {
            Err(e @ SmdError::TrajectoryShape { .. }) => {
                assert!(e.to_string().contains("x_traj1.colvars.traj"));
            }
            other => panic!("expected shape error, got {:?}", other),
        }
    }

    #[test]
    fn unreadable_sample_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = crate::discovery::sample_path(dir.path(), "x", 1);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("{}\n", colvars_line(0, 0.0, 0.0, 0.0))).unwrap();
        // Opening a directory succeeds, reading it does not
        std::fs::create_dir_all(crate::discovery::sample_path(dir.path(), "x", 2)).unwrap();

        let set = TrajectorySet::discover(dir.path(), "x", None).unwrap();
        assert_eq!(set.num_traj(), 2);
        match TrajectoryData::load(&set, 1) {
            Err(SmdError::TrajectoryCount { loaded, expected }) => {
                assert_eq!(loaded, 1);
                assert_eq!(expected, 2);
            }
            other => panic!("expected count error, got {:?}", other),
        }
    }
}

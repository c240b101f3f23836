use clap::Parser;
use std::path::PathBuf;

/// Compute the potential of mean force along the reaction coordinate of a set of steered MD
/// pulls by Jarzynski reweighting.
///
/// Reads `trajN/{JOBNAME}_trajN.colvars.traj` for every completed pull and the schedule in
/// `traj1/{JOBNAME}_traj1.colvars.conf`, and writes `{JOBNAME}.pmf`.
#[derive(Parser, Debug)]
#[command(name = "analyzesmd", version, about, long_about = None)]
pub struct Cli {
    /// Name of the job, the stem of every input file
    #[arg(value_name = "JOBNAME")]
    pub jobname: String,

    /// Highest trajectory index to consider (0 probes traj1, traj2, ... until the first gap)
    #[arg(short = 'm', long, value_name = "MAXTRAJ", default_value_t = 0)]
    pub max_traj: usize,

    /// Grid spacing and bin width in Å
    #[arg(short = 's', long, value_name = "STEPSIZE", default_value_t = 0.1)]
    pub step_size: f64,

    /// Temperature the pulls ran at, in K
    #[arg(short = 'T', long, value_name = "TEMP", default_value_t = 310.0)]
    pub temperature: f64,

    /// Directory holding the trajN/ subdirectories
    #[arg(short = 'C', long, value_name = "DIR", default_value = ".")]
    pub directory: PathBuf,

    /// Output path [default: DIR/JOBNAME.pmf]
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

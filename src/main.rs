mod cli;
mod logging;

use crate::cli::Cli;
use analyzesmd::SmdAnalysis;
use clap::Parser;
use std::error::Error;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, Box<dyn Error>>;

fn main() {
    if let Err(e) = run_app() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;
    debug!("Parsed arguments: {:?}", &cli);

    let mut builder = SmdAnalysis::builder();
    builder
        .jobname(cli.jobname.as_str())
        .root(cli.directory.as_path())
        .step_size(cli.step_size)
        .temperature(cli.temperature);
    if cli.max_traj > 0 {
        builder.max_traj(cli.max_traj);
    }
    let analysis = builder.build()?;

    let report = analysis.run()?;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| analysis.default_output());
    report.write_to_path(&output)?;

    info!(
        "Wrote {}-trajectory PMF for '{}' to {}",
        report.num_traj,
        report.jobname,
        output.display()
    );
    Ok(())
}

use std::process::ExitCode;

use clap::Parser;
use colored::*;

use sleeping_ta::config::{Config, LogFormat};
use sleeping_ta::{logging, Result, Simulation};

#[derive(Parser)]
#[command(name = "sleeping-ta")]
#[command(about = "Sleeping TA synchronization simulation", long_about = None)]
struct Cli {
    /// Number of students (default: TA_NUM_STUDENTS or 5)
    students: Option<usize>,

    /// Number of waiting-room chairs (default: TA_NUM_CHAIRS or 3)
    chairs: Option<usize>,

    /// Seed for reproducible delays
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    show_config: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    config.apply_overrides(cli.students, cli.chairs, cli.seed);
    if cli.json_logs {
        config.log_format = LogFormat::Json;
    }

    let simulation = Simulation::new(config)?;

    if cli.show_config {
        println!("{}", serde_json::to_string_pretty(simulation.config())?);
        return Ok(());
    }

    logging::init(simulation.config().log_format)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("sleeping-ta")
        .build()?;

    let report = runtime.block_on(simulation.run())?;

    println!(
        "{} Simulation complete: {}/{} students helped, peak {}/{} chairs, {} turned away, {:.1?}",
        "✓".green(),
        report.served(),
        report.students.len(),
        report.room.peak_occupied,
        report.room.capacity,
        report.room.rejections,
        report.elapsed,
    );

    Ok(())
}

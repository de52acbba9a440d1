//! Find the commit that introduced a compiler regression.
//!
//! Rebuilds the compiler at every commit `git bisect` proposes and labels it
//! with the exit code of the test command (0 = good, anything else = bad).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use clang_bisect::core::types::{Commit, CulpritReport, SessionOutcome};
use clang_bisect::error::BisectError;
use clang_bisect::exit_codes;
use clang_bisect::io::config::{BisectConfig, load_file_config};
use clang_bisect::io::process::SystemRunner;
use clang_bisect::logging;
use clang_bisect::session::BisectSession;

#[derive(Parser, Debug)]
#[command(
    name = "clang-bisect",
    version,
    about = "Bisect the compiler to find the commit that introduced a regression"
)]
struct Cli {
    /// Source location containing the compiler checkout and checkout script.
    #[arg(long, env = "SRC")]
    src: Option<PathBuf>,

    /// Build location containing the stage2 build directory.
    #[arg(long, env = "WORK")]
    work: Option<PathBuf>,

    /// TOML file overriding build commands, sanitized variables, and limits.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// Run `git bisect reset` once the search finishes.
    #[arg(long)]
    reset: bool,

    /// Do not echo build and test output.
    #[arg(short, long)]
    quiet: bool,

    /// Commit known not to have the regression.
    good: String,

    /// Commit known to have the regression.
    bad: String,

    /// Test command; exits 0 when the regression is absent.
    #[arg(last = true, required = true, num_args = 1..)]
    test_command: Vec<String>,
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
enum Report<'a> {
    Culprit(&'a CulpritReport),
    Exhausted { steps: u32 },
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let file = load_file_config(cli.config.as_deref()).context("load config")?;
    let config = BisectConfig::resolve(cli.src, cli.work, file)?;
    let runner = SystemRunner { quiet: cli.quiet };
    let mut session = BisectSession::open(&config, runner).context("open bisect session")?;

    let good = Commit::new(cli.good);
    let bad = Commit::new(cli.bad);
    let outcome = session.run(&good, &bad, &cli.test_command)?;

    if cli.reset {
        session.reset().context("reset bisect state")?;
    }

    let (report, code) = match &outcome {
        SessionOutcome::Culprit(report) => (Report::Culprit(report), exit_codes::OK),
        SessionOutcome::Exhausted { steps } => {
            (Report::Exhausted { steps: *steps }, exit_codes::EXHAUSTED)
        }
    };
    print_report(&report, cli.json)?;
    Ok(code)
}

fn print_report(report: &Report<'_>, json: bool) -> Result<()> {
    if json {
        let payload = serde_json::to_string_pretty(report).context("serialize report")?;
        println!("{payload}");
        return Ok(());
    }
    match report {
        Report::Culprit(report) => println!("Culprit commit {}", report.commit),
        Report::Exhausted { steps } => {
            println!("No culprit commit found after testing {steps} commits");
        }
    }
    Ok(())
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<BisectError>() {
        Some(BisectError::InvalidBoundary { .. }) => exit_codes::INVALID_BOUNDARY,
        _ => exit_codes::ERROR,
    }
}

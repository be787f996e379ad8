//! mk CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use mkgraph::makefile::DEFAULT_FILE;
use mkgraph::{Engine, Makefile};
use std::path::PathBuf;
use std::process::ExitCode;

/// Build a target from a YAML build description
#[derive(Debug, Parser)]
#[command(name = "mk", version, about)]
struct Cli {
    /// Target to build (prefix with ':' for phony targets)
    target: String,

    /// Build description file
    #[arg(short, long, default_value = DEFAULT_FILE)]
    file: PathBuf,

    /// Change to DIR before doing anything
    #[arg(short = 'C', long = "directory", value_name = "DIR")]
    directory: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Passed to every command as positional parameters
    #[arg(last = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mk: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("cannot change to {}", dir.display()))?;
    }

    let file = std::path::absolute(&cli.file)
        .with_context(|| format!("cannot resolve {}", cli.file.display()))?;
    let base_dir = file
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/"));

    log::debug!("Loading build description from: {}", file.display());
    let makefile = Makefile::from_file(&file)?;

    let mut engine = Engine::new()?;
    engine.set_args(cli.args);
    makefile.register(&mut engine, &base_dir)?;

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let report = engine.run_until(&cli.target, interrupted).await?;
    let goal = engine.graph().canonical(&cli.target);
    if report.up_to_date.contains(&goal) {
        log::info!("'{}' is up to date", cli.target);
    } else {
        log::info!("Ran {} action(s)", report.built.len());
    }
    Ok(())
}

use crate::config::AppConfig;
use crate::patch::Patcher;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "gl-static-patcher",
    version,
    about = "Restore LWJGL static imports in Java source trees"
)]
struct Cli {
    /// Increase verbosity (-v, -vv). Uses RUST_LOG under the hood
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a TOML config file with a [gl_static_patcher] section
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compute rewrites and report them without writing any file
    #[arg(long)]
    dry_run: bool,

    /// Target directory, or the exclusion rule file when TARGET is also given
    #[arg(value_name = "EXCLUDES|TARGET")]
    first: Option<PathBuf>,

    /// Target directory (defaults to the current directory)
    #[arg(value_name = "TARGET")]
    second: Option<PathBuf>,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .without_time()
        .try_init();
}

pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

pub fn run_cli_with<I, S>(args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    run(Cli::parse_from(args))
}

fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose);
    println!("GLStaticPatcher version {}", env!("CARGO_PKG_VERSION"));

    let mut cfg = AppConfig::load(cli.config.as_deref())
        .context("failed to load config")?
        .with_positionals(cli.first, cli.second);
    cfg.dry_run |= cli.dry_run;

    let exclusions = cfg.exclusions();
    let patcher = Patcher::new(&cfg.root, exclusions)?.dry_run(cfg.dry_run);
    tracing::debug!(
        rules = patcher.exclusions().len(),
        dry_run = cfg.dry_run,
        "patch start"
    );

    println!("Running in {}", patcher.root().display());
    let started = Instant::now();
    let summary = patcher.run();
    println!(
        "Patch completed, patched {} file(s) with {} failure(s) in {} ms",
        summary.processed,
        summary.failed,
        started.elapsed().as_millis()
    );
    if cfg.dry_run {
        println!("Dry run: {} file(s) would change", summary.changed);
    } else {
        tracing::info!("{} file(s) changed", summary.changed);
    }
    Ok(())
}

//! Command-line frontend: parse profiles, drill, analyze, save the map.

mod parser;

use anyhow::Result;
use clap::Parser;
use deepdrill_compute::{DrillMap, Driller, Error, MapAnalyzer, Options, SlowDriller};
use deepdrill_core::CancelFlag;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "deepdrill", version, about = "Deep-zoom Mandelbrot drill engine")]
struct Args {
    /// Profile files, applied in order
    #[arg(value_name = "PROFILE")]
    profiles: Vec<PathBuf>,

    /// Output map file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Override a single key, e.g. -k location.zoom=1e100
    #[arg(short = 'k', long = "key", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Fix the reference-selection seed for reproducible runs
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err
                .downcast_ref::<Error>()
                .is_some_and(|e| matches!(e, Error::UserInterrupt))
            {
                eprintln!("\x1b[95mUser Interrupt\x1b[0m");
            } else {
                eprintln!("\x1b[91mError:\x1b[0m {}", err);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut options = Options::new();

    for profile in &args.profiles {
        for (key, value) in parser::parse_file(profile)? {
            options.parse_key(&key, &value)?;
        }
    }
    for arg in &args.overrides {
        let (key, value) = parser::parse_override(arg)?;
        options.parse_key(&key, &value)?;
    }
    options.derive()?;

    info!(
        width = options.image.width,
        height = options.image.height,
        depth = options.location.depth,
        zoom = %options.location.zoom,
        precision = options.precision_bits,
        "drilling"
    );

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.cancel())?;
    }

    let mut map = DrillMap::new(&options);
    if options.perturbation.enable {
        let mut driller = Driller::with_cancel(&options, &mut map, cancel.clone());
        if let Some(seed) = args.seed {
            driller.set_seed(seed);
        }
        driller.drill()?;
    } else {
        SlowDriller::with_cancel(&options, &mut map, cancel.clone()).drill()?;
    }

    MapAnalyzer::analyze(&map, options.location.depth).report();

    if let Some(output) = &args.output {
        map.save(output)?;
        info!(path = %output.display(), "map written");
    }

    Ok(())
}

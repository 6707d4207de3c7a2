mod adapters;
mod app;
mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::App;
use cli::Args;
use stride_timing::{HighPrecisionTimer, SimulatedTimer};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if args.realtime {
        App::new(&args, HighPrecisionTimer::new())?.run()?;
    } else {
        App::new(&args, SimulatedTimer::new())?.run()?;
    }

    Ok(())
}

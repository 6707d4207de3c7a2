use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to config TOML (written with defaults if missing)
    #[arg(long, default_value = "stride.toml")]
    pub config: String,

    /// Seed for every random draw of the session; drawn from the OS when absent
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output file, one JSON object per finalized presentation
    #[arg(long, default_value = "events.jsonl")]
    pub output: String,

    /// Stop after this many trials
    #[arg(long)]
    pub trials: Option<usize>,

    /// Run on the wall clock instead of the simulated one
    #[arg(long, default_value_t = false)]
    pub realtime: bool,

    /// Scheduler step in milliseconds
    #[arg(long, default_value_t = 5)]
    pub step_ms: u64,

    /// Probability that the simulated participant lets a window pass
    #[arg(long, default_value_t = 0.05)]
    pub miss_rate: f32,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

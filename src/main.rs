//! Command line front end: renders one chart into a WAV file.

use std::{path::PathBuf, process::ExitCode};

use bms_mixdown::{ChartRenderer, rng::RandRng};
use clap::Parser;
use rand::{SeedableRng, rngs::StdRng};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Renders a BMS chart into a mixed autoplay WAV file", long_about = None)]
struct Cli {
    /// The chart to render. Assets are searched next to it.
    chart: PathBuf,
    /// Where to write the 32-bit float stereo WAV.
    output: PathBuf,
    /// Seed for `#RANDOM` draws, for reproducible output.
    #[arg(long)]
    seed: Option<u64>,
    /// Tempo used when the chart has no `#BPM`.
    #[arg(long, default_value_t = bms_mixdown::timeline::DEFAULT_BPM)]
    default_bpm: f64,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let rng = cli
        .seed
        .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    let mut renderer = ChartRenderer::with_rng(RandRng(rng)).with_default_bpm(cli.default_bpm);
    match renderer.render_file(&cli.chart, &cli.output) {
        Ok(summary) => {
            println!(
                "{}: {:.3}s, {} notes",
                summary.output.display(),
                summary.duration(),
                summary.notes
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(stage = %err.stage(), line = ?err.line(), "{err}");
            ExitCode::FAILURE
        }
    }
}

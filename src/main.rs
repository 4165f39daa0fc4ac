use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};

use showreel::{
    config::Config,
    media::FfmpegEngine,
    pipeline::ReelEngine,
};

#[derive(Parser)]
#[command(
    name = "showreel",
    version,
    about = "Assemble a portfolio showreel from a clip manifest",
    long_about = "Showreel trims the segments listed in a TOML manifest, letterboxes them \
onto a shared canvas, appends a black outro, and encodes a single output video."
)]
struct Cli {
    /// Path to the TOML clip manifest
    #[arg(short, long, default_value = "reel.toml")]
    manifest: PathBuf,

    /// Output video path (overrides the manifest's output.path)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    info!("Starting Showreel v{}", env!("CARGO_PKG_VERSION"));
    info!("Manifest: {:?}", cli.manifest);

    let mut config = Config::from_file(&cli.manifest)?;
    if let Some(output) = cli.output {
        config.output.path = output;
    }
    config.validate()?;

    let engine = ReelEngine::new(config, Box::new(FfmpegEngine::new()?));

    let report = match engine.assemble().await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    info!(
        "Done: {} ({:.1}s, {:.1} MB)",
        report.path.display(),
        report.duration,
        report.file_size as f64 / 1024.0 / 1024.0
    );
    Ok(())
}

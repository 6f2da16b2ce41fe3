use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m3u_aggregator::{
    config::Config,
    output::ArtifactWriter,
    pipeline::{Pipeline, load_template, log_run_report},
};

#[derive(Parser)]
#[command(name = "m3u-aggregator")]
#[command(version)]
#[command(about = "Aggregates live-channel playlists, ranks streams by latency and renders M3U/TXT output")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Channel template (overrides config file)
    #[arg(short, long, value_name = "PATH")]
    template: Option<String>,

    /// Output directory (overrides config file)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("m3u_aggregator={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting M3U Aggregator v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(template) = cli.template {
        config.template_path = template.into();
    }
    if let Some(output_dir) = cli.output_dir {
        config.output.output_dir = output_dir.into();
    }

    let template = load_template(&config.template_path).await?;
    let pipeline = Pipeline::from_config(&config)?;
    let output = pipeline.run(&template).await?;

    let written = ArtifactWriter::from_config(&config.output)
        .write(&output.artifacts)
        .await?;
    log_run_report(&output.report);
    info!(
        "Channel lists updated: {} and {}",
        written.playlist.display(),
        written.listing.display()
    );

    Ok(())
}

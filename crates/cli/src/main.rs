//! # streamtee CLI
//!
//! Entry point: parse arguments, initialize logging, open the sinks, and
//! hand standard input to the fan-out engine.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::Layer;

use cli::Cli;
use contracts::SinkTarget;
use engine::Engine;

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    let result = run(&cli);

    if let Err(ref e) = result {
        tracing::error!(error = %e, "streamtee failed");
    }

    result
}

/// Open the sinks and drive the engine to completion
fn run(cli: &Cli) -> Result<()> {
    let config = cli.engine_config();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = ?config.mode,
        block_size = config.block_size,
        outputs = cli.outputs.len(),
        "streamtee starting"
    );

    let mut targets = Vec::with_capacity(cli.outputs.len());
    for path in &cli.outputs {
        let target = SinkTarget::open(path)
            .with_context(|| format!("cannot open output {}", path.display()))?;
        debug!(sink = %target.name(), "output opened");
        targets.push(target);
    }

    let engine = Engine::new(config, std::io::stdin(), targets)?;
    let stats = engine.run()?;

    info!(
        bytes_read = stats.bytes_read,
        bytes_written = stats.bytes_written,
        broken_pipes = stats.broken_pipes,
        duration_secs = format!("{:.3}", stats.duration.as_secs_f64()),
        throughput_mib_s = format!("{:.2}", stats.throughput_mib_s()),
        "streamtee finished"
    );
    for sink in &stats.sinks {
        debug!(
            sink = %sink.name,
            bytes = sink.bytes_written,
            active = sink.active,
            "sink summary"
        );
    }

    Ok(())
}

/// Initialize logging based on CLI options. Everything goes to standard
/// error; the outputs carry data only.
fn init_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else {
        let default_level = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let fmt_layer = match cli.log_format {
        cli::LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
        cli::LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        cli::LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

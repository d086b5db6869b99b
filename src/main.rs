//! # kdpfc: Clustered k-Dollo Phylogeny Reconstruction
//!
//! ## Usage
//! ```bash
//! # Local search, 5 character clusters, 10 restarts
//! kdpfc input.txt output.txt -l 5 -N 10
//!
//! # Exact sub-solver with a 60 second limit per call
//! kdpfc input.txt output.txt --exact -T 60 -t 4
//! ```

use std::time::Instant;

use tracing::info;

use kdpfc::{Config, ReconstructionPipeline, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` overrides the level chosen by `-v`
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_timer(fmt::time::uptime()),
        )
        .init();
}

fn run() -> Result<()> {
    let start = Instant::now();

    // Parse and validate configuration
    let config = Config::parse_and_validate()?;
    init_logging(config.verbose);

    info!("kdpfc v{}", env!("CARGO_PKG_VERSION"));
    info!("Threads: {}", config.threads);

    let mut pipeline = ReconstructionPipeline::new(config);
    let report = pipeline.run()?;

    info!(
        "Log likelihood {:.6} after {} restart(s)",
        report.log_likelihood,
        report.restarts.len()
    );
    info!("Completed in {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}

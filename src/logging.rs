//! Diagnostic logging setup
//!
//! Diagnostics go to stderr through `tracing`; the advisory walker and
//! controller lines stay on stdout. `RUST_LOG` overrides the default filter.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub fn setup_logging(debug: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("randwalk=debug,warn")
        } else {
            EnvFilter::new("randwalk=info,warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

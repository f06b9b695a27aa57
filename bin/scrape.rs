// Supply Chain Registry - Scrape stage
// Drives a remote Chrome through the member table and the mill list download

use anyhow::Result;
use std::time::Instant;
use tracing::{info, warn};

use supply_chain_registry::{scrape_sources, ChromeProvider, DownloadOutcome, PipelineConfig, VERSION};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = PipelineConfig::from_env();
    info!("Supply chain registry v{}: scrape stage", VERSION);
    info!("Debugging endpoints: {}", config.endpoints.join(", "));

    let t0 = Instant::now();
    let provider = ChromeProvider::new(config.data_dir.clone());
    let summary = scrape_sources(&provider, &config)?;

    if summary.complete {
        info!("Member table: {} records from {} pages", summary.members, summary.pages);
    } else {
        warn!(
            "Member table incomplete: {} records from {} pages",
            summary.members, summary.pages
        );
    }
    if summary.mill_list == DownloadOutcome::LinkMissing {
        warn!("Mill list was not downloaded; the build stage will fail until a UML file is present");
    }

    info!("Scrape finished in {:.1} minutes", t0.elapsed().as_secs_f64() / 60.0);
    Ok(())
}

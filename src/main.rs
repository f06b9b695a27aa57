use anyhow::{bail, Result};
use std::env;
use std::time::Instant;
use tracing::info;

use supply_chain_registry::{build_registry, clean_source, CleanedSource, PipelineConfig, StandardCleaner, VERSION};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = parse_command(&args)?;
    let config = PipelineConfig::from_env();

    match command {
        Command::Build => run_build(&config)?,
        Command::Clean(source) => run_clean(&source, &config)?,
    }

    Ok(())
}

const USAGE: &str = "usage: supply-chain-registry [clean <rspo|uml>]";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Build,
    /// Clean a single source and report, without writing the registry
    Clean(String),
}

fn parse_command(args: &[String]) -> Result<Command> {
    match args {
        [] => Ok(Command::Build),
        [cmd, source] if cmd == "clean" => Ok(Command::Clean(source.clone())),
        [cmd] if cmd == "clean" => bail!("missing source for 'clean'\n{}", USAGE),
        _ => bail!("unexpected arguments: {}\n{}", args.join(" "), USAGE),
    }
}

fn run_build(config: &PipelineConfig) -> Result<()> {
    info!("Supply chain registry v{}: build stage", VERSION);
    info!("Reading sources from {}", config.data_dir.display());

    let t0 = Instant::now();
    let summary = build_registry(config, &StandardCleaner::new())?;

    info!(
        "Registry complete: {} entities ({} input rows, {} duplicates, {} blank names)",
        summary.report.output, summary.report.input, summary.report.duplicates, summary.report.blank
    );
    info!("Wrote {} and {}", config.registry_path().display(), config.registry_db_path().display());
    info!("Run {} finished in {:.1}s", summary.run.run_id, t0.elapsed().as_secs_f64());

    Ok(())
}

fn run_clean(source: &str, config: &PipelineConfig) -> Result<()> {
    let cleaned = clean_source(source, config, &StandardCleaner::new())?;
    let rows = match &cleaned {
        CleanedSource::Members(records) => records.len(),
        CleanedSource::Mills(records) => records.len(),
    };
    info!("Source '{}' cleaned: {} rows", source, rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_no_arguments_builds() {
        assert_eq!(parse_command(&[]).unwrap(), Command::Build);
    }

    #[test]
    fn test_clean_takes_a_source() {
        assert_eq!(parse_command(&args(&["clean", "uml"])).unwrap(), Command::Clean("uml".to_string()));
    }

    #[test]
    fn test_clean_without_source_is_a_usage_error() {
        let err = parse_command(&args(&["clean"])).unwrap_err();
        assert!(err.to_string().contains("missing source"));
        assert!(err.to_string().contains(USAGE));
    }

    #[test]
    fn test_unknown_arguments_are_rejected() {
        assert!(parse_command(&args(&["import"])).is_err());
        assert!(parse_command(&args(&["clean", "rspo", "extra"])).is_err());
    }
}

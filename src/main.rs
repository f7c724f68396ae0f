//! sampleref CLI - Resolve sample identifiers against BioSamples and Webin.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sampleref::models::Environment;
use sampleref::{Config, Sample, SampleResolver, ValidationReport};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "sampleref")]
#[command(version)]
#[command(about = "Resolve submitter sample identifiers against BioSamples and Webin")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one or more sample identifiers
    Resolve {
        /// BioSamples accessions, Webin sample IDs or aliases
        #[arg(required = true)]
        ids: Vec<String>,

        /// Print resolved samples as JSON
        #[arg(long)]
        json: bool,

        /// Append failures to this report file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

/// `--verbose` forces DEBUG; otherwise `RUST_LOG` applies, defaulting to INFO.
fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn setup_logging(verbose: bool) {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(verbose))
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {path:?}")),
        None => Ok(Config::for_environment(Environment::Production)),
    }
}

fn print_example_config() {
    let example = r#"# sampleref configuration file

# "production" or "test" (selects the default service URIs)
environment = "production"

[auth]
# Token endpoint
# uri = "https://www.ebi.ac.uk/ena/submit/webin/auth/token"
# Webin credentials (can also use WEBIN_USERNAME / WEBIN_PASSWORD env vars)
# username = "Webin-12345"
# password = "${MY_WEBIN_PASSWORD}"
# Pre-issued token (can also use WEBIN_TOKEN env var)
# token = "..."
timeout_secs = 60

[biosamples]
# uri = "https://www.ebi.ac.uk/biosamples/"
# Separate credentials for BioSamples token acquisition
# username = "Webin-67890"
# password = "${BIOSAMPLES_PASSWORD}"
timeout_secs = 60

[webin]
# uri = "https://www.ebi.ac.uk/ena/submit/drop-box/"
timeout_secs = 60
"#;
    println!("{example}");
}

fn print_sample(sample: &Sample) {
    println!("{}", sample.sra_sample_id.as_deref().or(sample.biosample_id.as_deref()).unwrap_or("-"));
    println!("  BioSample:  {}", sample.biosample_id.as_deref().unwrap_or("-"));
    println!("  SRA sample: {}", sample.sra_sample_id.as_deref().unwrap_or("-"));
    println!("  Name:       {}", sample.name.as_deref().unwrap_or("-"));
    println!("  Organism:   {}", sample.organism.as_deref().unwrap_or("-"));
    match sample.tax_id {
        Some(tax_id) => println!("  Tax ID:     {tax_id}"),
        None => println!("  Tax ID:     -"),
    }
    for attribute in &sample.attributes {
        let value = attribute.value.as_deref().unwrap_or("");
        match attribute.unit.as_deref() {
            Some(unit) => println!("  {} = {value} {unit}", attribute.tag),
            None => println!("  {} = {value}", attribute.tag),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Example => {
            print_example_config();
        }

        Commands::Validate => {
            let config = load_config(cli.config.as_deref())?;
            let settings = config
                .resolver_settings()
                .context("Invalid configuration")?;

            info!("Configuration is valid");
            info!("  Environment: {:?}", config.environment);
            info!("  BioSamples:  {}", settings.biosamples.base_uri());
            info!("  Webin:       {}", settings.webin.base_uri());
            if settings.biosamples.token().is_none() && settings.biosamples.auth().is_none() {
                warn!("No Webin credentials or token configured; BioSamples requests will fail");
            }
        }

        Commands::Resolve { ids, json, report } => {
            let config = load_config(cli.config.as_deref())?;
            let resolver =
                SampleResolver::from_config(&config).context("Failed to create resolver")?;

            let mut builder = ValidationReport::builder().log();
            if let Some(path) = &report {
                builder = builder.file(path);
            }
            let report = builder
                .build()
                .context("Failed to open validation report")?;

            let mut resolved = Vec::new();
            for id in &ids {
                if let Some(sample) = resolver.resolve_into_report(id, &report).await {
                    resolved.push(sample);
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                for sample in &resolved {
                    print_sample(sample);
                }
            }

            let failed = ids.len() - resolved.len();
            if failed > 0 {
                bail!("{failed} of {} sample(s) could not be resolved", ids.len());
            }
        }
    }

    Ok(())
}

///
/// This module implements the CLI glue for contentstack-republish: argument
/// parsing, config loading, operator prompt and the call into the pipeline.
///
/// The only flag is `--config`, pointing at an optional YAML settings file.
/// Environment and content type are always chosen interactively.
///
/// For programmatic/integration use: call [`run_with`] with your own prompter
/// and API clients, or [`run`] for the stdin/stdout + reqwest setup.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::client::ContentstackClient;
use crate::contract::{DeliveryApi, ManagementApi, Prompter};
use crate::load_config::{load_config, Settings};
use crate::prompt::LinePrompter;
use crate::republish::{republish, select_target, RepublishReport};

/// Republish Contentstack entries in bulk, locale by locale.
#[derive(Debug, Parser)]
#[clap(
    name = "contentstack-republish",
    version,
    about = "Fetch Contentstack entries for every locale and bulk republish them"
)]
pub struct Cli {
    /// Path to a YAML settings file (locales, environments, content types, endpoints, retry)
    #[clap(long)]
    pub config: Option<PathBuf>,
}

/// Load config from `cli`, prompt on the terminal and run against Contentstack.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let client = ContentstackClient::new(config.credentials.clone(), config.settings.endpoints());
    let mut prompter = LinePrompter::stdio();

    let report = run_with(&config.settings, &mut prompter, &client, &client).await?;
    println!(
        "Republished {} entries of {} to {} across {} locales.",
        report.total_entries(),
        report.content_type,
        report.environment,
        report.locales.len()
    );
    Ok(())
}

/// Prompt, fetch and publish with the given collaborators.
pub async fn run_with<P, D, M>(
    settings: &Settings,
    prompter: &mut P,
    delivery: &D,
    management: &M,
) -> Result<RepublishReport>
where
    P: Prompter + ?Sized,
    D: DeliveryApi + ?Sized,
    M: ManagementApi + ?Sized,
{
    let selection = select_target(prompter, settings).context("Failed to read operator selection")?;
    tracing::info!(command = "republish", ?selection, "Starting republish run");

    match republish(settings, &selection, delivery, management).await {
        Ok(report) => {
            tracing::info!(command = "republish", ?report, "Republish complete");
            Ok(report)
        }
        Err(e) => {
            tracing::error!(command = "republish", error = %e, payload = %e.payload(), "Republish failed");
            Err(anyhow::Error::new(e).context("Republish failed"))
        }
    }
}

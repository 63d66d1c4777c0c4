/// `load_config` module: secrets from the environment, settings from an optional YAML file.
///
/// The three Contentstack secrets are never read from the settings file. They
/// come from `CS_MANAGEMENT_TOKEN`, `CS_API_KEY` and `CS_DELIVERY_TOKEN` (a
/// `.env` file is loaded by the binary before this runs).
///
/// Every setting has a default, so running without `--config` reproduces the
/// stock setup: five locales, `stage`/`prod`, `articles`/`courses`, the EU
/// endpoints, pages of 100 and batches of 10.
use std::fmt;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{RepublishError, Result};
use crate::fetch::PAGE_SIZE;
use crate::publish::BATCH_SIZE;
use crate::retry::RetryPolicy;

pub const MANAGEMENT_TOKEN_VAR: &str = "CS_MANAGEMENT_TOKEN";
pub const API_KEY_VAR: &str = "CS_API_KEY";
pub const DELIVERY_TOKEN_VAR: &str = "CS_DELIVERY_TOKEN";

/// Opaque, pre-issued Contentstack secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub management_token: String,
    pub api_key: String,
    pub delivery_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("management_token", &"<redacted>")
            .field("api_key", &"<redacted>")
            .field("delivery_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            management_token: secret(MANAGEMENT_TOKEN_VAR)?,
            api_key: secret(API_KEY_VAR)?,
            delivery_token: secret(DELIVERY_TOKEN_VAR)?,
        })
    }
}

fn secret(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => {
            info!(var, "Secret found in env");
            Ok(value)
        }
        Ok(_) => {
            error!(var, "Secret is empty");
            Err(RepublishError::Config(format!("{var} is empty")))
        }
        Err(e) => {
            error!(error = ?e, var, "Secret environment variable not set");
            Err(RepublishError::Config(format!("{var} environment variable not set: {e}")))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub delivery_base_url: String,
    pub management_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            delivery_base_url: "https://eu-cdn.contentstack.com".to_string(),
            management_base_url: "https://eu-api.contentstack.com".to_string(),
        }
    }
}

/// Non-secret settings, as read from YAML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub locales: Vec<String>,
    pub environments: Vec<String>,
    pub content_types: Vec<String>,
    pub delivery_base_url: String,
    pub management_base_url: String,
    pub page_size: u32,
    pub batch_size: usize,
    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        let endpoints = Endpoints::default();
        Self {
            locales: ["en-us", "ru-ru", "uk-ua", "es", "hu-hu"]
                .map(String::from)
                .to_vec(),
            environments: ["stage", "prod"].map(String::from).to_vec(),
            content_types: ["articles", "courses"].map(String::from).to_vec(),
            delivery_base_url: endpoints.delivery_base_url,
            management_base_url: endpoints.management_base_url,
            page_size: PAGE_SIZE,
            batch_size: BATCH_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

impl Settings {
    /// Parse settings YAML and validate it.
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty file means "all defaults".
        let settings: Settings = if content.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                error!(error = ?e, "Failed to parse settings YAML");
                RepublishError::Config(format!("failed to parse settings YAML: {e}"))
            })?
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        non_empty_unique("locales", &self.locales)?;
        non_empty_unique("environments", &self.environments)?;
        non_empty_unique("content_types", &self.content_types)?;

        let locale_code = Regex::new(r"^[a-z]{2,3}(-[a-z0-9]{2,4})?$")
            .map_err(|e| RepublishError::Config(e.to_string()))?;
        if let Some(bad) = self.locales.iter().find(|l| !locale_code.is_match(l)) {
            return Err(RepublishError::Config(format!("invalid locale code: {bad:?}")));
        }

        // Content type uids end up as a URL path segment.
        let content_type_uid = Regex::new(r"^[a-z][a-z0-9_]*$")
            .map_err(|e| RepublishError::Config(e.to_string()))?;
        if let Some(bad) = self
            .content_types
            .iter()
            .find(|c| !content_type_uid.is_match(c))
        {
            return Err(RepublishError::Config(format!("invalid content type uid: {bad:?}")));
        }

        if !(1..=PAGE_SIZE).contains(&self.page_size) {
            return Err(RepublishError::Config(format!(
                "page_size must be between 1 and {PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if !(1..=BATCH_SIZE).contains(&self.batch_size) {
            return Err(RepublishError::Config(format!(
                "batch_size must be between 1 and {BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        if self.retry.factor < 1.0 {
            return Err(RepublishError::Config(format!(
                "retry.factor must be at least 1, got {}",
                self.retry.factor
            )));
        }
        if self.retry.initial_delay > self.retry.max_delay {
            return Err(RepublishError::Config(
                "retry.initial_delay_secs must not exceed retry.max_delay_secs".to_string(),
            ));
        }
        Ok(())
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            delivery_base_url: self.delivery_base_url.clone(),
            management_base_url: self.management_base_url.clone(),
        }
    }
}

fn non_empty_unique(key: &str, values: &[String]) -> Result<()> {
    if values.is_empty() {
        return Err(RepublishError::Config(format!("{key} must not be empty")));
    }
    for (i, v) in values.iter().enumerate() {
        if v.trim().is_empty() {
            return Err(RepublishError::Config(format!("{key} contains an empty value")));
        }
        if values[..i].contains(v) {
            return Err(RepublishError::Config(format!("{key} lists {v:?} twice")));
        }
    }
    Ok(())
}

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct RepublishConfig {
    pub credentials: Credentials,
    pub settings: Settings,
}

/// Read secrets from the environment and settings from `path`, or defaults
/// when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<RepublishConfig> {
    let settings = match path {
        Some(path) => {
            info!(config_path = ?path, "Loading settings from file");
            let content = fs::read_to_string(path).map_err(|e| {
                error!(error = ?e, config_path = ?path, "Failed to read settings file");
                RepublishError::Config(format!("failed to read settings file {path:?}: {e}"))
            })?;
            Settings::from_yaml(&content)?
        }
        None => {
            info!("No settings file given, using defaults");
            Settings::default()
        }
    };

    let credentials = Credentials::from_env()?;

    info!(
        locales = ?settings.locales,
        environments = ?settings.environments,
        content_types = ?settings.content_types,
        "Config loaded and merged successfully"
    );

    Ok(RepublishConfig {
        credentials,
        settings,
    })
}

//! High-level pipeline: operator selection → fetch every locale → publish every locale.
//!
//! A run moves through [`RunStage`] in one direction only:
//! `AwaitingInput → Fetching → Fetched → Publishing → Done`, or to `Failed`
//! from `Fetching`/`Publishing`. There is no resume: a failed run is started
//! again from scratch.
//!
//! # Responsibilities
//! - Ask the operator for an environment and a content type ([`select_target`])
//! - Drain the delivery API for every configured locale, then hand the whole
//!   [`LocaleEntrySet`] over to the publisher ([`republish`])
//! - Log each stage transition and return a [`RepublishReport`]
//!
//! Nothing runs concurrently: one request is in flight at a time.

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::contract::{DeliveryApi, LocaleEntrySet, ManagementApi, Prompter};
use crate::error::Result;
use crate::fetch::fetch_all_entries;
use crate::load_config::Settings;
use crate::publish::{publish_all_entries, LocalePublishReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    AwaitingInput,
    Fetching,
    Fetched,
    Publishing,
    Done,
    Failed,
}

/// The operator's two choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub environment: String,
    pub content_type: String,
}

#[derive(Debug)]
pub struct RepublishReport {
    pub run_id: Uuid,
    pub environment: String,
    pub content_type: String,
    pub locales: Vec<LocalePublishReport>,
}

impl RepublishReport {
    pub fn total_entries(&self) -> usize {
        self.locales.iter().map(|l| l.entries).sum()
    }
}

/// Ask for the environment first, then the content type.
pub fn select_target<P>(prompter: &mut P, settings: &Settings) -> Result<Selection>
where
    P: Prompter + ?Sized,
{
    info!(stage = ?RunStage::AwaitingInput, "[RUN] Waiting for operator input");
    let environment = prompter.select("Select the environment:", &settings.environments)?;
    let content_type = prompter.select("Select the content type:", &settings.content_types)?;
    info!(%environment, %content_type, "[RUN] Operator selection received");
    Ok(Selection {
        environment,
        content_type,
    })
}

fn transition(run_id: Uuid, stage: RunStage) {
    info!(%run_id, stage = ?stage, "[RUN] Stage changed");
}

/// Fetch, then publish, everything for `selection`.
pub async fn republish<D, M>(
    settings: &Settings,
    selection: &Selection,
    delivery: &D,
    management: &M,
) -> Result<RepublishReport>
where
    D: DeliveryApi + ?Sized,
    M: ManagementApi + ?Sized,
{
    let run_id = Uuid::new_v4();
    info!(
        %run_id,
        environment = %selection.environment,
        content_type = %selection.content_type,
        "[RUN] Starting republish"
    );

    transition(run_id, RunStage::Fetching);
    let entries_by_locale = match fetch_all_entries(
        delivery,
        &settings.locales,
        &selection.environment,
        &selection.content_type,
        settings.page_size,
    )
    .await
    {
        Ok(set) => set,
        Err(e) => {
            error!(%run_id, stage = ?RunStage::Failed, phase = "fetch", error = %e, "[RUN][ERROR] Fetch phase failed");
            return Err(e);
        }
    };

    transition(run_id, RunStage::Fetched);
    log_fetched(&entries_by_locale);

    transition(run_id, RunStage::Publishing);
    let locales = match publish_all_entries(
        management,
        &settings.retry,
        entries_by_locale,
        &selection.environment,
        &selection.content_type,
        settings.batch_size,
    )
    .await
    {
        Ok(reports) => reports,
        Err(e) => {
            error!(%run_id, stage = ?RunStage::Failed, phase = "publish", error = %e, "[RUN][ERROR] Publish phase failed");
            return Err(e);
        }
    };

    transition(run_id, RunStage::Done);
    Ok(RepublishReport {
        run_id,
        environment: selection.environment.clone(),
        content_type: selection.content_type.clone(),
        locales,
    })
}

fn log_fetched(set: &LocaleEntrySet) {
    for (locale, entries) in set.iter() {
        info!(locale, entries = entries.len(), "[RUN] Entries fetched for locale");
    }
    info!(total = set.total_entries(), locales = set.len(), "[RUN] All entries fetched");
    match serde_json::to_string_pretty(set) {
        Ok(json) => debug!(json = %json, "[RUN] Fetched entries as JSON"),
        Err(e) => error!(error = ?e, "[RUN] Failed to serialize fetched entries as JSON"),
    }
}

//! Publisher: bulk republishes fetched entries, one locale at a time.
//!
//! Entries are cut into consecutive batches of at most `batch_size`, each sent
//! as one bulk publish request scoped to a single locale and environment.
//! A batch that keeps failing after its retries aborts the locale and, through
//! [`publish_all_entries`], the rest of the run.

use tracing::{error, info};

use crate::contract::{BulkPublishRequest, Entry, LocaleEntrySet, ManagementApi, PublishReference};
use crate::error::{RepublishError, Result};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Largest batch the bulk publish endpoint accepts.
pub const BATCH_SIZE: usize = 10;

/// Outcome of one successfully published batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub entries: usize,
    pub attempts: u32,
}

/// Outcome of publishing one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalePublishReport {
    pub locale: String,
    pub entries: usize,
    pub batches: Vec<BatchReport>,
}

/// Build the bulk publish request bodies for one locale, in entry order.
///
/// Every reference and the request's `locales` are the given `locale`, never
/// the entry's own tag.
pub fn batches(
    entries: &[Entry],
    locale: &str,
    environment: &str,
    content_type: &str,
    batch_size: usize,
) -> Vec<BulkPublishRequest> {
    entries
        .chunks(batch_size.max(1))
        .map(|chunk| BulkPublishRequest {
            entries: chunk
                .iter()
                .map(|entry| PublishReference {
                    uid: entry.uid.clone(),
                    content_type: content_type.to_string(),
                    version: entry.version,
                    locale: locale.to_string(),
                })
                .collect(),
            locales: vec![locale.to_string()],
            environments: vec![environment.to_string()],
            publish_with_reference: false,
        })
        .collect()
}

/// Publish one locale's entries batch by batch.
pub async fn publish_entries<M>(
    api: &M,
    policy: &RetryPolicy,
    entries: &[Entry],
    locale: &str,
    environment: &str,
    content_type: &str,
    batch_size: usize,
) -> Result<LocalePublishReport>
where
    M: ManagementApi + ?Sized,
{
    let requests = batches(entries, locale, environment, content_type, batch_size);
    let mut reports = Vec::with_capacity(requests.len());

    for (index, request) in requests.iter().enumerate() {
        let mut attempts = 0u32;
        let label = format!("bulk publish {locale}/{environment} batch {index}");

        let outcome = retry_with_backoff(policy, &label, || {
            attempts += 1;
            api.bulk_publish(request)
        })
        .await;

        match outcome {
            Ok(response) => {
                info!(
                    locale,
                    environment,
                    batch = index,
                    entries = request.entries.len(),
                    attempts,
                    response = %response,
                    "[PUBLISH] Successfully published batch"
                );
                reports.push(BatchReport {
                    entries: request.entries.len(),
                    attempts,
                });
            }
            Err(e) => {
                error!(
                    locale,
                    environment,
                    batch = index,
                    attempts,
                    payload = %e.payload(),
                    "[PUBLISH][ERROR] Error publishing batch for locale"
                );
                return Err(RepublishError::Publish {
                    locale: locale.to_string(),
                    batch: index,
                    attempts,
                    source: Box::new(e),
                });
            }
        }
    }

    Ok(LocalePublishReport {
        locale: locale.to_string(),
        entries: entries.len(),
        batches: reports,
    })
}

/// Publish every locale in the set's insertion order.
pub async fn publish_all_entries<M>(
    api: &M,
    policy: &RetryPolicy,
    entries_by_locale: LocaleEntrySet,
    environment: &str,
    content_type: &str,
    batch_size: usize,
) -> Result<Vec<LocalePublishReport>>
where
    M: ManagementApi + ?Sized,
{
    let mut reports = Vec::with_capacity(entries_by_locale.len());
    for (locale, entries) in entries_by_locale {
        info!(locale = %locale, entries = entries.len(), "[PUBLISH] Publishing locale");
        let report = publish_entries(
            api,
            policy,
            &entries,
            &locale,
            environment,
            content_type,
            batch_size,
        )
        .await?;
        reports.push(report);
    }
    Ok(reports)
}

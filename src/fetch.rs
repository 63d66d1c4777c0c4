//! Fetcher: drains the delivery API's entry listing for each configured locale.
//!
//! Pagination is offset based (`skip += limit`). The total is read from the
//! first page only and used as the loop bound for the rest of the locale, even
//! if later pages report something else.

use tracing::{debug, error, info, warn};

use crate::contract::{DeliveryApi, Entry, LocaleEntrySet, PageQuery};
use crate::error::{RepublishError, Result};

/// Default (and maximum) page size accepted by the delivery API.
pub const PAGE_SIZE: u32 = 100;

/// Fetch every entry of `content_type` published to `environment` in `locale`.
pub async fn fetch_entries<D>(
    api: &D,
    locale: &str,
    environment: &str,
    content_type: &str,
    page_size: u32,
) -> Result<Vec<Entry>>
where
    D: DeliveryApi + ?Sized,
{
    let mut all_entries: Vec<Entry> = Vec::new();
    let mut skip: u32 = 0;
    let mut total: u64 = 0;

    loop {
        let query = PageQuery {
            content_type: content_type.to_string(),
            locale: locale.to_string(),
            environment: environment.to_string(),
            limit: page_size,
            skip,
        };

        let page = match api.fetch_page(&query).await {
            Ok(page) => page,
            Err(e) => {
                error!(locale, skip, error = %e, "[FETCH][ERROR] Error fetching entries for locale");
                return Err(e);
            }
        };

        if skip == 0 {
            total = match page.count {
                Some(count) => count,
                None => {
                    error!(locale, "[FETCH][ERROR] First page carried no count");
                    return Err(RepublishError::Malformed(format!(
                        "first page for locale {locale} has no count"
                    )));
                }
            };
        } else if let Some(count) = page.count.filter(|c| *c != total) {
            warn!(locale, skip, snapshot = total, reported = count, "[FETCH] Remote count changed during pagination, keeping first-page count");
        }

        if let Some(stray) = page.entries.iter().find(|e| e.locale != locale) {
            error!(locale, uid = %stray.uid, found = %stray.locale, "[FETCH][ERROR] Entry returned under the wrong locale");
            return Err(RepublishError::LocaleMismatch {
                uid: stray.uid.clone(),
                expected: locale.to_string(),
                found: stray.locale.clone(),
            });
        }

        let fetched_now = page.entries.len();
        all_entries.extend(page.entries);
        skip += page_size;

        info!(
            locale,
            fetched = fetched_now,
            total_fetched = all_entries.len(),
            count = total,
            "[FETCH] Fetched entries page"
        );

        if all_entries.len() as u64 >= total {
            break;
        }
        if fetched_now == 0 {
            error!(locale, total_fetched = all_entries.len(), count = total, "[FETCH][ERROR] Empty page before reaching the reported count");
            return Err(RepublishError::Malformed(format!(
                "locale {locale}: empty page at skip {} with {}/{} entries fetched",
                skip - page_size,
                all_entries.len(),
                total
            )));
        }
    }

    info!(locale, entries = all_entries.len(), "[FETCH] Successfully fetched all entries for locale");
    Ok(all_entries)
}

/// Fetch every locale in order, one locale fully drained before the next.
pub async fn fetch_all_entries<D>(
    api: &D,
    locales: &[String],
    environment: &str,
    content_type: &str,
    page_size: u32,
) -> Result<LocaleEntrySet>
where
    D: DeliveryApi + ?Sized,
{
    let mut set = LocaleEntrySet::new();
    for locale in locales {
        debug!(locale = %locale, environment, content_type, "[FETCH] Starting locale");
        let entries = fetch_entries(api, locale, environment, content_type, page_size).await?;
        set.insert(locale.clone(), entries);
    }
    Ok(set)
}

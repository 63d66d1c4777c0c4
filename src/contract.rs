//! # contract: data model and the seams between the pipeline and the outside world
//!
//! The pipeline talks to three things it does not own: the Contentstack
//! delivery API (read entries), the management API (bulk publish) and the
//! operator (pick environment and content type). Each is a trait here so the
//! fetch/publish logic can run against the reqwest client in production and
//! against `mockall` mocks in tests.
//!
//! ## Mocking & Testing
//! - The traits are annotated for `mockall`; with the default
//!   `test-export-mocks` feature the generated `Mock*` types are public so
//!   integration tests can use them too.

use async_trait::async_trait;
use mockall::automock;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A content entry as returned by the delivery API.
///
/// Only `uid`, `locale` and `_version` carry meaning for the pipeline; any other
/// field the API returns is kept untouched in `body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub uid: String,
    pub locale: String,
    #[serde(rename = "_version")]
    pub version: u64,
    #[serde(flatten)]
    pub body: serde_json::Map<String, serde_json::Value>,
}

impl Entry {
    pub fn new(uid: impl Into<String>, locale: impl Into<String>, version: u64) -> Self {
        Self {
            uid: uid.into(),
            locale: locale.into(),
            version,
            body: serde_json::Map::new(),
        }
    }
}

/// Entries grouped by locale, in the order locales were inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocaleEntrySet {
    sets: Vec<(String, Vec<Entry>)>,
}

impl LocaleEntrySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the entries for `locale`. Re-inserting a locale replaces its
    /// entries but keeps its original position.
    pub fn insert(&mut self, locale: impl Into<String>, entries: Vec<Entry>) {
        let locale = locale.into();
        match self.sets.iter_mut().find(|(l, _)| *l == locale) {
            Some((_, existing)) => *existing = entries,
            None => self.sets.push((locale, entries)),
        }
    }

    pub fn get(&self, locale: &str) -> Option<&[Entry]> {
        self.sets
            .iter()
            .find(|(l, _)| l == locale)
            .map(|(_, e)| e.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Entry])> {
        self.sets.iter().map(|(l, e)| (l.as_str(), e.as_slice()))
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.sets.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn total_entries(&self) -> usize {
        self.sets.iter().map(|(_, e)| e.len()).sum()
    }
}

impl IntoIterator for LocaleEntrySet {
    type Item = (String, Vec<Entry>);
    type IntoIter = std::vec::IntoIter<(String, Vec<Entry>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.into_iter()
    }
}

impl Serialize for LocaleEntrySet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sets.len()))?;
        for (locale, entries) in &self.sets {
            map.serialize_entry(locale, entries)?;
        }
        map.end()
    }
}

/// One page request against the delivery API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub content_type: String,
    pub locale: String,
    pub environment: String,
    pub limit: u32,
    pub skip: u32,
}

/// One page of the delivery API's entries listing.
///
/// `count` is only present when the request asked for it (`include_count=true`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntriesPage {
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Minimal reference to an entry inside a bulk publish request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReference {
    pub uid: String,
    pub content_type: String,
    pub version: u64,
    pub locale: String,
}

/// Body of `POST /v3/bulk/publish`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkPublishRequest {
    pub entries: Vec<PublishReference>,
    pub locales: Vec<String>,
    pub environments: Vec<String>,
    pub publish_with_reference: bool,
}

/// Read side: paginated entry listing.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DeliveryApi: Send + Sync {
    /// Fetch a single page of entries.
    async fn fetch_page(&self, query: &PageQuery) -> Result<EntriesPage>;
}

/// Write side: bulk publishing.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Submit one bulk publish request, returning the API's response body.
    async fn bulk_publish(&self, request: &BulkPublishRequest) -> Result<serde_json::Value>;
}

/// Operator-facing choice prompt.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Prompter {
    /// Ask the operator to pick exactly one of `choices`.
    fn select(&mut self, message: &str, choices: &[String]) -> Result<String>;
}

#![doc = "reqwest client for the Contentstack delivery and management APIs."]
//
//! # Contentstack client
//!
//! [`ContentstackClient`] implements both [`DeliveryApi`] and [`ManagementApi`]
//! on one shared `reqwest::Client`. Base URLs are configurable so the client can
//! target another region or a local test server.
//!
//! - Delivery: `GET {delivery}/v3/content_types/{content_type}/entries`,
//!   authenticated with the `access_token` and `api_key` headers.
//! - Management: `POST {management}/v3/bulk/publish`, authenticated with the
//!   `authorization` and `api_key` headers.
//!
//! Transport failures map to [`RepublishError::Network`], non-2xx answers to
//! [`RepublishError::Remote`] and undecodable bodies to
//! [`RepublishError::Malformed`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::contract::{BulkPublishRequest, DeliveryApi, EntriesPage, ManagementApi, PageQuery};
use crate::error::{RepublishError, Result};
use crate::load_config::{Credentials, Endpoints};

/// Base fields kept in delivery responses.
const BASE_FIELDS: [&str; 3] = ["uid", "locale", "_version"];

pub struct ContentstackClient {
    http: reqwest::Client,
    credentials: Credentials,
    endpoints: Endpoints,
}

impl ContentstackClient {
    pub fn new(credentials: Credentials, endpoints: Endpoints) -> Self {
        Self::with_http(reqwest::Client::new(), credentials, endpoints)
    }

    pub fn with_http(http: reqwest::Client, credentials: Credentials, endpoints: Endpoints) -> Self {
        tracing::info!(
            delivery = %endpoints.delivery_base_url,
            management = %endpoints.management_base_url,
            "Initialized Contentstack client"
        );
        Self {
            http,
            credentials,
            endpoints,
        }
    }

    fn entries_url(&self, content_type: &str) -> String {
        format!(
            "{}/v3/content_types/{}/entries",
            self.endpoints.delivery_base_url.trim_end_matches('/'),
            content_type
        )
    }

    fn bulk_publish_url(&self) -> String {
        format!(
            "{}/v3/bulk/publish",
            self.endpoints.management_base_url.trim_end_matches('/')
        )
    }
}

/// Turn a response into `T`, keeping the body of failed requests for the log.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(RepublishError::Remote {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| RepublishError::Malformed(format!("{e}: {body}")))
}

#[async_trait]
impl DeliveryApi for ContentstackClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<EntriesPage> {
        let url = self.entries_url(&query.content_type);
        let mut params: Vec<(&str, String)> = vec![
            ("locale", query.locale.clone()),
            ("limit", query.limit.to_string()),
            ("skip", query.skip.to_string()),
            ("environment", query.environment.clone()),
            ("include_count", "true".to_string()),
        ];
        params.extend(BASE_FIELDS.iter().map(|f| ("only[BASE][]", f.to_string())));

        tracing::debug!(url = %url, locale = %query.locale, skip = query.skip, "Requesting entries page");
        let response = self
            .http
            .get(&url)
            .query(&params)
            .header("access_token", &self.credentials.delivery_token)
            .header("api_key", &self.credentials.api_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, url = %url, "Failed to reach delivery API");
                RepublishError::Network(e)
            })?;

        decode(response).await
    }
}

#[async_trait]
impl ManagementApi for ContentstackClient {
    async fn bulk_publish(&self, request: &BulkPublishRequest) -> Result<serde_json::Value> {
        let url = self.bulk_publish_url();
        tracing::debug!(
            url = %url,
            entries = request.entries.len(),
            locales = ?request.locales,
            "Submitting bulk publish"
        );
        let response = self
            .http
            .post(&url)
            .header("authorization", &self.credentials.management_token)
            .header("api_key", &self.credentials.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, url = %url, "Failed to reach management API");
                RepublishError::Network(e)
            })?;

        decode(response).await
    }
}

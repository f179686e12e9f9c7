//! Hipolabs universities-directory lookup.
//!
//! One search call; the first match supplies country and state/province, and
//! its first listed domain becomes a Clearbit logo URL (pure string
//! synthesis, no extra round-trip).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::cache::{normalize, CacheStore, HOUR_SECS};
use crate::enricher::Lookup;
use crate::record::Enrichment;

const HIPOLABS_BASE: &str = "http://universities.hipolabs.com";
const CLEARBIT_LOGO: &str = "https://logo.clearbit.com";

pub struct HipolabsClient {
    http: Client,
    cache: Arc<dyn CacheStore>,
    base_url: String,
}

#[derive(Deserialize)]
struct DirectoryEntry {
    country: Option<String>,
    #[serde(rename = "state-province")]
    state_province: Option<String>,
    #[serde(default)]
    domains: Vec<String>,
}

impl HipolabsClient {
    pub fn new(http: Client, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            http,
            cache,
            base_url: HIPOLABS_BASE.to_string(),
        }
    }

    /// Point the client at a different host; tests use this with a local
    /// stand-in server.
    pub fn with_base_url(http: Client, cache: Arc<dyn CacheStore>, base_url: String) -> Self {
        Self {
            http,
            cache,
            base_url,
        }
    }

    async fn fetch(&self, name: &str) -> Result<Enrichment, reqwest::Error> {
        let entries: Vec<DirectoryEntry> = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("name", name)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Zero results is a definitive (and cacheable) empty answer.
        let Some(first) = entries.into_iter().next() else {
            return Ok(Enrichment::default());
        };

        Ok(Enrichment {
            country: first.country,
            // The directory reports "" for universities without a province.
            location: first.state_province.filter(|s| !s.is_empty()),
            logo: first
                .domains
                .first()
                .map(|domain| format!("{CLEARBIT_LOGO}/{domain}")),
            latitude: None,
            longitude: None,
        })
    }
}

#[async_trait]
impl Lookup for HipolabsClient {
    async fn lookup(&self, name: &str) -> Enrichment {
        let key = format!("hipolabs:{}", normalize(name));
        if let Some(cached) = self.cache.get_json::<Enrichment>(&key).await {
            return cached;
        }

        match self.fetch(name).await {
            Ok(record) => {
                self.cache.set_json(&key, &record, HOUR_SECS).await;
                record
            }
            Err(err) => {
                warn!(university = name, error = %err, "hipolabs lookup failed");
                Enrichment::default()
            }
        }
    }
}

//! Wikidata lookup: entity search, then a claims fetch on the first match.
//!
//! Claims we read: `P154` (logo file), `P131` (administrative territorial
//! entity, resolved to its English label), `P625` (coordinate location).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::cache::{normalize, CacheStore, HOUR_SECS};
use crate::enricher::Lookup;
use crate::record::Enrichment;

const WIKIDATA_BASE: &str = "https://www.wikidata.org";
const COMMONS_FILE_PATH: &str = "https://commons.wikimedia.org/wiki/Special:FilePath";

const LOGO_CLAIM: &str = "P154";
const ADMIN_LOCATION_CLAIM: &str = "P131";
const COORDINATES_CLAIM: &str = "P625";

pub struct WikidataClient {
    http: Client,
    cache: Arc<dyn CacheStore>,
    base_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: String,
}

#[derive(Deserialize)]
struct EntityResponse {
    #[serde(default)]
    entities: HashMap<String, Entity>,
}

#[derive(Deserialize, Default)]
struct Entity {
    #[serde(default)]
    claims: HashMap<String, Vec<Claim>>,
    #[serde(default)]
    labels: HashMap<String, Label>,
}

#[derive(Deserialize)]
struct Claim {
    mainsnak: Option<Snak>,
}

#[derive(Deserialize)]
struct Snak {
    datavalue: Option<DataValue>,
}

#[derive(Deserialize)]
struct DataValue {
    value: Value,
}

#[derive(Deserialize)]
struct Label {
    value: String,
}

impl Entity {
    /// First claim's datavalue for a property, if any. Missing snaks and
    /// missing datavalues just read as absent.
    fn claim_value(&self, property: &str) -> Option<&Value> {
        let datavalue = self
            .claims
            .get(property)?
            .first()?
            .mainsnak
            .as_ref()?
            .datavalue
            .as_ref()?;
        Some(&datavalue.value)
    }

    fn english_label(&self) -> Option<String> {
        self.labels.get("en").map(|label| label.value.clone())
    }
}

impl WikidataClient {
    pub fn new(http: Client, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            http,
            cache,
            base_url: WIKIDATA_BASE.to_string(),
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
        let search: SearchResponse = self
            .http
            .get(format!("{}/w/api.php", self.base_url))
            .query(&[
                ("action", "wbsearchentities"),
                ("search", name),
                ("language", "en"),
                ("format", "json"),
                ("type", "item"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // No matching entity is a definitive (and cacheable) empty answer.
        let Some(hit) = search.search.first() else {
            return Ok(Enrichment::default());
        };
        let entity = self.entity(&hit.id).await?;

        let mut record = Enrichment::default();

        if let Some(file) = entity.claim_value(LOGO_CLAIM).and_then(Value::as_str) {
            record.logo = Some(format!("{COMMONS_FILE_PATH}/{}", urlencoding::encode(file)));
        }

        if let Some(region_id) = entity
            .claim_value(ADMIN_LOCATION_CLAIM)
            .and_then(|value| value.get("id"))
            .and_then(Value::as_str)
        {
            record.location = self.entity(region_id).await?.english_label();
        }

        // Coordinates only ever come out as a pair.
        if let Some(coords) = entity.claim_value(COORDINATES_CLAIM) {
            let latitude = coords.get("latitude").and_then(Value::as_f64);
            let longitude = coords.get("longitude").and_then(Value::as_f64);
            if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
                record.latitude = Some(latitude);
                record.longitude = Some(longitude);
            }
        }

        Ok(record)
    }

    async fn entity(&self, id: &str) -> Result<Entity, reqwest::Error> {
        let mut response: EntityResponse = self
            .http
            .get(format!("{}/wiki/Special:EntityData/{id}.json", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.entities.remove(id).unwrap_or_default())
    }
}

#[async_trait]
impl Lookup for WikidataClient {
    async fn lookup(&self, name: &str) -> Enrichment {
        let key = format!("wikidata:{}", normalize(name));
        if let Some(cached) = self.cache.get_json::<Enrichment>(&key).await {
            return cached;
        }

        match self.fetch(name).await {
            Ok(record) => {
                self.cache.set_json(&key, &record, HOUR_SECS).await;
                record
            }
            Err(err) => {
                // Errors are not definitive, so nothing is cached for them.
                warn!(university = name, error = %err, "wikidata lookup failed");
                Enrichment::default()
            }
        }
    }
}

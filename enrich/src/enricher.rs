use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::bounded::map_bounded;
use crate::record::{merge, Enrichment};

/// In-flight ceiling for request-path batches (one page of universities).
pub const LIST_CONCURRENCY: usize = 20;
/// In-flight ceiling for the offline cache warmer.
pub const WARM_CONCURRENCY: usize = 30;

/// One external source of enrichment facts.
///
/// A lookup never fails its caller; whatever goes wrong inside degrades to
/// the empty record. The seam exists so the orchestrator can be exercised
/// with fakes.
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn lookup(&self, name: &str) -> Enrichment;
}

/// Fans a batch of names out to both sources and merges the answers.
///
/// Owns no state beyond its two clients; each call is a pure pipeline over
/// its input batch.
pub struct Enricher {
    graph: Arc<dyn Lookup>,
    directory: Arc<dyn Lookup>,
}

impl Enricher {
    pub fn new(graph: Arc<dyn Lookup>, directory: Arc<dyn Lookup>) -> Self {
        Self { graph, directory }
    }

    /// One merged record per distinct input name.
    ///
    /// Duplicate names share a single pair of lookups and a single record;
    /// that is the whole point of deduplicating here instead of leaving it
    /// to the per-name caches. Distinct names are processed in first-seen
    /// order, at most [`LIST_CONCURRENCY`] in flight.
    pub async fn enrich(&self, names: &[String]) -> HashMap<String, Enrichment> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = names
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .collect();

        let merged = map_bounded(&unique, LIST_CONCURRENCY, |name| self.enrich_one(name)).await;

        unique.into_iter().cloned().zip(merged).collect()
    }

    /// Both sources for one name, merged under the fixed precedence.
    pub async fn enrich_one(&self, name: &str) -> Enrichment {
        let (graph, directory) =
            tokio::join!(self.graph.lookup(name), self.directory.lookup(name));
        merge(graph, directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeLookup {
        record: Enrichment,
        calls: Mutex<Vec<String>>,
    }

    impl FakeLookup {
        fn new(record: Enrichment) -> Arc<Self> {
            Arc::new(Self {
                record,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Lookup for FakeLookup {
        async fn lookup(&self, name: &str) -> Enrichment {
            self.calls.lock().unwrap().push(name.to_string());
            self.record.clone()
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_duplicates_share_one_lookup_pair() {
        let graph = FakeLookup::new(Enrichment::default());
        let directory = FakeLookup::new(Enrichment::default());
        let enricher = Enricher::new(graph.clone(), directory.clone());

        let out = enricher.enrich(&names(&["a", "a", "b"])).await;

        assert_eq!(out.len(), 2);
        assert!(out.contains_key("a") && out.contains_key("b"));
        assert_eq!(graph.calls(), vec!["a", "b"]);
        assert_eq!(directory.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_merge_precedence_applies_per_name() {
        let graph = FakeLookup::new(Enrichment {
            logo: Some("X".into()),
            location: Some("Y".into()),
            ..Default::default()
        });
        let directory = FakeLookup::new(Enrichment {
            country: Some("C".into()),
            logo: Some("Z".into()),
            location: Some("W".into()),
            ..Default::default()
        });
        let enricher = Enricher::new(graph, directory);

        let out = enricher.enrich(&names(&["ui"])).await;
        let record = &out["ui"];

        assert_eq!(record.country.as_deref(), Some("C"));
        assert_eq!(record.logo.as_deref(), Some("X"));
        assert_eq!(record.location.as_deref(), Some("Y"));
    }

    #[tokio::test]
    async fn test_both_sources_empty_yields_empty_record() {
        let enricher = Enricher::new(
            FakeLookup::new(Enrichment::default()),
            FakeLookup::new(Enrichment::default()),
        );

        let out = enricher.enrich(&names(&["unknown"])).await;

        assert!(out["unknown"].is_empty());
    }

    /// Both real clients against stand-in services with no data: the merged
    /// record is all-absent and both source caches hold the empty answer.
    #[tokio::test]
    async fn test_total_miss_is_cached_by_both_sources() {
        use crate::cache::{CacheStore, MemoryCache};
        use crate::{HipolabsClient, WikidataClient};
        use axum::routing::get;
        use axum::{Json, Router};
        use serde_json::json;

        let router = Router::new()
            .route("/w/api.php", get(|| async { Json(json!({"search": []})) }))
            .route("/search", get(|| async { Json(json!([])) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        let cache = Arc::new(MemoryCache::new());
        let http = reqwest::Client::new();
        let enricher = Enricher::new(
            Arc::new(WikidataClient::with_base_url(
                http.clone(),
                cache.clone(),
                base.clone(),
            )),
            Arc::new(HipolabsClient::with_base_url(http, cache.clone(), base)),
        );

        let out = enricher.enrich(&names(&["Ghost College"])).await;

        assert!(out["Ghost College"].is_empty());
        let stored: Arc<dyn CacheStore> = cache;
        assert!(stored.get_raw("wikidata:ghost college").await.is_some());
        assert!(stored.get_raw("hipolabs:ghost college").await.is_some());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let enricher = Enricher::new(
            FakeLookup::new(Enrichment::default()),
            FakeLookup::new(Enrichment::default()),
        );

        assert!(enricher.enrich(&[]).await.is_empty());
    }
}

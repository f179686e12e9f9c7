use std::sync::Arc;

use enrich::{CacheStore, Enricher, HipolabsClient, MemoryCache, RedisCache, WikidataClient};
use sqlx::SqlitePool;
use tracing::warn;

use crate::{config::Config, database::init_db};

pub struct State {
    pub config: Config,
    pub db: SqlitePool,
    pub cache: Arc<dyn CacheStore>,
    pub enricher: Enricher,
}

impl State {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let db = init_db(&config.database_url).await;

        // The cache is an optimization; a missing Redis must not keep the
        // API from serving.
        let cache: Arc<dyn CacheStore> = match RedisCache::connect(&config.redis_url).await {
            Ok(redis) => Arc::new(redis),
            Err(err) => {
                warn!(error = %err, "Redis unavailable, using in-process cache");
                Arc::new(MemoryCache::new())
            }
        };

        let http = reqwest::Client::new();
        let enricher = Enricher::new(
            Arc::new(WikidataClient::new(http.clone(), cache.clone())),
            Arc::new(HipolabsClient::new(http, cache.clone())),
        );

        Arc::new(Self {
            config,
            db,
            cache,
            enricher,
        })
    }
}

//! Offline cache warmer.
//!
//! Walks every distinct university name in the dump and runs both external
//! lookups for it, so the first real request after a deploy hits warm
//! `wikidata:`/`hipolabs:` keys instead of paying the fan-out itself.
//! Idempotent: names already cached are skipped by the clients.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, EnvFilter};

use enrich::{
    map_bounded, CacheStore, HipolabsClient, Lookup, RedisCache, WikidataClient, WARM_CONCURRENCY,
};
use server::config::Config;
use server::database::{distinct_university_names, init_db};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();

    let db = init_db(&config.database_url).await;
    // Unlike the API, warming without a cache to warm is pointless.
    let cache: Arc<dyn CacheStore> = Arc::new(
        RedisCache::connect(&config.redis_url)
            .await
            .expect("Cache misconfigured!"),
    );

    let http = reqwest::Client::new();
    let wikidata = WikidataClient::new(http.clone(), cache.clone());
    let hipolabs = HipolabsClient::new(http, cache);

    let names = distinct_university_names(&db)
        .await
        .expect("Failed to read university names");
    println!("Loaded Universities: {}\n", names.len());

    let pb = ProgressBar::new(names.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap()
        .progress_chars("=> "),
    );

    let (wikidata, hipolabs, pb_ref) = (&wikidata, &hipolabs, &pb);
    map_bounded(&names, WARM_CONCURRENCY, |name| async move {
        let _ = tokio::join!(wikidata.lookup(name), hipolabs.lookup(name));
        pb_ref.set_message(name.clone());
        pb_ref.inc(1);
    })
    .await;

    pb.finish_with_message("Done");
    println!("Cache warming complete! Processed {} universities.", names.len());
}

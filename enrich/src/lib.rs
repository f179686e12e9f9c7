//! # University Enrichment
//!
//! External knowledge about universities: country, logo, location and
//! coordinates. None of this lives in the SNBT dump, so we pull it from two
//! independent services and memoize the answers in Redis.
//!
//! ## Sources
//!
//! - **Wikidata**: free-text entity search, then a claims fetch on the best
//!   match. Supplies logo (P154), administrative location (P131) and
//!   coordinates (P625). Never supplies country.
//! - **Hipolabs**: the universities directory. Supplies country,
//!   state/province, and domains we turn into a Clearbit logo URL. Never
//!   supplies coordinates.
//!
//! Both are slow relative to what a request can afford, so every lookup is
//! cached for an hour under `wikidata:{name}` / `hipolabs:{name}` with the
//! name trimmed and lowercased. An empty answer is still an answer: "Wikidata
//! knows nothing about this name" is worth memoizing for the TTL too.
//!
//! ## Failure policy
//!
//! Enrichment is decoration. A lookup never returns an error to its caller;
//! network failures, junk payloads and a dead Redis all degrade to the empty
//! record and the API serves the base row unenriched.
//!
//! ## Concurrency
//!
//! A page of universities fans out to 2 HTTP calls per name. [`map_bounded`]
//! caps how many names are in flight at once (20 for request-path batches,
//! 30 for the offline warmer) so we do not hammer either service.

pub mod bounded;
pub mod cache;
pub mod enricher;
pub mod hipolabs;
pub mod record;
pub mod wikidata;

pub use bounded::map_bounded;
pub use cache::{normalize, CacheStore, MemoryCache, RedisCache, HOUR_SECS};
pub use enricher::{Enricher, Lookup, LIST_CONCURRENCY, WARM_CONCURRENCY};
pub use hipolabs::HipolabsClient;
pub use record::{merge, Enrichment};
pub use wikidata::WikidataClient;

use serde::{Deserialize, Serialize};

/// Externally sourced facts about one university.
///
/// Every field is optional; the all-`None` record is a valid, cacheable
/// result meaning "neither source knows this name".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Merge the two sources' partial records into one.
///
/// Precedence is fixed: country comes from Hipolabs (Wikidata has none),
/// logo and location prefer Wikidata and fall back to Hipolabs, coordinates
/// come from Wikidata only. Every path that enriches (batch list, single
/// detail, cache warmer) goes through this one function so the policy cannot
/// drift between call sites.
pub fn merge(graph: Enrichment, directory: Enrichment) -> Enrichment {
    Enrichment {
        country: directory.country,
        logo: graph.logo.or(directory.logo),
        location: graph.location.or(directory.location),
        latitude: graph.latitude,
        longitude: graph.longitude,
    }
}

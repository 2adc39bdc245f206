// Keyword idea generation
// Single request/response round trip against the keyword planner endpoint

use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::client::AdsClient;
use crate::error::ApiError;

/// English language constant for idea generation
const LANGUAGE_EN: &str = "languageConstants/1000";
/// United States geo target constant
const GEO_TARGET_US: &str = "geoTargetConstants/2840";

/// Idea-generation input: seed keywords or a landing page, never both
#[derive(Debug, Clone, PartialEq)]
pub enum IdeaSeed {
    Keywords(Vec<String>),
    PageUrl(String),
}

impl IdeaSeed {
    /// Validate caller-supplied inputs into exactly one seed kind
    pub fn from_inputs(
        seed_keywords: Vec<String>,
        page_url: Option<String>,
    ) -> Result<Self, ApiError> {
        match (seed_keywords.is_empty(), page_url) {
            (false, Some(_)) => Err(ApiError::InvalidArgument(
                "supply either seed keywords or a page URL, not both".to_string(),
            )),
            (false, None) => Ok(IdeaSeed::Keywords(seed_keywords)),
            (true, Some(url)) => Ok(IdeaSeed::PageUrl(url)),
            (true, None) => Err(ApiError::InvalidArgument(
                "either seed keywords or a page URL is required".to_string(),
            )),
        }
    }

    fn seed_field(&self) -> (&'static str, Value) {
        match self {
            IdeaSeed::Keywords(keywords) => ("keywordSeed", json!({ "keywords": keywords })),
            IdeaSeed::PageUrl(url) => ("urlSeed", json!({ "url": url })),
        }
    }
}

fn u64_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Int(v) => Ok(v),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct IdeaListing {
    results: Vec<IdeaRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct IdeaRow {
    text: String,
    keyword_idea_metrics: IdeaMetrics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct IdeaMetrics {
    #[serde(deserialize_with = "u64_lenient")]
    avg_monthly_searches: u64,
    competition: String,
}

/// One generated keyword idea
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordIdea {
    pub text: String,
    pub avg_monthly_searches: u64,
    pub competition: String,
}

/// Generate keyword ideas for one account. One round trip; no pagination,
/// no retries.
pub async fn generate_keyword_ideas(
    client: &AdsClient,
    customer_id: u64,
    seed: &IdeaSeed,
) -> Result<Vec<KeywordIdea>, ApiError> {
    let (seed_key, seed_value) = seed.seed_field();
    let mut body = json!({
        "language": LANGUAGE_EN,
        "geoTargetConstants": [GEO_TARGET_US],
    });
    body[seed_key] = seed_value;

    let value = client
        .post(
            &format!("customers/{customer_id}:generateKeywordIdeas"),
            &body,
        )
        .await?;

    let listing: IdeaListing = serde_json::from_value(value)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("malformed idea listing: {e}")))?;

    Ok(listing
        .results
        .into_iter()
        .map(|row| KeywordIdea {
            text: row.text,
            avg_monthly_searches: row.keyword_idea_metrics.avg_monthly_searches,
            competition: row.keyword_idea_metrics.competition,
        })
        .collect())
}

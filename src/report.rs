// Reporting query engine
// Builds the inefficiency query, drains the batch stream, and normalizes
// costs out of micro-units

use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::client::AdsClient;
use crate::error::ApiError;

/// Micro-units per standard currency unit
pub const MICROS_PER_UNIT: f64 = 1_000_000.0;

/// Named relative date ranges the reporting service understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookbackWindow {
    Last7Days,
    Last14Days,
    Last30Days,
}

impl LookbackWindow {
    fn as_gaql(self) -> &'static str {
        match self {
            LookbackWindow::Last7Days => "LAST_7_DAYS",
            LookbackWindow::Last14Days => "LAST_14_DAYS",
            LookbackWindow::Last30Days => "LAST_30_DAYS",
        }
    }
}

/// Immutable parameters of one inefficiency query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    cost_threshold: f64,
    conversion_ceiling: u64,
    lookback_window: LookbackWindow,
    result_limit: usize,
}

impl QueryFilter {
    /// Keywords costing more than `cost_threshold` currency units with zero
    /// conversions over the last 7 days
    pub fn new(cost_threshold: f64, result_limit: usize) -> Result<Self, ApiError> {
        if !(cost_threshold > 0.0) {
            return Err(ApiError::InvalidArgument(
                "cost threshold must be positive".to_string(),
            ));
        }
        if result_limit == 0 {
            return Err(ApiError::InvalidArgument(
                "result limit must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            cost_threshold,
            conversion_ceiling: 0,
            lookback_window: LookbackWindow::Last7Days,
            result_limit,
        })
    }

    pub fn cost_threshold(&self) -> f64 {
        self.cost_threshold
    }

    pub fn result_limit(&self) -> usize {
        self.result_limit
    }

    /// Threshold in the service's integer micro-currency unit, truncated
    pub fn cost_threshold_micros(&self) -> i64 {
        (self.cost_threshold * MICROS_PER_UNIT) as i64
    }

    /// Render the filter as a GAQL query
    pub fn to_gaql(&self) -> String {
        format!(
            "SELECT \
             ad_group_criterion.keyword.text, \
             metrics.cost_micros, \
             metrics.impressions, \
             metrics.clicks, \
             metrics.conversions \
             FROM ad_group_criterion \
             WHERE ad_group_criterion.type = 'KEYWORD' \
             AND ad_group_criterion.status = 'ENABLED' \
             AND metrics.cost_micros > {} \
             AND metrics.conversions = {} \
             AND segments.date DURING {} \
             ORDER BY metrics.cost_micros DESC \
             LIMIT {}",
            self.cost_threshold_micros(),
            self.conversion_ceiling,
            self.lookback_window.as_gaql(),
            self.result_limit
        )
    }
}

/// One keyword with its normalized metrics
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordMetricRecord {
    pub keyword_text: String,
    pub cost: f64,
    pub impressions: u64,
    pub clicks: u64,
}

impl From<SearchRow> for KeywordMetricRecord {
    fn from(row: SearchRow) -> Self {
        Self {
            keyword_text: row.ad_group_criterion.keyword.text,
            cost: row.metrics.cost_micros as f64 / MICROS_PER_UNIT,
            impressions: row.metrics.impressions,
            clicks: row.metrics.clicks,
        }
    }
}

// ==================================================================================================
// Wire types
// ==================================================================================================

// The REST transport serializes int64 metrics as JSON strings; the lenient
// deserializers below accept either representation.

fn i64_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Int(v) => Ok(v),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
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

/// One server-driven result batch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchStreamBatch {
    pub results: Vec<SearchRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRow {
    pub ad_group_criterion: CriterionView,
    pub metrics: MetricsView,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CriterionView {
    pub keyword: KeywordView,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeywordView {
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsView {
    #[serde(deserialize_with = "i64_lenient")]
    pub cost_micros: i64,
    #[serde(deserialize_with = "u64_lenient")]
    pub impressions: u64,
    #[serde(deserialize_with = "u64_lenient")]
    pub clicks: u64,
    pub conversions: f64,
}

// ==================================================================================================
// Execution
// ==================================================================================================

/// Run the inefficiency query against one account and aggregate the stream
/// into an ordered result set.
///
/// Row order across batches is the service-enforced descending-cost order;
/// no client-side re-sort happens here.
pub async fn find_inefficient_keywords(
    client: &AdsClient,
    customer_id: u64,
    filter: &QueryFilter,
) -> Result<Vec<KeywordMetricRecord>, ApiError> {
    let gaql = filter.to_gaql();
    tracing::debug!(customer_id, query = %gaql, "Running search stream");

    let value = client
        .post(
            &format!("customers/{customer_id}/googleAds:searchStream"),
            &json!({ "query": gaql }),
        )
        .await?;

    let batches = parse_stream_payload(value)?;
    drain_batches(
        futures::stream::iter(batches.into_iter().map(Ok)),
        filter.result_limit(),
    )
    .await
}

/// The stream endpoint responds with an array of batches; a bare object is
/// accepted as a single batch
fn parse_stream_payload(value: Value) -> Result<Vec<SearchStreamBatch>, ApiError> {
    let result = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|batch| vec![batch])
    };
    result.map_err(|e| {
        ApiError::Internal(anyhow::anyhow!("malformed search stream payload: {e}"))
    })
}

/// Drain a finite batch stream into one result set, preserving arrival
/// order. A mid-stream failure aborts the whole query; rows accumulated so
/// far are discarded.
pub async fn drain_batches<S>(
    stream: S,
    result_limit: usize,
) -> Result<Vec<KeywordMetricRecord>, ApiError>
where
    S: Stream<Item = Result<SearchStreamBatch, ApiError>>,
{
    futures::pin_mut!(stream);

    let mut records = Vec::new();
    while let Some(batch) = stream.next().await {
        let batch = batch?;
        tracing::trace!(rows = batch.results.len(), "Consumed result batch");
        records.extend(batch.results.into_iter().map(KeywordMetricRecord::from));
    }

    records.truncate(result_limit);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn batch(rows: &[(&str, i64, u64, u64)]) -> SearchStreamBatch {
        SearchStreamBatch {
            results: rows
                .iter()
                .map(|&(text, cost_micros, impressions, clicks)| SearchRow {
                    ad_group_criterion: CriterionView {
                        keyword: KeywordView {
                            text: text.to_string(),
                        },
                    },
                    metrics: MetricsView {
                        cost_micros,
                        impressions,
                        clicks,
                        conversions: 0.0,
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn test_filter_rejects_non_positive_threshold() {
        assert!(matches!(
            QueryFilter::new(0.0, 50),
            Err(ApiError::InvalidArgument(_))
        ));
        assert!(matches!(
            QueryFilter::new(-5.0, 50),
            Err(ApiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_filter_rejects_zero_limit() {
        assert!(matches!(
            QueryFilter::new(30.0, 0),
            Err(ApiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_threshold_micros_truncates() {
        let filter = QueryFilter::new(30.0, 50).unwrap();
        assert_eq!(filter.cost_threshold_micros(), 30_000_000);

        let filter = QueryFilter::new(0.0000019, 50).unwrap();
        assert_eq!(filter.cost_threshold_micros(), 1);
    }

    #[test]
    fn test_gaql_predicate() {
        let gaql = QueryFilter::new(30.0, 50).unwrap().to_gaql();
        assert!(gaql.contains("ad_group_criterion.type = 'KEYWORD'"));
        assert!(gaql.contains("ad_group_criterion.status = 'ENABLED'"));
        assert!(gaql.contains("metrics.cost_micros > 30000000"));
        assert!(gaql.contains("metrics.conversions = 0"));
        assert!(gaql.contains("segments.date DURING LAST_7_DAYS"));
        assert!(gaql.contains("ORDER BY metrics.cost_micros DESC"));
        assert!(gaql.ends_with("LIMIT 50"));
    }

    #[test]
    fn test_cost_unit_conversion() {
        let record = KeywordMetricRecord::from(SearchRow {
            ad_group_criterion: CriterionView {
                keyword: KeywordView {
                    text: "wireless earbuds".to_string(),
                },
            },
            metrics: MetricsView {
                cost_micros: 45_230_000,
                impressions: 1200,
                clicks: 40,
                conversions: 0.0,
            },
        });
        assert_eq!(record.cost, 45.23);
        assert_eq!(record.impressions, 1200);
        assert_eq!(record.clicks, 40);
    }

    #[test]
    fn test_metrics_deserialize_string_int64() {
        let row: SearchRow = serde_json::from_value(serde_json::json!({
            "adGroupCriterion": { "keyword": { "text": "usb hub" } },
            "metrics": {
                "costMicros": "45230000",
                "impressions": "1200",
                "clicks": "40",
                "conversions": 0.0
            }
        }))
        .unwrap();
        assert_eq!(row.metrics.cost_micros, 45_230_000);
        assert_eq!(row.metrics.impressions, 1200);
    }

    #[tokio::test]
    async fn test_empty_stream_yields_empty_result() {
        let records = drain_batches(stream::iter(Vec::<Result<_, ApiError>>::new()), 50)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_multi_batch_concatenation_preserves_order() {
        let batches = vec![
            Ok(batch(&[("a", 90_000_000, 10, 1), ("b", 80_000_000, 10, 1)])),
            Ok(batch(&[("c", 70_000_000, 10, 1)])),
            Ok(batch(&[("d", 60_000_000, 10, 1), ("e", 50_000_000, 10, 1)])),
        ];

        let records = drain_batches(stream::iter(batches), 50).await.unwrap();
        assert_eq!(records.len(), 5);
        let order: Vec<&str> = records.iter().map(|r| r.keyword_text.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_result_limit_truncates() {
        let batches = vec![
            Ok(batch(&[("a", 90_000_000, 10, 1), ("b", 80_000_000, 10, 1)])),
            Ok(batch(&[("c", 70_000_000, 10, 1)])),
        ];
        let records = drain_batches(stream::iter(batches), 2).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].keyword_text, "b");
    }

    #[tokio::test]
    async fn test_mid_stream_failure_discards_partials() {
        let batches = vec![
            Ok(batch(&[("a", 90_000_000, 10, 1)])),
            Err(ApiError::RemoteServiceError {
                status: 503,
                detail: "transient unavailability".to_string(),
            }),
            Ok(batch(&[("c", 70_000_000, 10, 1)])),
        ];

        let err = drain_batches(stream::iter(batches), 50).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::RemoteServiceError { status: 503, .. }
        ));
    }

    #[test]
    fn test_parse_stream_payload_array_and_object() {
        let array = serde_json::json!([
            { "results": [] },
            { "results": [] }
        ]);
        assert_eq!(parse_stream_payload(array).unwrap().len(), 2);

        let object = serde_json::json!({ "results": [] });
        assert_eq!(parse_stream_payload(object).unwrap().len(), 1);
    }
}

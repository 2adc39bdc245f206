// Account resolver
// Lists the customer accounts reachable under the manager account

use serde::Deserialize;

use crate::client::AdsClient;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CustomerListing {
    resource_names: Vec<String>,
}

/// List accessible account ids, in the order the service returns them.
///
/// Exactly one remote call, no retries. An empty list is a valid outcome
/// the caller must handle.
pub async fn list_accessible_accounts(client: &AdsClient) -> Result<Vec<u64>, ApiError> {
    let value = client.get("customers:listAccessibleCustomers").await?;
    let listing: CustomerListing = serde_json::from_value(value).map_err(|e| {
        ApiError::Internal(anyhow::anyhow!("malformed customer listing: {e}"))
    })?;

    tracing::debug!(count = listing.resource_names.len(), "Accessible accounts listed");

    listing
        .resource_names
        .iter()
        .map(|name| parse_customer_resource(name))
        .collect()
}

/// Extract the numeric id from a `customers/<id>` resource name
pub fn parse_customer_resource(name: &str) -> Result<u64, ApiError> {
    name.strip_prefix("customers/")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!(
                "unexpected customer resource name: {name}"
            ))
        })
}

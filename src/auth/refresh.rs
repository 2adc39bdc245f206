// Token refresh logic
// Refresh-token grant against the OAuth token endpoint

use reqwest::Client;

use super::types::{Credential, TokenResponse};
use crate::error::ApiError;

/// Exchange the refresh token for a fresh access token, mutating the
/// credential in place on success.
///
/// A rejected exchange is not retried here; the caller decides whether to
/// fall through to interactive authorization.
pub async fn refresh_credential(
    http: &Client,
    token_url: &str,
    credential: &mut Credential,
) -> Result<(), ApiError> {
    let refresh_token = credential
        .refresh_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::AuthError("no refresh token to renew with".to_string()))?
        .to_string();

    tracing::info!("Refreshing access token...");

    let form = [
        ("grant_type", "refresh_token"),
        ("client_id", credential.client_id.as_str()),
        ("client_secret", credential.client_secret.as_str()),
        ("refresh_token", refresh_token.as_str()),
    ];

    let response = http
        .post(token_url)
        .form(&form)
        .send()
        .await
        .map_err(|e| ApiError::AuthError(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, detail = %detail, "Token refresh rejected");
        return Err(ApiError::RemoteServiceError {
            status: status.as_u16(),
            detail,
        });
    }

    let grant: TokenResponse = response
        .json()
        .await
        .map_err(|e| ApiError::AuthError(format!("malformed token refresh response: {e}")))?;

    if grant.access_token.is_empty() {
        return Err(ApiError::AuthError(
            "token refresh response carried no access token".to_string(),
        ));
    }

    let expires_at = grant.expires_at();
    tracing::info!(expires_at = %expires_at.to_rfc3339(), "Access token refreshed");

    credential.access_token = grant.access_token;
    credential.expires_at = Some(expires_at);
    // The refresh token normally stays stable; replace it only when rotated
    if let Some(rotated) = grant.refresh_token {
        credential.refresh_token = Some(rotated);
    }

    Ok(())
}

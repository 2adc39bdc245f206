// Interactive authorization flow
// Authorization-code grant with a one-shot loopback callback listener

use reqwest::Client;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use super::types::{Credential, TokenResponse, ADWORDS_SCOPE};
use crate::error::ApiError;

/// OAuth client settings for the consent and token exchanges
#[derive(Clone, Debug)]
pub struct OAuthSettings {
    pub auth_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub callback_port: u16,
}

const CALLBACK_RESPONSE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h3>Authorization received.</h3><p>You can close this tab and return to the terminal.</p></body></html>";

/// Run the full interactive flow: consent URL, callback, code exchange.
///
/// Blocks until the user completes or declines consent in the browser; there
/// is no programmatic timeout in the base design.
pub async fn run_interactive_flow(
    http: &Client,
    settings: &OAuthSettings,
) -> Result<Credential, ApiError> {
    let listener = TcpListener::bind(("127.0.0.1", settings.callback_port))
        .await
        .map_err(|e| {
            ApiError::AuthError(format!(
                "could not bind callback listener on port {}: {e}",
                settings.callback_port
            ))
        })?;
    let port = listener
        .local_addr()
        .map_err(|e| ApiError::AuthError(format!("callback listener has no address: {e}")))?
        .port();
    let redirect_uri = format!("http://127.0.0.1:{port}");

    let consent = consent_url(settings, &redirect_uri)?;
    println!();
    println!("Open this URL in your browser to authorize access:");
    println!();
    println!("  {consent}");
    println!();
    println!("Waiting for the authorization callback on {redirect_uri} ...");

    let code = wait_for_code(&listener).await?;
    tracing::info!("Authorization code received, exchanging for tokens");

    exchange_code(http, settings, &code, &redirect_uri).await
}

/// Build the consent URL for the single required scope
pub fn consent_url(settings: &OAuthSettings, redirect_uri: &str) -> Result<String, ApiError> {
    let mut url = Url::parse(&settings.auth_url)
        .map_err(|e| ApiError::ConfigError(format!("invalid authorization endpoint: {e}")))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &settings.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", ADWORDS_SCOPE)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");
    Ok(url.into())
}

/// Accept one connection and pull the authorization code out of the redirect
async fn wait_for_code(listener: &TcpListener) -> Result<String, ApiError> {
    let (mut stream, _) = listener
        .accept()
        .await
        .map_err(|e| ApiError::AuthError(format!("callback listener failed: {e}")))?;

    let mut buf = vec![0u8; 4096];
    let n = stream
        .read(&mut buf)
        .await
        .map_err(|e| ApiError::AuthError(format!("failed to read callback request: {e}")))?;
    let request = String::from_utf8_lossy(&buf[..n]).to_string();

    let result = extract_code(&request);

    // Answer the browser regardless of outcome, then close the socket
    if let Err(e) = stream.write_all(CALLBACK_RESPONSE.as_bytes()).await {
        tracing::debug!(error = %e, "Failed to write callback response");
    }
    let _ = stream.shutdown().await;

    result
}

/// Parse the HTTP request line of the redirect and extract the `code`
/// query parameter. A `error` parameter means the user declined consent.
pub(crate) fn extract_code(request: &str) -> Result<String, ApiError> {
    let request_line = request
        .lines()
        .next()
        .ok_or_else(|| ApiError::AuthError("empty callback request".to_string()))?;
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| ApiError::AuthError("malformed callback request line".to_string()))?;

    let url = Url::parse(&format!("http://127.0.0.1{target}"))
        .map_err(|e| ApiError::AuthError(format!("malformed callback target: {e}")))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => {
                return Err(ApiError::AuthError(format!(
                    "authorization declined: {value}"
                )))
            }
            "code" => code = Some(value.into_owned()),
            _ => {}
        }
    }

    code.filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::AuthError("callback carried no authorization code".to_string()))
}

/// Exchange the authorization code for a fresh credential
async fn exchange_code(
    http: &Client,
    settings: &OAuthSettings,
    code: &str,
    redirect_uri: &str,
) -> Result<Credential, ApiError> {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", settings.client_id.as_str()),
        ("client_secret", settings.client_secret.as_str()),
        ("redirect_uri", redirect_uri),
    ];

    let response = http
        .post(&settings.token_url)
        .form(&form)
        .send()
        .await
        .map_err(|e| ApiError::AuthError(format!("code exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(ApiError::AuthError(format!(
            "code exchange rejected ({status}): {detail}"
        )));
    }

    let grant: TokenResponse = response
        .json()
        .await
        .map_err(|e| ApiError::AuthError(format!("malformed code exchange response: {e}")))?;

    if grant.access_token.is_empty() {
        return Err(ApiError::AuthError(
            "code exchange response carried no access token".to_string(),
        ));
    }

    Ok(Credential {
        access_token: grant.access_token.clone(),
        refresh_token: grant.refresh_token.clone(),
        expires_at: Some(grant.expires_at()),
        client_id: settings.client_id.clone(),
        client_secret: settings.client_secret.clone(),
        scopes: vec![ADWORDS_SCOPE.to_string()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> OAuthSettings {
        OAuthSettings {
            auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            callback_port: 0,
        }
    }

    #[test]
    fn test_consent_url_parameters() {
        let url = consent_url(&settings(), "http://127.0.0.1:8080").unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("client_id".to_string(), "client-id".to_string())));
        assert!(pairs.contains(&("scope".to_string(), ADWORDS_SCOPE.to_string())));
        assert!(pairs.contains(&("access_type".to_string(), "offline".to_string())));
    }

    #[test]
    fn test_extract_code() {
        let request = "GET /?code=4%2Fabc123&scope=adwords HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n";
        assert_eq!(extract_code(request).unwrap(), "4/abc123");
    }

    #[test]
    fn test_extract_code_declined() {
        let request = "GET /?error=access_denied HTTP/1.1\r\n\r\n";
        let err = extract_code(request).unwrap_err();
        assert!(matches!(err, ApiError::AuthError(_)));
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn test_extract_code_missing() {
        let request = "GET /favicon.ico HTTP/1.1\r\n\r\n";
        assert!(matches!(
            extract_code(request),
            Err(ApiError::AuthError(_))
        ));
    }

    #[tokio::test]
    async fn test_callback_listener_round_trip() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let browser = tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
                .await
                .unwrap();
            stream
                .write_all(b"GET /?code=test-code HTTP/1.1\r\nHost: x\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            response
        });

        let code = wait_for_code(&listener).await.unwrap();
        assert_eq!(code, "test-code");

        let response = browser.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
    }
}

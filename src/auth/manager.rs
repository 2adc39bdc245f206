use reqwest::Client;
use std::time::Duration;

use super::flow::{self, OAuthSettings};
use super::refresh;
use super::state::{classify, CredentialState};
use super::store::CredentialStore;
use super::types::Credential;
use crate::config::Config;
use crate::error::ApiError;

/// A valid credential plus the static account-level secrets every remote
/// call needs
#[derive(Clone, Debug)]
pub struct AuthenticatedSession {
    pub credential: Credential,
    pub developer_token: String,
    pub login_customer_id: u64,
}

/// Credential lifecycle manager.
///
/// Sole writer of the credential store. Produces a usable session,
/// refreshing or re-authorizing as the credential state requires; refresh
/// and re-authorization each run at most once per invocation.
pub struct AuthManager<S: CredentialStore> {
    store: S,
    http: Client,
    oauth: OAuthSettings,
    developer_token: String,
    login_customer_id: u64,
}

impl<S: CredentialStore> AuthManager<S> {
    pub fn new(config: &Config, store: S) -> Result<Self, ApiError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.http_connect_timeout))
            .timeout(Duration::from_secs(config.http_request_timeout))
            .build()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            store,
            http,
            oauth: OAuthSettings {
                auth_url: config.auth_url.clone(),
                token_url: config.token_url.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                callback_port: config.callback_port,
            },
            developer_token: config.developer_token.clone(),
            login_customer_id: config.login_customer_id,
        })
    }

    /// Produce an authenticated session, walking the credential state
    /// machine exactly once
    pub async fn obtain_session(&self) -> Result<AuthenticatedSession, ApiError> {
        let loaded = self.store.load()?;

        let credential = match classify(loaded.as_ref()) {
            CredentialState::Valid => {
                tracing::debug!("Persisted credential is valid, no exchange needed");
                loaded.ok_or_else(|| {
                    ApiError::AuthError("credential vanished after classification".to_string())
                })?
            }

            CredentialState::ExpiredRefreshable => {
                let mut credential = loaded.ok_or_else(|| {
                    ApiError::AuthError("credential vanished after classification".to_string())
                })?;
                match refresh::refresh_credential(&self.http, &self.oauth.token_url, &mut credential)
                    .await
                {
                    Ok(()) => {
                        self.store.save(&credential)?;
                        credential
                    }
                    Err(e) => {
                        // A rejected refresh is non-retriable this run; the
                        // interactive path is the only way forward
                        tracing::warn!(error = %e, "Refresh failed, starting interactive authorization");
                        self.authorize_interactively().await?
                    }
                }
            }

            CredentialState::Absent | CredentialState::ExpiredUnrefreshable => {
                tracing::info!("No usable credential, starting interactive authorization");
                self.authorize_interactively().await?
            }
        };

        Ok(AuthenticatedSession {
            credential,
            developer_token: self.developer_token.clone(),
            login_customer_id: self.login_customer_id,
        })
    }

    async fn authorize_interactively(&self) -> Result<Credential, ApiError> {
        let credential = flow::run_interactive_flow(&self.http, &self.oauth).await?;
        self.store.save(&credential)?;
        tracing::info!("Interactive authorization complete, credential persisted");
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryCredentialStore;
    use crate::auth::types::ADWORDS_SCOPE;
    use crate::config::{CliArgs, Command, Config};
    use chrono::{Duration as ChronoDuration, Utc};

    fn test_config(token_url: String) -> Config {
        Config::from_args(CliArgs {
            developer_token: Some("dev-token".to_string()),
            client_id: Some("client-id".to_string()),
            client_secret: Some("client-secret".to_string()),
            login_customer_id: Some(9998887777),
            credentials_file: Some("/tmp/unused.json".to_string()),
            api_base_url: "https://googleads.googleapis.com".to_string(),
            token_url,
            auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            callback_port: 0,
            log_level: "info".to_string(),
            http_connect_timeout: 5,
            http_request_timeout: 5,
            command: Command::Audit {
                cost_threshold: 30.0,
                limit: 50,
                customer_id: None,
            },
        })
        .unwrap()
    }

    fn credential(expired: bool, refresh_token: Option<&str>) -> Credential {
        let offset = if expired {
            -ChronoDuration::hours(1)
        } else {
            ChronoDuration::hours(1)
        };
        Credential {
            access_token: "access-token".to_string(),
            refresh_token: refresh_token.map(|t| t.to_string()),
            expires_at: Some(Utc::now() + offset),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            scopes: vec![ADWORDS_SCOPE.to_string()],
        }
    }

    #[tokio::test]
    async fn test_valid_credential_skips_every_exchange() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/token")
            .expect(0)
            .create_async()
            .await;

        let config = test_config(format!("{}/token", server.url()));
        let store = MemoryCredentialStore::new(Some(credential(false, Some("refresh"))));
        let manager = AuthManager::new(&config, store.clone()).unwrap();

        let session = manager.obtain_session().await.unwrap();
        assert_eq!(session.credential.access_token, "access-token");
        assert_eq!(session.developer_token, "dev-token");
        assert_eq!(session.login_customer_id, 9998887777);

        // No network call, store unchanged
        token_mock.assert_async().await;
        assert_eq!(
            store.snapshot().unwrap().access_token,
            "access-token"
        );
    }

    #[tokio::test]
    async fn test_expired_credential_takes_refresh_path_only() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::UrlEncoded(
                "grant_type".into(),
                "refresh_token".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"renewed","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let config = test_config(format!("{}/token", server.url()));
        let store = MemoryCredentialStore::new(Some(credential(true, Some("refresh"))));
        let manager = AuthManager::new(&config, store.clone()).unwrap();

        // Completing without user interaction proves the interactive flow
        // never ran; the only token-endpoint hit is the refresh grant
        let session = manager.obtain_session().await.unwrap();
        token_mock.assert_async().await;

        assert_eq!(session.credential.access_token, "renewed");
        assert!(session.credential.is_usable());

        // The mutated credential was persisted
        let stored = store.snapshot().unwrap();
        assert_eq!(stored.access_token, "renewed");
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh"));
    }
}

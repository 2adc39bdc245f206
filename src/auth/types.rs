// Authentication types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single required Google Ads permission scope
pub const ADWORDS_SCOPE: &str = "https://www.googleapis.com/auth/adwords";

/// Delegated-access credential persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    /// A credential is usable iff it carries an access token and has not expired
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty() && self.expires_at.map_or(true, |exp| exp > Utc::now())
    }
}

/// OAuth token endpoint response (both grant types)
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    #[allow(dead_code)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Expiry with a safety buffer so the token is replaced before the wire rejects it
    pub fn expires_at(&self) -> DateTime<Utc> {
        let expires_in = self.expires_in.unwrap_or(3600);
        Utc::now() + chrono::Duration::seconds(expires_in as i64 - 60)
    }
}

// Credential state machine
// The refresh-vs-reauthorize decision is made by inspection, never by
// catching failures from a happy path

use super::types::Credential;

/// Lifecycle state of the persisted credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// No record, or the record was unreadable
    Absent,
    /// Access token present and not expired
    Valid,
    /// Expired, but a refresh token is available
    ExpiredRefreshable,
    /// Expired and no refresh token to renew with
    ExpiredUnrefreshable,
}

/// Classify a loaded credential by inspection
pub fn classify(credential: Option<&Credential>) -> CredentialState {
    match credential {
        None => CredentialState::Absent,
        Some(cred) if cred.is_usable() => CredentialState::Valid,
        Some(cred) if cred.refresh_token.as_deref().is_some_and(|t| !t.is_empty()) => {
            CredentialState::ExpiredRefreshable
        }
        Some(_) => CredentialState::ExpiredUnrefreshable,
    }
}

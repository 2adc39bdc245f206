// Authentication module
// Credential lifecycle: persistence, refresh, and interactive authorization

mod flow;
mod manager;
mod refresh;
mod state;
mod store;
mod types;

pub use flow::OAuthSettings;
pub use manager::{AuthManager, AuthenticatedSession};
pub use state::{classify, CredentialState};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use types::{Credential, ADWORDS_SCOPE};

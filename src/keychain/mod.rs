//! Component H: the OS keychain seam (§6 "Persisted state" — API keys
//! stored under service `com.spellcaster.terminal`, account
//! `api-key-<provider>`). The concrete `keyring`-backed adapter lives in
//! [`os_keychain`].

pub mod os_keychain;

use crate::error::KeychainError;

/// Service name every [`KeychainStore`] entry is filed under.
pub const KEYCHAIN_SERVICE: &str = "com.spellcaster.terminal";

/// Narrow seam over "store a provider's API key," so preferences code can
/// be tested without touching the real OS keychain.
pub trait KeychainStore: Send + Sync {
    fn get_api_key(&self, provider: &str) -> Result<String, KeychainError>;
    fn set_api_key(&self, provider: &str, key: &str) -> Result<(), KeychainError>;
    fn delete_api_key(&self, provider: &str) -> Result<(), KeychainError>;
}

/// `api-key-<provider>`, the account name every adapter stores under.
pub fn account_for(provider: &str) -> String {
    format!("api-key-{provider}")
}

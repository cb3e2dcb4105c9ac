//! `keyring`-backed [`KeychainStore`] adapter, grounded in
//! `Tonksthebear-trybotster/cli/src/keyring.rs`'s `Entry::new` /
//! `get_password` / `set_password` / `delete_credential` pattern (also used
//! by `other_examples/DigitalPals-portal` for the same OS-credential-store
//! role).

use keyring::Entry;

use crate::error::KeychainError;

use super::{account_for, KeychainStore, KEYCHAIN_SERVICE};

/// Default production `KeychainStore`: one keychain entry per provider,
/// filed under `com.spellcaster.terminal` / `api-key-<provider>` (§6).
#[derive(Debug, Clone, Default)]
pub struct OsKeychain;

impl OsKeychain {
    pub fn new() -> Self {
        Self
    }

    fn entry(&self, provider: &str) -> Result<Entry, KeychainError> {
        Entry::new(KEYCHAIN_SERVICE, &account_for(provider)).map_err(KeychainError::Backend)
    }
}

impl KeychainStore for OsKeychain {
    fn get_api_key(&self, provider: &str) -> Result<String, KeychainError> {
        let entry = self.entry(provider)?;
        match entry.get_password() {
            Ok(password) => Ok(password),
            Err(keyring::Error::NoEntry) => Err(KeychainError::NotFound(account_for(provider))),
            Err(e) => Err(KeychainError::Backend(e)),
        }
    }

    fn set_api_key(&self, provider: &str, key: &str) -> Result<(), KeychainError> {
        let entry = self.entry(provider)?;
        entry.set_password(key).map_err(KeychainError::Backend)
    }

    fn delete_api_key(&self, provider: &str) -> Result<(), KeychainError> {
        let entry = self.entry(provider)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::Backend(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_naming_matches_spec() {
        assert_eq!(account_for("openai"), "api-key-openai");
    }

    #[test]
    fn keychain_service_matches_spec() {
        assert_eq!(KEYCHAIN_SERVICE, "com.spellcaster.terminal");
    }
}

//! Component H: terminal-profile persistence (§6 "Persisted state" —
//! "terminal profiles stored as a JSON array in an application-defaults
//! store under key `terminal-profiles`"). Grounded in [`crate::config`]'s
//! load/save pattern, generalized from one struct to an array and given a
//! narrow [`ProfileStore`] trait seam so preferences code can be tested
//! against a fake store instead of the filesystem.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::context::ContextToggles;
use crate::error::ProfileError;
use crate::provider::ProviderConfig;

/// The application-defaults key profiles are filed under (§6).
pub const PROFILES_KEY: &str = "terminal-profiles";

/// Per-provider AI connection settings a profile can carry, minus the API
/// key itself — that lives in the OS keychain (§6), never in the profile
/// file. `to_provider_config` re-attaches a key fetched from
/// [`crate::keychain::KeychainStore`] to produce the seam
/// [`crate::provider::AiProviderClient`] actually consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiProviderProfile {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl AiProviderProfile {
    /// Combines this profile with a key retrieved from the keychain into
    /// the wire-level [`ProviderConfig`] the streaming client is given.
    pub fn to_provider_config(&self, api_key: String) -> ProviderConfig {
        ProviderConfig {
            base_url: self.base_url.clone(),
            api_key,
            model: self.model.clone(),
        }
    }
}

/// One saved terminal profile: shell, starting directory, extra
/// environment, the default context-capture toggles (§4.6), and an
/// optional AI provider binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalProfile {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub context_toggles: SerializableToggles,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_provider: Option<AiProviderProfile>,
}

/// `ContextToggles` is `Copy` and has no serde derive of its own (it lives
/// in the context module, which is read-path only); this mirrors its six
/// booleans for profile persistence and converts both ways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableToggles {
    pub include_current_directory: bool,
    pub include_recent_output: bool,
    pub include_last_command: bool,
    pub include_git_status: bool,
    pub include_environment: bool,
    pub include_scrollback: bool,
}

impl Default for SerializableToggles {
    fn default() -> Self {
        ContextToggles::default().into()
    }
}

impl From<ContextToggles> for SerializableToggles {
    fn from(toggles: ContextToggles) -> Self {
        Self {
            include_current_directory: toggles.include_current_directory,
            include_recent_output: toggles.include_recent_output,
            include_last_command: toggles.include_last_command,
            include_git_status: toggles.include_git_status,
            include_environment: toggles.include_environment,
            include_scrollback: toggles.include_scrollback,
        }
    }
}

impl From<SerializableToggles> for ContextToggles {
    fn from(toggles: SerializableToggles) -> Self {
        Self {
            include_current_directory: toggles.include_current_directory,
            include_recent_output: toggles.include_recent_output,
            include_last_command: toggles.include_last_command,
            include_git_status: toggles.include_git_status,
            include_environment: toggles.include_environment,
            include_scrollback: toggles.include_scrollback,
        }
    }
}

/// Narrow seam over "load/save the profile array," so preferences code can
/// be tested without touching the filesystem.
pub trait ProfileStore: Send + Sync {
    fn load(&self) -> Result<Vec<TerminalProfile>, ProfileError>;
    fn save(&self, profiles: &[TerminalProfile]) -> Result<(), ProfileError>;
}

/// Default production `ProfileStore`: a JSON array at
/// `dirs::config_dir()/spellcaster/terminal-profiles.json`, following
/// `config.rs`'s load/save pattern one level down (an array of profiles
/// rather than one config record).
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new() -> Self {
        Self { path: default_profiles_path() }
    }

    /// Construct against an explicit path, for tests that shouldn't touch
    /// the real config directory.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Default for JsonProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore for JsonProfileStore {
    fn load(&self) -> Result<Vec<TerminalProfile>, ProfileError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, profiles: &[TerminalProfile]) -> Result<(), ProfileError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(profiles)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

fn default_profiles_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("spellcaster")
        .join("terminal-profiles.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile() -> TerminalProfile {
        TerminalProfile {
            name: "default".to_string(),
            shell: Some("/bin/zsh".to_string()),
            working_directory: None,
            env: HashMap::new(),
            context_toggles: SerializableToggles::default(),
            ai_provider: Some(AiProviderProfile {
                provider: "openai".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4".to_string(),
                temperature: 0.7,
                max_tokens: None,
                top_p: None,
            }),
        }
    }

    #[test]
    fn missing_file_loads_empty_array() {
        let dir = std::env::temp_dir().join(format!("spellcaster-profile-test-{}", uuid::Uuid::new_v4()));
        let store = JsonProfileStore::with_path(dir.join("terminal-profiles.json"));
        assert_eq!(store.load().unwrap(), Vec::new());
    }

    #[test]
    fn round_trips_profiles_through_json() {
        let dir = std::env::temp_dir().join(format!("spellcaster-profile-test-{}", uuid::Uuid::new_v4()));
        let store = JsonProfileStore::with_path(dir.join("terminal-profiles.json"));
        let profiles = vec![sample_profile()];
        store.save(&profiles).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, profiles);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn ai_provider_profile_combines_with_keychain_key() {
        let profile = sample_profile();
        let ai = profile.ai_provider.unwrap();
        let config = ai.to_provider_config("sk-test".to_string());
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.model, "gpt-4");
    }

    #[test]
    fn toggles_round_trip_through_context_toggles() {
        let toggles = ContextToggles {
            include_environment: true,
            ..ContextToggles::default()
        };
        let serializable: SerializableToggles = toggles.into();
        let back: ContextToggles = serializable.into();
        assert!(back.include_environment);
        assert_eq!(back.include_current_directory, toggles.include_current_directory);
    }
}

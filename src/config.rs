use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::context::ContextToggles;
use crate::profile::SerializableToggles;

/// Application-wide terminal preferences, persisted as JSON at
/// `~/.config/spellcaster/config.json`. Distinct from [`crate::profile`]'s
/// per-profile records: this is the single global default, profiles
/// override pieces of it per-session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellcasterConfig {
    pub font: FontConfig,
    pub terminal: TerminalConfig,
    pub theme: String,
    #[serde(default)]
    pub context_toggles: SerializableToggles,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    pub family: String,
    pub size: f32,
    pub line_height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    pub scrollback_lines: usize,
    pub cursor_blink: bool,
    pub cursor_shape: String,
    pub option_as_meta: bool,
    pub shell: Option<String>,
}

impl Default for SpellcasterConfig {
    fn default() -> Self {
        Self {
            font: FontConfig {
                family: "JetBrains Mono, Menlo, Monaco, monospace".to_string(),
                size: 14.0,
                line_height: 1.4,
            },
            terminal: TerminalConfig {
                scrollback_lines: 10_000,
                cursor_blink: true,
                cursor_shape: "block".to_string(),
                option_as_meta: true,
                shell: None,
            },
            theme: "dark".to_string(),
            context_toggles: SerializableToggles::default(),
        }
    }
}

impl SpellcasterConfig {
    /// Load config from the standard config path, falling back to defaults.
    pub fn load() -> Self {
        let path = config_path();
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard config path.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The context-capture toggles this config's defaults translate to.
    pub fn context_toggles(&self) -> ContextToggles {
        self.context_toggles.into()
    }
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("spellcaster")
        .join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_terminal_defaults() {
        let config = SpellcasterConfig::default();
        assert_eq!(config.terminal.scrollback_lines, 10_000);
        assert!(config.terminal.cursor_blink);
    }

    #[test]
    fn context_toggles_match_context_module_defaults() {
        let config = SpellcasterConfig::default();
        assert_eq!(config.context_toggles(), ContextToggles::default());
    }
}

use thiserror::Error;

/// Errors surfaced by the PTY host (component D). Only explicit operations
/// (launch, write, resize) can fail; byte ingestion never does.
#[derive(Debug, Error)]
pub enum PtyError {
    #[error("failed to spawn pty: {0}")]
    SpawnError(#[from] std::io::Error),
    #[error("write to closed pty")]
    PipeClosed,
}

/// Errors from the AI provider streaming path. Recoverable: the session
/// remains usable and the error is annotated on the in-progress message
/// rather than bubbled to the caller as a fatal condition.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider not configured: {0}")]
    ProviderConfigError(String),
    #[error("provider authentication failed")]
    ProviderAuthError,
    #[error("provider returned HTTP {0}")]
    ProviderHTTPError(u16),
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors from the OS keychain wrapper. Never crashes the terminal engine;
/// surfaced only to whatever preferences UI asked for the credential.
#[derive(Debug, Error)]
pub enum KeychainError {
    #[error("keychain entry not found for account {0}")]
    NotFound(String),
    #[error("keychain operation failed: {0}")]
    Backend(#[from] keyring::Error),
}

/// Errors from the terminal-profile store (§6 "Persisted state" —
/// `terminal-profiles`). Surfaced to whatever preferences UI is managing
/// profiles; never bubbles into pane/session operation.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profile store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse profile store: {0}")]
    Parse(#[from] serde_json::Error),
}

//! `spellcaster_core`: the terminal engine and AI context pipeline behind
//! the Spellcaster terminal. This crate is a library — the window/pane
//! lifecycle manager, UI renderer, preferences store, OS keychain, and AI
//! HTTP client are external collaborators specified only at the narrow
//! trait/adapter seams in [`profile`], [`keychain`], and [`provider`] (§1, §9).
//!
//! The owning unit is a [`pane::Pane`]: one PTY host, one [`terminal::TerminalState`]
//! (which doubles as the `vte::Perform` implementor driving the ANSI parser),
//! and the background threads that keep them flowing into a
//! [`render::WindowObserver`].

pub mod clipboard;
pub mod config;
pub mod context;
pub mod error;
pub mod keychain;
pub mod pane;
pub mod profile;
pub mod provider;
pub mod pty;
pub mod redact;
pub mod render;
pub mod shell;
pub mod terminal;

pub use pane::{Pane, PaneOptions};

/// Installs the crate's default `tracing` subscriber: an `EnvFilter`
/// defaulting to `info` level, overridable via the `SPELLCASTER_LOG`
/// environment variable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SPELLCASTER_LOG")
                .unwrap_or_else(|_| "spellcaster_core=info".into()),
        )
        .init();
}

//! The library's top-level entry point: a `Pane` ties together one PTY
//! host, one `TerminalState`, and the reader/notification threads that
//! drive it (§3 Ownership: "Each pane exclusively owns one PTY host, one
//! terminal state, one parser, and one emulator"). This is the thin,
//! explicitly-typed seam the window/pane lifecycle manager — an external
//! collaborator per §1 — is built against; it carries no UI logic itself.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::context::{ContextSnapshot, ContextSnapshotBuilder, ContextToggles, ShellType};
use crate::error::PtyError;
use crate::pty::reader::spawn_pty_threads;
use crate::pty::{PtyManager, Session};
use crate::render::WindowObserver;
use crate::shell::detect::shell_name;
use crate::terminal::TerminalState;

/// Parameters for spawning a new pane. Mirrors `PtyManager::spawn_session`'s
/// arguments but groups them for a single call site.
#[derive(Debug, Clone, Default)]
pub struct PaneOptions {
    pub shell: Option<String>,
    pub cwd: Option<String>,
    pub rows: u16,
    pub cols: u16,
    pub env: HashMap<String, String>,
}

/// One live terminal pane: PTY host + terminal state + the background
/// threads that keep them in sync with an observer.
pub struct Pane {
    pub id: String,
    session: Session,
    shell_type: ShellType,
}

impl Pane {
    /// Launch a new pane (component D `Launch`), wiring its reader and
    /// notification-pump threads to `observer`.
    pub fn launch(
        options: PaneOptions,
        observer: Arc<dyn WindowObserver>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let rows = if options.rows == 0 { 24 } else { options.rows };
        let cols = if options.cols == 0 { 80 } else { options.cols };
        let id = Uuid::new_v4().to_string();

        let manager = PtyManager::new();
        let spawn_result = manager.spawn_session(
            options.shell.as_deref(),
            options.cwd.as_deref(),
            rows,
            cols,
            Some(&options.env),
        )?;

        let mut session = spawn_result.session;
        let reader = spawn_result.reader;

        let shell_path = options
            .shell
            .unwrap_or_else(|| crate::shell::detect::detect_shell());
        let shell_type = ShellType::from_shell_name(shell_name(&shell_path));

        let state = session.state();
        let writer = session.writer();
        let child = session.child();
        let exit_code = session.exit_code();
        let running = session.running();

        let handles = spawn_pty_threads(
            reader,
            state,
            writer,
            child,
            exit_code,
            observer,
            id.clone(),
            running,
        );
        session.set_thread_handles(handles.parser, handles.notify_pump, handles.notify_waker);

        tracing::info!(pane = %&id[..8.min(id.len())], rows, cols, "pane launched");

        Ok(Self {
            id,
            session,
            shell_type,
        })
    }

    /// Write input bytes to the shell via the PTY.
    pub fn write_input(&self, data: &[u8]) -> Result<(), PtyError> {
        self.session.write_input(data)
    }

    /// Resize the terminal grid and the underlying PTY.
    pub fn resize(&self, rows: u16, cols: u16) -> Result<(), PtyError> {
        self.session.resize(rows, cols)
    }

    /// Request a full redraw of the active screen.
    pub fn request_full_redraw(&self) {
        self.session.request_full_redraw();
    }

    /// True once the child process has exited.
    pub fn has_exited(&self) -> bool {
        !self.session.running().load(Ordering::Acquire)
    }

    /// Terminate the pane: SIGHUP then SIGKILL the child, cancel the
    /// reader, and join its threads (§5 Cancellation).
    pub fn terminate(mut self) {
        self.session.kill();
    }

    /// Shared access to the pane's terminal state, for direct inspection
    /// (selection, `ExtractText`, cursor position) outside the context
    /// pipeline.
    pub fn state(&self) -> Arc<Mutex<TerminalState>> {
        self.session.state()
    }

    /// Build a redacted `ContextSnapshot` for this pane (components F + G).
    /// `process_env` is the environment to capture when
    /// `includeEnvironment` is set — pass the PTY child's environment when
    /// available, falling back to the host's own (§4.6).
    pub fn build_context_snapshot(
        &self,
        toggles: ContextToggles,
        process_env: &HashMap<String, String>,
    ) -> ContextSnapshot {
        let builder = ContextSnapshotBuilder::new(toggles);
        let state = self.session.state();
        let state = state.lock();
        builder.build(&state, self.shell_type.clone(), process_env)
    }
}

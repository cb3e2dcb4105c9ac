//! Component H (§9 "Grid rendering callback"): the core never pushes
//! rendered frames through a UI framework's observation pattern. It tracks
//! a dirty-region set on the grid (`Grid::take_dirty_rows`) and notifies an
//! observer that a redraw is owed; the observer drains it at its own
//! cadence. Rendering itself — glyph shaping, styled spans, GPU composition
//! — is the UI layer's job and stays out of this crate (§1 Non-goals).

use crossbeam_channel::{Sender, TrySendError};

/// Terminal-level events the emulator surfaces alongside dirty rows. Kept to
/// what the core itself observes: mode and screen transitions, bell, title,
/// and shell-integration signals. Anything that would require interpreting
/// pixels or glyphs (cursor blink phase, font fallback, etc.) belongs to the
/// UI layer instead.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalEvent {
    /// OSC 0/2 set the window title.
    TitleChanged { title: String },
    /// DEC private mode 1049/47/1047 entered the alternate screen.
    AltScreenEntered,
    /// The alternate screen was exited, returning to primary.
    AltScreenExited,
    /// BEL (0x07) was executed.
    Bell,
    /// OSC 7 or shell-integration `CurrentDir` updated the working directory.
    CwdChanged { path: String },
    /// `CSI 3 J` cleared the scrollback buffer.
    ScrollbackCleared,
    /// Mouse or paste tracking mode flags changed.
    ModeChanged {
        mouse_tracking: bool,
        mouse_motion: bool,
        mouse_all_motion: bool,
        sgr_mouse: bool,
        bracketed_paste: bool,
        cursor_keys_application: bool,
    },
    /// Shell integration observed `PromptStart` at the given live-grid row.
    PromptStarted { row: u16 },
    /// Shell integration observed `CommandStart`.
    CommandStarted { command: String },
    /// Shell integration observed `CommandEnd=status`.
    CommandEnded { exit_code: i32 },
    /// The PTY's child process exited (component D's `OnExit` callback).
    /// `exit_code` is `None` when the process was killed by a signal.
    SessionExited { exit_code: Option<i32> },
}

/// What a pane hands its observer after draining a chunk of PTY output:
/// which visible rows changed (screen-relative, top = 0) and which
/// terminal-level events fired while processing that chunk.
#[derive(Debug, Clone, Default)]
pub struct DirtyNotification {
    pub dirty_rows: Vec<u16>,
    pub events: Vec<TerminalEvent>,
}

impl DirtyNotification {
    pub fn is_empty(&self) -> bool {
        self.dirty_rows.is_empty() && self.events.is_empty()
    }
}

/// The UI-side drain point for dirty-region notifications. The core only
/// ever calls `notify`; it never reaches into a UI framework directly.
pub trait WindowObserver: Send + Sync {
    fn notify(&self, pane_id: &str, notification: DirtyNotification);
}

/// Default `WindowObserver` adapter: forwards notifications through a
/// bounded `crossbeam_channel`, matching the "producer + bounded channel"
/// redesign this crate uses throughout (§9, §5 backpressure). A full
/// channel drops the notification rather than blocking the caller — the
/// next one will still carry every row that's dirty, since dirty state
/// accumulates on the grid until drained.
pub struct ChannelObserver {
    sender: Sender<(String, DirtyNotification)>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<(String, DirtyNotification)>) -> Self {
        Self { sender }
    }
}

impl WindowObserver for ChannelObserver {
    fn notify(&self, pane_id: &str, notification: DirtyNotification) {
        match self.sender.try_send((pane_id.to_string(), notification)) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!(pane_id, "dropped dirty notification, observer channel full");
            }
        }
    }
}

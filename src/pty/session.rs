use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;

use parking_lot::Mutex;
use portable_pty::{Child, MasterPty, PtySize};

use crate::error::PtyError;
use crate::terminal::TerminalState;

/// Shared writer handle so both the Session (keyboard input) and the reader
/// thread (DSR/DA responses) can write to the PTY.
pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Shared slot for the child process exit code. The parser thread writes it
/// when it detects EOF; the notification-pump thread reads it when
/// emitting the `SessionExited` event.
pub type SharedExitCode = Arc<Mutex<Option<i32>>>;

/// Shared child handle so the parser thread can call `try_wait()` after EOF.
pub type SharedChild = Arc<Mutex<Box<dyn Child + Send + Sync>>>;

/// A live terminal session (component D + the `TerminalState` it drives).
/// Each pane owns exactly one of these (§3 Ownership).
pub struct Session {
    /// Master PTY handle for resize operations (Option so it can be dropped before thread join)
    master: Option<Box<dyn MasterPty + Send>>,
    /// Child process (shell)
    child: SharedChild,
    /// Writer for sending input to the shell
    writer: SharedWriter,
    /// Shared terminal state (accessed by the reader thread and callers)
    pub state: Arc<Mutex<TerminalState>>,
    /// Shared run flag for parser/notification threads.
    running: Arc<AtomicBool>,
    /// Wake channel for the notification-pump thread.
    notify_waker: Option<SyncSender<()>>,
    /// Parser thread handle
    parser_handle: Option<std::thread::JoinHandle<()>>,
    /// Notification-pump thread handle
    notify_handle: Option<std::thread::JoinHandle<()>>,
    /// Temp directory used for shell init files; cleaned up on kill.
    temp_dir: Option<std::path::PathBuf>,
    /// Shared exit code slot written by the parser thread on EOF.
    exit_code: SharedExitCode,
}

impl Session {
    pub fn new(
        master: Box<dyn MasterPty + Send>,
        child: Box<dyn Child + Send + Sync>,
        writer: Box<dyn Write + Send>,
        rows: u16,
        cols: u16,
    ) -> Self {
        let state = Arc::new(Mutex::new(TerminalState::new(rows, cols)));

        Self {
            master: Some(master),
            child: Arc::new(Mutex::new(child)),
            writer: Arc::new(Mutex::new(writer)),
            state,
            running: Arc::new(AtomicBool::new(true)),
            notify_waker: None,
            parser_handle: None,
            notify_handle: None,
            temp_dir: None,
            exit_code: Arc::new(Mutex::new(None)),
        }
    }

    /// Get a reference to the shared terminal state.
    pub fn state(&self) -> Arc<Mutex<TerminalState>> {
        Arc::clone(&self.state)
    }

    /// Get a clone of the shared writer handle.
    pub fn writer(&self) -> SharedWriter {
        Arc::clone(&self.writer)
    }

    /// Get the shared running flag for PTY worker threads.
    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Get the shared exit code slot for reader/notification threads.
    pub fn exit_code(&self) -> SharedExitCode {
        Arc::clone(&self.exit_code)
    }

    /// Signal the notification-pump thread that terminal state may have changed.
    pub fn notify_dirty(&self) {
        if let Some(waker) = &self.notify_waker {
            let _ = waker.try_send(());
        }
    }

    /// Request a full redraw: marks every visible row of the active screen
    /// dirty so the next notification carries the whole viewport.
    pub fn request_full_redraw(&self) {
        let mut ts = self.state.lock();
        ts.request_full_redraw();
        drop(ts);
        self.notify_dirty();
    }

    /// Write input bytes to the shell via the PTY (component D `Write`).
    /// A write after the child has exited surfaces as `PipeClosed` rather
    /// than propagating the raw I/O error — the caller should treat it as
    /// a no-op and rely on the exit callback instead (§7).
    pub fn write_input(&self, data: &[u8]) -> Result<(), PtyError> {
        let mut writer = self.writer.lock();
        writer.write_all(data).map_err(|_| PtyError::PipeClosed)?;
        writer.flush().map_err(|_| PtyError::PipeClosed)?;
        Ok(())
    }

    /// Resize the terminal (component D `Resize`).
    ///
    /// Resizes the internal grid state *before* the PTY so the reader thread
    /// always processes incoming data against the correct dimensions. The PTY
    /// resize delivers SIGWINCH to the child, which may respond immediately.
    /// A no-op (not an error) once the PTY master has already been closed by
    /// `kill()` (§4.4 "Resize on an already-exited PTY is a no-op").
    pub fn resize(&self, rows: u16, cols: u16) -> Result<(), PtyError> {
        let Some(master) = self.master.as_ref() else {
            return Ok(());
        };
        let mut state = self.state.lock();
        state.resize(rows, cols);
        master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        drop(state);
        self.notify_dirty();
        Ok(())
    }

    /// Set the temp directory path for shell init files.
    /// Will be deleted (best-effort) when the session is killed.
    pub fn set_temp_dir(&mut self, path: std::path::PathBuf) {
        self.temp_dir = Some(path);
    }

    /// Set parser and notification-pump thread handles.
    pub fn set_thread_handles(
        &mut self,
        parser: std::thread::JoinHandle<()>,
        notify_pump: std::thread::JoinHandle<()>,
        notify_waker: SyncSender<()>,
    ) {
        self.parser_handle = Some(parser);
        self.notify_handle = Some(notify_pump);
        self.notify_waker = Some(notify_waker);
    }

    /// Kill the session: gracefully terminate the child process.
    ///
    /// Sends SIGHUP first (via portable-pty `kill()`), waits up to 200ms for
    /// the process to exit, then force-kills with SIGKILL if still alive.
    /// Also attempts to kill the entire process group for thorough cleanup
    /// (§5 Cancellation: "SIGHUP then SIGKILL after a grace period").
    pub fn kill(&mut self) {
        self.running.store(false, Ordering::Release);
        self.notify_dirty();

        {
            let mut child = self.child.lock();

            // Capture pid before sending any signals
            let pid = child.process_id();

            // Step 1: Send SIGHUP (portable-pty's kill() sends SIGHUP on Unix)
            let _ = child.kill();

            // Step 2: Wait up to 200ms for graceful exit
            let deadline = std::time::Instant::now() + std::time::Duration::from_millis(200);
            let mut exited = false;
            while std::time::Instant::now() < deadline {
                if let Ok(Some(_)) = child.try_wait() {
                    exited = true;
                    break;
                }
                std::thread::sleep(std::time::Duration::from_millis(10));
            }

            // Step 3: Force kill if still alive
            if !exited {
                if let Some(raw_pid) = pid {
                    // Try to kill the entire process group first
                    #[cfg(unix)]
                    {
                        unsafe {
                            // Kill process group (negative pid)
                            libc::kill(-(raw_pid as i32), libc::SIGKILL);
                            // Also kill the process directly in case it changed groups
                            libc::kill(raw_pid as i32, libc::SIGKILL);
                        }
                    }
                }
                // Also try direct kill via wait (which reaps the process)
                let _ = child.try_wait();
            }
        }

        // Close the PTY master fd so the parser thread's read returns EOF
        // and unblocks, preventing indefinite join hangs.
        drop(self.master.take());

        if let Some(handle) = self.parser_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.notify_handle.take() {
            let _ = handle.join();
        }
        self.notify_waker = None;

        // Best-effort cleanup of temp shell init directory
        if let Some(dir) = self.temp_dir.take() {
            let _ = std::fs::remove_dir_all(&dir);
        }
    }

    /// Check if the child process has exited.
    #[allow(dead_code)]
    pub fn try_wait(&self) -> Option<portable_pty::ExitStatus> {
        self.child.lock().try_wait().ok().flatten()
    }

    /// Get a shared reference to the child process for use by reader threads.
    pub fn child(&self) -> SharedChild {
        Arc::clone(&self.child)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.kill();
    }
}

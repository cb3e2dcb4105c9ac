use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::render::{TerminalEvent, WindowObserver};
use crate::terminal::TerminalState;

use super::session::{SharedChild, SharedExitCode, SharedWriter};

/// Handles for the parser and notification-pump threads (§5 "PTY reader" /
/// "UI observer" actors).
pub struct PtyThreadHandles {
    pub parser: std::thread::JoinHandle<()>,
    pub notify_pump: std::thread::JoinHandle<()>,
    pub notify_waker: SyncSender<()>,
}

/// Spawn the PTY parser and notification-pump threads for one pane.
///
/// - Parser thread: reads PTY bytes, feeds `vte::Parser` against the shared
///   `TerminalState` (which implements `Perform`), and flushes any DSR/DA
///   response bytes the emulator queued back to the PTY. This is the single
///   ordered channel by which bytes enter the emulator (§4.4 Reader
///   contract, §5 Ordering).
/// - Notification-pump thread: drains `TerminalState::drain_notification`
///   at ~60 Hz and forwards the result to the `WindowObserver`, coalescing
///   bursts of output into one notification per tick (§5 Backpressure).
pub fn spawn_pty_threads(
    mut reader: Box<dyn Read + Send>,
    state: Arc<Mutex<TerminalState>>,
    writer: SharedWriter,
    child: SharedChild,
    exit_code: SharedExitCode,
    observer: Arc<dyn WindowObserver>,
    pane_id: String,
    running: Arc<AtomicBool>,
) -> PtyThreadHandles {
    fn wake(waker: &SyncSender<()>) {
        let _ = waker.try_send(());
    }

    let (notify_waker, notify_rx) = sync_channel::<()>(1);
    let parser_state = Arc::clone(&state);
    let parser_writer = Arc::clone(&writer);
    let parser_child = Arc::clone(&child);
    let parser_exit_code = Arc::clone(&exit_code);
    let parser_pane = pane_id.clone();
    let parser_running = Arc::clone(&running);
    let parser_waker = notify_waker.clone();

    let parser = std::thread::Builder::new()
        .name(format!("pty-parser-{}", short_id(&parser_pane)))
        .spawn(move || {
            let mut parser = vte::Parser::new();
            let mut buf = [0u8; 4096];

            while parser_running.load(Ordering::Acquire) {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        tracing::info!(pane = short_id(&parser_pane), "PTY reader EOF");
                        if let Ok(Some(status)) = parser_child.lock().try_wait() {
                            let code = status.exit_code() as i32;
                            *parser_exit_code.lock() = Some(code);
                        }
                        parser_running.store(false, Ordering::Release);
                        wake(&parser_waker);
                        break;
                    }
                    Ok(n) => {
                        let mut state = parser_state.lock();
                        for &byte in &buf[..n] {
                            parser.advance(&mut *state, byte);
                        }

                        let responses = state.take_pending_responses();
                        if !responses.is_empty() {
                            let mut w = parser_writer.lock();
                            for resp in &responses {
                                let _ = w.write_all(resp);
                            }
                            let _ = w.flush();
                        }
                        wake(&parser_waker);
                    }
                    Err(e) => {
                        if parser_running.load(Ordering::Acquire) {
                            tracing::error!(pane = short_id(&parser_pane), error = %e, "PTY read error");
                        }
                        if let Ok(Some(status)) = parser_child.lock().try_wait() {
                            *parser_exit_code.lock() = Some(status.exit_code() as i32);
                        }
                        parser_running.store(false, Ordering::Release);
                        wake(&parser_waker);
                        break;
                    }
                }
            }
        })
        .expect("failed to spawn pty parser thread");

    let notify_state = Arc::clone(&state);
    let notify_exit_code = Arc::clone(&exit_code);
    let notify_observer = observer;
    let notify_pane = pane_id;
    let notify_running = Arc::clone(&running);
    let notify_retry_waker = notify_waker.clone();

    let notify_pump = std::thread::Builder::new()
        .name(format!("pty-notify-{}", short_id(&notify_pane)))
        .spawn(move || {
            const TICK: Duration = Duration::from_millis(16);
            let mut last_emit = Instant::now() - TICK;

            while notify_running.load(Ordering::Acquire) {
                if notify_rx.recv().is_err() {
                    break;
                }
                if !notify_running.load(Ordering::Acquire) {
                    break;
                }

                let elapsed = last_emit.elapsed();
                if elapsed < TICK {
                    std::thread::sleep(TICK - elapsed);
                }
                while notify_rx.try_recv().is_ok() {}

                match notify_state.try_lock() {
                    Some(mut state) => {
                        let notification = state.drain_notification();
                        drop(state);
                        if !notification.is_empty() {
                            notify_observer.notify(&notify_pane, notification);
                        }
                        last_emit = Instant::now();
                    }
                    None => {
                        wake(&notify_retry_waker);
                    }
                }
            }

            let mut state = notify_state.lock();
            let mut notification = state.drain_notification();
            drop(state);
            let exit_code = notify_exit_code.lock().take();
            notification
                .events
                .push(TerminalEvent::SessionExited { exit_code });
            notify_observer.notify(&notify_pane, notification);
        })
        .expect("failed to spawn pty notification-pump thread");

    PtyThreadHandles {
        parser,
        notify_pump,
        notify_waker,
    }
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(8)]
}

//! Thin `arboard` wrapper backing OSC 52 clipboard read/write (§4.3 OSC
//! dispatch). Kept as free functions rather than a trait since there is
//! exactly one backend and no adapter seam is needed here.

/// Writes `text` to the system clipboard. Failures are logged and
/// swallowed — a clipboard write triggered by terminal output should never
/// interrupt the session.
pub fn write_clipboard_text(text: &str) {
    match arboard::Clipboard::new() {
        Ok(mut clipboard) => {
            if let Err(err) = clipboard.set_text(text.to_string()) {
                tracing::debug!(?err, "OSC 52 clipboard write failed");
            }
        }
        Err(err) => tracing::debug!(?err, "failed to open system clipboard"),
    }
}

/// Reads the system clipboard as text, if any. Used for OSC 52 read
/// requests (`\e]52;c;?\a`).
pub fn read_clipboard_text() -> Option<String> {
    let mut clipboard = arboard::Clipboard::new().ok()?;
    clipboard.get_text().ok()
}

/// Terminal mode flags tracking the DEC private and ANSI modes this engine
/// understands. Modes are shared across both the primary and alternate
/// screens; only cursor position, style, and the scroll region are
/// per-grid.
#[derive(Debug, Clone)]
pub struct TerminalModes {
    /// DECCKM: cursor key mode (application vs normal)
    pub cursor_keys_application: bool,
    /// DECOM: origin mode
    pub origin: bool,
    /// DECAWM: auto-wrap mode
    pub autowrap: bool,
    /// DECTCEM: text cursor visible
    pub cursor_visible: bool,
    /// Mouse tracking (mode 1000)
    pub mouse_tracking: bool,
    /// Mouse motion tracking (mode 1002)
    pub mouse_motion: bool,
    /// Mouse all-motion tracking (mode 1003)
    pub mouse_all_motion: bool,
    /// SGR mouse reporting (mode 1006)
    pub sgr_mouse: bool,
    /// Bracketed paste mode (mode 2004)
    pub bracketed_paste: bool,
    /// Alternate screen active
    pub alt_screen: bool,
    /// Line feed / new line mode (LNM, public mode 20)
    pub linefeed_newline: bool,
}

impl Default for TerminalModes {
    fn default() -> Self {
        Self {
            cursor_keys_application: false,
            origin: false,
            autowrap: true,
            cursor_visible: true,
            mouse_tracking: false,
            mouse_motion: false,
            mouse_all_motion: false,
            sgr_mouse: false,
            bracketed_paste: false,
            alt_screen: false,
            linefeed_newline: false,
        }
    }
}

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use unicode_width::UnicodeWidthChar;

use super::color::{indexed_to_rgb, Color};
use super::cursor::{CellAttrs, CellStyle};
use super::grid::{Cell, CellFlags, Grid};
use super::modes::TerminalModes;
use super::selection::Selection;
use crate::render::{DirtyNotification, TerminalEvent};
use crate::shell::ShellIntegration;

/// Default scrollback capacity for the primary grid (§3 Scrollback).
const DEFAULT_SCROLLBACK: usize = 10_000;

/// DECSCUSR cursor shape. Not part of `Grid` — it's display metadata the
/// emulator tracks but never interprets, unlike the attributes in
/// `CellAttrs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    Block,
    Underline,
    Bar,
}

impl Default for CursorShape {
    fn default() -> Self {
        CursorShape::Block
    }
}

fn default_tab_stops(cols: u16) -> Vec<bool> {
    let mut stops = vec![false; cols as usize];
    for i in (0..cols as usize).step_by(8) {
        stops[i] = true;
    }
    stops
}

fn dec_line_drawing_char(c: char) -> char {
    match c {
        'j' => '┘',
        'k' => '┐',
        'l' => '┌',
        'm' => '└',
        'n' => '┼',
        'q' => '─',
        't' => '├',
        'u' => '┤',
        'v' => '┴',
        'w' => '┬',
        'x' => '│',
        'a' => '▒',
        '`' => '◆',
        'f' => '°',
        'g' => '±',
        '~' => '·',
        '_' => ' ',
        '0' => '█',
        _ => c,
    }
}

/// Format an RGB triplet as the `rgb:RRRR/GGGG/BBBB` body xterm-family
/// terminals use to answer OSC 4/10-19 color queries (each 8-bit channel
/// doubled into 16 bits).
fn rgb_query_response((r, g, b): (u8, u8, u8)) -> String {
    format!("rgb:{r:02x}{r:02x}/{g:02x}{g:02x}/{b:02x}{b:02x}")
}

/// Full terminal state: primary and alternate grids, modes, tab stops,
/// title, shell-integration record, and selection. Implements
/// `vte::Perform` so a `vte::Parser` can drive it directly.
pub struct TerminalState {
    primary: Grid,
    alternate: Grid,
    using_alt: bool,
    modes: TerminalModes,
    insert_mode: bool,
    tab_stops: Vec<bool>,
    title: String,
    title_changed: bool,
    shell: ShellIntegration,
    selection: Option<Selection>,
    cursor_shape: CursorShape,
    charset_g0_drawing: bool,
    bell_pending: bool,
    last_printed_char: char,
    pending_events: Vec<TerminalEvent>,
    pending_responses: Vec<Vec<u8>>,
}

impl TerminalState {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            primary: Grid::new(rows, cols, DEFAULT_SCROLLBACK),
            alternate: Grid::new(rows, cols, 0),
            using_alt: false,
            modes: TerminalModes::default(),
            insert_mode: false,
            tab_stops: default_tab_stops(cols),
            title: String::new(),
            title_changed: false,
            shell: ShellIntegration::new(),
            selection: None,
            cursor_shape: CursorShape::default(),
            charset_g0_drawing: false,
            bell_pending: false,
            last_printed_char: ' ',
            pending_events: Vec::new(),
            pending_responses: Vec::new(),
        }
    }

    pub fn active_grid(&self) -> &Grid {
        if self.using_alt {
            &self.alternate
        } else {
            &self.primary
        }
    }

    fn active_grid_mut(&mut self) -> &mut Grid {
        if self.using_alt {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    pub fn shell_integration(&self) -> &ShellIntegration {
        &self.shell
    }

    pub fn modes(&self) -> &TerminalModes {
        &self.modes
    }

    pub fn cursor_shape(&self) -> CursorShape {
        self.cursor_shape
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn dimensions(&self) -> (u16, u16) {
        let g = self.active_grid();
        (g.visible_rows, g.cols)
    }

    pub fn resize(&mut self, rows: u16, cols: u16) {
        self.primary.resize(rows, cols);
        self.alternate.resize_no_scrollback(rows, cols);
        self.tab_stops = default_tab_stops(cols);
    }

    /// Drain response bytes queued by DSR/DA/OSC-52-read so the reader
    /// thread can write them back to the PTY.
    pub fn take_pending_responses(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.pending_responses)
    }

    /// Drain dirty rows plus accumulated terminal-level events for the
    /// observer notification model (§9 "Grid rendering callback").
    pub fn drain_notification(&mut self) -> DirtyNotification {
        let using_alt = self.using_alt;
        let dirty_rows = if using_alt {
            self.alternate.take_dirty_rows()
        } else {
            self.primary.take_dirty_rows()
        };

        let mut events = self.shell.take_pending_events();
        events.append(&mut self.pending_events);
        if self.title_changed {
            events.push(TerminalEvent::TitleChanged {
                title: self.title.clone(),
            });
            self.title_changed = false;
        }
        if self.bell_pending {
            events.push(TerminalEvent::Bell);
            self.bell_pending = false;
        }

        DirtyNotification { dirty_rows, events }
    }

    pub fn request_full_redraw(&mut self) {
        self.active_grid_mut().mark_all_dirty();
    }

    // --- Selection (§4.3 Expansion) -----------------------------------

    pub fn start_selection(&mut self, row: i64, col: u16) {
        let abs = self.absolute_row(row);
        self.selection = Some(Selection::new(abs, col));
    }

    pub fn extend_selection(&mut self, row: i64, col: u16) {
        let abs = self.absolute_row(row);
        if let Some(selection) = &mut self.selection {
            selection.extend(abs, col);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn selected_text(&self) -> Option<String> {
        let selection = self.selection?;
        let (start_row, start_col, end_row, end_col) = selection.normalized();
        let grid = self.active_grid();
        let mut lines = Vec::new();
        for row_idx in start_row..=end_row {
            if row_idx >= grid.rows.len() {
                break;
            }
            let chars: Vec<char> = grid.rows[row_idx].to_text().chars().collect();
            let from = if row_idx == start_row {
                start_col as usize
            } else {
                0
            };
            let to = if row_idx == end_row {
                (end_col as usize).min(chars.len())
            } else {
                chars.len()
            };
            if from <= to && from <= chars.len() {
                lines.push(chars[from..to.max(from)].iter().collect::<String>());
            } else {
                lines.push(String::new());
            }
        }
        Some(lines.join("\n"))
    }

    /// Converts a screen-relative row (negative addresses scrollback, row
    /// `-1` is the line directly above the viewport) to an absolute index
    /// into the active grid's row list.
    fn absolute_row(&self, row: i64) -> usize {
        let offset = self.active_grid().visible_offset() as i64;
        (offset + row).max(0) as usize
    }

    // --- Context snapshot support (§4.6) -------------------------------

    pub fn recent_visible_lines(&self, n: u16) -> Vec<String> {
        let grid = self.active_grid();
        let take = n.min(grid.visible_rows);
        let start = grid.visible_rows - take;
        (start..grid.visible_rows)
            .map(|row| grid.visible_row(row).to_text())
            .collect()
    }

    pub fn scrollback_lines(&self) -> Vec<String> {
        let grid = self.active_grid();
        let offset = grid.visible_offset();
        grid.rows.iter().take(offset).map(|row| row.to_text()).collect()
    }

    /// Component B's `ExtractText(range)`: concatenates rows from `start`
    /// to `end` inclusive (screen-relative; row 0 is the top of the
    /// viewport, negative indices reach into scrollback), joining logical
    /// rows with line breaks.
    pub fn extract_text_range(&self, start: i64, end: i64) -> String {
        let grid = self.active_grid();
        if grid.rows.is_empty() {
            return String::new();
        }
        let offset = grid.visible_offset() as i64;
        let last = grid.rows.len() as i64 - 1;
        let start_abs = (offset + start).clamp(0, last) as usize;
        let end_abs = (offset + end).clamp(0, last) as usize;
        if start_abs > end_abs {
            return String::new();
        }
        grid.rows
            .iter()
            .skip(start_abs)
            .take(end_abs - start_abs + 1)
            .map(|row| row.to_text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    // --- Cursor movement -------------------------------------------------

    fn cursor_up(&mut self, n: u16) {
        let grid = self.active_grid_mut();
        grid.clear_wrap_latch();
        grid.cursor_row = grid.cursor_row.saturating_sub(n);
    }

    fn cursor_down(&mut self, n: u16) {
        let grid = self.active_grid_mut();
        grid.clear_wrap_latch();
        let max = grid.visible_rows.saturating_sub(1);
        grid.cursor_row = grid.cursor_row.saturating_add(n).min(max);
    }

    fn cursor_forward(&mut self, n: u16) {
        let grid = self.active_grid_mut();
        grid.clear_wrap_latch();
        let max = grid.cols.saturating_sub(1);
        grid.cursor_col = grid.cursor_col.saturating_add(n).min(max);
    }

    fn cursor_backward(&mut self, n: u16) {
        let grid = self.active_grid_mut();
        grid.clear_wrap_latch();
        grid.cursor_col = grid.cursor_col.saturating_sub(n);
    }

    fn set_col(&mut self, col: u16) {
        let grid = self.active_grid_mut();
        grid.clear_wrap_latch();
        grid.cursor_col = col.min(grid.cols.saturating_sub(1));
    }

    fn set_row(&mut self, row: u16) {
        let origin = self.modes.origin;
        let grid = self.active_grid_mut();
        grid.clear_wrap_latch();
        let base = if origin { grid.scroll_top } else { 0 };
        let max = if origin {
            grid.scroll_bottom
        } else {
            grid.visible_rows.saturating_sub(1)
        };
        grid.cursor_row = (base + row).min(max);
    }

    fn set_cursor_position(&mut self, row: u16, col: u16) {
        let origin = self.modes.origin;
        let grid = self.active_grid_mut();
        grid.clear_wrap_latch();
        let row_base = if origin { grid.scroll_top } else { 0 };
        let row_max = if origin {
            grid.scroll_bottom
        } else {
            grid.visible_rows.saturating_sub(1)
        };
        grid.cursor_row = (row_base + row).min(row_max);
        grid.cursor_col = col.min(grid.cols.saturating_sub(1));
    }

    fn set_tab_stop_at_cursor(&mut self) {
        let col = self.active_grid().cursor_col as usize;
        if col < self.tab_stops.len() {
            self.tab_stops[col] = true;
        }
    }

    fn tab(&mut self) {
        let (col, cols) = {
            let g = self.active_grid();
            (g.cursor_col, g.cols)
        };
        let mut next = col as usize + 1;
        while next < self.tab_stops.len() && !self.tab_stops[next] {
            next += 1;
        }
        let target = (next as u16).min(cols.saturating_sub(1));
        let grid = self.active_grid_mut();
        grid.clear_wrap_latch();
        grid.cursor_col = target;
    }

    fn backspace(&mut self) {
        let grid = self.active_grid_mut();
        grid.clear_wrap_latch();
        if grid.cursor_col > 0 {
            grid.cursor_col -= 1;
        }
    }

    fn carriage_return(&mut self) {
        let grid = self.active_grid_mut();
        grid.clear_wrap_latch();
        grid.cursor_col = 0;
    }

    /// LineFeed/Index: scroll at `scroll_bottom`, otherwise move down one
    /// row. Leaves `wrapPending` cleared either way (§4.2).
    fn do_linefeed(&mut self) {
        let (top, bottom) = {
            let g = self.active_grid();
            (g.scroll_top, g.scroll_bottom)
        };
        let grid = self.active_grid_mut();
        if grid.cursor_row == bottom {
            grid.scroll_up(top, bottom);
        } else if grid.cursor_row < grid.visible_rows.saturating_sub(1) {
            grid.cursor_row += 1;
        }
        grid.wrap_pending = false;
    }

    /// ReverseIndex: mirror of `do_linefeed` at `scroll_top`.
    fn reverse_index(&mut self) {
        let (top, bottom) = {
            let g = self.active_grid();
            (g.scroll_top, g.scroll_bottom)
        };
        let grid = self.active_grid_mut();
        if grid.cursor_row == top {
            grid.scroll_down(top, bottom);
        } else if grid.cursor_row > 0 {
            grid.cursor_row -= 1;
        }
        grid.wrap_pending = false;
    }

    /// The soft line-wrap a print triggers when `wrapPending` was latched:
    /// a linefeed whose destination row is marked as a continuation of the
    /// one above, so reflow can tell a wrapped line from a hard newline.
    fn soft_wrap(&mut self) {
        self.do_linefeed();
        let grid = self.active_grid_mut();
        let row = grid.cursor_row;
        grid.visible_row_mut(row).wrapped = true;
        grid.cursor_col = 0;
    }

    fn write_char(&mut self, c: char) {
        let width = UnicodeWidthChar::width(c).unwrap_or(1).max(1) as u16;

        let wrap_pending = self.active_grid().wrap_pending;
        if wrap_pending {
            if self.modes.autowrap {
                self.soft_wrap();
            } else {
                let grid = self.active_grid_mut();
                grid.wrap_pending = false;
                grid.cursor_col = grid.cols.saturating_sub(1);
            }
        }

        if self.insert_mode {
            let (row, col) = {
                let g = self.active_grid();
                (g.cursor_row, g.cursor_col)
            };
            self.active_grid_mut().insert_cells(row, col, width);
        }

        let grid = self.active_grid_mut();
        let row = grid.cursor_row;
        let col = grid.cursor_col.min(grid.cols.saturating_sub(1));
        let style = grid.current_style;

        if width == 2 && col + 1 < grid.cols {
            grid.set_cell(
                row,
                col,
                Cell {
                    c,
                    fg: style.fg,
                    bg: style.bg,
                    attrs: style.attrs,
                    flags: CellFlags::WIDE_CHAR,
                },
            );
            grid.set_cell(row, col + 1, Cell::wide_spacer());
            grid.cursor_col = col + 2;
        } else {
            grid.set_cell(
                row,
                col,
                Cell {
                    c,
                    fg: style.fg,
                    bg: style.bg,
                    attrs: style.attrs,
                    flags: CellFlags::empty(),
                },
            );
            grid.cursor_col = col + 1;
        }

        if grid.cursor_col >= grid.cols {
            grid.cursor_col = grid.cols;
            grid.wrap_pending = true;
        }
    }

    // --- Erase / insert / delete ----------------------------------------

    fn erase_display(&mut self, mode: u16) {
        let (cursor_row, cursor_col, visible_rows, cols, bg) = {
            let g = self.active_grid();
            (g.cursor_row, g.cursor_col, g.visible_rows, g.cols, g.current_style.bg)
        };
        match mode {
            0 => {
                let grid = self.active_grid_mut();
                grid.erase_cells(cursor_row, cursor_col, cols, bg);
                for r in (cursor_row + 1)..visible_rows {
                    grid.erase_cells(r, 0, cols, bg);
                }
            }
            1 => {
                let grid = self.active_grid_mut();
                for r in 0..cursor_row {
                    grid.erase_cells(r, 0, cols, bg);
                }
                grid.erase_cells(cursor_row, 0, cursor_col + 1, bg);
            }
            2 => {
                let grid = self.active_grid_mut();
                for r in 0..visible_rows {
                    grid.erase_cells(r, 0, cols, bg);
                }
            }
            3 => {
                let using_alt = self.using_alt;
                {
                    let grid = self.active_grid_mut();
                    for r in 0..visible_rows {
                        grid.erase_cells(r, 0, cols, bg);
                    }
                    if !using_alt {
                        let offset = grid.visible_offset();
                        for _ in 0..offset {
                            grid.rows.pop_front();
                        }
                    }
                }
                self.pending_events.push(TerminalEvent::ScrollbackCleared);
            }
            _ => {}
        }
    }

    fn erase_line(&mut self, mode: u16) {
        let (cursor_row, cursor_col, cols, bg) = {
            let g = self.active_grid();
            (g.cursor_row, g.cursor_col, g.cols, g.current_style.bg)
        };
        let grid = self.active_grid_mut();
        match mode {
            0 => grid.erase_cells(cursor_row, cursor_col, cols, bg),
            1 => grid.erase_cells(cursor_row, 0, cursor_col + 1, bg),
            2 => grid.erase_cells(cursor_row, 0, cols, bg),
            _ => {}
        }
    }

    fn insert_lines(&mut self, n: u16) {
        let (cursor_row, top, bottom) = {
            let g = self.active_grid();
            (g.cursor_row, g.scroll_top, g.scroll_bottom)
        };
        if cursor_row < top || cursor_row > bottom {
            return;
        }
        let count = n.min(bottom - cursor_row + 1);
        let grid = self.active_grid_mut();
        for _ in 0..count {
            grid.scroll_down(cursor_row, bottom);
        }
    }

    fn delete_lines(&mut self, n: u16) {
        let (cursor_row, top, bottom) = {
            let g = self.active_grid();
            (g.cursor_row, g.scroll_top, g.scroll_bottom)
        };
        if cursor_row < top || cursor_row > bottom {
            return;
        }
        let count = n.min(bottom - cursor_row + 1);
        let grid = self.active_grid_mut();
        for _ in 0..count {
            grid.scroll_up(cursor_row, bottom);
        }
    }

    fn insert_chars(&mut self, n: u16) {
        let (row, col) = {
            let g = self.active_grid();
            (g.cursor_row, g.cursor_col)
        };
        self.active_grid_mut().insert_cells(row, col, n);
    }

    fn delete_chars(&mut self, n: u16) {
        let (row, col) = {
            let g = self.active_grid();
            (g.cursor_row, g.cursor_col)
        };
        self.active_grid_mut().delete_cells(row, col, n);
    }

    fn erase_chars(&mut self, n: u16) {
        let (row, col, cols, bg) = {
            let g = self.active_grid();
            (g.cursor_row, g.cursor_col, g.cols, g.current_style.bg)
        };
        self.active_grid_mut()
            .erase_cells(row, col, (col + n).min(cols), bg);
    }

    fn scroll_up_n(&mut self, n: u16) {
        let (top, bottom) = {
            let g = self.active_grid();
            (g.scroll_top, g.scroll_bottom)
        };
        let grid = self.active_grid_mut();
        for _ in 0..n {
            grid.scroll_up(top, bottom);
        }
    }

    fn scroll_down_n(&mut self, n: u16) {
        let (top, bottom) = {
            let g = self.active_grid();
            (g.scroll_top, g.scroll_bottom)
        };
        let grid = self.active_grid_mut();
        for _ in 0..n {
            grid.scroll_down(top, bottom);
        }
    }

    fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        let rows = self.active_grid().visible_rows;
        let top0 = top.saturating_sub(1);
        let bottom0 = if bottom == 0 {
            rows.saturating_sub(1)
        } else {
            bottom.saturating_sub(1).min(rows.saturating_sub(1))
        };
        if top0 >= bottom0 {
            return;
        }
        let origin = self.modes.origin;
        let grid = self.active_grid_mut();
        grid.scroll_top = top0;
        grid.scroll_bottom = bottom0;
        grid.cursor_row = if origin { top0 } else { 0 };
        grid.cursor_col = 0;
        grid.wrap_pending = false;
    }

    // --- SGR --------------------------------------------------------------

    fn style_mut(&mut self) -> &mut CellStyle {
        &mut self.active_grid_mut().current_style
    }

    fn reset_style(&mut self) {
        *self.style_mut() = CellStyle::default();
    }

    fn handle_sgr(&mut self, flat: &[u16]) {
        if flat.is_empty() {
            self.reset_style();
            return;
        }
        let mut i = 0;
        while i < flat.len() {
            let code = flat[i];
            match code {
                0 => self.reset_style(),
                1 => self.style_mut().attrs.insert(CellAttrs::BOLD),
                2 => self.style_mut().attrs.insert(CellAttrs::DIM),
                3 => self.style_mut().attrs.insert(CellAttrs::ITALIC),
                4 => self.style_mut().attrs.insert(CellAttrs::UNDERLINE),
                5 | 6 => {}
                7 => self.style_mut().attrs.insert(CellAttrs::REVERSE),
                8 => self.style_mut().attrs.insert(CellAttrs::HIDDEN),
                9 => self.style_mut().attrs.insert(CellAttrs::STRIKETHROUGH),
                21 => self.style_mut().attrs.remove(CellAttrs::BOLD),
                22 => self.style_mut().attrs.remove(CellAttrs::DIM),
                23 => self.style_mut().attrs.remove(CellAttrs::ITALIC),
                24 => self.style_mut().attrs.remove(CellAttrs::UNDERLINE),
                27 => self.style_mut().attrs.remove(CellAttrs::REVERSE),
                28 => self.style_mut().attrs.remove(CellAttrs::HIDDEN),
                29 => self.style_mut().attrs.remove(CellAttrs::STRIKETHROUGH),
                30..=37 => self.style_mut().fg = Color::Indexed((code - 30) as u8),
                38 => i += self.consume_extended_color(&flat[i + 1..], true),
                39 => self.style_mut().fg = Color::Default,
                40..=47 => self.style_mut().bg = Color::Indexed((code - 40) as u8),
                48 => i += self.consume_extended_color(&flat[i + 1..], false),
                49 => self.style_mut().bg = Color::Default,
                90..=97 => self.style_mut().fg = Color::Indexed((code - 90 + 8) as u8),
                100..=107 => self.style_mut().bg = Color::Indexed((code - 100 + 8) as u8),
                _ => {}
            }
            i += 1;
        }
    }

    /// Consumes the `5;n` (256-color) or `2;r;g;b` (true-color) tail that
    /// follows a 38/48 code, returning how many extra slots were used so
    /// the caller's cursor can skip past them. Colon sub-parameters arrive
    /// pre-flattened into the same slice by `csi_dispatch`, so both forms
    /// are handled identically here.
    fn consume_extended_color(&mut self, rest: &[u16], is_fg: bool) -> usize {
        match rest.first() {
            Some(5) => {
                let idx = rest.get(1).copied().unwrap_or(0) as u8;
                let color = Color::Indexed(idx);
                if is_fg {
                    self.style_mut().fg = color;
                } else {
                    self.style_mut().bg = color;
                }
                2
            }
            Some(2) => {
                let r = rest.get(1).copied().unwrap_or(0) as u8;
                let g = rest.get(2).copied().unwrap_or(0) as u8;
                let b = rest.get(3).copied().unwrap_or(0) as u8;
                let color = Color::Rgb(r, g, b);
                if is_fg {
                    self.style_mut().fg = color;
                } else {
                    self.style_mut().bg = color;
                }
                4
            }
            _ => 0,
        }
    }

    // --- Modes --------------------------------------------------------------

    fn set_mode(&mut self, flat: &[u16], private: bool, enable: bool) {
        for &code in flat {
            if private {
                self.set_dec_mode(code, enable);
            } else {
                self.set_ansi_mode(code, enable);
            }
        }
        self.pending_events.push(TerminalEvent::ModeChanged {
            mouse_tracking: self.modes.mouse_tracking,
            mouse_motion: self.modes.mouse_motion,
            mouse_all_motion: self.modes.mouse_all_motion,
            sgr_mouse: self.modes.sgr_mouse,
            bracketed_paste: self.modes.bracketed_paste,
            cursor_keys_application: self.modes.cursor_keys_application,
        });
    }

    fn set_ansi_mode(&mut self, code: u16, enable: bool) {
        match code {
            4 => self.insert_mode = enable,
            20 => self.modes.linefeed_newline = enable,
            _ => {}
        }
    }

    fn set_dec_mode(&mut self, code: u16, enable: bool) {
        match code {
            1 => self.modes.cursor_keys_application = enable,
            6 => {
                self.modes.origin = enable;
                let grid = self.active_grid_mut();
                grid.cursor_row = if enable { grid.scroll_top } else { 0 };
                grid.cursor_col = 0;
            }
            7 => self.modes.autowrap = enable,
            25 => self.modes.cursor_visible = enable,
            1000 => self.modes.mouse_tracking = enable,
            1002 => self.modes.mouse_motion = enable,
            1003 => self.modes.mouse_all_motion = enable,
            1006 => self.modes.sgr_mouse = enable,
            2004 => self.modes.bracketed_paste = enable,
            1049 => self.set_alt_screen(enable),
            _ => {}
        }
    }

    fn set_alt_screen(&mut self, enable: bool) {
        if enable {
            if !self.using_alt {
                self.primary.save_cursor();
                self.using_alt = true;
                let (rows, cols) = (self.alternate.visible_rows, self.alternate.cols);
                self.alternate.resize_no_scrollback(rows, cols);
                self.modes.alt_screen = true;
                self.pending_events.push(TerminalEvent::AltScreenEntered);
            }
        } else if self.using_alt {
            self.using_alt = false;
            self.primary.restore_cursor();
            self.modes.alt_screen = false;
            self.pending_events.push(TerminalEvent::AltScreenExited);
        }
    }

    // --- Device status / attribute responses ------------------------------

    fn device_status_report(&mut self, n: u16) {
        match n {
            5 => self.pending_responses.push(b"\x1b[0n".to_vec()),
            6 => {
                let (row, col) = {
                    let g = self.active_grid();
                    (g.cursor_row, g.cursor_col)
                };
                let resp = format!("\x1b[{};{}R", row + 1, col + 1);
                self.pending_responses.push(resp.into_bytes());
            }
            _ => {}
        }
    }

    fn report_primary_device_attributes(&mut self) {
        self.pending_responses.push(b"\x1b[?62;22c".to_vec());
    }

    fn window_op(&mut self, n: u16) {
        if n == 18 {
            let (rows, cols) = {
                let g = self.active_grid();
                (g.visible_rows, g.cols)
            };
            let resp = format!("\x1b[8;{};{}t", rows, cols);
            self.pending_responses.push(resp.into_bytes());
        }
    }

    fn set_cursor_shape(&mut self, n: u16) {
        self.cursor_shape = match n {
            0 | 1 | 2 => CursorShape::Block,
            3 | 4 => CursorShape::Underline,
            5 | 6 => CursorShape::Bar,
            _ => self.cursor_shape,
        };
    }

    // --- OSC ----------------------------------------------------------------

    fn handle_osc52(&mut self, params: &[&[u8]]) {
        if params.len() < 3 {
            return;
        }
        if params[2] == b"?" {
            if let Some(text) = crate::clipboard::read_clipboard_text() {
                let encoded = BASE64_STANDARD.encode(text);
                let resp = format!("\x1b]52;c;{}\x07", encoded);
                self.pending_responses.push(resp.into_bytes());
            }
            return;
        }
        if let Ok(decoded) = BASE64_STANDARD.decode(params[2]) {
            if let Ok(text) = String::from_utf8(decoded) {
                crate::clipboard::write_clipboard_text(&text);
            }
        }
    }

    /// OSC 4 ; index ; spec — palette color query/set. This crate owns no
    /// mutable palette store (§ color engine note in `color.rs`), so a `?`
    /// query is answered against the fixed `indexed_to_rgb` table and a set
    /// request is accepted and ignored.
    fn handle_osc4(&mut self, params: &[&[u8]]) {
        if params.len() < 3 || params[2] != b"?" {
            return;
        }
        if let Ok(index) = std::str::from_utf8(params[1]).unwrap_or("").parse::<u8>() {
            let resp = format!("\x1b]4;{};{}\x07", index, rgb_query_response(indexed_to_rgb(index)));
            self.pending_responses.push(resp.into_bytes());
        }
    }

    /// OSC 10-19 — dynamic color queries (foreground, background, cursor,
    /// mouse pointer, Tektronix, highlight). Answered against fixed palette
    /// entries for the same reason as `handle_osc4`; set requests are
    /// accepted and ignored.
    fn handle_osc_dynamic_color(&mut self, code: u16, params: &[&[u8]]) {
        if params.len() < 2 || params[1] != b"?" {
            return;
        }
        let index = match code {
            10 => 15, // foreground
            11 => 0,  // background
            12 => 15, // cursor
            13 => 15, // mouse foreground
            14 => 0,  // mouse background
            15 => 15, // Tektronix foreground
            16 => 0,  // Tektronix background
            17 => 8,  // highlight background
            18 => 15, // Tektronix cursor
            19 => 15, // highlight foreground
            _ => return,
        };
        let resp = format!("\x1b]{};{}\x07", code, rgb_query_response(indexed_to_rgb(index)));
        self.pending_responses.push(resp.into_bytes());
    }

    fn handle_osc_1337(&mut self, params: &[&[u8]]) {
        if params.len() < 2 {
            return;
        }
        let payload = params[1..]
            .iter()
            .map(|p| String::from_utf8_lossy(p).to_string())
            .collect::<Vec<_>>()
            .join(";");
        let global_row = {
            let grid = self.active_grid();
            (grid.visible_offset() + grid.cursor_row as usize) as i64
        };
        self.shell.handle_directive(&payload, global_row);
    }

    fn full_reset(&mut self) {
        let (rows, cols) = self.dimensions();
        *self = TerminalState::new(rows, cols);
    }
}

impl vte::Perform for TerminalState {
    fn print(&mut self, c: char) {
        self.shell.accumulate_print(c);
        let mapped = if self.charset_g0_drawing {
            dec_line_drawing_char(c)
        } else {
            c
        };
        self.write_char(mapped);
        self.last_printed_char = mapped;
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            0x07 => self.bell_pending = true,
            0x08 => self.backspace(),
            0x09 => self.tab(),
            0x0A | 0x0B | 0x0C => {
                self.do_linefeed();
                if self.modes.linefeed_newline {
                    self.carriage_return();
                }
            }
            0x0D => self.carriage_return(),
            0x0E | 0x0F => {}
            _ => tracing::debug!(byte, "ignored unrecognized control byte"),
        }
    }

    fn hook(&mut self, _params: &vte::Params, _intermediates: &[u8], _ignore: bool, _action: char) {
        // DCS content (sixel, XTGETTCAP, tmux control mode) is externally
        // indistinguishable from "unsupported, returns to Ground" per the
        // resolved Open Question in DESIGN.md.
    }

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, params: &[&[u8]], _bell_terminated: bool) {
        if params.is_empty() {
            return;
        }
        match params[0] {
            b"0" | b"1" | b"2" => {
                let title = params
                    .get(1)
                    .map(|p| String::from_utf8_lossy(p).to_string())
                    .unwrap_or_default();
                self.title = title;
                self.title_changed = true;
            }
            b"4" => self.handle_osc4(params),
            b"10" => self.handle_osc_dynamic_color(10, params),
            b"11" => self.handle_osc_dynamic_color(11, params),
            b"12" => self.handle_osc_dynamic_color(12, params),
            b"13" => self.handle_osc_dynamic_color(13, params),
            b"14" => self.handle_osc_dynamic_color(14, params),
            b"15" => self.handle_osc_dynamic_color(15, params),
            b"16" => self.handle_osc_dynamic_color(16, params),
            b"17" => self.handle_osc_dynamic_color(17, params),
            b"18" => self.handle_osc_dynamic_color(18, params),
            b"19" => self.handle_osc_dynamic_color(19, params),
            b"52" => self.handle_osc52(params),
            b"1337" => self.handle_osc_1337(params),
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &vte::Params, intermediates: &[u8], _ignore: bool, action: char) {
        let flat: Vec<u16> = params.iter().flat_map(|p| p.iter().copied()).collect();
        let private = intermediates.contains(&b'?');

        let get = |idx: usize, default: u16| -> u16 {
            match flat.get(idx).copied() {
                Some(0) | None => default,
                Some(v) => v.min(16383),
            }
        };
        let raw = |idx: usize| -> u16 { flat.get(idx).copied().unwrap_or(0).min(16383) };

        match action {
            'A' => self.cursor_up(get(0, 1)),
            'B' => self.cursor_down(get(0, 1)),
            'C' => self.cursor_forward(get(0, 1)),
            'D' => self.cursor_backward(get(0, 1)),
            'E' => {
                self.cursor_down(get(0, 1));
                self.carriage_return();
            }
            'F' => {
                self.cursor_up(get(0, 1));
                self.carriage_return();
            }
            'G' => self.set_col(get(0, 1).saturating_sub(1)),
            'd' => self.set_row(get(0, 1).saturating_sub(1)),
            'H' | 'f' => {
                let row = get(0, 1).saturating_sub(1);
                let col = get(1, 1).saturating_sub(1);
                self.set_cursor_position(row, col);
            }
            'J' => self.erase_display(raw(0)),
            'K' => self.erase_line(raw(0)),
            'L' => self.insert_lines(get(0, 1)),
            'M' => self.delete_lines(get(0, 1)),
            '@' => self.insert_chars(get(0, 1)),
            'P' => self.delete_chars(get(0, 1)),
            'S' => self.scroll_up_n(get(0, 1)),
            'T' => self.scroll_down_n(get(0, 1)),
            'X' => self.erase_chars(get(0, 1)),
            'r' => self.set_scroll_region(raw(0), raw(1)),
            'm' => self.handle_sgr(&flat),
            'h' => self.set_mode(&flat, private, true),
            'l' => self.set_mode(&flat, private, false),
            'n' => self.device_status_report(raw(0)),
            's' => self.active_grid_mut().save_cursor(),
            'u' => self.active_grid_mut().restore_cursor(),
            'c' if !private => self.report_primary_device_attributes(),
            't' => self.window_op(raw(0)),
            'q' if intermediates.contains(&b' ') => self.set_cursor_shape(raw(0)),
            'b' => {
                let c = self.last_printed_char;
                for _ in 0..get(0, 1) {
                    self.write_char(c);
                }
            }
            _ => {}
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        if intermediates.contains(&b'(') {
            match byte {
                b'0' => self.charset_g0_drawing = true,
                b'B' => self.charset_g0_drawing = false,
                _ => {}
            }
            return;
        }
        match byte {
            b'D' => self.do_linefeed(),
            b'E' => {
                self.do_linefeed();
                self.carriage_return();
            }
            b'M' => self.reverse_index(),
            b'7' => self.active_grid_mut().save_cursor(),
            b'8' => self.active_grid_mut().restore_cursor(),
            b'c' => self.full_reset(),
            b'H' => self.set_tab_stop_at_cursor(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(state: &mut TerminalState, bytes: &[u8]) {
        let mut parser = vte::Parser::new();
        for &b in bytes {
            parser.advance(state, b);
        }
    }

    #[test]
    fn prints_plain_text() {
        let mut state = TerminalState::new(24, 80);
        feed(&mut state, b"hello");
        assert_eq!(state.active_grid().visible_row(0).to_text(), "hello");
    }

    #[test]
    fn autowrap_marks_continuation_row() {
        let mut state = TerminalState::new(2, 4);
        feed(&mut state, b"abcdef");
        assert_eq!(state.active_grid().visible_row(0).to_text(), "abcd");
        assert_eq!(state.active_grid().visible_row(1).to_text(), "ef");
        assert!(state.active_grid().visible_row(1).wrapped);
    }

    #[test]
    fn sgr_true_color_sets_foreground() {
        let mut state = TerminalState::new(5, 10);
        feed(&mut state, b"\x1b[38;2;10;20;30mX");
        let cell = &state.active_grid().visible_row(0).cells[0];
        assert_eq!(cell.fg, Color::Rgb(10, 20, 30));
    }

    #[test]
    fn sgr_256_color_sets_background() {
        let mut state = TerminalState::new(5, 10);
        feed(&mut state, b"\x1b[48;5;160mX");
        let cell = &state.active_grid().visible_row(0).cells[0];
        assert_eq!(cell.bg, Color::Indexed(160));
    }

    #[test]
    fn scroll_region_insert_delete_lines() {
        let mut state = TerminalState::new(5, 10);
        feed(&mut state, b"\x1b[2;4r");
        assert_eq!(state.active_grid().scroll_top, 1);
        assert_eq!(state.active_grid().scroll_bottom, 3);
    }

    #[test]
    fn alt_screen_1049_round_trips_cursor() {
        let mut state = TerminalState::new(5, 10);
        feed(&mut state, b"hi");
        feed(&mut state, b"\x1b[?1049h");
        assert!(state.using_alt);
        feed(&mut state, b"\x1b[?1049l");
        assert!(!state.using_alt);
        assert_eq!(state.active_grid().visible_row(0).to_text(), "hi");
    }

    #[test]
    fn erase_in_display_mode_3_clears_scrollback() {
        let mut state = TerminalState::new(2, 10, );
        for _ in 0..5 {
            feed(&mut state, b"line\n");
        }
        assert!(state.active_grid().scrollback_len() > 0);
        feed(&mut state, b"\x1b[3J");
        assert_eq!(state.active_grid().scrollback_len(), 0);
    }

    #[test]
    fn shell_integration_osc_1337_end_to_end() {
        let mut state = TerminalState::new(24, 80);
        feed(&mut state, b"\x1b]1337;CurrentDir=/tmp\x07");
        feed(&mut state, b"\x1b]1337;PromptEnd\x07");
        feed(&mut state, b"ls");
        feed(&mut state, b"\x1b]1337;CommandEnd=0\x07");

        let shell = state.shell_integration();
        assert_eq!(shell.current_working_directory.as_deref(), Some("/tmp"));
        assert_eq!(shell.last_command.as_deref(), Some("ls"));
        assert_eq!(shell.last_exit_status, Some(0));
    }

    #[test]
    fn osc4_palette_query_answers_with_indexed_rgb() {
        let mut state = TerminalState::new(24, 80);
        feed(&mut state, b"\x1b]4;1;?\x07");
        let responses = state.take_pending_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(
            String::from_utf8(responses[0].clone()).unwrap(),
            "\x1b]4;1;rgb:f7f7/7676/8e8e\x07"
        );
    }

    #[test]
    fn osc10_and_osc11_dynamic_color_queries_are_answered() {
        let mut state = TerminalState::new(24, 80);
        feed(&mut state, b"\x1b]10;?\x07");
        feed(&mut state, b"\x1b]11;?\x07");
        let responses = state.take_pending_responses();
        assert_eq!(responses.len(), 2);
        assert_eq!(
            String::from_utf8(responses[0].clone()).unwrap(),
            "\x1b]10;rgb:c0c0/caca/f5f5\x07"
        );
        assert_eq!(
            String::from_utf8(responses[1].clone()).unwrap(),
            "\x1b]11;rgb:1515/1616/1e1e\x07"
        );
    }

    #[test]
    fn osc4_set_request_is_accepted_and_ignored() {
        let mut state = TerminalState::new(24, 80);
        feed(&mut state, b"\x1b]4;1;rgb:ff/ff/ff\x07");
        assert!(state.take_pending_responses().is_empty());
    }

    #[test]
    fn dcs_sequences_are_inert() {
        let mut state = TerminalState::new(5, 10);
        feed(&mut state, b"\x1bPq#0;2;0;0;0#1\x1b\\hi");
        assert_eq!(state.active_grid().visible_row(0).to_text(), "hi");
    }
}

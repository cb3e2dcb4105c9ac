use std::collections::VecDeque;

use bitflags::bitflags;

use super::color::Color;
use super::cursor::{CellAttrs, CellStyle, SavedCursor};

bitflags! {
    /// Per-cell flags for wide character tracking.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct CellFlags: u8 {
        /// This cell holds a wide (2-column) character
        const WIDE_CHAR   = 1 << 0;
        /// This cell is the trailing spacer of a wide character
        const WIDE_SPACER = 1 << 1;
    }
}

/// A single terminal cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub c: char,
    pub fg: Color,
    pub bg: Color,
    pub attrs: CellAttrs,
    pub flags: CellFlags,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            c: ' ',
            fg: Color::Default,
            bg: Color::Default,
            attrs: CellAttrs::empty(),
            flags: CellFlags::empty(),
        }
    }
}

impl Cell {
    /// Create a spacer cell for the trailing half of a wide character.
    pub fn wide_spacer() -> Self {
        Self {
            c: ' ',
            flags: CellFlags::WIDE_SPACER,
            ..Default::default()
        }
    }

    /// Reset cell to default blank state.
    pub fn clear(&mut self) {
        *self = Cell::default();
    }

    /// Erase cell using the given background color (per ECMA-48, SGR
    /// background survives an erase while foreground/attrs do not).
    pub fn erase(&mut self, bg: Color) {
        *self = Cell::default();
        self.bg = bg;
    }
}

/// A single row in the terminal grid.
#[derive(Debug, Clone)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub dirty: bool,
    /// True when this row is the wrapped continuation of the row above it
    /// (set by DEC autowrap, consulted by reflow on resize).
    pub wrapped: bool,
}

impl Row {
    pub fn new(cols: u16) -> Self {
        Self {
            cells: vec![Cell::default(); cols as usize],
            dirty: true,
            wrapped: false,
        }
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.wrapped = false;
        self.dirty = true;
    }

    /// Erase all cells using the given background color (per ECMA-48).
    pub fn erase_with_bg(&mut self, bg: Color) {
        for cell in &mut self.cells {
            cell.erase(bg);
        }
        self.dirty = true;
    }

    pub fn resize(&mut self, cols: u16) {
        let new_len = cols as usize;
        if self.cells.len() != new_len {
            self.cells.resize(new_len, Cell::default());
            self.dirty = true;
        }
    }

    /// Render this row's cells back to plain text, skipping wide-character
    /// spacer cells and trimming trailing blanks.
    pub fn to_text(&self) -> String {
        let mut s: String = self
            .cells
            .iter()
            .filter(|c| !c.flags.contains(CellFlags::WIDE_SPACER))
            .map(|c| c.c)
            .collect();
        while s.ends_with(' ') {
            s.pop();
        }
        s
    }
}

/// A terminal screen: visible rows plus, for the primary screen, scrollback
/// history. The alternate screen uses the same type with
/// `scrollback_limit == 0`, so scrolling naturally discards instead of
/// accumulating. Cursor position, the pending SGR style, the DEC scroll
/// region, and the autowrap latch all live here because each screen tracks
/// its own independently of the other.
pub struct Grid {
    /// All rows: scrollback + visible. The visible area is the last
    /// `visible_rows` entries.
    pub rows: VecDeque<Row>,
    pub cols: u16,
    pub visible_rows: u16,
    pub scrollback_limit: usize,
    pub cursor_row: u16,
    /// 0..=cols. Equality with `cols` is the pre-wrap latch state, resolved
    /// on the next print.
    pub cursor_col: u16,
    pub wrap_pending: bool,
    pub scroll_top: u16,
    pub scroll_bottom: u16,
    pub current_style: CellStyle,
    saved_cursor: Option<SavedCursor>,
}

impl Grid {
    pub fn new(visible_rows: u16, cols: u16, scrollback_limit: usize) -> Self {
        let mut rows = VecDeque::with_capacity(visible_rows as usize);
        for _ in 0..visible_rows {
            rows.push_back(Row::new(cols));
        }
        Self {
            rows,
            cols,
            visible_rows,
            scrollback_limit,
            cursor_row: 0,
            cursor_col: 0,
            wrap_pending: false,
            scroll_top: 0,
            scroll_bottom: visible_rows.saturating_sub(1),
            current_style: CellStyle::default(),
            saved_cursor: None,
        }
    }

    /// Get the offset where the visible area starts.
    pub fn visible_offset(&self) -> usize {
        self.rows.len().saturating_sub(self.visible_rows as usize)
    }

    /// Get a reference to a visible row by its screen-relative index (0 = top of screen).
    pub fn visible_row(&self, row: u16) -> &Row {
        let idx = self.visible_offset() + row as usize;
        &self.rows[idx]
    }

    /// Get a mutable reference to a visible row.
    pub fn visible_row_mut(&mut self, row: u16) -> &mut Row {
        let idx = self.visible_offset() + row as usize;
        &mut self.rows[idx]
    }

    /// Write a cell at the given screen-relative position.
    pub fn set_cell(&mut self, row: u16, col: u16, cell: Cell) {
        if col < self.cols && row < self.visible_rows {
            let r = self.visible_row_mut(row);
            r.cells[col as usize] = cell;
            r.dirty = true;
        }
    }

    /// Clear the autowrap latch. Any cursor-addressing operation other than
    /// print calls this: being parked at `cursor_col == cols` only means
    /// something outside of printing.
    pub fn clear_wrap_latch(&mut self) {
        if self.wrap_pending {
            self.wrap_pending = false;
        }
        if self.cols > 0 && self.cursor_col >= self.cols {
            self.cursor_col = self.cols - 1;
        }
    }

    pub fn save_cursor(&mut self) {
        self.saved_cursor = Some(SavedCursor {
            row: self.cursor_row,
            col: self.cursor_col,
            style: self.current_style,
        });
    }

    pub fn restore_cursor(&mut self) {
        if let Some(saved) = self.saved_cursor {
            self.cursor_row = saved.row.min(self.visible_rows.saturating_sub(1));
            self.cursor_col = saved.col.min(self.cols);
            self.current_style = saved.style;
            self.wrap_pending = false;
        }
    }

    /// Scroll the region [top, bottom] up by one line. On the primary
    /// screen, a line scrolled off the top of the full buffer becomes
    /// scrollback; on the alternate screen (`scrollback_limit == 0`) it is
    /// discarded immediately.
    pub fn scroll_up(&mut self, top: u16, bottom: u16) {
        let offset = self.visible_offset();
        let top_idx = offset + top as usize;
        let bottom_idx = offset + bottom as usize;

        if top_idx > bottom_idx || bottom_idx >= self.rows.len() {
            return;
        }

        if top == 0 {
            self.rows.insert(bottom_idx + 1, Row::new(self.cols));
            while self.rows.len() > self.visible_rows as usize + self.scrollback_limit {
                self.rows.pop_front();
            }
        } else {
            self.rows.remove(top_idx);
            self.rows.insert(bottom_idx, Row::new(self.cols));
        }

        for i in top..=bottom {
            self.visible_row_mut(i).dirty = true;
        }
    }

    /// Scroll the region [top, bottom] down by one line. The bottom line of
    /// the region is discarded and a blank line is inserted at the top;
    /// this never grows scrollback.
    pub fn scroll_down(&mut self, top: u16, bottom: u16) {
        let offset = self.visible_offset();
        let top_idx = offset + top as usize;
        let bottom_idx = offset + bottom as usize;

        if top_idx > bottom_idx || bottom_idx >= self.rows.len() {
            return;
        }

        self.rows.remove(bottom_idx);
        self.rows.insert(top_idx, Row::new(self.cols));

        for i in top..=bottom {
            self.visible_row_mut(i).dirty = true;
        }
    }

    /// Resize the grid to new dimensions, reflowing (rewrapping) content
    /// when the column count changes. The cursor is remapped to the same
    /// logical character it pointed at before the resize.
    pub fn resize(&mut self, new_rows: u16, new_cols: u16) {
        let old_abs_cursor = self.visible_offset() + self.cursor_row as usize;
        let old_col = self.cursor_col;

        if new_cols != self.cols && new_cols > 0 {
            let (new_abs, new_col) = self.reflow(new_cols, old_abs_cursor, old_col);
            self.visible_rows = new_rows;
            while self.rows.len() < self.visible_rows as usize {
                self.rows.push_back(Row::new(new_cols));
            }
            let offset = self.visible_offset();
            self.cursor_row = new_abs.saturating_sub(offset).min(new_rows.saturating_sub(1) as usize) as u16;
            self.cursor_col = new_col.min(new_cols.saturating_sub(1));
        } else {
            for row in self.rows.iter_mut() {
                row.resize(new_cols);
            }
            let current_visible = self.visible_rows as usize;
            let new_visible = new_rows as usize;
            if new_visible > current_visible {
                for _ in 0..(new_visible - current_visible) {
                    self.rows.push_back(Row::new(new_cols));
                }
            }
            self.visible_rows = new_rows;
            self.cursor_row = self.cursor_row.min(new_rows.saturating_sub(1));
            self.cursor_col = self.cursor_col.min(new_cols.saturating_sub(1));
        }

        self.cols = new_cols;
        self.scroll_top = 0;
        self.scroll_bottom = new_rows.saturating_sub(1);
        self.wrap_pending = false;
        self.saved_cursor = None;
        self.mark_all_dirty();
    }

    /// Rewrap every row (scrollback included) at `new_cols`, grouping rows
    /// joined by the wrap flag into logical lines before re-chunking.
    /// Returns the absolute row index and column the tracked position
    /// (`old_abs_row`, `old_col`) maps to after rewrapping.
    fn reflow(&mut self, new_cols: u16, old_abs_row: usize, old_col: u16) -> (usize, u16) {
        let new_cols_usize = (new_cols as usize).max(1);

        let mut lines: Vec<Vec<Cell>> = Vec::new();
        let mut owner: Vec<(usize, usize)> = Vec::with_capacity(self.rows.len());

        for row in self.rows.iter() {
            if !row.wrapped || lines.is_empty() {
                lines.push(Vec::new());
            }
            let line_idx = lines.len() - 1;
            let start = lines[line_idx].len();
            lines[line_idx].extend(row.cells.iter().cloned());
            owner.push((line_idx, start));
        }

        let (tracked_line, tracked_line_start) = owner
            .get(old_abs_row)
            .copied()
            .unwrap_or((lines.len().saturating_sub(1), 0));
        let tracked_flat = tracked_line_start + old_col as usize;

        for line in lines.iter_mut() {
            while line.len() > 1 && line.last() == Some(&Cell::default()) {
                line.pop();
            }
        }

        let mut new_rows: VecDeque<Row> = VecDeque::new();
        let mut new_cursor_abs = 0usize;
        let mut new_cursor_col = 0u16;

        for (line_idx, line) in lines.iter().enumerate() {
            let chunk_count = ((line.len() + new_cols_usize - 1) / new_cols_usize).max(1);
            for chunk_idx in 0..chunk_count {
                let start = chunk_idx * new_cols_usize;
                let end = (start + new_cols_usize).min(line.len());
                let mut cells: Vec<Cell> = line[start..end].to_vec();
                cells.resize(new_cols_usize, Cell::default());
                let row_abs = new_rows.len();
                if line_idx == tracked_line && tracked_flat >= start && tracked_flat <= end {
                    new_cursor_abs = row_abs;
                    new_cursor_col = (tracked_flat - start).min(new_cols_usize) as u16;
                }
                new_rows.push_back(Row {
                    cells,
                    dirty: true,
                    wrapped: chunk_idx > 0,
                });
            }
        }

        if new_rows.is_empty() {
            new_rows.push_back(Row::new(new_cols));
        }

        self.rows = new_rows;
        while self.rows.len() > self.visible_rows as usize + self.scrollback_limit {
            self.rows.pop_front();
        }
        (new_cursor_abs, new_cursor_col)
    }

    /// Clear and resize without reflow or scrollback, for the alternate
    /// screen: TUIs always repaint from scratch on SIGWINCH, so there is
    /// nothing worth preserving.
    pub fn resize_no_scrollback(&mut self, new_rows: u16, new_cols: u16) {
        self.rows.clear();
        for _ in 0..new_rows as usize {
            self.rows.push_back(Row::new(new_cols));
        }
        self.visible_rows = new_rows;
        self.cols = new_cols;
        self.cursor_row = 0;
        self.cursor_col = 0;
        self.wrap_pending = false;
        self.scroll_top = 0;
        self.scroll_bottom = new_rows.saturating_sub(1);
        self.saved_cursor = None;
        self.mark_all_dirty();
    }

    /// Collect and clear the set of visible rows that changed since the
    /// last call, for an observer to redraw incrementally.
    pub fn take_dirty_rows(&mut self) -> Vec<u16> {
        let offset = self.visible_offset();
        let mut dirty = Vec::new();
        for i in 0..self.visible_rows {
            let idx = offset + i as usize;
            if idx < self.rows.len() && self.rows[idx].dirty {
                dirty.push(i);
                self.rows[idx].dirty = false;
            }
        }
        dirty
    }

    /// Mark all visible rows as dirty (for full redraws).
    pub fn mark_all_dirty(&mut self) {
        let offset = self.visible_offset();
        for i in 0..self.visible_rows as usize {
            if offset + i < self.rows.len() {
                self.rows[offset + i].dirty = true;
            }
        }
    }

    /// Get the total number of lines including scrollback.
    pub fn total_lines(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of scrollback lines above the visible area.
    pub fn scrollback_len(&self) -> usize {
        self.visible_offset()
    }

    /// Erase cells in a row from start_col to end_col (exclusive),
    /// filling with the given background color (per ECMA-48).
    pub fn erase_cells(&mut self, row: u16, start_col: u16, end_col: u16, bg: Color) {
        if row >= self.visible_rows {
            return;
        }
        let r = self.visible_row_mut(row);
        let start = start_col as usize;
        let end = (end_col as usize).min(r.cells.len());
        for i in start..end {
            r.cells[i].erase(bg);
        }
        r.dirty = true;
    }

    /// Insert blank cells at position, shifting existing cells right.
    pub fn insert_cells(&mut self, row: u16, col: u16, count: u16) {
        if row >= self.visible_rows {
            return;
        }
        let r = self.visible_row_mut(row);
        let col = col as usize;
        let count = count as usize;
        let len = r.cells.len();

        for _ in 0..count.min(len.saturating_sub(col)) {
            r.cells.pop();
            r.cells.insert(col, Cell::default());
        }
        r.dirty = true;
    }

    /// Delete cells at position, shifting remaining cells left.
    pub fn delete_cells(&mut self, row: u16, col: u16, count: u16) {
        if row >= self.visible_rows {
            return;
        }
        let r = self.visible_row_mut(row);
        let col = col as usize;
        let count = count as usize;

        let to_remove = count.min(r.cells.len().saturating_sub(col));
        for _ in 0..to_remove {
            if col < r.cells.len() {
                r.cells.remove(col);
                r.cells.push(Cell::default());
            }
        }
        r.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_has_blank_rows() {
        let grid = Grid::new(24, 80, 1000);
        assert_eq!(grid.rows.len(), 24);
        assert_eq!(grid.scroll_bottom, 23);
    }

    #[test]
    fn scroll_up_on_primary_grows_scrollback() {
        let mut grid = Grid::new(3, 10, 100);
        grid.set_cell(0, 0, Cell { c: 'x', ..Cell::default() });
        grid.scroll_up(0, 2);
        assert_eq!(grid.total_lines(), 4);
        assert_eq!(grid.scrollback_len(), 1);
        assert_eq!(grid.rows[0].cells[0].c, 'x');
    }

    #[test]
    fn scroll_up_on_alt_grid_discards() {
        let mut grid = Grid::new(3, 10, 0);
        grid.scroll_up(0, 2);
        assert_eq!(grid.total_lines(), 3);
        assert_eq!(grid.scrollback_len(), 0);
    }

    #[test]
    fn reflow_rewraps_joined_rows_and_tracks_cursor() {
        let mut grid = Grid::new(2, 4, 100);
        let text = "abcdef";
        for (i, c) in text.chars().enumerate() {
            grid.set_cell(0, (i % 4) as u16, Cell { c, ..Cell::default() });
        }
        grid.visible_row_mut(0).wrapped = false;
        grid.visible_row_mut(1).wrapped = true;
        for (i, c) in "ef".chars().enumerate() {
            grid.set_cell(1, i as u16, Cell { c, ..Cell::default() });
        }
        grid.cursor_row = 1;
        grid.cursor_col = 2;

        grid.resize(2, 6);

        let line0 = grid.visible_row(0).to_text();
        assert_eq!(line0, "abcdef");
        assert_eq!(grid.cursor_row, 0);
        assert_eq!(grid.cursor_col, 5);
    }

    #[test]
    fn clear_wrap_latch_pulls_cursor_back_one_column() {
        let mut grid = Grid::new(2, 4, 10);
        grid.cursor_col = 4;
        grid.wrap_pending = true;
        grid.clear_wrap_latch();
        assert!(!grid.wrap_pending);
        assert_eq!(grid.cursor_col, 3);
    }
}

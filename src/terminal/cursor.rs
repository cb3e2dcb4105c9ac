use super::color::Color;
use bitflags::bitflags;

bitflags! {
    /// Cell text attributes as a compact bitflag set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct CellAttrs: u16 {
        const BOLD          = 1 << 0;
        const DIM           = 1 << 1;
        const ITALIC        = 1 << 2;
        const UNDERLINE     = 1 << 3;
        const REVERSE       = 1 << 4;
        const HIDDEN        = 1 << 5;
        const STRIKETHROUGH = 1 << 6;
    }
}

/// The pending SGR state applied to the next cell a grid writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellStyle {
    pub fg: Color,
    pub bg: Color,
    pub attrs: CellAttrs,
}

/// Cursor position and style captured by DECSC / CSI s, restored by
/// DECRC / CSI u. Each grid (primary and alternate) keeps its own.
#[derive(Debug, Clone, Copy)]
pub struct SavedCursor {
    pub row: u16,
    pub col: u16,
    pub style: CellStyle,
}

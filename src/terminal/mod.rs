pub mod color;
pub mod cursor;
pub mod grid;
pub mod modes;
pub mod selection;
pub mod state;

pub use state::TerminalState;

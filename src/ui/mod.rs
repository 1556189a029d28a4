pub mod icons;
pub mod terminal;

#[cfg(test)]
pub use terminal::SharedBuffer;
pub use terminal::{ConsoleUI, format_duration};

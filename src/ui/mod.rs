//! UI module - Table formatting, screen composition and terminal I/O

pub mod composer;
pub mod table;
pub mod terminal;

//! Board-level GPIO and timing helpers.

pub mod delay;
pub mod reset_line;

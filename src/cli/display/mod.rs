//! Display framework for CLI output formatting.
//!
//! Shared primitives for colors, tables, formatting, and detail views.

pub mod colors;
pub mod detail;
pub mod format;
pub mod table;

pub use colors::*;
pub use detail::*;
pub use format::*;
pub use table::*;

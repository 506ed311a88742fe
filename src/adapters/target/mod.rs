//! Target adapter implementations.

pub mod http;
pub mod scripted;

pub use http::HttpTargetAdapter;
pub use scripted::{ScriptStep, ScriptedTargetAdapter};

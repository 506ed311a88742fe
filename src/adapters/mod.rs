//! Adapter implementations for the controller's ports.

pub mod audit;
pub mod target;

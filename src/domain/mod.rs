//! Domain layer for the convergence controller
//!
//! This module contains the data model of a convergence run, the error
//! taxonomy, and the port traits through which the controller reaches its
//! collaborators.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{AdapterError, AdapterResult, RecorderError, RecorderResult};

pub mod backoff;
pub mod convergence_controller;
pub mod outcome_classifier;

pub use backoff::StandardBackoff;
pub use convergence_controller::ConvergenceController;
pub use outcome_classifier::SignalClassifier;

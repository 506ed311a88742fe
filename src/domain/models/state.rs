use serde::{Deserialize, Serialize};

/// Snapshot of the target system taken by a single `observe()` call.
///
/// Both counts always come from the same observation; the controller never
/// combines counts read at different times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedState {
    /// Number of items not yet applied.
    pub pending_count: u64,
    /// Number of items already applied. Informational only.
    #[serde(default)]
    pub applied_count: u64,
}

impl ObservedState {
    pub const fn new(pending_count: u64, applied_count: u64) -> Self {
        Self {
            pending_count,
            applied_count,
        }
    }

    /// True when nothing is left to apply.
    pub const fn is_converged(&self) -> bool {
        self.pending_count == 0
    }
}

/// One unit of work selected for an apply attempt.
///
/// The controller treats the item as opaque; the label only feeds the audit trail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingItem {
    #[serde(default)]
    pub label: String,
}

impl PendingItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Label for display, substituting a placeholder when the adapter gave none.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            "<unlabelled>"
        } else {
            &self.label
        }
    }
}

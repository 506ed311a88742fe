//! Target adapter port - interface to the system holding pending work.

use async_trait::async_trait;

use crate::domain::errors::AdapterResult;
use crate::domain::models::{ObservedState, PendingItem, RawSignal};

/// Capability interface to the remote system being converged.
///
/// Implementations may be a UI-automation layer, a direct API client, or an
/// in-process simulation. Every call may fail; the controller bounds each one
/// with its per-attempt timeout.
#[async_trait]
pub trait TargetAdapter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Read pending and applied counts in one observation.
    ///
    /// Fails with `AdapterError::ObserveFailed` when no state is available,
    /// which is distinct from a legitimate zero count.
    async fn observe(&self) -> AdapterResult<ObservedState>;

    /// Pick exactly one pending item to apply next.
    ///
    /// Fails with `AdapterError::NoSelectableItem` when nothing can be selected.
    async fn select_next(&self) -> AdapterResult<PendingItem>;

    /// Apply a single item and return whatever signal the target produced.
    ///
    /// Fails with `AdapterError::ApplyFailed` when the call broke down before
    /// any signal arrived.
    async fn apply_next(&self, item: &PendingItem) -> AdapterResult<RawSignal>;
}

//! Scheduler-facing read views.
//!
//! These traits have the same shape as a live cluster cache, so scheduler
//! plugins cannot tell whether they are running against a real cluster or
//! a forked simulation. Results reflect the active merged view at the
//! moment of the call and are materialized fresh per call: a caller
//! iterating a returned list while the snapshot is mutated elsewhere
//! still sees a stable list.

use std::sync::Arc;

use gridsim_model::{NodeInfo, Selector, Workload};

use crate::error::SnapshotResult;

/// Read view over the nodes of the active cluster view.
pub trait NodeInfoLister {
    /// All current NodeInfos, ordered by node name.
    fn list(&self) -> SnapshotResult<Vec<NodeInfo>>;

    /// The NodeInfo for a node name, or `NotFound`.
    fn get(&self, name: &str) -> SnapshotResult<NodeInfo>;
}

/// Read view over the workloads of the active cluster view.
pub trait WorkloadLister {
    /// All workloads whose labels satisfy the selector.
    ///
    /// `Selector::everything()` returns every workload in the view.
    fn list(&self, selector: &Selector) -> SnapshotResult<Vec<Arc<Workload>>>;
}

//! gridsim-snapshot — forkable in-memory cluster state for scheduling
//! simulation.
//!
//! The snapshot holds the simulator's view of a cluster (nodes and the
//! workloads placed on them) and supports cheap speculative modification:
//! the decision loop forks the view, explores a hypothetical placement,
//! and then commits the experiment or reverts it, many times per second.
//! Reads always observe the merged view of the base state plus all open
//! overlays.
//!
//! Two implementations satisfy the same contract:
//!
//! - [`BasicSnapshot`] — full-copy-on-fork; obvious and slow, the
//!   reference semantics
//! - [`DeltaSnapshot`] — layered overlays with lazy materialization;
//!   O(1) forks over large base state
//!
//! # Architecture
//!
//! ```text
//! ClusterSnapshot (trait)
//!   ├── BasicSnapshot        saved-state stack, container copy per fork
//!   ├── DeltaSnapshot        layer stack, tombstones + per-node deltas
//!   └── Read views
//!       ├── NodeInfoLister   list()/get() over merged NodeInfos
//!       └── WorkloadLister   list(selector) over merged workloads
//! ```
//!
//! The snapshot is single-writer: one simulator loop owns it and performs
//! all mutations; read views are consumed by plugin code called
//! synchronously from that same loop.

pub mod basic;
pub mod delta;
pub mod error;
pub mod view;

pub use basic::BasicSnapshot;
pub use delta::DeltaSnapshot;
pub use error::{SnapshotError, SnapshotResult};
pub use view::{NodeInfoLister, WorkloadLister};

use std::sync::Arc;

use gridsim_model::{Node, Workload};

/// The operation set of a forkable cluster snapshot.
///
/// All operations are synchronous. On an error return the store is left
/// as it was before the call; [`ClusterSnapshot::add_nodes`] is the one
/// documented exception.
pub trait ClusterSnapshot: NodeInfoLister + WorkloadLister {
    /// Add a node to the active view.
    ///
    /// Fails with `Duplicate` if a node with that name already exists.
    fn add_node(&mut self, node: Arc<Node>) -> SnapshotResult<()>;

    /// Add a batch of nodes.
    ///
    /// A convenience loop over [`ClusterSnapshot::add_node`]: on a
    /// mid-batch duplicate, earlier additions are retained and the first
    /// error is returned.
    fn add_nodes(&mut self, nodes: Vec<Arc<Node>>) -> SnapshotResult<()> {
        for node in nodes {
            self.add_node(node)?;
        }
        Ok(())
    }

    /// Add a node together with the workloads assigned to it.
    ///
    /// Observable as a single state transition: if any workload fails to
    /// add, the node is unwound and the view is unchanged.
    fn add_node_with_workloads(
        &mut self,
        node: Arc<Node>,
        workloads: Vec<Arc<Workload>>,
    ) -> SnapshotResult<()> {
        let name = node.name.clone();
        self.add_node(node)?;
        for workload in workloads {
            if let Err(e) = self.add_workload(workload, &name) {
                // Unwind the fresh node so the failed call leaves no trace.
                let _ = self.remove_node(&name);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Remove a node and, atomically, all workloads assigned to it.
    ///
    /// Fails with `NotFound` if the node is absent from the active view.
    fn remove_node(&mut self, name: &str) -> SnapshotResult<()>;

    /// Add a workload, assigned to the named node.
    ///
    /// Fails with `NotFound` if the node is absent and `Duplicate` if a
    /// workload with the same (namespace, name) identity is already
    /// present anywhere in the active view.
    fn add_workload(&mut self, workload: Arc<Workload>, node_name: &str) -> SnapshotResult<()>;

    /// Remove the workload with the given identity from the named node.
    ///
    /// Fails with `NotFound` if the node is absent, or if the node exists
    /// but hosts no workload with that identity.
    fn remove_workload(
        &mut self,
        namespace: &str,
        name: &str,
        node_name: &str,
    ) -> SnapshotResult<()>;

    /// Open a new overlay. Subsequent mutations land in the overlay until
    /// it is committed or reverted. Forks nest.
    fn fork(&mut self);

    /// Discard the topmost overlay.
    ///
    /// Fails with `InvalidOperation` if no overlay is open.
    fn revert(&mut self) -> SnapshotResult<()>;

    /// Merge the topmost overlay into the layer below it.
    ///
    /// Fails with `InvalidOperation` if no overlay is open.
    fn commit(&mut self) -> SnapshotResult<()>;

    /// Empty the snapshot back to the empty, unforked state.
    fn clear(&mut self);

    /// The node read view over the active merged state.
    fn node_infos(&self) -> &dyn NodeInfoLister;

    /// The workload read view over the active merged state.
    fn workloads(&self) -> &dyn WorkloadLister;
}

/// Which snapshot implementation to instantiate.
///
/// The basic store is the reference semantics; the delta store is what
/// the simulator runs against large clusters. The shared contract test
/// suite iterates [`SnapshotKind::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Basic,
    Delta,
}

impl SnapshotKind {
    /// Both implementations, for factory-parameterized call sites.
    pub const ALL: [SnapshotKind; 2] = [SnapshotKind::Basic, SnapshotKind::Delta];

    /// Instantiate an empty snapshot of this kind.
    pub fn create(self) -> Box<dyn ClusterSnapshot> {
        match self {
            SnapshotKind::Basic => Box::new(BasicSnapshot::new()),
            SnapshotKind::Delta => Box::new(DeltaSnapshot::new()),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SnapshotKind::Basic => "basic",
            SnapshotKind::Delta => "delta",
        }
    }
}

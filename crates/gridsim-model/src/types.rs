//! Domain types for the simulated cluster.
//!
//! Nodes and workloads are owned by the caller and shared into the
//! snapshot via `Arc`; the snapshot never mutates them. All stored types
//! are serializable so collaborators that sync cluster state over the
//! wire can reuse them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Unique name of a node within a cluster view.
pub type NodeName = String;

/// Composite workload identity, rendered as `namespace/name`.
pub type WorkloadId = String;

// ── Node ──────────────────────────────────────────────────────────

/// A cluster machine.
///
/// The snapshot keys nodes by `name` and treats everything else as
/// opaque. Capacity figures and labels exist for the scheduler plugins
/// reading the node through a `NodeInfo`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub name: NodeName,
    /// Arbitrary labels for scheduling affinity.
    pub labels: HashMap<String, String>,
    /// Total memory allocatable on this node (bytes).
    pub capacity_memory_bytes: u64,
    /// Total CPU weight capacity on this node.
    pub capacity_cpu_weight: u32,
}

// ── Workload ──────────────────────────────────────────────────────

/// A placed unit, assigned to exactly one node by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workload {
    pub namespace: String,
    pub name: String,
    /// Name of the node this workload is assigned to.
    pub node_name: NodeName,
    /// Labels matched by `Selector` when listing workloads.
    pub labels: HashMap<String, String>,
    /// Requested memory (bytes).
    pub request_memory_bytes: u64,
    /// Requested CPU weight.
    pub request_cpu_weight: u32,
}

impl Workload {
    /// Build the composite identity key for a (namespace, name) pair.
    pub fn key(namespace: &str, name: &str) -> WorkloadId {
        format!("{namespace}/{name}")
    }

    /// This workload's composite identity key.
    pub fn id(&self) -> WorkloadId {
        Self::key(&self.namespace, &self.name)
    }
}

// ── NodeInfo ──────────────────────────────────────────────────────

/// A node together with the workloads currently assigned to it.
///
/// Derived on demand by the snapshot read views; never stored as a
/// first-class entity. Workloads are ordered by identity key so repeated
/// reads of an unchanged view list them identically.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub node: Arc<Node>,
    pub workloads: Vec<Arc<Workload>>,
}

impl NodeInfo {
    /// Bundle a node with its workloads, normalizing workload order.
    pub fn new(node: Arc<Node>, mut workloads: Vec<Arc<Workload>>) -> Self {
        workloads.sort_by_key(|w| w.id());
        Self { node, workloads }
    }

    /// Sum of memory requested by the assigned workloads (bytes).
    pub fn requested_memory_bytes(&self) -> u64 {
        self.workloads.iter().map(|w| w.request_memory_bytes).sum()
    }

    /// Sum of CPU weight requested by the assigned workloads.
    pub fn requested_cpu_weight(&self) -> u32 {
        self.workloads.iter().map(|w| w.request_cpu_weight).sum()
    }
}

//! gridsim-model — the cluster data model consumed by the snapshot layer.
//!
//! These types describe what a simulated cluster is made of: `Node`s,
//! the `Workload`s placed on them, and the derived `NodeInfo` bundle the
//! scheduler reads. The snapshot layer (`gridsim-snapshot`) stores nodes
//! and workloads by reference and never interprets their contents beyond
//! identity; scheduler plugins that consume the read views interpret the
//! resource and label fields.
//!
//! # Components
//!
//! - **`types`** — `Node`, `Workload`, `NodeInfo` and their identity keys
//! - **`selector`** — equality-based label selector predicate

pub mod selector;
pub mod types;

pub use selector::Selector;
pub use types::{Node, NodeInfo, NodeName, Workload, WorkloadId};

//! Layered-overlay snapshot.
//!
//! Optimized for large base state and many small mutations per fork. The
//! store is a non-empty stack of layers; the bottom layer is the base.
//! Each overlay records, relative to the layer below it, the nodes it
//! adds, the node names it tombstones, and per-node workload add/remove
//! sets. The active view is the top-down merge: for any node name, the
//! first layer that tombstones or adds it owns it; a node's workload set
//! is materialized starting at the owning layer and overlaying each
//! higher layer's deltas upward.
//!
//! Fork pushes an empty layer (O(1)), revert pops it, and commit folds
//! the top layer into the one below in O(size of top layer). The top
//! layer carries a lazily populated `name → NodeInfo` cache so repeated
//! reads of an unchanged name cost O(1); any mutation to a name
//! invalidates that name's entry.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use gridsim_model::{Node, NodeInfo, NodeName, Selector, Workload, WorkloadId};

use crate::error::{SnapshotError, SnapshotResult};
use crate::view::{NodeInfoLister, WorkloadLister};
use crate::ClusterSnapshot;

/// Per-node workload changes recorded by one layer.
#[derive(Debug, Clone, Default)]
struct WorkloadDelta {
    added: HashMap<WorkloadId, Arc<Workload>>,
    removed: HashSet<WorkloadId>,
}

impl WorkloadDelta {
    fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// One layer of the stack.
///
/// Invariants: a name is never in both `added` and `tombstones`; a
/// tombstoned name has no `deltas` entry; a name in `added` has no
/// `removed` ids in its delta (an owning add is a clean slate). The host
/// indexes mirror the per-node deltas so global workload-id lookups do
/// not scan every node.
#[derive(Debug, Default)]
struct Layer {
    /// Nodes added in this layer.
    added: HashMap<NodeName, Arc<Node>>,
    /// Node names masked out relative to the layers below.
    tombstones: HashSet<NodeName>,
    /// Per-node workload changes.
    deltas: HashMap<NodeName, WorkloadDelta>,
    /// Inherited nodes whose workload set diverges from the layer below.
    modified: HashSet<NodeName>,
    /// workload id → host node, for ids added in this layer.
    added_hosts: HashMap<WorkloadId, NodeName>,
    /// workload id → host node, for ids tombstoned in this layer.
    removed_hosts: HashMap<WorkloadId, NodeName>,
    /// Lazily materialized merged view, keyed by node name. Only the top
    /// layer's cache is consulted; entries are dropped on any mutation
    /// to the name and when a commit folds changes down.
    cache: RefCell<HashMap<NodeName, NodeInfo>>,
}

/// Layered-overlay implementation of [`ClusterSnapshot`].
#[derive(Debug)]
pub struct DeltaSnapshot {
    /// Bottom layer is the base; the last element is the active overlay.
    layers: Vec<Layer>,
}

impl Default for DeltaSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self {
            layers: vec![Layer::default()],
        }
    }

    /// Number of open overlays.
    pub fn fork_depth(&self) -> usize {
        self.layers.len() - 1
    }

    /// Walk `layers` top-down and return the index of the layer that owns
    /// `name`: the first layer that tombstones it (node absent) or adds
    /// it. `None` when the node is not in the merged view of `layers`.
    fn find_node_in(layers: &[Layer], name: &str) -> Option<usize> {
        for (idx, layer) in layers.iter().enumerate().rev() {
            if layer.tombstones.contains(name) {
                return None;
            }
            if layer.added.contains_key(name) {
                return Some(idx);
            }
        }
        None
    }

    fn top(&self) -> &Layer {
        self.layers.last().expect("layer stack is never empty")
    }

    fn top_mut(&mut self) -> &mut Layer {
        self.layers.last_mut().expect("layer stack is never empty")
    }

    /// The layers below the top, and the top layer, borrowed disjointly.
    fn split_top(&mut self) -> (&[Layer], &mut Layer) {
        let last = self.layers.len() - 1;
        let (below, top) = self.layers.split_at_mut(last);
        (below, &mut top[0])
    }

    /// Whether a workload id is present anywhere in the merged view.
    ///
    /// Walks host-index mentions top-down. A mention is masked when the
    /// host node was re-added or tombstoned in a layer above it (that
    /// incarnation of the node is gone, and its workloads with it); the
    /// first unmasked mention decides.
    fn workload_visible(&self, id: &str) -> bool {
        for (idx, layer) in self.layers.iter().enumerate().rev() {
            if let Some(host) = layer.added_hosts.get(id) {
                if matches!(Self::find_node_in(&self.layers, host), Some(owner) if owner <= idx) {
                    return true;
                }
            }
            if let Some(host) = layer.removed_hosts.get(id) {
                if matches!(Self::find_node_in(&self.layers, host), Some(owner) if owner <= idx) {
                    return false;
                }
            }
        }
        false
    }

    /// Materialize the merged NodeInfo for a name, consulting and
    /// populating the top layer's cache.
    fn materialize(&self, name: &str) -> Option<NodeInfo> {
        if let Some(info) = self.top().cache.borrow().get(name) {
            return Some(info.clone());
        }
        let owner = Self::find_node_in(&self.layers, name)?;
        let node = Arc::clone(self.layers[owner].added.get(name)?);

        // Start from the owning layer's own additions (an owning add
        // masks anything further down) and fold higher layers upward.
        let mut merged: HashMap<WorkloadId, Arc<Workload>> = self.layers[owner]
            .deltas
            .get(name)
            .map(|delta| delta.added.clone())
            .unwrap_or_default();
        for layer in &self.layers[owner + 1..] {
            if let Some(delta) = layer.deltas.get(name) {
                for id in &delta.removed {
                    merged.remove(id);
                }
                for (id, workload) in &delta.added {
                    merged.insert(id.clone(), Arc::clone(workload));
                }
            }
        }

        let info = NodeInfo::new(node, merged.into_values().collect());
        self.top()
            .cache
            .borrow_mut()
            .insert(name.to_string(), info.clone());
        Some(info)
    }

    /// Node names present in the merged view, sorted.
    fn visible_names(&self) -> Vec<&str> {
        let mut names: HashSet<&str> = HashSet::new();
        for layer in &self.layers {
            for name in &layer.tombstones {
                names.remove(name.as_str());
            }
            for name in layer.added.keys() {
                names.insert(name);
            }
        }
        let mut names: Vec<&str> = names.into_iter().collect();
        names.sort_unstable();
        names
    }

    /// Drop a layer's bookkeeping for `name`, cleaning the host indexes.
    fn purge_node_records(layer: &mut Layer, name: &str) {
        if let Some(delta) = layer.deltas.remove(name) {
            for id in delta.added.keys() {
                layer.added_hosts.remove(id);
            }
            for id in &delta.removed {
                layer.removed_hosts.remove(id);
            }
        }
        layer.modified.remove(name);
    }
}

impl ClusterSnapshot for DeltaSnapshot {
    fn add_node(&mut self, node: Arc<Node>) -> SnapshotResult<()> {
        let name = node.name.clone();
        if Self::find_node_in(&self.layers, &name).is_some() {
            return Err(SnapshotError::duplicate_node(&name));
        }
        let top = self.top_mut();
        // A tombstone followed by an add collapses to an add; the node
        // comes back as a clean slate, masking lower-layer workloads.
        top.tombstones.remove(&name);
        top.added.insert(name.clone(), node);
        top.cache.get_mut().remove(&name);
        Ok(())
    }

    fn remove_node(&mut self, name: &str) -> SnapshotResult<()> {
        if Self::find_node_in(&self.layers, name).is_none() {
            return Err(SnapshotError::node_not_found(name));
        }
        let (below, top) = self.split_top();
        Self::purge_node_records(top, name);
        top.added.remove(name);
        // Only mask what a lower layer can still supply; an add-then-
        // remove confined to this layer nets out to nothing.
        if Self::find_node_in(below, name).is_some() {
            top.tombstones.insert(name.to_string());
        }
        top.cache.get_mut().remove(name);
        Ok(())
    }

    fn add_workload(&mut self, workload: Arc<Workload>, node_name: &str) -> SnapshotResult<()> {
        if Self::find_node_in(&self.layers, node_name).is_none() {
            return Err(SnapshotError::node_not_found(node_name));
        }
        let id = workload.id();
        if self.workload_visible(&id) {
            return Err(SnapshotError::duplicate_workload(&id));
        }
        let inherited = !self.top().added.contains_key(node_name);
        let top = self.top_mut();
        let delta = top.deltas.entry(node_name.to_string()).or_default();
        if delta.removed.remove(&id) {
            top.removed_hosts.remove(&id);
        }
        delta.added.insert(id.clone(), workload);
        top.added_hosts.insert(id, node_name.to_string());
        if inherited {
            top.modified.insert(node_name.to_string());
        }
        top.cache.get_mut().remove(node_name);
        Ok(())
    }

    fn remove_workload(
        &mut self,
        namespace: &str,
        name: &str,
        node_name: &str,
    ) -> SnapshotResult<()> {
        let info = self
            .materialize(node_name)
            .ok_or_else(|| SnapshotError::node_not_found(node_name))?;
        let id = Workload::key(namespace, name);
        if !info.workloads.iter().any(|w| w.id() == id) {
            return Err(SnapshotError::workload_not_found(&id));
        }
        let inherited = !self.top().added.contains_key(node_name);
        let top = self.top_mut();
        let delta = top.deltas.entry(node_name.to_string()).or_default();
        if delta.added.remove(&id).is_some() {
            top.added_hosts.remove(&id);
        } else {
            // The workload lives in a lower layer: record a workload-level
            // tombstone without copying the node up.
            delta.removed.insert(id.clone());
            top.removed_hosts.insert(id, node_name.to_string());
        }
        let emptied = delta.is_empty();
        if emptied {
            top.deltas.remove(node_name);
            top.modified.remove(node_name);
        } else if inherited {
            top.modified.insert(node_name.to_string());
        }
        top.cache.get_mut().remove(node_name);
        Ok(())
    }

    fn fork(&mut self) {
        self.layers.push(Layer::default());
        debug!(depth = self.fork_depth(), "delta snapshot forked");
    }

    fn revert(&mut self) -> SnapshotResult<()> {
        if self.layers.len() < 2 {
            return Err(SnapshotError::InvalidOperation("revert with no open fork"));
        }
        self.layers.pop();
        debug!(depth = self.fork_depth(), "delta snapshot reverted");
        Ok(())
    }

    fn commit(&mut self) -> SnapshotResult<()> {
        if self.layers.len() < 2 {
            return Err(SnapshotError::InvalidOperation("commit with no open fork"));
        }
        let top = self.layers.pop().expect("layer stack is never empty");
        let below_idx = self.layers.len() - 1;
        let (deeper, rest) = self.layers.split_at_mut(below_idx);
        let below = &mut rest[0];

        // Tombstones override any add or modification below. Folding into
        // a layer that inherited the node installs a tombstone there;
        // folding past the last layer that knows the node deletes it
        // outright.
        for name in top.tombstones {
            Self::purge_node_records(below, &name);
            below.added.remove(&name);
            if Self::find_node_in(deeper, &name).is_some() {
                below.tombstones.insert(name.clone());
            }
            below.cache.get_mut().remove(&name);
        }

        let mut deltas = top.deltas;

        // Nodes the overlay added become adds below, replacing whatever
        // the lower layer knew: the overlay's workload set is the node's
        // whole set.
        for (name, node) in top.added {
            let fresh = deltas.remove(&name).unwrap_or_default();
            below.tombstones.remove(&name);
            Self::purge_node_records(below, &name);
            for id in fresh.added.keys() {
                below.added_hosts.insert(id.clone(), name.clone());
            }
            if !fresh.added.is_empty() {
                below.deltas.insert(
                    name.clone(),
                    WorkloadDelta {
                        added: fresh.added,
                        removed: HashSet::new(),
                    },
                );
            }
            below.added.insert(name.clone(), node);
            below.cache.get_mut().remove(&name);
        }

        // What remains are workload deltas on inherited nodes: merge them
        // with the overlay's operations taking precedence.
        for (name, delta) in deltas {
            let owned_below = below.added.contains_key(&name);
            let merged = below.deltas.entry(name.clone()).or_default();
            for id in delta.removed {
                if merged.added.remove(&id).is_some() {
                    below.added_hosts.remove(&id);
                } else if !owned_below {
                    merged.removed.insert(id.clone());
                    below.removed_hosts.insert(id, name.clone());
                }
            }
            for (id, workload) in delta.added {
                if merged.removed.remove(&id) {
                    below.removed_hosts.remove(&id);
                }
                merged.added.insert(id.clone(), workload);
                below.added_hosts.insert(id, name.clone());
            }
            let emptied = merged.is_empty();
            if emptied {
                below.deltas.remove(&name);
                below.modified.remove(&name);
            } else if !owned_below {
                below.modified.insert(name.clone());
            }
            below.cache.get_mut().remove(&name);
        }

        debug!(depth = self.fork_depth(), "delta snapshot committed");
        Ok(())
    }

    fn clear(&mut self) {
        self.layers = vec![Layer::default()];
        debug!("delta snapshot cleared");
    }

    fn node_infos(&self) -> &dyn NodeInfoLister {
        self
    }

    fn workloads(&self) -> &dyn WorkloadLister {
        self
    }
}

impl NodeInfoLister for DeltaSnapshot {
    fn list(&self) -> SnapshotResult<Vec<NodeInfo>> {
        let mut infos = Vec::new();
        for name in self.visible_names() {
            if let Some(info) = self.materialize(name) {
                infos.push(info);
            }
        }
        Ok(infos)
    }

    fn get(&self, name: &str) -> SnapshotResult<NodeInfo> {
        self.materialize(name)
            .ok_or_else(|| SnapshotError::node_not_found(name))
    }
}

impl WorkloadLister for DeltaSnapshot {
    fn list(&self, selector: &Selector) -> SnapshotResult<Vec<Arc<Workload>>> {
        let mut out = Vec::new();
        for name in self.visible_names() {
            if let Some(info) = self.materialize(name) {
                for workload in &info.workloads {
                    if selector.matches(&workload.labels) {
                        out.push(Arc::clone(workload));
                    }
                }
            }
        }
        Ok(out)
    }
}

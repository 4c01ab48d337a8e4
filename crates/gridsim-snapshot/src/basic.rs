//! Full-copy-on-fork snapshot.
//!
//! The simplest correct implementation: state is one mapping
//! `name → NodeInfo` plus one `workload id → workload`. A fork clones the
//! container structure (node and workload references are shared, only the
//! maps and vectors are duplicated) and pushes the previous state onto a
//! saved-state stack. Memory cost per fork is proportional to the whole
//! view, so this store suits small clusters and shallow fork depth; it
//! also serves as the reference semantics the delta store is tested
//! against.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use gridsim_model::{Node, NodeInfo, NodeName, Selector, Workload, WorkloadId};

use crate::error::{SnapshotError, SnapshotResult};
use crate::view::{NodeInfoLister, WorkloadLister};
use crate::ClusterSnapshot;

/// The full cluster view at one fork depth.
#[derive(Debug, Clone, Default)]
struct BasicState {
    /// name → node with its assigned workloads.
    nodes: HashMap<NodeName, NodeInfo>,
    /// workload id → workload, across all nodes.
    workloads: HashMap<WorkloadId, Arc<Workload>>,
}

/// Full-copy-on-fork implementation of [`ClusterSnapshot`].
#[derive(Debug, Default)]
pub struct BasicSnapshot {
    state: BasicState,
    /// States captured by open forks, oldest first.
    saved: Vec<BasicState>,
}

impl BasicSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open overlays.
    pub fn fork_depth(&self) -> usize {
        self.saved.len()
    }
}

impl ClusterSnapshot for BasicSnapshot {
    fn add_node(&mut self, node: Arc<Node>) -> SnapshotResult<()> {
        if self.state.nodes.contains_key(&node.name) {
            return Err(SnapshotError::duplicate_node(&node.name));
        }
        self.state
            .nodes
            .insert(node.name.clone(), NodeInfo::new(node, Vec::new()));
        Ok(())
    }

    fn remove_node(&mut self, name: &str) -> SnapshotResult<()> {
        let info = self
            .state
            .nodes
            .remove(name)
            .ok_or_else(|| SnapshotError::node_not_found(name))?;
        for workload in &info.workloads {
            self.state.workloads.remove(&workload.id());
        }
        Ok(())
    }

    fn add_workload(&mut self, workload: Arc<Workload>, node_name: &str) -> SnapshotResult<()> {
        if !self.state.nodes.contains_key(node_name) {
            return Err(SnapshotError::node_not_found(node_name));
        }
        let id = workload.id();
        if self.state.workloads.contains_key(&id) {
            return Err(SnapshotError::duplicate_workload(&id));
        }
        self.state.workloads.insert(id, Arc::clone(&workload));
        if let Some(info) = self.state.nodes.get_mut(node_name) {
            info.workloads.push(workload);
        }
        Ok(())
    }

    fn remove_workload(
        &mut self,
        namespace: &str,
        name: &str,
        node_name: &str,
    ) -> SnapshotResult<()> {
        let info = self
            .state
            .nodes
            .get_mut(node_name)
            .ok_or_else(|| SnapshotError::node_not_found(node_name))?;
        let id = Workload::key(namespace, name);
        let pos = info
            .workloads
            .iter()
            .position(|w| w.id() == id)
            .ok_or_else(|| SnapshotError::workload_not_found(&id))?;
        info.workloads.swap_remove(pos);
        self.state.workloads.remove(&id);
        Ok(())
    }

    fn fork(&mut self) {
        self.saved.push(self.state.clone());
        debug!(depth = self.saved.len(), "basic snapshot forked");
    }

    fn revert(&mut self) -> SnapshotResult<()> {
        let prev = self
            .saved
            .pop()
            .ok_or(SnapshotError::InvalidOperation("revert with no open fork"))?;
        self.state = prev;
        debug!(depth = self.saved.len(), "basic snapshot reverted");
        Ok(())
    }

    fn commit(&mut self) -> SnapshotResult<()> {
        self.saved
            .pop()
            .ok_or(SnapshotError::InvalidOperation("commit with no open fork"))?;
        debug!(depth = self.saved.len(), "basic snapshot committed");
        Ok(())
    }

    fn clear(&mut self) {
        self.state = BasicState::default();
        self.saved.clear();
        debug!("basic snapshot cleared");
    }

    fn node_infos(&self) -> &dyn NodeInfoLister {
        self
    }

    fn workloads(&self) -> &dyn WorkloadLister {
        self
    }
}

impl NodeInfoLister for BasicSnapshot {
    fn list(&self) -> SnapshotResult<Vec<NodeInfo>> {
        let mut infos: Vec<NodeInfo> = self
            .state
            .nodes
            .values()
            .map(|info| NodeInfo::new(Arc::clone(&info.node), info.workloads.clone()))
            .collect();
        infos.sort_by(|a, b| a.node.name.cmp(&b.node.name));
        Ok(infos)
    }

    fn get(&self, name: &str) -> SnapshotResult<NodeInfo> {
        self.state
            .nodes
            .get(name)
            .map(|info| NodeInfo::new(Arc::clone(&info.node), info.workloads.clone()))
            .ok_or_else(|| SnapshotError::node_not_found(name))
    }
}

impl WorkloadLister for BasicSnapshot {
    fn list(&self, selector: &Selector) -> SnapshotResult<Vec<Arc<Workload>>> {
        let mut out: Vec<Arc<Workload>> = self
            .state
            .workloads
            .values()
            .filter(|w| selector.matches(&w.labels))
            .map(Arc::clone)
            .collect();
        out.sort_by_key(|w| w.id());
        Ok(out)
    }
}

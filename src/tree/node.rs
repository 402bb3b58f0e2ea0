use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::synthesis::{NodeStats, SynthesisEngine};
use crate::types::{Outcome, Synthesis};

pub type NodeId = u64;

/// Everything a reader may observe about a node. Weight, stats and synthesis
/// change together under one lock so a reader never sees them disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NodeState {
    pub weight: u64,
    pub stats: NodeStats,
    pub synthesis: Synthesis,
}

#[derive(Debug)]
pub struct TreeNode {
    id: NodeId,
    depth: usize,
    symbol: Option<usize>,
    state: RwLock<NodeState>,
    children: RwLock<BTreeMap<usize, Arc<TreeNode>>>,
}

impl TreeNode {
    pub(crate) fn new(id: NodeId, depth: usize, symbol: Option<usize>) -> Self {
        Self {
            id,
            depth,
            symbol,
            state: RwLock::new(NodeState::default()),
            children: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Bin that leads here from the parent; `None` for the root.
    pub fn symbol(&self) -> Option<usize> {
        self.symbol
    }

    pub fn state(&self) -> NodeState {
        *read(&self.state)
    }

    pub fn child(&self, symbol: usize) -> Option<Arc<TreeNode>> {
        read(&self.children).get(&symbol).cloned()
    }

    /// Children in ascending symbol order.
    pub fn children(&self) -> Vec<Arc<TreeNode>> {
        read(&self.children).values().cloned().collect()
    }

    #[cfg(test)]
    pub fn child_count(&self) -> usize {
        read(&self.children).len()
    }

    /// Returns the child for `symbol`, building it with `make` when absent.
    /// The flag is true when the child was created by this call.
    pub(crate) fn child_or_insert_with(
        &self,
        symbol: usize,
        make: impl FnOnce() -> Arc<TreeNode>,
    ) -> (Arc<TreeNode>, bool) {
        if let Some(existing) = self.child(symbol) {
            return (existing, false);
        }
        let mut children = write(&self.children);
        if let Some(existing) = children.get(&symbol) {
            return (Arc::clone(existing), false);
        }
        let child = make();
        children.insert(symbol, Arc::clone(&child));
        (child, true)
    }

    /// Counts one observation and recomputes the synthesis before releasing the lock.
    pub(crate) fn observe(&self, outcome: Outcome, synthesis: &SynthesisEngine) -> NodeState {
        let mut state = write(&self.state);
        state.weight += 1;
        state.stats.record(outcome);
        state.synthesis = synthesis.compute(state.weight, &state.stats);
        *state
    }
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

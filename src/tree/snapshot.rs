use serde::{Deserialize, Serialize};

use super::node::{NodeId, TreeNode};
use super::synthesis::NodeStats;
use crate::types::Synthesis;

/// Immutable copy of the tree handed to transports and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub root: NodeSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub depth: usize,
    pub symbol: Option<usize>,
    pub weight: u64,
    pub synthesis: Synthesis,
    pub stats: NodeStats,
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    pub fn capture(node: &TreeNode) -> Self {
        let state = node.state();
        Self {
            id: node.id(),
            depth: node.depth(),
            symbol: node.symbol(),
            weight: state.weight,
            synthesis: state.synthesis,
            stats: state.stats,
            children: node
                .children()
                .iter()
                .map(|child| NodeSnapshot::capture(child))
                .collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeSnapshot::node_count).sum::<usize>()
    }

    pub fn max_depth(&self) -> usize {
        self.children
            .iter()
            .map(NodeSnapshot::max_depth)
            .max()
            .unwrap_or(self.depth)
    }

    /// Pre-order walk.
    #[cfg(test)]
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a NodeSnapshot)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

impl TreeSnapshot {
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    pub fn max_depth(&self) -> usize {
        self.root.max_depth()
    }
}

/// A single node without its subtree, for lookups by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub depth: usize,
    pub symbol: Option<usize>,
    pub weight: u64,
    pub synthesis: Synthesis,
    pub stats: NodeStats,
    pub child_ids: Vec<NodeId>,
}

impl NodeView {
    pub fn capture(node: &TreeNode) -> Self {
        let state = node.state();
        Self {
            id: node.id(),
            depth: node.depth(),
            symbol: node.symbol(),
            weight: state.weight,
            synthesis: state.synthesis,
            stats: state.stats,
            child_ids: node.children().iter().map(|c| c.id()).collect(),
        }
    }
}

/// Payload pushed when training creates a node. Counts are taken after the
/// insertion that created it has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCreated {
    pub id: NodeId,
    pub depth: usize,
    pub symbol: usize,
    pub path: Vec<usize>,
    pub weight: u64,
    pub synthesis: Synthesis,
    pub stats: NodeStats,
}

use std::sync::{Arc, RwLock, Weak};
use tracing::warn;

use super::node::{read, write, NodeId, TreeNode};
use super::snapshot::{NodeCreated, NodeSnapshot, TreeSnapshot};
use super::synthesis::SynthesisEngine;
use crate::types::{Outcome, Synthesis};

/// Prefix tree of bin sequences.
///
/// Nodes are owned by their parents. `index` holds weak handles by id so a
/// node can be addressed directly without walking from the root. Mutation
/// goes through `&self`; callers keep a single writer at a time, readers may
/// walk concurrently and see each node either before or after an update.
#[derive(Debug)]
pub struct SequenceTree {
    root: Arc<TreeNode>,
    index: RwLock<Vec<Weak<TreeNode>>>,
    synthesis: SynthesisEngine,
    sequence_length: usize,
}

impl SequenceTree {
    pub fn new(sequence_length: usize, synthesis: SynthesisEngine) -> Self {
        let root = Arc::new(TreeNode::new(0, 0, None));
        Self {
            index: RwLock::new(vec![Arc::downgrade(&root)]),
            root,
            synthesis,
            sequence_length,
        }
    }

    #[cfg(test)]
    pub fn root(&self) -> &Arc<TreeNode> {
        &self.root
    }

    /// Nodes including the root.
    pub fn node_count(&self) -> usize {
        read(&self.index).len()
    }

    pub fn node(&self, id: NodeId) -> Option<Arc<TreeNode>> {
        read(&self.index).get(id as usize).and_then(Weak::upgrade)
    }

    /// Adds one labelled sequence. Missing nodes along the path are created,
    /// then every node from the root to the terminal counts the outcome.
    /// `on_created` fires once per new node after the counts are in.
    ///
    /// Returns the number of nodes created.
    pub fn insert<F>(&self, sequence: &[usize], outcome: Outcome, mut on_created: F) -> usize
    where
        F: FnMut(NodeCreated),
    {
        if sequence.len() != self.sequence_length {
            warn!(
                "Ignoring sequence of length {} (tree depth {})",
                sequence.len(),
                self.sequence_length
            );
            return 0;
        }

        let mut path = Vec::with_capacity(sequence.len() + 1);
        let mut created = Vec::new();
        path.push(Arc::clone(&self.root));

        for (level, &symbol) in sequence.iter().enumerate() {
            let parent = &path[level];
            let (child, is_new) =
                parent.child_or_insert_with(symbol, || self.allocate(level + 1, symbol));
            if is_new {
                created.push(level + 1);
            }
            path.push(child);
        }

        for node in &path {
            node.observe(outcome, &self.synthesis);
        }

        for &depth in &created {
            let node = &path[depth];
            let state = node.state();
            on_created(NodeCreated {
                id: node.id(),
                depth,
                symbol: sequence[depth - 1],
                path: sequence[..depth].to_vec(),
                weight: state.weight,
                synthesis: state.synthesis,
                stats: state.stats,
            });
        }

        created.len()
    }

    /// Exact-path lookup; `None` as soon as a level has no matching child.
    pub fn find(&self, sequence: &[usize]) -> Option<Arc<TreeNode>> {
        let mut current = Arc::clone(&self.root);
        for &symbol in sequence {
            current = current.child(symbol)?;
        }
        Some(current)
    }

    pub fn query(&self, sequence: &[usize]) -> Synthesis {
        self.find(sequence)
            .map(|node| node.state().synthesis)
            .unwrap_or(Synthesis::None)
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            root: NodeSnapshot::capture(&self.root),
        }
    }

    fn allocate(&self, depth: usize, symbol: usize) -> Arc<TreeNode> {
        let mut index = write(&self.index);
        let node = Arc::new(TreeNode::new(index.len() as NodeId, depth, Some(symbol)));
        index.push(Arc::downgrade(&node));
        node
    }
}

#[cfg(test)]
pub(crate) mod invariants {
    use crate::tree::snapshot::NodeSnapshot;
    use crate::tree::synthesis::NodeStats;
    use crate::types::Synthesis;

    /// Weight and stats conservation plus the synthesis/weight pairing, at every node.
    pub fn assert_conserved(node: &NodeSnapshot, sequence_length: usize) {
        assert_eq!(
            node.synthesis == Synthesis::None,
            node.weight == 0,
            "node {} synthesis {} with weight {}",
            node.id,
            node.synthesis,
            node.weight
        );
        assert_eq!(node.stats.total(), node.weight, "node {} stats", node.id);

        if node.depth == sequence_length {
            assert!(node.children.is_empty(), "terminal node {} has children", node.id);
            return;
        }

        let child_weight: u64 = node.children.iter().map(|c| c.weight).sum();
        assert_eq!(child_weight, node.weight, "node {} weight", node.id);

        let child_stats = node
            .children
            .iter()
            .fold(NodeStats::default(), |acc, c| acc + c.stats);
        assert_eq!(child_stats, node.stats, "node {} stats sum", node.id);

        for child in &node.children {
            assert_eq!(child.depth, node.depth + 1);
            assert_conserved(child, sequence_length);
        }
    }
}

//! Sequence tree: return binning, training window extraction, outcome
//! labelling, the prefix tree itself and its serializable snapshot.

pub mod binner;
pub mod extractor;
pub mod labeler;
pub mod node;
pub mod sequence_tree;
pub mod snapshot;
pub mod synthesis;

pub use binner::Binner;
pub use extractor::SequenceExtractor;
pub use labeler::OutcomeLabeler;
pub use node::NodeId;
pub use sequence_tree::SequenceTree;
pub use snapshot::{NodeCreated, NodeView, TreeSnapshot};
pub use synthesis::SynthesisEngine;

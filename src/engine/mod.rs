pub mod context;
pub mod sequence_engine;
pub mod error;
pub mod inference;
pub mod lifecycle;

pub use context::EngineContext;
pub use sequence_engine::{SequenceEngine, TrainReport};
pub use error::EngineError;

pub mod runtime;
pub mod settings;

pub use runtime::*;
pub use settings::*;

pub mod bar;
pub mod decision;

pub use bar::*;
pub use decision::*;

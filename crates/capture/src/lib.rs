pub mod compose;
pub mod pipeline;

pub use compose::*;
pub use pipeline::*;

pub mod engine;
pub mod surface;
pub mod view;
pub mod viewport;

pub use engine::*;
pub use surface::*;
pub use view::*;
pub use viewport::*;

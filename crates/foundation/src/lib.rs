pub mod geo;
pub mod raster;
pub mod time;

// Foundation crate: small, well-tested primitives only.
pub use geo::*;
pub use raster::*;
pub use time::*;

pub mod clock;
pub mod debounce;
pub mod request;
pub mod service;
pub mod tiling;
pub mod timeline;
pub mod wms;

pub use clock::*;
pub use debounce::*;
pub use request::*;
pub use service::*;
pub use tiling::*;
pub use timeline::*;
pub use wms::*;

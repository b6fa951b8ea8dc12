pub mod shell;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use shell::*;

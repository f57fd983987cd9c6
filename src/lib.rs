pub mod core;
pub mod services;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub mod config;
pub mod io;
pub mod state;
#[cfg(target_arch = "wasm32")]
pub mod web_io;

pub mod api;
pub mod catalog;
pub mod handoff;
pub mod mock;
pub mod store;
pub mod workflow;

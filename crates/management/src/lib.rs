//! Campaign entity store for campaigns, assets, creatives, creative groups and ad groups.
//!
//! Data lives in DashMap for the lifetime of the process; snapshot/restore
//! gives tests and the CLI a way to capture and replay state.

pub mod models;
pub mod seed;
pub mod store;

pub use models::ErrorResponse;
pub use store::{EntityStore, StoreSnapshot};

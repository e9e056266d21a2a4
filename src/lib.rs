//! Client-side synchronization for shared lists.
//!
//! Keeps a local [`model::ItemSnapshot`] consistent with a remote item store:
//! background polling, bulk mutations with partial-failure reporting, the
//! item refresh workflow and the bulk "read" toggle.

pub mod config;
pub mod error;
pub mod failure;
pub mod model;
pub mod notify;
pub mod remote;
pub mod sync;

pub use error::SyncError;

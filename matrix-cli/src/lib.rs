//! Mail-handling binary's internals, split into a library so integration
//! tests (`tests/`) can drive the email driver directly, the way
//! `backend`'s `[lib]`/`[[bin]]` split lets its own `tests/e2e` exercise
//! the axum router in-process.

pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod metrics;
pub mod object_store;

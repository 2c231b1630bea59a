//! Container Status Relay Library
//!
//! Accepts status reports for containers from many concurrent callers and keeps the
//! most recent report per container in a key/value store that may be unavailable at times.
//! The binary (`main.rs`) wires these modules together.
//!
//! ## Modules
//! - **`serializer`**: The core. One task owns all relay state, drops stale reports by
//!   observation time, writes to the store, buffers failed writes and retries them on a timer.
//! - **`storage`**: The `StatusStore` port and its in-memory and HTTP backends.
//! - **`status`**: The HTTP ingestion layer: report schema, handlers and router.
//! - **`config`**: Command line and environment configuration.

pub mod config;
pub mod serializer;
pub mod status;
pub mod storage;

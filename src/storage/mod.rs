//! Storage Module
//!
//! The persistence boundary of the relay. The serializer only sees the
//! `StatusStore` trait; concrete backends live next to it.
//!
//! ## Backends
//! - **`MemoryStore`**: in-process map with an optional simulated failure rate and an
//!   availability switch, used for local runs and demos of the retry path.
//! - **`RemoteStore`**: HTTP client writing into a cluster node's `/put` endpoint.

pub mod memory;
pub mod protocol;
pub mod remote;
pub mod store;

pub use memory::MemoryStore;
pub use remote::RemoteStore;
pub use store::StatusStore;

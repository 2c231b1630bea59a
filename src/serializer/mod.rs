//! Update Serializer Module
//!
//! Turns concurrent status submissions into one ordered stream of store writes,
//! with deduplication by observation time and write-behind retry of failed writes.
//!
//! ## Architecture Overview
//! - **Single owner**: `UpdateSerializer::run` is the only code that touches the
//!   committed and pending maps. There are no locks around them.
//! - **Intake**: producers hold a `SerializerHandle` and talk to the loop over a bounded
//!   `mpsc` channel. Queries (`stats`, `lookup`) are answered by the loop over `oneshot`.
//! - **Retry**: a fixed-interval tick re-attempts every pending report, with no backoff
//!   and no attempt limit.
//!
//! ## Submodules
//! - **`serializer`**: the loop and the dedup/write/buffer logic.
//! - **`handle`**: the producer side.
//! - **`types`**: commands, configuration, stats and errors.

pub mod handle;
pub mod serializer;
pub mod types;

pub use handle::SerializerHandle;
pub use serializer::UpdateSerializer;
pub use types::{
    EntityView, SerializerConfig, SerializerError, SerializerState, SerializerStats,
};

#[cfg(test)]
mod tests;

//! Status Ingestion Module
//!
//! HTTP front door of the relay. Decodes JSON status reports and forwards them to the
//! serializer; never talks to the store itself.
//!
//! ## Endpoints
//! - `POST /api/update`: queue one report (`message-id`, `container-id`, `status`, `time`).
//! - `GET  /api/health`: static liveness answer.
//! - `GET  /api/stats`: serializer counters.
//! - `GET  /api/status/:container_id`: committed and pending report for one container.
//! - `POST /api/flush`: retry pending reports now.

pub mod handlers;
pub mod server;
pub mod types;

//! Remote Store Protocol
//!
//! Request and response bodies spoken by `RemoteStore` when it writes into a
//! cluster node's key/value API.

use serde::{Deserialize, Serialize};

/// Public endpoint for client write requests.
pub const ENDPOINT_PUT: &str = "/put";

/// Client write request.
///
/// `op_id` lets the receiving node drop a request it has already applied.
#[derive(Debug, Serialize, Deserialize)]
pub struct PutRequest {
    pub op_id: String,
    pub key: String,
    /// The serialized JSON string of the value.
    pub value_json: String,
}

/// Acknowledgment for write operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct PutResponse {
    /// Indicates if the value was persisted.
    pub success: bool,
}

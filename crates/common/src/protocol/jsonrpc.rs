// JSON-RPC 2.0 envelope types for the ledger ingestion endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const SUCCESS_STATUS: &str = "success";
pub const SUCCESS_MESSAGE: &str = "Operation completed successfully";

/// Only the exact `"2.0"` tag is accepted; near misses like `"2"` are rejected.
#[must_use]
pub fn is_supported_protocol_version(version: &str) -> bool {
    version == JSONRPC_VERSION
}

/// An inbound command batch: one method applied to an ordered list of
/// parameter records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    #[serde(alias = "protocolVersion")]
    pub jsonrpc: String,
    pub id: i64,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// The fixed call-level success envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response {
    pub jsonrpc: String,
    pub id: i64,
    pub result: RpcResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcResult {
    pub status: String,
    pub message: String,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Vec<Value>, id: i64) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, method: method.into(), params }
    }
}

impl Response {
    pub fn success(id: i64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: RpcResult {
                status: SUCCESS_STATUS.to_string(),
                message: SUCCESS_MESSAGE.to_string(),
            },
        }
    }
}

// tnt-registry: track-and-trace document registry with a JSON-RPC ingestion
// endpoint for ledger announcements.

pub mod api;
pub mod config;
pub mod cors;
pub mod db;
pub mod error;
pub mod pagination;
pub mod rpc;
pub mod server;
pub mod store;
pub mod validation;

// JSON-RPC command dispatcher.
//
// A call is the unit of atomicity: all of its records are decoded up front,
// applied to the session as deferred writes, and committed exactly once.
// Any failure drops the session, which discards the partial batch.

pub mod params;

use std::str::FromStr;

use sha2::{Digest, Sha256};
use tnt_common::protocol::{
    jsonrpc::{is_supported_protocol_version, Request, Response, JSONRPC_VERSION},
    rpc_methods::RpcMethod,
};
use tracing::{debug, error, info};

use crate::store::{
    models::{Access, AccessFilter, Document, Event},
    Commit, Session, StoreError,
};
use params::{decode_all, Command, ParamError};

/// How the internal `hash` of a written event is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventHashMode {
    /// Store a fixed sentinel, as the ledger listener historically did.
    Placeholder(String),
    /// `0x` + hex SHA-256 over the event content.
    Sha256,
}

impl Default for EventHashMode {
    fn default() -> Self {
        Self::Placeholder(DEFAULT_EVENT_HASH_PLACEHOLDER.to_owned())
    }
}

pub const DEFAULT_EVENT_HASH_PLACEHOLDER: &str = "0";

impl EventHashMode {
    pub fn digest(
        &self,
        document_id: &str,
        metadata: &str,
        sender: &str,
        origin: &str,
        external_hash: Option<&str>,
    ) -> String {
        match self {
            Self::Placeholder(sentinel) => sentinel.clone(),
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                for part in [document_id, metadata, sender, origin, external_hash.unwrap_or("")] {
                    hasher.update(part.as_bytes());
                    hasher.update([0u8]);
                }
                format!("0x{}", hex::encode(hasher.finalize()))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unsupported jsonrpc version `{0}`, expected {JSONRPC_VERSION}")]
    InvalidRequest(String),
    #[error("unknown method `{0}`")]
    InvalidMethod(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<ParamError> for DispatchError {
    fn from(error: ParamError) -> Self {
        match &error {
            ParamError::Invalid { .. } => Self::InvalidParams(error.to_string()),
            ParamError::Decode { .. } => Self::Decode(error.to_string()),
        }
    }
}

impl From<StoreError> for DispatchError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { .. } => Self::NotFound(error.to_string()),
            StoreError::Conflict(message) => Self::Conflict(message),
            StoreError::Database(_) => {
                error!(error = %error, "rpc store failure");
                Self::Store(error)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    event_hash: EventHashMode,
}

impl Dispatcher {
    pub fn new(event_hash: EventHashMode) -> Self {
        Self { event_hash }
    }

    pub async fn dispatch(
        &self,
        session: &mut Session,
        request: Request,
    ) -> Result<Response, DispatchError> {
        if !is_supported_protocol_version(&request.jsonrpc) {
            return Err(DispatchError::InvalidRequest(request.jsonrpc));
        }
        let method = RpcMethod::from_str(&request.method)
            .map_err(|_| DispatchError::InvalidMethod(request.method.clone()))?;

        if method.is_passthrough() {
            debug!(method = %method, rpc_id = request.id, "rpc method accepted without effect");
            return Ok(Response::success(request.id));
        }

        let commands = decode_all(method, &request.params, &self.event_hash)?;
        info!(method = %method, rpc_id = request.id, records = commands.len(), "rpc call");

        for command in commands {
            apply(session, command).await?;
        }
        session.commit().await?;

        Ok(Response::success(request.id))
    }
}

async fn apply(session: &mut Session, command: Command) -> Result<(), DispatchError> {
    match command {
        Command::CreateDocument(document) => {
            session.repo::<Document>().create(document, Commit::Deferred).await?;
        }
        Command::RemoveDocument { document_id } => {
            session.repo::<Document>().delete(&document_id, Commit::Deferred).await?;
        }
        Command::GrantAccess(access) => {
            session.repo::<Access>().create(access, Commit::Deferred).await?;
        }
        Command::RevokeAccess { subject, document_id, permission } => {
            let filter = AccessFilter {
                subject: Some(subject),
                document_id: Some(document_id),
                permission: Some(permission),
            };
            let mut accesses = session.repo::<Access>();
            let access = accesses.list(0, 1, None, &filter).await?.into_iter().next().ok_or_else(
                || {
                    DispatchError::NotFound(format!(
                        "no {} access for `{}` on document `{}`",
                        permission,
                        filter.subject.as_deref().unwrap_or_default(),
                        filter.document_id.as_deref().unwrap_or_default(),
                    ))
                },
            )?;
            accesses.delete(&access.id, Commit::Deferred).await?;
        }
        Command::WriteEvent(event) => {
            session.repo::<Event>().create(event, Commit::Deferred).await?;
        }
    }

    Ok(())
}

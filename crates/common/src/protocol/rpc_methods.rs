// RPC method names accepted by the ledger ingestion endpoint.

use std::{fmt, str::FromStr};

pub const AUTHORISE_DID: &str = "authoriseDid";
pub const CREATE_DOCUMENT: &str = "createDocument";
pub const REMOVE_DOCUMENT: &str = "removeDocument";
pub const GRANT_ACCESS: &str = "grantAccess";
pub const REVOKE_ACCESS: &str = "revokeAccess";
pub const WRITE_EVENT: &str = "writeEvent";
pub const SEND_SIGNED_TRANSACTION: &str = "sendSignedTransaction";

/// All methods the dispatcher accepts.
pub const IMPLEMENTED_METHODS: &[&str] = &[
    AUTHORISE_DID,
    CREATE_DOCUMENT,
    REMOVE_DOCUMENT,
    GRANT_ACCESS,
    REVOKE_ACCESS,
    WRITE_EVENT,
    SEND_SIGNED_TRANSACTION,
];

/// The closed set of ledger commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    AuthoriseDid,
    CreateDocument,
    RemoveDocument,
    GrantAccess,
    RevokeAccess,
    WriteEvent,
    SendSignedTransaction,
}

impl RpcMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthoriseDid => AUTHORISE_DID,
            Self::CreateDocument => CREATE_DOCUMENT,
            Self::RemoveDocument => REMOVE_DOCUMENT,
            Self::GrantAccess => GRANT_ACCESS,
            Self::RevokeAccess => REVOKE_ACCESS,
            Self::WriteEvent => WRITE_EVENT,
            Self::SendSignedTransaction => SEND_SIGNED_TRANSACTION,
        }
    }

    /// Methods acknowledged without touching the registry.
    pub const fn is_passthrough(self) -> bool {
        matches!(self, Self::AuthoriseDid | Self::SendSignedTransaction)
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rpc method `{0}`")]
pub struct UnknownMethod(pub String);

impl FromStr for RpcMethod {
    type Err = UnknownMethod;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            AUTHORISE_DID => Ok(Self::AuthoriseDid),
            CREATE_DOCUMENT => Ok(Self::CreateDocument),
            REMOVE_DOCUMENT => Ok(Self::RemoveDocument),
            GRANT_ACCESS => Ok(Self::GrantAccess),
            REVOKE_ACCESS => Ok(Self::RevokeAccess),
            WRITE_EVENT => Ok(Self::WriteEvent),
            SEND_SIGNED_TRANSACTION => Ok(Self::SendSignedTransaction),
            other => Err(UnknownMethod(other.to_owned())),
        }
    }
}

// Parameter records announced by the ledger listener, and their decoding
// into store commands. Every record of a call is decoded before anything is
// written, so a malformed record rejects the whole call.

use serde::Deserialize;
use serde_json::Value;
use tnt_common::{
    encoding::{decode_hex_text, parse_epoch_seconds, DecodeError},
    protocol::rpc_methods::RpcMethod,
    types::Permission,
};
use uuid::Uuid;

use super::EventHashMode;
use crate::store::models::{Document, NewAccess, NewEvent, Stamp};

/// Source tag recorded for timestamps carried by ledger announcements.
pub const LEDGER_TIMESTAMP_SOURCE: &str = "block";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDocumentParams {
    document_hash: String,
    document_metadata: String,
    did_ebsi_creator: String,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    timestamp_proof: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveDocumentParams {
    document_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrantAccessParams {
    document_hash: String,
    granted_by_account: String,
    subject_account: String,
    permission: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevokeAccessParams {
    document_hash: String,
    revoked_by_account: String,
    subject_account: String,
    permission: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteEventParams {
    event_params: Vec<EventParams>,
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    timestamp_proof: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventParams {
    document_hash: String,
    #[serde(default)]
    external_hash: Option<String>,
    sender: String,
    origin: String,
    metadata: String,
}

/// One decoded mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateDocument(Document),
    RemoveDocument { document_id: String },
    GrantAccess(NewAccess),
    RevokeAccess { subject: String, document_id: String, permission: Permission },
    WriteEvent(NewEvent),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("params[{index}]: {reason}")]
    Invalid { index: usize, reason: String },
    #[error("params[{index}]: {source}")]
    Decode { index: usize, source: DecodeError },
}

pub fn decode_all(
    method: RpcMethod,
    params: &[Value],
    event_hash: &EventHashMode,
) -> Result<Vec<Command>, ParamError> {
    params
        .iter()
        .enumerate()
        .map(|(index, record)| decode(method, record, event_hash).map_err(|error| error.at(index)))
        .collect()
}

enum RecordError {
    Invalid(String),
    Decode(DecodeError),
}

impl RecordError {
    fn at(self, index: usize) -> ParamError {
        match self {
            Self::Invalid(reason) => ParamError::Invalid { index, reason },
            Self::Decode(source) => ParamError::Decode { index, source },
        }
    }
}

impl From<DecodeError> for RecordError {
    fn from(error: DecodeError) -> Self {
        Self::Decode(error)
    }
}

fn parse_record<T: for<'de> Deserialize<'de>>(record: &Value) -> Result<T, RecordError> {
    T::deserialize(record).map_err(|error| RecordError::Invalid(error.to_string()))
}

fn parse_permission(value: &str) -> Result<Permission, RecordError> {
    value.parse().map_err(|error: tnt_common::types::InvalidPermission| {
        RecordError::Invalid(error.to_string())
    })
}

fn decode_stamp(
    timestamp: Option<&Value>,
    proof: Option<String>,
) -> Result<Option<Stamp>, RecordError> {
    match (timestamp, proof) {
        (None, None) => Ok(None),
        (Some(timestamp), Some(proof)) => Ok(Some(Stamp {
            at: parse_epoch_seconds("timestamp", timestamp)?,
            source: LEDGER_TIMESTAMP_SOURCE.to_owned(),
            proof,
        })),
        _ => Err(RecordError::Invalid(
            "timestamp and timestampProof must be supplied together".to_owned(),
        )),
    }
}

fn decode(
    method: RpcMethod,
    record: &Value,
    event_hash: &EventHashMode,
) -> Result<Command, RecordError> {
    match method {
        RpcMethod::CreateDocument => {
            let params: CreateDocumentParams = parse_record(record)?;
            let stamp = decode_stamp(params.timestamp.as_ref(), params.timestamp_proof)?;
            Ok(Command::CreateDocument(Document::new(
                params.document_hash,
                decode_hex_text("documentMetadata", &params.document_metadata)?,
                decode_hex_text("didEbsiCreator", &params.did_ebsi_creator)?,
                stamp,
            )))
        }
        RpcMethod::RemoveDocument => {
            let params: RemoveDocumentParams = parse_record(record)?;
            Ok(Command::RemoveDocument { document_id: params.document_hash })
        }
        RpcMethod::GrantAccess => {
            let params: GrantAccessParams = parse_record(record)?;
            Ok(Command::GrantAccess(NewAccess {
                subject: decode_hex_text("subjectAccount", &params.subject_account)?,
                document_id: params.document_hash,
                granted_by: decode_hex_text("grantedByAccount", &params.granted_by_account)?,
                permission: parse_permission(&params.permission)?,
            }))
        }
        RpcMethod::RevokeAccess => {
            let params: RevokeAccessParams = parse_record(record)?;
            // Must still be well-formed even though the registry keeps no revoker.
            decode_hex_text("revokedByAccount", &params.revoked_by_account)?;
            Ok(Command::RevokeAccess {
                subject: decode_hex_text("subjectAccount", &params.subject_account)?,
                document_id: params.document_hash,
                permission: parse_permission(&params.permission)?,
            })
        }
        RpcMethod::WriteEvent => {
            let params: WriteEventParams = parse_record(record)?;
            let stamp = decode_stamp(params.timestamp.as_ref(), params.timestamp_proof)?;
            let event = params
                .event_params
                .into_iter()
                .next()
                .ok_or_else(|| RecordError::Invalid("eventParams must not be empty".to_owned()))?;
            let sender = decode_hex_text("sender", &event.sender)?;
            let hash = event_hash.digest(
                &event.document_hash,
                &event.metadata,
                &sender,
                &event.origin,
                event.external_hash.as_deref(),
            );

            Ok(Command::WriteEvent(NewEvent {
                id: params.event_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                document_id: event.document_hash,
                metadata: event.metadata,
                sender,
                origin: event.origin,
                hash,
                external_hash: event.external_hash,
                stamp,
            }))
        }
        RpcMethod::AuthoriseDid | RpcMethod::SendSignedTransaction => {
            Err(RecordError::Invalid(format!("{method} carries no persisted records")))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tnt_common::{
        encoding::DecodeError, protocol::rpc_methods::RpcMethod, types::Permission,
    };

    use super::{decode_all, Command, ParamError, LEDGER_TIMESTAMP_SOURCE};
    use crate::rpc::EventHashMode;

    fn placeholder() -> EventHashMode {
        EventHashMode::Placeholder("0".to_owned())
    }

    #[test]
    fn create_document_decodes_metadata_creator_and_stamp() {
        let params = [json!({
            "documentHash": "0xdoc",
            "documentMetadata": "0x7b7d",
            "didEbsiCreator": "0x61646d696e",
            "timestamp": 1_700_000_000,
            "timestampProof": "0xproof",
        })];

        let commands =
            decode_all(RpcMethod::CreateDocument, &params, &placeholder()).expect("decode");
        let [Command::CreateDocument(document)] = commands.as_slice() else {
            panic!("expected one createDocument command, got {commands:?}");
        };
        assert_eq!(document.id, "0xdoc");
        assert_eq!(document.metadata, "{}");
        assert_eq!(document.creator, "admin");
        assert_eq!(document.timestamp_source.as_deref(), Some(LEDGER_TIMESTAMP_SOURCE));
        assert_eq!(document.timestamp_proof.as_deref(), Some("0xproof"));
        assert!(document.timestamp_datetime.is_some());
    }

    #[test]
    fn absent_timestamp_leaves_all_stamp_fields_empty() {
        let params = [json!({
            "documentHash": "doc1",
            "documentMetadata": "0x",
            "didEbsiCreator": "0x61",
        })];

        let commands =
            decode_all(RpcMethod::CreateDocument, &params, &placeholder()).expect("decode");
        let [Command::CreateDocument(document)] = commands.as_slice() else {
            panic!("expected one createDocument command");
        };
        assert!(document.timestamp().is_none());
        assert!(document.timestamp_datetime.is_none());
        assert!(document.timestamp_source.is_none());
        assert!(document.timestamp_proof.is_none());
    }

    #[test]
    fn timestamp_without_proof_is_rejected() {
        let params = [json!({
            "documentHash": "doc1",
            "documentMetadata": "0x",
            "didEbsiCreator": "0x61",
            "timestamp": 1_700_000_000,
        })];

        let error = decode_all(RpcMethod::CreateDocument, &params, &placeholder())
            .expect_err("half a stamp");
        assert!(matches!(error, ParamError::Invalid { index: 0, .. }));
    }

    #[test]
    fn malformed_record_reports_its_index() {
        let params = [
            json!({"documentHash": "doc1", "grantedByAccount": "0x61", "subjectAccount": "0x62", "permission": "write"}),
            json!({"documentHash": "doc1", "grantedByAccount": "0x61", "subjectAccount": "0x6", "permission": "write"}),
        ];

        let error =
            decode_all(RpcMethod::GrantAccess, &params, &placeholder()).expect_err("odd hex");
        assert!(matches!(
            error,
            ParamError::Decode { index: 1, source: DecodeError::InvalidHex { field: "subjectAccount", .. } }
        ));
    }

    #[test]
    fn grant_access_rejects_unknown_permission() {
        let params = [json!({
            "documentHash": "doc1",
            "grantedByAccount": "0x61646d696e",
            "subjectAccount": "0x7573657231",
            "permission": "owner",
        })];

        let error = decode_all(RpcMethod::GrantAccess, &params, &placeholder())
            .expect_err("invalid permission");
        assert!(matches!(error, ParamError::Invalid { index: 0, .. }));
    }

    #[test]
    fn revoke_access_validates_revoker_hex() {
        let params = [json!({
            "documentHash": "doc1",
            "revokedByAccount": "admin",
            "subjectAccount": "0x7573657231",
            "permission": "write",
        })];

        let error =
            decode_all(RpcMethod::RevokeAccess, &params, &placeholder()).expect_err("bad revoker");
        assert_eq!(error, ParamError::Decode {
            index: 0,
            source: DecodeError::MissingHexPrefix { field: "revokedByAccount" },
        });
    }

    #[test]
    fn write_event_uses_first_event_params_and_placeholder_hash() {
        let params = [json!({
            "eventParams": [{
                "documentHash": "doc1",
                "externalHash": "0xabc",
                "sender": "0x7573657231",
                "origin": "warehouse",
                "metadata": "shipped",
            }],
            "eventId": "event-7",
        })];

        let commands = decode_all(RpcMethod::WriteEvent, &params, &placeholder()).expect("decode");
        let [Command::WriteEvent(event)] = commands.as_slice() else {
            panic!("expected one writeEvent command");
        };
        assert_eq!(event.id, "event-7");
        assert_eq!(event.document_id, "doc1");
        assert_eq!(event.sender, "user1");
        assert_eq!(event.hash, "0");
        assert_eq!(event.external_hash.as_deref(), Some("0xabc"));
        assert!(event.stamp.is_none());
    }

    #[test]
    fn write_event_generates_an_id_when_absent() {
        let record = json!({
            "eventParams": [{"documentHash": "doc1", "sender": "0x61", "origin": "o", "metadata": "m"}],
        });

        let commands = decode_all(RpcMethod::WriteEvent, &[record.clone(), record], &placeholder())
            .expect("decode");
        let ids: Vec<&str> = commands
            .iter()
            .filter_map(|command| match command {
                Command::WriteEvent(event) => Some(event.id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn write_event_requires_event_params() {
        let params = [json!({"eventParams": []})];

        let error =
            decode_all(RpcMethod::WriteEvent, &params, &placeholder()).expect_err("no event");
        assert!(matches!(error, ParamError::Invalid { index: 0, .. }));
    }

    #[test]
    fn remove_document_only_needs_the_hash() {
        let commands = decode_all(
            RpcMethod::RemoveDocument,
            &[json!({"documentHash": "doc1"})],
            &placeholder(),
        )
        .expect("decode");
        assert_eq!(commands, vec![Command::RemoveDocument { document_id: "doc1".into() }]);
    }

    #[test]
    fn revoke_access_decodes_lookup_triple() {
        let params = [json!({
            "documentHash": "doc1",
            "revokedByAccount": "0x61646d696e",
            "subjectAccount": "0x7573657231",
            "permission": "delegate",
        })];

        let commands = decode_all(RpcMethod::RevokeAccess, &params, &placeholder()).expect("decode");
        assert_eq!(commands, vec![Command::RevokeAccess {
            subject: "user1".into(),
            document_id: "doc1".into(),
            permission: Permission::Delegate,
        }]);
    }
}

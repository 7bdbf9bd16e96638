// Registry rows: documents, their provenance events, and access grants.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tnt_common::types::{Permission, Timestamp};

use super::{
    entity::{Assignments, Entity, Immutable, SqlValue},
    memory::MemoryTables,
    StoreError,
};

/// Provenance triple as persisted: all three parts or none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub at: DateTime<Utc>,
    pub source: String,
    pub proof: String,
}

fn split_stamp(stamp: Option<&Stamp>) -> (Option<DateTime<Utc>>, Option<String>, Option<String>) {
    match stamp {
        Some(stamp) => (Some(stamp.at), Some(stamp.source.clone()), Some(stamp.proof.clone())),
        None => (None, None, None),
    }
}

fn stamp_values(stamp: Option<&Stamp>) -> Assignments {
    let (at, source, proof) = split_stamp(stamp);
    vec![
        ("timestamp_datetime", at.into()),
        ("timestamp_source", source.into()),
        ("timestamp_proof", proof.into()),
    ]
}

// ── Documents ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Document {
    pub id: String,
    pub metadata: String,
    pub timestamp_datetime: Option<DateTime<Utc>>,
    pub timestamp_source: Option<String>,
    pub timestamp_proof: Option<String>,
    pub creator: String,
}

impl Document {
    pub fn new(id: String, metadata: String, creator: String, stamp: Option<Stamp>) -> Self {
        let (timestamp_datetime, timestamp_source, timestamp_proof) = split_stamp(stamp.as_ref());
        Self { id, metadata, timestamp_datetime, timestamp_source, timestamp_proof, creator }
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        Timestamp::from_parts(
            self.timestamp_datetime,
            self.timestamp_source.clone(),
            self.timestamp_proof.clone(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentChanges {
    pub metadata: Option<String>,
    pub creator: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub creator: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSort {
    Id,
    Timestamp,
}

impl Entity for Document {
    type Id = String;
    type New = Document;
    type Changes = DocumentChanges;
    type Filter = DocumentFilter;
    type SortKey = DocumentSort;

    const NAME: &'static str = "document";
    const TABLE: &'static str = "documents";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "metadata",
        "timestamp_datetime",
        "timestamp_source",
        "timestamp_proof",
        "creator",
    ];

    fn id(&self) -> &String {
        &self.id
    }

    fn id_value(id: &String) -> SqlValue {
        id.as_str().into()
    }

    fn insert_values(new: &Document) -> Assignments {
        vec![
            ("id", new.id.as_str().into()),
            ("metadata", new.metadata.as_str().into()),
            ("timestamp_datetime", new.timestamp_datetime.into()),
            ("timestamp_source", new.timestamp_source.clone().into()),
            ("timestamp_proof", new.timestamp_proof.clone().into()),
            ("creator", new.creator.as_str().into()),
        ]
    }

    fn change_values(changes: &DocumentChanges) -> Assignments {
        let mut values = Vec::new();
        if let Some(metadata) = &changes.metadata {
            values.push(("metadata", metadata.as_str().into()));
        }
        if let Some(creator) = &changes.creator {
            values.push(("creator", creator.as_str().into()));
        }
        values
    }

    fn filter_values(filter: &DocumentFilter) -> Assignments {
        filter.creator.iter().map(|creator| ("creator", creator.as_str().into())).collect()
    }

    fn sort_column(key: DocumentSort) -> &'static str {
        match key {
            DocumentSort::Id => "id",
            DocumentSort::Timestamp => "timestamp_datetime",
        }
    }

    fn default_sort() -> DocumentSort {
        DocumentSort::Id
    }

    fn column_value(&self, column: &str) -> SqlValue {
        match column {
            "id" => self.id.as_str().into(),
            "metadata" => self.metadata.as_str().into(),
            "timestamp_datetime" => self.timestamp_datetime.into(),
            "timestamp_source" => self.timestamp_source.clone().into(),
            "timestamp_proof" => self.timestamp_proof.clone().into(),
            "creator" => self.creator.as_str().into(),
            _ => SqlValue::Text(None),
        }
    }

    fn table(tables: &MemoryTables) -> &BTreeMap<String, Self> {
        &tables.documents
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut BTreeMap<String, Self> {
        &mut tables.documents
    }

    fn materialize(new: Document, _sequence: i64) -> Self {
        new
    }

    fn apply(&mut self, changes: DocumentChanges) {
        if let Some(metadata) = changes.metadata {
            self.metadata = metadata;
        }
        if let Some(creator) = changes.creator {
            self.creator = creator;
        }
    }

    fn check_dependents(tables: &MemoryTables, id: &String) -> Result<(), StoreError> {
        let has_events = tables.events.values().any(|event| &event.document_id == id);
        let has_accesses = tables.accesses.values().any(|access| &access.document_id == id);
        if has_events || has_accesses {
            return Err(StoreError::Conflict(format!(
                "document {id} is still referenced by events or accesses"
            )));
        }

        Ok(())
    }
}

// ── Events ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Event {
    pub id: String,
    pub document_id: String,
    pub metadata: String,
    pub sender: String,
    pub origin: String,
    pub hash: String,
    pub external_hash: Option<String>,
    pub timestamp_datetime: Option<DateTime<Utc>>,
    pub timestamp_source: Option<String>,
    pub timestamp_proof: Option<String>,
}

impl Event {
    pub fn timestamp(&self) -> Option<Timestamp> {
        Timestamp::from_parts(
            self.timestamp_datetime,
            self.timestamp_source.clone(),
            self.timestamp_proof.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub id: String,
    pub document_id: String,
    pub metadata: String,
    pub sender: String,
    pub origin: String,
    pub hash: String,
    pub external_hash: Option<String>,
    pub stamp: Option<Stamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub document_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSort {
    Id,
    Timestamp,
}

impl Entity for Event {
    type Id = String;
    type New = NewEvent;
    type Changes = Immutable;
    type Filter = EventFilter;
    type SortKey = EventSort;

    const NAME: &'static str = "event";
    const TABLE: &'static str = "events";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "document_id",
        "metadata",
        "sender",
        "origin",
        "hash",
        "external_hash",
        "timestamp_datetime",
        "timestamp_source",
        "timestamp_proof",
    ];

    fn id(&self) -> &String {
        &self.id
    }

    fn id_value(id: &String) -> SqlValue {
        id.as_str().into()
    }

    fn insert_values(new: &NewEvent) -> Assignments {
        let mut values: Assignments = vec![
            ("id", new.id.as_str().into()),
            ("document_id", new.document_id.as_str().into()),
            ("metadata", new.metadata.as_str().into()),
            ("sender", new.sender.as_str().into()),
            ("origin", new.origin.as_str().into()),
            ("hash", new.hash.as_str().into()),
            ("external_hash", new.external_hash.clone().into()),
        ];
        values.extend(stamp_values(new.stamp.as_ref()));
        values
    }

    fn change_values(changes: &Immutable) -> Assignments {
        match *changes {}
    }

    fn filter_values(filter: &EventFilter) -> Assignments {
        filter
            .document_id
            .iter()
            .map(|document_id| ("document_id", document_id.as_str().into()))
            .collect()
    }

    fn sort_column(key: EventSort) -> &'static str {
        match key {
            EventSort::Id => "id",
            EventSort::Timestamp => "timestamp_datetime",
        }
    }

    fn default_sort() -> EventSort {
        EventSort::Id
    }

    fn column_value(&self, column: &str) -> SqlValue {
        match column {
            "id" => self.id.as_str().into(),
            "document_id" => self.document_id.as_str().into(),
            "metadata" => self.metadata.as_str().into(),
            "sender" => self.sender.as_str().into(),
            "origin" => self.origin.as_str().into(),
            "hash" => self.hash.as_str().into(),
            "external_hash" => self.external_hash.clone().into(),
            "timestamp_datetime" => self.timestamp_datetime.into(),
            "timestamp_source" => self.timestamp_source.clone().into(),
            "timestamp_proof" => self.timestamp_proof.clone().into(),
            _ => SqlValue::Text(None),
        }
    }

    fn table(tables: &MemoryTables) -> &BTreeMap<String, Self> {
        &tables.events
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut BTreeMap<String, Self> {
        &mut tables.events
    }

    fn materialize(new: NewEvent, _sequence: i64) -> Self {
        let (timestamp_datetime, timestamp_source, timestamp_proof) =
            split_stamp(new.stamp.as_ref());
        Self {
            id: new.id,
            document_id: new.document_id,
            metadata: new.metadata,
            sender: new.sender,
            origin: new.origin,
            hash: new.hash,
            external_hash: new.external_hash,
            timestamp_datetime,
            timestamp_source,
            timestamp_proof,
        }
    }

    fn apply(&mut self, changes: Immutable) {
        match changes {}
    }

    fn check_references(tables: &MemoryTables, row: &Self) -> Result<(), StoreError> {
        require_document(tables, &row.document_id)
    }
}

// ── Accesses ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Access {
    pub id: i64,
    pub subject: String,
    pub document_id: String,
    pub granted_by: String,
    #[sqlx(try_from = "String")]
    pub permission: Permission,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccess {
    pub subject: String,
    pub document_id: String,
    pub granted_by: String,
    pub permission: Permission,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessChanges {
    pub granted_by: Option<String>,
    pub permission: Option<Permission>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessFilter {
    pub subject: Option<String>,
    pub document_id: Option<String>,
    pub permission: Option<Permission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSort {
    Id,
    Subject,
}

impl Entity for Access {
    type Id = i64;
    type New = NewAccess;
    type Changes = AccessChanges;
    type Filter = AccessFilter;
    type SortKey = AccessSort;

    const NAME: &'static str = "access";
    const TABLE: &'static str = "accesses";
    const COLUMNS: &'static [&'static str] =
        &["id", "subject", "document_id", "granted_by", "permission"];

    fn id(&self) -> &i64 {
        &self.id
    }

    fn id_value(id: &i64) -> SqlValue {
        (*id).into()
    }

    fn insert_values(new: &NewAccess) -> Assignments {
        vec![
            ("subject", new.subject.as_str().into()),
            ("document_id", new.document_id.as_str().into()),
            ("granted_by", new.granted_by.as_str().into()),
            ("permission", new.permission.as_str().into()),
        ]
    }

    fn change_values(changes: &AccessChanges) -> Assignments {
        let mut values = Vec::new();
        if let Some(granted_by) = &changes.granted_by {
            values.push(("granted_by", granted_by.as_str().into()));
        }
        if let Some(permission) = changes.permission {
            values.push(("permission", permission.as_str().into()));
        }
        values
    }

    fn filter_values(filter: &AccessFilter) -> Assignments {
        let mut values = Vec::new();
        if let Some(subject) = &filter.subject {
            values.push(("subject", subject.as_str().into()));
        }
        if let Some(document_id) = &filter.document_id {
            values.push(("document_id", document_id.as_str().into()));
        }
        if let Some(permission) = filter.permission {
            values.push(("permission", permission.as_str().into()));
        }
        values
    }

    fn sort_column(key: AccessSort) -> &'static str {
        match key {
            AccessSort::Id => "id",
            AccessSort::Subject => "subject",
        }
    }

    fn default_sort() -> AccessSort {
        AccessSort::Id
    }

    fn column_value(&self, column: &str) -> SqlValue {
        match column {
            "id" => self.id.into(),
            "subject" => self.subject.as_str().into(),
            "document_id" => self.document_id.as_str().into(),
            "granted_by" => self.granted_by.as_str().into(),
            "permission" => self.permission.as_str().into(),
            _ => SqlValue::Text(None),
        }
    }

    fn table(tables: &MemoryTables) -> &BTreeMap<i64, Self> {
        &tables.accesses
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut BTreeMap<i64, Self> {
        &mut tables.accesses
    }

    fn materialize(new: NewAccess, sequence: i64) -> Self {
        Self {
            id: sequence,
            subject: new.subject,
            document_id: new.document_id,
            granted_by: new.granted_by,
            permission: new.permission,
        }
    }

    fn apply(&mut self, changes: AccessChanges) {
        if let Some(granted_by) = changes.granted_by {
            self.granted_by = granted_by;
        }
        if let Some(permission) = changes.permission {
            self.permission = permission;
        }
    }

    fn check_references(tables: &MemoryTables, row: &Self) -> Result<(), StoreError> {
        require_document(tables, &row.document_id)
    }
}

fn require_document(tables: &MemoryTables, document_id: &str) -> Result<(), StoreError> {
    if tables.documents.contains_key(document_id) {
        Ok(())
    } else {
        Err(StoreError::Conflict(format!("document {document_id} does not exist")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Document, Stamp};

    #[test]
    fn document_keeps_the_stamp_triple_together() {
        let at = Utc.with_ymd_and_hms(2025, 11, 25, 12, 0, 0).single().expect("valid instant");
        let stamp = Stamp { at, source: "block".into(), proof: "0xproof".into() };

        let document = Document::new("doc1".into(), "{}".into(), "admin".into(), Some(stamp));
        assert_eq!(document.timestamp_datetime, Some(at));
        let timestamp = document.timestamp().expect("stamped document");
        assert_eq!(timestamp.datetime, "2025-11-25T12:00:00Z");
        assert_eq!(timestamp.source, "block");

        let bare = Document::new("doc2".into(), "{}".into(), "admin".into(), None);
        assert!(bare.timestamp().is_none());
    }
}

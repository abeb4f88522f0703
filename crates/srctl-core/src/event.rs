//! The unit of replication: [`SchemaEvent`], decoded from one `_schemas` log
//! record and later dispatched to the target registry by `srctl-replicate`.

use serde::{Deserialize, Serialize};

/// A schema reference as carried in a `SCHEMA` event's `references` list.
/// Order is preserved end to end — the registry treats reference order as
/// significant when resolving a schema's dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub subject: String,
    pub version: i32,
}

/// Type-specific payload for a [`SchemaEvent`]. Carries exactly the fields
/// the log record's value held for that key type; see `spec.md` §6.1 for the
/// wire shapes this is decoded from.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Schema {
        schema_id: i32,
        schema: String,
        schema_type: String,
        references: Vec<Reference>,
        deleted: bool,
    },
    Config {
        compatibility: String,
    },
    Mode {
        mode: String,
    },
    DeleteSubject,
    ClearSubject,
}

impl EventPayload {
    /// Short label used in logs and metrics; matches the `keytype` names on
    /// the wire so operators can correlate log lines with broker records.
    pub fn label(&self) -> &'static str {
        match self {
            EventPayload::Schema { .. } => "SCHEMA",
            EventPayload::Config { .. } => "CONFIG",
            EventPayload::Mode { .. } => "MODE",
            EventPayload::DeleteSubject => "DELETE_SUBJECT",
            EventPayload::ClearSubject => "CLEAR_SUBJECT",
        }
    }
}

/// One decoded record from the source registry's write-ahead log.
///
/// `offset` is the sole source of truth for replication progress (invariant
/// i in `spec.md` §3): it is strictly increasing per partition, and the
/// replication loop commits based on it, never on wall-clock time or record
/// count.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaEvent {
    /// Empty subject means global scope; see `spec.md` §4.3 for how each
    /// event type handles that case.
    pub subject: String,
    pub version: i32,
    pub offset: i64,
    pub partition: i32,
    /// The underlying record had a null value: a permanent-deletion marker,
    /// independent of the `deleted` soft-delete flag inside a SCHEMA value.
    pub tombstone: bool,
    pub payload: EventPayload,
}

impl SchemaEvent {
    pub fn is_global(&self) -> bool {
        self.subject.is_empty()
    }

    pub fn label(&self) -> &'static str {
        self.payload.label()
    }
}

//! Pure decoder turning one broker record into a [`SchemaEvent`] (`spec.md`
//! §4.1). No I/O, no clock reads — same input always yields the same
//! output, so the replication loop can quarantine a bad record without
//! poisoning the rest of the batch.

use serde::Deserialize;
use srctl_core::{EventPayload, Reference, SchemaEvent, SrctlError};

#[derive(Debug, Deserialize)]
struct KeyRecord {
    keytype: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    version: Option<i32>,
    #[allow(dead_code)]
    #[serde(default)]
    magic: Option<i32>,
}

#[derive(Debug, Deserialize, Default)]
struct SchemaValue {
    #[serde(default)]
    id: Option<i32>,
    #[serde(default)]
    schema: Option<String>,
    #[serde(default, rename = "schemaType")]
    schema_type: Option<String>,
    #[serde(default)]
    references: Option<Vec<Reference>>,
    #[serde(default)]
    deleted: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigValue {
    #[serde(default, rename = "compatibilityLevel")]
    compatibility_level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ModeValue {
    #[serde(default)]
    mode: Option<String>,
}

/// Decode one `(key, value, offset, partition)` tuple. `Ok(None)` means the
/// record carried no replicable event (empty key, `NOOP` key type, or an
/// unrecognized key type) — not an error, and the caller should simply skip
/// to the next record.
pub fn decode(
    key: Option<&[u8]>,
    value: Option<&[u8]>,
    offset: i64,
    partition: i32,
) -> Result<Option<SchemaEvent>, SrctlError> {
    let key_bytes = match key {
        Some(k) if !k.is_empty() => k,
        _ => return Ok(None),
    };

    let key: KeyRecord = serde_json::from_slice(key_bytes)
        .map_err(|e| SrctlError::Decode(format!("invalid key at offset {offset}: {e}")))?;

    if key.keytype == "NOOP" {
        return Ok(None);
    }

    let subject = key.subject.unwrap_or_default();
    let version = key.version.unwrap_or(0);
    let tombstone = value.map(|v| v.is_empty()).unwrap_or(true);

    let payload = if tombstone {
        // Works for any key type: a null value is the log's universal
        // deletion marker, independent of any type-specific fields.
        match key.keytype.as_str() {
            "SCHEMA" => EventPayload::Schema {
                schema_id: 0,
                schema: String::new(),
                schema_type: String::new(),
                references: Vec::new(),
                deleted: false,
            },
            "CONFIG" => EventPayload::Config {
                compatibility: String::new(),
            },
            "MODE" => EventPayload::Mode {
                mode: String::new(),
            },
            "DELETE_SUBJECT" => EventPayload::DeleteSubject,
            "CLEAR_SUBJECT" => EventPayload::ClearSubject,
            _ => return Ok(None),
        }
    } else {
        let value_bytes = value.expect("non-tombstone implies Some value");
        match key.keytype.as_str() {
            "SCHEMA" => {
                let v: SchemaValue = serde_json::from_slice(value_bytes).map_err(|e| {
                    SrctlError::Decode(format!("invalid SCHEMA value at offset {offset}: {e}"))
                })?;
                let schema_type = match v.schema_type {
                    Some(t) if !t.is_empty() => t,
                    _ => "AVRO".to_string(),
                };
                EventPayload::Schema {
                    schema_id: v.id.unwrap_or(0),
                    schema: v.schema.unwrap_or_default(),
                    schema_type,
                    references: v.references.unwrap_or_default(),
                    deleted: v.deleted.unwrap_or(false),
                }
            }
            "CONFIG" => {
                let v: ConfigValue = serde_json::from_slice(value_bytes).map_err(|e| {
                    SrctlError::Decode(format!("invalid CONFIG value at offset {offset}: {e}"))
                })?;
                EventPayload::Config {
                    compatibility: v.compatibility_level.unwrap_or_default(),
                }
            }
            "MODE" => {
                let v: ModeValue = serde_json::from_slice(value_bytes).map_err(|e| {
                    SrctlError::Decode(format!("invalid MODE value at offset {offset}: {e}"))
                })?;
                EventPayload::Mode {
                    mode: v.mode.unwrap_or_default(),
                }
            }
            "DELETE_SUBJECT" => EventPayload::DeleteSubject,
            "CLEAR_SUBJECT" => EventPayload::ClearSubject,
            _ => return Ok(None),
        }
    };

    Ok(Some(SchemaEvent {
        subject,
        version,
        offset,
        partition,
        tombstone,
        payload,
    }))
}

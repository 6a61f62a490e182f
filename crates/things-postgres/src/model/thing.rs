//! Thing row model for PostgreSQL database operations.

use diesel::prelude::*;
use things_core::{Metadata, Thing};

use crate::schema::things;

/// A thing row as stored in the database.
///
/// Metadata is persisted as a Jsonb document; decoding it back into the
/// semantic string-keyed map can fail if the stored value is not an object,
/// which surfaces as a metadata-scan error rather than a silent empty map.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = things)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ThingRecord {
    /// Unique thing identifier.
    pub id: String,
    /// Principal controlling the thing.
    pub owner: String,
    /// Human-readable thing name.
    pub name: String,
    /// Access key, unique across the table.
    pub key: String,
    /// Caller-defined attributes.
    pub metadata: serde_json::Value,
}

/// Changeset replacing a thing's name and metadata.
///
/// The key, identifier, and owner columns are deliberately absent: key
/// rotation has its own operation and the rest is immutable.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = things)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdateThing {
    /// New thing name.
    pub name: String,
    /// New metadata document.
    pub metadata: serde_json::Value,
}

impl ThingRecord {
    /// Converts the row into the domain record.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ScanMetadata`] if the stored metadata is not a
    /// JSON object.
    ///
    /// [`ErrorKind::ScanMetadata`]: things_core::ErrorKind::ScanMetadata
    pub fn into_thing(self) -> things_core::Result<Thing> {
        let metadata = decode_metadata(self.metadata)?;
        Ok(Thing {
            id: self.id,
            owner: self.owner,
            name: self.name,
            key: self.key,
            metadata,
        })
    }
}

impl From<&Thing> for ThingRecord {
    fn from(thing: &Thing) -> Self {
        Self {
            id: thing.id.clone(),
            owner: thing.owner.clone(),
            name: thing.name.clone(),
            key: thing.key.clone(),
            metadata: serde_json::Value::Object(thing.metadata.clone()),
        }
    }
}

impl From<&Thing> for UpdateThing {
    fn from(thing: &Thing) -> Self {
        Self {
            name: thing.name.clone(),
            metadata: serde_json::Value::Object(thing.metadata.clone()),
        }
    }
}

/// Decodes a stored Jsonb value into the semantic metadata map.
fn decode_metadata(value: serde_json::Value) -> things_core::Result<Metadata> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(things_core::Error::scan_metadata()
            .with_message(format!("expected a JSON object, found {}", kind_of(&other)))),
    }
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use things_core::ErrorKind;

    use super::*;

    fn sample_record(metadata: serde_json::Value) -> ThingRecord {
        ThingRecord {
            id: "t1".into(),
            owner: "u1".into(),
            name: "sensor".into(),
            key: "k1".into(),
            metadata,
        }
    }

    #[test]
    fn record_round_trips_to_domain_thing() {
        let record = sample_record(serde_json::json!({"serial": "X-100"}));
        let thing = record.clone().into_thing().unwrap();
        assert_eq!(thing.id, "t1");
        assert_eq!(thing.metadata["serial"], serde_json::json!("X-100"));
        assert_eq!(ThingRecord::from(&thing), record);
    }

    #[test]
    fn non_object_metadata_is_a_scan_error() {
        let record = sample_record(serde_json::json!([1, 2, 3]));
        let err = record.into_thing().unwrap_err();
        assert!(err.is_kind(ErrorKind::ScanMetadata));
    }

    #[test]
    fn update_changeset_carries_name_and_metadata_only() {
        let thing = Thing::new("t1", "u1", "k1").with_name("renamed");
        let changes = UpdateThing::from(&thing);
        assert_eq!(changes.name, "renamed");
        assert_eq!(changes.metadata, serde_json::json!({}));
    }
}

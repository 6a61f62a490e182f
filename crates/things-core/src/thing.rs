//! The registered thing record and its free-form metadata.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Caller-defined attributes attached to a thing.
///
/// The registry enforces no schema beyond "must be representable": any
/// string-keyed JSON object round-trips through the backing store unchanged.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A registered device record.
///
/// Each thing is owned by one principal and is assigned a unique identifier
/// and a rotatable access key. The identifier and owner are immutable after
/// creation; the key is unique across the whole registry and changes only
/// through explicit rotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    /// Unique thing identifier, assigned at creation.
    pub id: String,
    /// Principal controlling the thing.
    pub owner: String,
    /// Human-readable name, not required to be unique.
    pub name: String,
    /// Opaque access credential, unique across the registry.
    pub key: String,
    /// Caller-defined attributes.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Thing {
    /// Creates a new thing with the given identity fields and no metadata.
    pub fn new(
        id: impl Into<String>,
        owner: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            name: String::new(),
            key: key.into(),
            metadata: Metadata::new(),
        }
    }

    /// Sets the human-readable name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the metadata map.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Checks structural validity before any persistence attempt.
    ///
    /// The identifier, owner, and key must all be non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::malformed_entity().with_message("missing thing identifier"));
        }
        if self.owner.is_empty() {
            return Err(Error::malformed_entity().with_message("missing thing owner"));
        }
        if self.key.is_empty() {
            return Err(Error::malformed_entity().with_message("missing thing key"));
        }
        Ok(())
    }

    /// Returns whether the thing carries any metadata.
    #[inline]
    pub fn has_metadata(&self) -> bool {
        !self.metadata.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_complete_thing() {
        let thing = Thing::new("t1", "u1", "k1");
        assert!(thing.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_required_fields() {
        assert!(Thing::new("", "u1", "k1").validate().unwrap_err().is_malformed_entity());
        assert!(Thing::new("t1", "", "k1").validate().unwrap_err().is_malformed_entity());
        assert!(Thing::new("t1", "u1", "").validate().unwrap_err().is_malformed_entity());
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let mut metadata = Metadata::new();
        metadata.insert("serial".into(), serde_json::json!("X-100"));
        metadata.insert("sensors".into(), serde_json::json!(["temp", "hum"]));

        let thing = Thing::new("t1", "u1", "k1").with_metadata(metadata.clone());
        let encoded = serde_json::to_string(&thing).unwrap();
        let decoded: Thing = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.metadata, metadata);
    }
}

//! Things table constraint violations.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Categories of database constraint violations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintCategory {
    /// A uniqueness guarantee would be broken by the write.
    Uniqueness,
    /// Stored data fails a structural validity check.
    Validation,
}

/// Things table constraint violations.
///
/// Identifier and key uniqueness are enforced here, by the database itself,
/// rather than by application-level pre-checks: concurrent writers racing on
/// the same identifier or key are serialized by the unique indexes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(into = "String", try_from = "String")]
pub enum ThingConstraints {
    /// Primary key on the thing identifier.
    #[strum(serialize = "things_pkey")]
    IdUnique,
    /// Unique index on the access key.
    #[strum(serialize = "things_key_key")]
    KeyUnique,
}

impl ThingConstraints {
    /// Creates a new [`ThingConstraints`] from the constraint name.
    pub fn new(constraint: &str) -> Option<Self> {
        constraint.parse().ok()
    }

    /// Returns the category of this constraint violation.
    pub fn categorize(&self) -> ConstraintCategory {
        match self {
            ThingConstraints::IdUnique | ThingConstraints::KeyUnique => {
                ConstraintCategory::Uniqueness
            }
        }
    }
}

impl From<ThingConstraints> for String {
    #[inline]
    fn from(val: ThingConstraints) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for ThingConstraints {
    type Error = strum::ParseError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_constraint_names() {
        assert_eq!(
            ThingConstraints::new("things_pkey"),
            Some(ThingConstraints::IdUnique)
        );
        assert_eq!(
            ThingConstraints::new("things_key_key"),
            Some(ThingConstraints::KeyUnique)
        );
        assert_eq!(ThingConstraints::new("things_owner_idx"), None);
    }

    #[test]
    fn round_trips_through_strings() {
        let name = String::from(ThingConstraints::KeyUnique);
        assert_eq!(name, "things_key_key");
        assert_eq!(
            ThingConstraints::try_from(name).unwrap(),
            ThingConstraints::KeyUnique
        );
    }

    #[test]
    fn uniqueness_category() {
        assert_eq!(
            ThingConstraints::IdUnique.categorize(),
            ConstraintCategory::Uniqueness
        );
    }
}

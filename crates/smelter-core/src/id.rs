use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SmelterError;

/// The schema type that first-class relationship records map to.
///
/// A `relationship--<uuid>` id refers to a relation instance in the schema,
/// not an entity, so reference translation must target this reserved type
/// instead of the literal `relationship` prefix.
pub const CORE_RELATIONSHIP_TYPE: &str = "stix-core-relationship";

/// A STIX identifier of the form `<kind>--<uuid>`.
///
/// The kind prefix is what reference translation uses to decide which schema
/// type to match against, so the separator is validated at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StixId {
    raw: String,
}

impl StixId {
    /// Parse an id, requiring the `<kind>--<uuid>` shape.
    pub fn parse(raw: impl Into<String>) -> Result<Self, SmelterError> {
        let raw = raw.into();
        match raw.split_once("--") {
            Some((kind, rest)) if !kind.is_empty() && !rest.is_empty() => Ok(Self { raw }),
            _ => Err(SmelterError::InvalidId {
                id: raw,
                reason: "expected `<kind>--<uuid>`".to_string(),
            }),
        }
    }

    /// Generate a fresh id for the given kind.
    pub fn random(kind: &str) -> Self {
        Self {
            raw: format!("{}--{}", kind, Uuid::new_v4()),
        }
    }

    /// The kind prefix: everything before the first `--`.
    pub fn kind(&self) -> &str {
        self.raw
            .split_once("--")
            .map(|(kind, _)| kind)
            .unwrap_or(&self.raw)
    }

    /// The schema type referenced by this id.
    ///
    /// Identical to [`kind`](Self::kind) except for `relationship`, which
    /// disambiguates to [`CORE_RELATIONSHIP_TYPE`].
    pub fn schema_type(&self) -> &str {
        schema_type_for(self.kind())
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Map an id prefix to the schema type it refers to.
pub fn schema_type_for(kind: &str) -> &str {
    if kind == "relationship" {
        CORE_RELATIONSHIP_TYPE
    } else {
        kind
    }
}

impl fmt::Display for StixId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for StixId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        StixId::parse(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_kind_at_first_separator() {
        let id = StixId::parse("indicator--8e2e2d2b-17d4-4cbf-938f-98ee46b3cd3f").unwrap();
        assert_eq!(id.kind(), "indicator");
        assert_eq!(id.schema_type(), "indicator");
    }

    #[test]
    fn relationship_prefix_maps_to_core_relationship() {
        let id = StixId::parse("relationship--44298a74-ba52-4f0c-87a3-1824e67d7fad").unwrap();
        assert_eq!(id.kind(), "relationship");
        assert_eq!(id.schema_type(), "stix-core-relationship");
    }

    #[test]
    fn missing_separator_is_rejected() {
        assert!(StixId::parse("indicator").is_err());
        assert!(StixId::parse("--abc").is_err());
        assert!(StixId::parse("indicator--").is_err());
    }

    #[test]
    fn random_ids_carry_the_kind_prefix() {
        let id = StixId::random("malware");
        assert_eq!(id.kind(), "malware");
    }
}

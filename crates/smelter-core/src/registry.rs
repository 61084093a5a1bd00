//! The schema mapping registry.
//!
//! One typed table keyed by `(kind, field)` replaces the sprawl of parallel
//! lookup lists a name-based dispatcher would need: every field of every
//! known record kind carries a closed [`FieldMapping`] shape tag plus the
//! TypeQL names translation emits for it. The registry is loaded once (the
//! builtin STIX 2.1 subset, or JSON configuration) and passed explicitly
//! into translation calls; nothing reads it as ambient global state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SmelterError;
use crate::value::ValueKind;

/// A flat attribute assertion on the owning node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    /// Target attribute name.
    pub attr: String,
    #[serde(default)]
    pub kind: ValueKind,
    /// Omit the attribute entirely when the value equals the implicit
    /// `false` default (`revoked`, `defanged`, `summary`).
    #[serde(default)]
    pub skip_false: bool,
}

/// Relation name plus the role pair used to link owner and members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRoles {
    pub relation: String,
    pub owner: String,
    pub pointed: String,
}

impl RelationRoles {
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            owner: "owner".to_string(),
            pointed: "pointed-to".to_string(),
        }
    }
}

/// Key/value map: one node per key, value attributes, one fan-out relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueSpec {
    pub roles: RelationRoles,
    /// Entity type instantiated per key; the key text is its direct value.
    pub key_type: String,
    /// Attribute holding each value.
    pub value_attr: String,
}

/// List of embedded objects: one typed node per element plus a fan-out
/// relation. Element fields recurse through [`FieldMapping`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectListSpec {
    pub roles: RelationRoles,
    pub object: String,
    pub fields: BTreeMap<String, FieldMapping>,
}

/// Reference id(s): match existing nodes by stix-id, relate them to the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSpec {
    pub roles: RelationRoles,
}

/// One embedded object, translated recursively and related to the owner.
/// Also the registry entry type for recognized extension blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedObjectSpec {
    pub object: String,
    pub roles: RelationRoles,
    pub fields: BTreeMap<String, FieldMapping>,
}

/// Closed set of field shapes. Adding a field is a registry entry, not a new
/// branch in translation code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum FieldMapping {
    Property(PropertySpec),
    KeyValue(KeyValueSpec),
    ObjectList(ObjectListSpec),
    /// Digest map restricted to the registry's hash-algorithm table; fixed
    /// `owner`/`pointed-to` roles and relation name `hashes`.
    Hashes,
    Reference(ReferenceSpec),
    NestedObject(NestedObjectSpec),
    /// Map of extension-kind name to nested object, resolved against the
    /// registry's extension table.
    Extensions,
    /// Granular marking list.
    Markings,
    /// Consumed elsewhere (core relation endpoints); no fragment emitted.
    Ignored,
}

/// Endpoint of a first-class relation record (`relationship`, `sighting`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub field: String,
    pub role: String,
}

/// Marks a record kind as instantiating a relation rather than an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSpec {
    pub endpoints: Vec<Endpoint>,
}

/// Everything the translator needs to know about one record kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindSpec {
    /// TypeQL type instantiated for this kind (`relationship` records map to
    /// `stix-core-relationship`).
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationSpec>,
    pub fields: BTreeMap<String, FieldMapping>,
}

/// The process-lifetime mapping table. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaRegistry {
    kinds: BTreeMap<String, KindSpec>,
    extensions: BTreeMap<String, NestedObjectSpec>,
    hash_algorithms: BTreeMap<String, String>,
}

impl SchemaRegistry {
    pub fn new(
        kinds: BTreeMap<String, KindSpec>,
        extensions: BTreeMap<String, NestedObjectSpec>,
        hash_algorithms: BTreeMap<String, String>,
    ) -> Self {
        Self {
            kinds,
            extensions,
            hash_algorithms,
        }
    }

    /// Load from JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, SmelterError> {
        serde_json::from_str(json)
            .map_err(|e| SmelterError::MalformedBatch(format!("invalid registry JSON: {e}")))
    }

    pub fn kind(&self, kind: &str) -> Option<&KindSpec> {
        self.kinds.get(kind)
    }

    pub fn extension(&self, name: &str) -> Option<&NestedObjectSpec> {
        self.extensions.get(name)
    }

    /// TypeQL entity type for a digest algorithm name, if recognized.
    pub fn hash_algorithm(&self, name: &str) -> Option<&str> {
        self.hash_algorithms.get(name).map(String::as_str)
    }

    /// The builtin STIX 2.1 subset.
    pub fn builtin() -> Self {
        builtin::registry()
    }
}

/// Builtin STIX 2.1 mapping subset: the domain/observable kinds and embedded
/// structures the bridge is exercised against. External configuration can
/// replace or extend this wholesale via [`SchemaRegistry::from_json_str`].
mod builtin {
    use super::*;

    fn prop(attr: &str) -> FieldMapping {
        FieldMapping::Property(PropertySpec {
            attr: attr.to_string(),
            kind: ValueKind::Auto,
            skip_false: false,
        })
    }

    fn ts(attr: &str) -> FieldMapping {
        FieldMapping::Property(PropertySpec {
            attr: attr.to_string(),
            kind: ValueKind::Timestamp,
            skip_false: false,
        })
    }

    /// Boolean with an implicit `false` default.
    fn flag(attr: &str) -> FieldMapping {
        FieldMapping::Property(PropertySpec {
            attr: attr.to_string(),
            kind: ValueKind::Auto,
            skip_false: true,
        })
    }

    fn reference(relation: &str) -> FieldMapping {
        FieldMapping::Reference(ReferenceSpec {
            roles: RelationRoles::new(relation),
        })
    }

    fn table(entries: Vec<(&str, FieldMapping)>) -> BTreeMap<String, FieldMapping> {
        entries
            .into_iter()
            .map(|(name, mapping)| (name.to_string(), mapping))
            .collect()
    }

    fn external_references() -> FieldMapping {
        FieldMapping::ObjectList(ObjectListSpec {
            roles: RelationRoles::new("external-references"),
            object: "external-reference".to_string(),
            fields: table(vec![
                ("source_name", prop("source-name")),
                ("description", prop("description")),
                ("url", prop("url")),
                ("external_id", prop("external-id")),
                ("hashes", FieldMapping::Hashes),
            ]),
        })
    }

    fn kill_chain_phases() -> FieldMapping {
        FieldMapping::ObjectList(ObjectListSpec {
            roles: RelationRoles::new("kill-chain-phases"),
            object: "kill-chain-phase".to_string(),
            fields: table(vec![
                ("kill_chain_name", prop("kill-chain-name")),
                ("phase_name", prop("phase-name")),
            ]),
        })
    }

    /// Properties and embedded structures every SDO carries.
    fn sdo_common() -> Vec<(&'static str, FieldMapping)> {
        vec![
            ("type", prop("stix-type")),
            ("spec_version", prop("spec-version")),
            ("id", prop("stix-id")),
            ("created_by_ref", reference("created-by")),
            ("created", ts("created")),
            ("modified", ts("modified")),
            ("revoked", flag("revoked")),
            ("labels", prop("label")),
            ("confidence", prop("confidence")),
            ("lang", prop("lang")),
            ("external_references", external_references()),
            ("object_marking_refs", reference("object-marking")),
            ("granular_markings", FieldMapping::Markings),
        ]
    }

    /// Properties and embedded structures every SCO carries.
    fn sco_common() -> Vec<(&'static str, FieldMapping)> {
        vec![
            ("type", prop("stix-type")),
            ("id", prop("stix-id")),
            ("spec_version", prop("spec-version")),
            ("defanged", flag("defanged")),
            ("object_marking_refs", reference("object-marking")),
            ("granular_markings", FieldMapping::Markings),
            ("extensions", FieldMapping::Extensions),
        ]
    }

    fn entity(
        schema_type: &str,
        mut fields: Vec<(&'static str, FieldMapping)>,
        common: Vec<(&'static str, FieldMapping)>,
    ) -> KindSpec {
        let mut all = common;
        all.append(&mut fields);
        KindSpec {
            schema_type: schema_type.to_string(),
            relation: None,
            fields: table(all),
        }
    }

    fn pe_section() -> ObjectListSpec {
        ObjectListSpec {
            roles: RelationRoles::new("pe-sections"),
            object: "windows-pe-section".to_string(),
            fields: table(vec![
                ("name", prop("name")),
                ("size", prop("size")),
                ("entropy", prop("entropy")),
                ("hashes", FieldMapping::Hashes),
            ]),
        }
    }

    fn pe_optional_header() -> NestedObjectSpec {
        NestedObjectSpec {
            object: "windows-pe-optional-header".to_string(),
            roles: RelationRoles::new("optional-header"),
            fields: table(vec![
                ("magic_hex", prop("magic-hex")),
                ("size_of_code", prop("size-of-code")),
                ("address_of_entry_point", prop("address-of-entry-point")),
                ("checksum_hex", prop("checksum-hex")),
            ]),
        }
    }

    fn extension_table() -> BTreeMap<String, NestedObjectSpec> {
        let mut extensions = BTreeMap::new();
        extensions.insert(
            "archive-ext".to_string(),
            NestedObjectSpec {
                object: "archive-ext".to_string(),
                roles: RelationRoles::new("archive-extension"),
                fields: table(vec![
                    ("comment", prop("comment")),
                    ("contains_refs", reference("contains")),
                ]),
            },
        );
        extensions.insert(
            "ntfs-ext".to_string(),
            NestedObjectSpec {
                object: "ntfs-ext".to_string(),
                roles: RelationRoles::new("ntfs-extension"),
                fields: table(vec![
                    ("sid", prop("sid")),
                    (
                        "alternate_data_streams",
                        FieldMapping::ObjectList(ObjectListSpec {
                            roles: RelationRoles::new("alternate-data-streams"),
                            object: "alternate-data-stream".to_string(),
                            fields: table(vec![
                                ("name", prop("name")),
                                ("size", prop("size")),
                                ("hashes", FieldMapping::Hashes),
                            ]),
                        }),
                    ),
                ]),
            },
        );
        extensions.insert(
            "windows-pebinary-ext".to_string(),
            NestedObjectSpec {
                object: "windows-pebinary-ext".to_string(),
                roles: RelationRoles::new("pebinary-extension"),
                fields: table(vec![
                    ("pe_type", prop("pe-type")),
                    ("imphash", prop("imphash")),
                    ("machine_hex", prop("machine-hex")),
                    ("number_of_sections", prop("number-of-sections")),
                    ("sections", FieldMapping::ObjectList(pe_section())),
                    (
                        "optional_header",
                        FieldMapping::NestedObject(pe_optional_header()),
                    ),
                ]),
            },
        );
        extensions
    }

    fn hash_table() -> BTreeMap<String, String> {
        [
            ("MD5", "md5"),
            ("SHA-1", "sha-1"),
            ("SHA-256", "sha-256"),
            ("SHA-512", "sha-512"),
            ("SHA3-256", "sha3-256"),
            ("SHA3-512", "sha3-512"),
            ("SSDEEP", "ssdeep"),
            ("TLSH", "tlsh"),
        ]
        .into_iter()
        .map(|(name, attr)| (name.to_string(), attr.to_string()))
        .collect()
    }

    pub(super) fn registry() -> SchemaRegistry {
        let mut kinds = BTreeMap::new();

        kinds.insert(
            "indicator".to_string(),
            entity(
                "indicator",
                vec![
                    ("name", prop("name")),
                    ("description", prop("description")),
                    ("indicator_types", prop("indicator-type")),
                    ("pattern", prop("pattern")),
                    ("pattern_type", prop("pattern-type")),
                    ("pattern_version", prop("pattern-version")),
                    ("valid_from", ts("valid-from")),
                    ("valid_until", ts("valid-until")),
                    ("kill_chain_phases", kill_chain_phases()),
                ],
                sdo_common(),
            ),
        );

        kinds.insert(
            "malware".to_string(),
            entity(
                "malware",
                vec![
                    ("name", prop("name")),
                    ("description", prop("description")),
                    ("malware_types", prop("malware-type")),
                    ("is_family", prop("is-family")),
                    ("aliases", prop("alias")),
                    ("first_seen", ts("first-seen")),
                    ("last_seen", ts("last-seen")),
                    ("kill_chain_phases", kill_chain_phases()),
                    ("sample_refs", reference("malware-sample")),
                    ("operating_system_refs", reference("operating-system")),
                ],
                sdo_common(),
            ),
        );

        kinds.insert(
            "attack-pattern".to_string(),
            entity(
                "attack-pattern",
                vec![
                    ("name", prop("name")),
                    ("description", prop("description")),
                    ("aliases", prop("alias")),
                    ("kill_chain_phases", kill_chain_phases()),
                ],
                sdo_common(),
            ),
        );

        kinds.insert(
            "identity".to_string(),
            entity(
                "identity",
                vec![
                    ("name", prop("name")),
                    ("description", prop("description")),
                    ("roles", prop("stix-role")),
                    ("identity_class", prop("identity-class")),
                    ("sectors", prop("sector")),
                    ("contact_information", prop("contact-information")),
                ],
                sdo_common(),
            ),
        );

        kinds.insert(
            "report".to_string(),
            entity(
                "report",
                vec![
                    ("name", prop("name")),
                    ("description", prop("description")),
                    ("report_types", prop("report-type")),
                    ("published", ts("published")),
                    ("object_refs", reference("object-reference")),
                ],
                sdo_common(),
            ),
        );

        kinds.insert(
            "observed-data".to_string(),
            entity(
                "observed-data",
                vec![
                    ("first_observed", ts("first-observed")),
                    ("last_observed", ts("last-observed")),
                    ("number_observed", prop("number-observed")),
                    ("object_refs", reference("object-reference")),
                ],
                sdo_common(),
            ),
        );

        kinds.insert("relationship".to_string(), {
            let mut spec = entity(
                "stix-core-relationship",
                vec![
                    ("relationship_type", prop("relationship-type")),
                    ("description", prop("description")),
                    ("start_time", ts("start-time")),
                    ("stop_time", ts("stop-time")),
                    ("source_ref", FieldMapping::Ignored),
                    ("target_ref", FieldMapping::Ignored),
                ],
                sdo_common(),
            );
            spec.relation = Some(RelationSpec {
                endpoints: vec![
                    Endpoint {
                        field: "source_ref".to_string(),
                        role: "source".to_string(),
                    },
                    Endpoint {
                        field: "target_ref".to_string(),
                        role: "target".to_string(),
                    },
                ],
            });
            spec
        });

        kinds.insert("sighting".to_string(), {
            let mut spec = entity(
                "sighting",
                vec![
                    ("description", prop("description")),
                    ("first_seen", ts("first-seen")),
                    ("last_seen", ts("last-seen")),
                    ("count", prop("count")),
                    ("summary", flag("summary")),
                    ("sighting_of_ref", FieldMapping::Ignored),
                    ("observed_data_refs", FieldMapping::Ignored),
                    ("where_sighted_refs", FieldMapping::Ignored),
                ],
                sdo_common(),
            );
            spec.relation = Some(RelationSpec {
                endpoints: vec![
                    Endpoint {
                        field: "sighting_of_ref".to_string(),
                        role: "sighting-of".to_string(),
                    },
                    Endpoint {
                        field: "observed_data_refs".to_string(),
                        role: "observed".to_string(),
                    },
                    Endpoint {
                        field: "where_sighted_refs".to_string(),
                        role: "where-sighted".to_string(),
                    },
                ],
            });
            spec
        });

        kinds.insert(
            "marking-definition".to_string(),
            KindSpec {
                schema_type: "marking-definition".to_string(),
                relation: None,
                fields: table(vec![
                    ("type", prop("stix-type")),
                    ("spec_version", prop("spec-version")),
                    ("id", prop("stix-id")),
                    ("created", ts("created")),
                    ("created_by_ref", reference("created-by")),
                    ("definition_type", prop("definition-type")),
                    ("name", prop("name")),
                ]),
            },
        );

        kinds.insert(
            "file".to_string(),
            entity(
                "file",
                vec![
                    ("hashes", FieldMapping::Hashes),
                    ("name", prop("name")),
                    ("name_enc", prop("name-enc")),
                    ("size", prop("size")),
                    ("mime_type", prop("mime-type")),
                    ("ctime", ts("ctime")),
                    ("mtime", ts("mtime")),
                    ("atime", ts("atime")),
                    ("magic_number_hex", prop("magic-number-hex")),
                    ("parent_directory_ref", reference("parent-directory")),
                    ("contains_refs", reference("contains")),
                    ("content_ref", reference("content")),
                ],
                sco_common(),
            ),
        );

        kinds.insert(
            "directory".to_string(),
            entity(
                "directory",
                vec![
                    ("path", prop("path")),
                    ("path_enc", prop("path-enc")),
                    ("ctime", ts("ctime")),
                    ("mtime", ts("mtime")),
                    ("atime", ts("atime")),
                    ("contains_refs", reference("contains")),
                ],
                sco_common(),
            ),
        );

        kinds.insert(
            "email-message".to_string(),
            entity(
                "email-message",
                vec![
                    ("is_multipart", prop("is-multipart")),
                    ("date", ts("date")),
                    ("content_type", prop("content-type")),
                    ("subject", prop("subject")),
                    ("message_id", prop("message-id")),
                    ("body", prop("body")),
                    ("from_ref", reference("from-email")),
                    ("sender_ref", reference("sender-email")),
                    ("to_refs", reference("to-email")),
                    ("cc_refs", reference("cc-email")),
                    ("bcc_refs", reference("bcc-email")),
                    (
                        "additional_header_fields",
                        FieldMapping::KeyValue(KeyValueSpec {
                            roles: RelationRoles::new("additional-header"),
                            key_type: "header-key".to_string(),
                            value_attr: "header-value".to_string(),
                        }),
                    ),
                ],
                sco_common(),
            ),
        );

        kinds.insert(
            "ipv4-addr".to_string(),
            entity(
                "ipv4-addr",
                vec![
                    ("value", prop("stix-value")),
                    ("resolves_to_refs", reference("resolves-to")),
                    ("belongs_to_refs", reference("belongs-to")),
                ],
                sco_common(),
            ),
        );

        SchemaRegistry::new(kinds, extension_table(), hash_table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_partitions_properties_and_structural_fields() {
        let registry = SchemaRegistry::builtin();
        let indicator = registry.kind("indicator").unwrap();
        assert!(matches!(
            indicator.fields.get("pattern"),
            Some(FieldMapping::Property(_))
        ));
        assert!(matches!(
            indicator.fields.get("object_marking_refs"),
            Some(FieldMapping::Reference(_))
        ));
        assert!(matches!(
            indicator.fields.get("granular_markings"),
            Some(FieldMapping::Markings)
        ));
    }

    #[test]
    fn relationship_kind_is_a_relation_over_source_and_target() {
        let registry = SchemaRegistry::builtin();
        let spec = registry.kind("relationship").unwrap();
        assert_eq!(spec.schema_type, "stix-core-relationship");
        let relation = spec.relation.as_ref().unwrap();
        let roles: Vec<&str> = relation.endpoints.iter().map(|e| e.role.as_str()).collect();
        assert_eq!(roles, vec!["source", "target"]);
    }

    #[test]
    fn hash_algorithm_lookup_is_closed() {
        let registry = SchemaRegistry::builtin();
        assert_eq!(registry.hash_algorithm("SHA-256"), Some("sha-256"));
        assert_eq!(registry.hash_algorithm("WHIRLPOOL"), None);
    }

    #[test]
    fn registry_round_trips_through_json() {
        let registry = SchemaRegistry::builtin();
        let json = serde_json::to_string(&registry).unwrap();
        let reloaded = SchemaRegistry::from_json_str(&json).unwrap();
        assert_eq!(registry, reloaded);
    }
}

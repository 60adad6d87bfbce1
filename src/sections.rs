//! Non-tabular section content: typed values, versioned storage blobs and
//! the declared field schemas of the three checklist domains.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Version written by this build for every domain.
pub const CURRENT_VERSION: u32 = 2;

// ============================================================================
// Values
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionValue {
    Flag(bool),
    Text(String),
    Choices(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Flag,
    Text,
    Choices,
}

impl SectionValue {
    /// Only truthy values are rendered.
    pub fn is_truthy(&self) -> bool {
        match self {
            SectionValue::Flag(flag) => *flag,
            SectionValue::Text(text) => !text.trim().is_empty(),
            SectionValue::Choices(values) => values.iter().any(|v| !v.trim().is_empty()),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            SectionValue::Flag(_) => FieldKind::Flag,
            SectionValue::Text(_) => FieldKind::Text,
            SectionValue::Choices(_) => FieldKind::Choices,
        }
    }

    /// The value converted to `kind`. Used when old data stored a field
    /// with a different kind than it is declared with now.
    pub fn coerced(&self, kind: FieldKind) -> SectionValue {
        match (kind, self) {
            (FieldKind::Flag, SectionValue::Text(text)) => {
                let text = text.trim().to_lowercase();
                SectionValue::Flag(!matches!(text.as_str(), "" | "nein" | "no" | "false" | "0"))
            }
            (FieldKind::Flag, other) => SectionValue::Flag(other.is_truthy()),
            (FieldKind::Text, SectionValue::Flag(flag)) => {
                SectionValue::Text(if *flag { "ja" } else { "" }.to_string())
            }
            (FieldKind::Text, SectionValue::Choices(values)) => {
                SectionValue::Text(values.join(", "))
            }
            (FieldKind::Choices, SectionValue::Text(text)) => SectionValue::Choices(
                text.split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            (FieldKind::Choices, SectionValue::Flag(_)) => SectionValue::Choices(Vec::new()),
            (_, same) => same.clone(),
        }
    }

    fn from_legacy(value: serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Bool(flag) => Some(SectionValue::Flag(flag)),
            Value::String(text) => Some(SectionValue::Text(text)),
            Value::Number(n) => Some(SectionValue::Text(n.to_string())),
            Value::Array(items) => Some(SectionValue::Choices(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        Value::Null => None,
                        other => Some(other.to_string()),
                    })
                    .collect(),
            )),
            Value::Null | Value::Object(_) => None,
        }
    }
}

/// One labeled fact inside a section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionEntry {
    pub label: String,
    pub value: SectionValue,
}

impl SectionEntry {
    pub fn new(label: &str, value: SectionValue) -> Self {
        Self {
            label: label.to_string(),
            value,
        }
    }
}

/// A heading with its entries in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub entries: Vec<SectionEntry>,
}

// ============================================================================
// Stored Blobs
// ============================================================================

/// Keyed values of one domain, tagged with the schema version they follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredSectionData")]
pub struct SectionData {
    pub version: u32,
    pub values: BTreeMap<String, SectionValue>,
}

impl SectionData {
    pub fn new() -> Self {
        Self {
            version: CURRENT_VERSION,
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&SectionValue> {
        self.values.get(key)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl Default for SectionData {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSectionData {
    Versioned(VersionedBlob),
    /// Flat objects written before blobs carried a version.
    Legacy(BTreeMap<String, serde_json::Value>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct VersionedBlob {
    version: u32,
    values: BTreeMap<String, SectionValue>,
}

impl From<StoredSectionData> for SectionData {
    fn from(stored: StoredSectionData) -> Self {
        match stored {
            StoredSectionData::Versioned(blob) => SectionData {
                version: blob.version,
                values: blob.values,
            },
            StoredSectionData::Legacy(map) => SectionData {
                version: 0,
                values: map
                    .into_iter()
                    .filter_map(|(key, value)| {
                        SectionValue::from_legacy(value).map(|v| (key, v))
                    })
                    .collect(),
            },
        }
    }
}

/// The three section blobs stored per patient.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionBundle {
    #[serde(default)]
    pub therapy_plan: SectionData,
    #[serde(default)]
    pub infusion: SectionData,
    #[serde(default)]
    pub notes: SectionData,
}

impl SectionBundle {
    pub fn get(&self, domain: SectionDomain) -> &SectionData {
        match domain {
            SectionDomain::TherapyPlan => &self.therapy_plan,
            SectionDomain::Infusion => &self.infusion,
            SectionDomain::Notes => &self.notes,
        }
    }

    pub fn get_mut(&mut self, domain: SectionDomain) -> &mut SectionData {
        match domain {
            SectionDomain::TherapyPlan => &mut self.therapy_plan,
            SectionDomain::Infusion => &mut self.infusion,
            SectionDomain::Notes => &mut self.notes,
        }
    }

    /// Bring every blob up to the current schema version.
    pub fn migrated(self) -> Self {
        Self {
            therapy_plan: SectionDomain::TherapyPlan.schema().migrate(self.therapy_plan),
            infusion: SectionDomain::Infusion.schema().migrate(self.infusion),
            notes: SectionDomain::Notes.schema().migrate(self.notes),
        }
    }
}

// ============================================================================
// Schemas
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionDomain {
    TherapyPlan,
    Infusion,
    Notes,
}

impl SectionDomain {
    pub const ALL: [SectionDomain; 3] = [
        SectionDomain::TherapyPlan,
        SectionDomain::Infusion,
        SectionDomain::Notes,
    ];

    /// Storage key.
    pub fn key(&self) -> &'static str {
        match self {
            SectionDomain::TherapyPlan => "therapy_plan",
            SectionDomain::Infusion => "infusion",
            SectionDomain::Notes => "notes",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        SectionDomain::ALL.into_iter().find(|d| d.key() == key)
    }

    pub fn schema(&self) -> &'static SectionSchema {
        match self {
            SectionDomain::TherapyPlan => &THERAPY_PLAN,
            SectionDomain::Infusion => &INFUSION,
            SectionDomain::Notes => &NOTES,
        }
    }
}

#[derive(Debug)]
pub struct FieldDecl {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

#[derive(Debug)]
pub struct SectionDecl {
    pub name: &'static str,
    pub fields: &'static [FieldDecl],
}

/// Key renames applied when moving a blob up to `to_version`.
#[derive(Debug)]
pub struct Migration {
    pub to_version: u32,
    pub renames: &'static [(&'static str, &'static str)],
}

#[derive(Debug)]
pub struct SectionSchema {
    pub domain: SectionDomain,
    /// Title band of the rendered block.
    pub title: &'static str,
    pub sections: &'static [SectionDecl],
    pub migrations: &'static [Migration],
}

impl SectionSchema {
    pub fn field(&self, key: &str) -> Option<&'static FieldDecl> {
        self.sections
            .iter()
            .flat_map(|section| section.fields.iter())
            .find(|field| field.key == key)
    }

    /// Store `value` under a declared key of matching kind.
    pub fn set(&self, data: &mut SectionData, key: &str, value: SectionValue) -> Result<()> {
        let field = self.field(key).ok_or_else(|| {
            Error::Input(format!("{} has no field \"{}\"", self.domain.key(), key))
        })?;
        if field.kind != value.kind() {
            return Err(Error::Input(format!(
                "field \"{}\" expects {:?}, got {:?}",
                key,
                field.kind,
                value.kind()
            )));
        }
        data.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Apply pending renames and convert values to their declared kind.
    /// Keys the schema does not know are kept.
    pub fn migrate(&self, mut data: SectionData) -> SectionData {
        for step in self.migrations {
            if step.to_version <= data.version {
                continue;
            }
            for (from, to) in step.renames {
                if data.values.contains_key(*to) {
                    continue;
                }
                if let Some(value) = data.values.remove(*from) {
                    data.values.insert(to.to_string(), value);
                }
            }
            data.version = step.to_version;
        }

        if data.version > CURRENT_VERSION {
            warn!(
                "{} data has version {}, newer than {}",
                self.domain.key(),
                data.version,
                CURRENT_VERSION
            );
        }
        for (key, value) in data.values.iter_mut() {
            match self.field(key) {
                None => warn!("{}: keeping undeclared key \"{}\"", self.domain.key(), key),
                Some(field) if field.kind != value.kind() => {
                    warn!(
                        "{}: converting \"{}\" from {:?} to {:?}",
                        self.domain.key(),
                        key,
                        value.kind(),
                        field.kind
                    );
                    *value = value.coerced(field.kind);
                }
                Some(_) => {}
            }
        }
        data
    }

    /// Sections with their entries in declaration order.
    pub fn sections(&self, data: &SectionData) -> Vec<Section> {
        self.sections
            .iter()
            .map(|decl| Section {
                name: decl.name.to_string(),
                entries: decl
                    .fields
                    .iter()
                    .filter_map(|field| {
                        data.get(field.key)
                            .map(|value| SectionEntry::new(field.label, value.clone()))
                    })
                    .collect(),
            })
            .collect()
    }
}

const fn flag(key: &'static str, label: &'static str) -> FieldDecl {
    FieldDecl { key, label, kind: FieldKind::Flag }
}

const fn text(key: &'static str, label: &'static str) -> FieldDecl {
    FieldDecl { key, label, kind: FieldKind::Text }
}

const fn choices(key: &'static str, label: &'static str) -> FieldDecl {
    FieldDecl { key, label, kind: FieldKind::Choices }
}

static THERAPY_PLAN: SectionSchema = SectionSchema {
    domain: SectionDomain::TherapyPlan,
    title: "THERAPIEPLAN",
    sections: &[
        SectionDecl {
            name: "Diagnostik",
            fields: &[
                flag("lab_basic", "Basislabor (Blutbild, Mineralstoffe)"),
                flag("micronutrients", "Mikronährstoffanalyse"),
                flag("stool_analysis", "Stuhlanalyse / Darmflora"),
                flag("hormone_status", "Hormonstatus"),
                text("diagnostics_other", "Weitere Diagnostik"),
            ],
        },
        SectionDecl {
            name: "Bewegung",
            fields: &[
                flag("endurance", "Ausdauertraining"),
                flag("strength", "Krafttraining"),
                choices("sports", "Empfohlene Sportarten"),
                text("movement_plan", "Bewegungsplan"),
            ],
        },
        SectionDecl {
            name: "Begleittherapien",
            fields: &[
                choices("therapies", "Therapien"),
                text("therapy_notes", "Hinweise"),
            ],
        },
    ],
    migrations: &[
        Migration {
            to_version: 1,
            renames: &[
                ("Labor", "lab_basic"),
                ("Mikronährstoffe", "micronutrients"),
                ("Darmflora", "stool_analysis"),
                ("Hormone", "hormone_status"),
                ("Bewegung", "movement_plan"),
            ],
        },
        Migration {
            to_version: 2,
            renames: &[("sport", "sports")],
        },
    ],
};

static INFUSION: SectionSchema = SectionSchema {
    domain: SectionDomain::Infusion,
    title: "INFUSIONSTHERAPIE",
    sections: &[
        SectionDecl {
            name: "Infusionen",
            fields: &[
                flag("vitamin_c_high_dose", "Vitamin C hochdosiert"),
                flag("glutathione", "Glutathion"),
                flag("alpha_lipoic_acid", "Alpha-Liponsäure"),
                flag("nad", "NAD+"),
                text("infusion_other", "Weitere Infusionen"),
            ],
        },
        SectionDecl {
            name: "Ablauf",
            fields: &[
                choices("frequency", "Frequenz"),
                text("series_count", "Anzahl Infusionen"),
                text("infusion_notes", "Bemerkungen"),
            ],
        },
    ],
    migrations: &[
        Migration {
            to_version: 1,
            renames: &[
                ("Vitamin C", "vitamin_c_high_dose"),
                ("Glutathion", "glutathione"),
                ("ALA", "alpha_lipoic_acid"),
                ("NAD", "nad"),
            ],
        },
        Migration {
            to_version: 2,
            renames: &[("notes", "infusion_notes")],
        },
    ],
};

static NOTES: SectionSchema = SectionSchema {
    domain: SectionDomain::Notes,
    title: "ERNÄHRUNG & NOTIZEN",
    sections: &[
        SectionDecl {
            name: "Ernährung",
            fields: &[
                choices("diet", "Ernährungsform"),
                flag("gluten_free", "Glutenfrei"),
                flag("lactose_free", "Laktosefrei"),
                text("nutrition_notes", "Hinweise"),
            ],
        },
        SectionDecl {
            name: "Notizen",
            fields: &[text("free_text", "Freitext")],
        },
    ],
    migrations: &[
        Migration {
            to_version: 1,
            renames: &[("Ernährung", "diet"), ("Notizen", "free_text")],
        },
        Migration {
            to_version: 2,
            renames: &[("notes", "nutrition_notes")],
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(SectionValue::Flag(true).is_truthy());
        assert!(!SectionValue::Flag(false).is_truthy());
        assert!(!SectionValue::Text("  ".into()).is_truthy());
        assert!(SectionValue::Text("Yoga".into()).is_truthy());
        assert!(!SectionValue::Choices(vec![]).is_truthy());
        assert!(SectionValue::Choices(vec!["Schwimmen".into()]).is_truthy());
    }

    #[test]
    fn test_versioned_blob_round_trip() {
        let mut data = SectionData::new();
        data.values.insert("endurance".into(), SectionValue::Flag(true));
        data.values.insert(
            "sports".into(),
            SectionValue::Choices(vec!["Radfahren".into(), "Schwimmen".into()]),
        );
        let json = data.to_json().unwrap();
        assert!(json.contains("\"version\":2"));
        assert_eq!(SectionData::from_json(&json).unwrap(), data);
    }

    #[test]
    fn test_legacy_blob_loads_as_version_zero() {
        let json = r#"{
            "Labor": true, "Bewegung": "3x pro Woche", "sport": ["Yoga"], "leer": null, "Anzahl": 10
        }"#;
        let data = SectionData::from_json(json).unwrap();
        assert_eq!(data.version, 0);
        assert_eq!(data.get("Labor"), Some(&SectionValue::Flag(true)));
        assert_eq!(data.get("Anzahl"), Some(&SectionValue::Text("10".into())));
        assert!(data.get("leer").is_none());
    }

    #[test]
    fn test_migration_renames_legacy_keys() {
        let json = r#"{
            "Labor": true, "Bewegung": "3x pro Woche", "sport": ["Yoga"], "Zusatz": "bleibt"
        }"#;
        let data = SectionData::from_json(json).unwrap();
        let migrated = SectionDomain::TherapyPlan.schema().migrate(data);

        assert_eq!(migrated.version, CURRENT_VERSION);
        assert_eq!(migrated.get("lab_basic"), Some(&SectionValue::Flag(true)));
        assert_eq!(
            migrated.get("movement_plan"),
            Some(&SectionValue::Text("3x pro Woche".into()))
        );
        assert_eq!(
            migrated.get("sports"),
            Some(&SectionValue::Choices(vec!["Yoga".into()]))
        );
        // Undeclared keys survive
        assert_eq!(migrated.get("Zusatz"), Some(&SectionValue::Text("bleibt".into())));
    }

    #[test]
    fn test_migration_converts_renamed_values_to_declared_kind() {
        let json = r#"{"Labor": "ja", "Mikronährstoffe": "nein", "sport": "Yoga, Laufen"}"#;
        let data = SectionData::from_json(json).unwrap();
        let schema = SectionDomain::TherapyPlan.schema();
        let migrated = schema.migrate(data);

        assert_eq!(migrated.get("lab_basic"), Some(&SectionValue::Flag(true)));
        assert_eq!(migrated.get("micronutrients"), Some(&SectionValue::Flag(false)));
        assert_eq!(
            migrated.get("sports"),
            Some(&SectionValue::Choices(vec!["Yoga".into(), "Laufen".into()]))
        );
        for (key, value) in &migrated.values {
            if let Some(field) = schema.field(key) {
                assert_eq!(field.kind, value.kind(), "{}", key);
            }
        }
    }

    #[test]
    fn test_migration_never_overwrites_existing_target() {
        let mut data = SectionData::new();
        data.version = 1;
        data.values.insert("sport".into(), SectionValue::Choices(vec!["alt".into()]));
        data.values.insert("sports".into(), SectionValue::Choices(vec!["neu".into()]));
        let migrated = SectionDomain::TherapyPlan.schema().migrate(data);
        assert_eq!(
            migrated.get("sports"),
            Some(&SectionValue::Choices(vec!["neu".into()]))
        );
        assert!(migrated.get("sport").is_some());
    }

    #[test]
    fn test_current_version_is_untouched() {
        let mut data = SectionData::new();
        data.values.insert("notes".into(), SectionValue::Text("x".into()));
        let migrated = SectionDomain::Infusion.schema().migrate(data.clone());
        assert_eq!(migrated, data);
    }

    #[test]
    fn test_set_validates_key_and_kind() {
        let schema = SectionDomain::Notes.schema();
        let mut data = SectionData::new();
        schema
            .set(&mut data, "gluten_free", SectionValue::Flag(true))
            .unwrap();
        assert!(matches!(
            schema.set(&mut data, "gluten_free", SectionValue::Text("ja".into())),
            Err(Error::Input(_))
        ));
        assert!(matches!(
            schema.set(&mut data, "unbekannt", SectionValue::Flag(true)),
            Err(Error::Input(_))
        ));
    }

    #[test]
    fn test_sections_follow_declaration_order() {
        let schema = SectionDomain::TherapyPlan.schema();
        let mut data = SectionData::new();
        // Inserted in reverse; BTreeMap would sort these lexically
        schema
            .set(&mut data, "strength", SectionValue::Flag(true))
            .unwrap();
        schema
            .set(&mut data, "endurance", SectionValue::Flag(true))
            .unwrap();
        schema
            .set(&mut data, "movement_plan", SectionValue::Text("Spaziergänge".into()))
            .unwrap();

        let sections = schema.sections(&data);
        let names: Vec<_> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Diagnostik", "Bewegung", "Begleittherapien"]);

        let labels: Vec<_> = sections[1].entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Ausdauertraining", "Krafttraining", "Bewegungsplan"]);
        assert!(sections[0].entries.is_empty());
    }

    #[test]
    fn test_domain_keys() {
        for domain in SectionDomain::ALL {
            assert_eq!(SectionDomain::parse(domain.key()), Some(domain));
            assert_eq!(domain.schema().domain, domain);
        }
        assert_eq!(SectionDomain::parse("ernaehrung"), None);
    }
}

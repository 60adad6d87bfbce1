//! Patient records, prescription line items and the supplement catalog.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::sections::{Section, SectionBundle, SectionEntry, SectionValue};

/// Default therapy duration in months for new records
pub const DEFAULT_DURATION_MONTHS: u32 = 6;

// ============================================================================
// Patient
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "W")]
    Female,
}

impl Sex {
    pub fn code(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "W",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "M" | "m" => Some(Sex::Male),
            "W" | "w" | "F" | "f" => Some(Sex::Female),
            _ => None,
        }
    }
}

/// Follow-up flags noted at intake.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowUp {
    pub control_appointment: bool,
    pub lab_review: bool,
    pub remarks: String,
}

impl FollowUp {
    pub fn to_section(&self) -> Section {
        Section {
            name: "Verlaufskontrolle".to_string(),
            entries: vec![
                SectionEntry::new(
                    "Kontrolltermin vereinbart",
                    SectionValue::Flag(self.control_appointment),
                ),
                SectionEntry::new(
                    "Laborbesprechung geplant",
                    SectionValue::Flag(self.lab_review),
                ),
                SectionEntry::new("Anmerkungen", SectionValue::Text(self.remarks.clone())),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Unique within the store.
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub height_cm: Option<u32>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub therapy_start: Option<NaiveDate>,
    /// Record-level default for every line item's total dose.
    #[serde(default = "default_duration")]
    pub duration_months: u32,
    /// "TW besprochen?"
    #[serde(default)]
    pub blood_work_discussed: bool,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub diagnoses: String,
    #[serde(default)]
    pub follow_up: FollowUp,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_MONTHS
}

impl PatientRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            birth_date: None,
            sex: None,
            height_cm: None,
            weight_kg: None,
            therapy_start: None,
            duration_months: DEFAULT_DURATION_MONTHS,
            blood_work_discussed: false,
            allergies: String::new(),
            diagnoses: String::new(),
            follow_up: FollowUp::default(),
        }
    }
}

// ============================================================================
// Line Items
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeSlot {
    Fasting,
    Morning,
    Midday,
    Evening,
    Night,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 5] = [
        TimeSlot::Fasting,
        TimeSlot::Morning,
        TimeSlot::Midday,
        TimeSlot::Evening,
        TimeSlot::Night,
    ];

    /// Column header in the rendered table.
    pub fn label(&self) -> &'static str {
        match self {
            TimeSlot::Fasting => "Nüchtern",
            TimeSlot::Morning => "Morgens",
            TimeSlot::Midday => "Mittags",
            TimeSlot::Evening => "Abends",
            TimeSlot::Night => "Nachts",
        }
    }
}

/// Amount taken in one time-of-day slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SlotAmount {
    Half,
    One,
    Two,
    Three,
    Four,
}

impl SlotAmount {
    pub fn code(&self) -> &'static str {
        match self {
            SlotAmount::Half => "1/2",
            SlotAmount::One => "1",
            SlotAmount::Two => "2",
            SlotAmount::Three => "3",
            SlotAmount::Four => "4",
        }
    }

    /// Accepts the stored codes plus the legacy checkbox marker `X`.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "1/2" | "½" | "0.5" => Some(SlotAmount::Half),
            "1" | "X" | "x" => Some(SlotAmount::One),
            "2" => Some(SlotAmount::Two),
            "3" => Some(SlotAmount::Three),
            "4" => Some(SlotAmount::Four),
            _ => None,
        }
    }
}

impl TryFrom<String> for SlotAmount {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SlotAmount::parse(&value).ok_or_else(|| format!("unknown slot amount: {:?}", value))
    }
}

impl From<SlotAmount> for String {
    fn from(amount: SlotAmount) -> Self {
        amount.code().to_string()
    }
}

/// The five intake slots of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub fasting: Option<SlotAmount>,
    pub morning: Option<SlotAmount>,
    pub midday: Option<SlotAmount>,
    pub evening: Option<SlotAmount>,
    pub night: Option<SlotAmount>,
}

impl Schedule {
    pub fn get(&self, slot: TimeSlot) -> Option<SlotAmount> {
        match slot {
            TimeSlot::Fasting => self.fasting,
            TimeSlot::Morning => self.morning,
            TimeSlot::Midday => self.midday,
            TimeSlot::Evening => self.evening,
            TimeSlot::Night => self.night,
        }
    }

    pub fn set(&mut self, slot: TimeSlot, amount: Option<SlotAmount>) {
        let field = match slot {
            TimeSlot::Fasting => &mut self.fasting,
            TimeSlot::Morning => &mut self.morning,
            TimeSlot::Midday => &mut self.midday,
            TimeSlot::Evening => &mut self.evening,
            TimeSlot::Night => &mut self.night,
        };
        *field = amount;
    }

    /// True if any slot holds an amount.
    pub fn is_active(&self) -> bool {
        TimeSlot::ALL.iter().any(|slot| self.get(*slot).is_some())
    }
}

/// One prescribed supplement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub catalog_id: String,
    #[serde(default)]
    pub name: String,
    /// Therapy duration in months for this item.
    pub total_dose: u32,
    #[serde(default)]
    pub delivery_form: String,
    #[serde(default)]
    pub per_intake: String,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub comment: String,
}

impl LineItem {
    /// Only active items are rendered.
    pub fn is_active(&self) -> bool {
        self.schedule.is_active()
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub category: u32,
    #[serde(default)]
    pub category_name: String,
    /// Pre-fills the delivery form of new line items.
    #[serde(default)]
    pub delivery_form: Option<String>,
}

// ============================================================================
// Persisted Units
// ============================================================================

/// Everything stored for one patient, loaded and saved as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub patient: PatientRecord,
    pub items: Vec<LineItem>,
    pub sections: SectionBundle,
    pub revision: i64,
}

/// A therapy plan as exchanged in JSON files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFile {
    pub patient: PatientRecord,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(flatten)]
    pub sections: SectionBundle,
}

//! Draft assignments: candidate pointers from a grid cell to its evidence.

use crate::geometry::BBox;
use serde::{Deserialize, Serialize};

/// Where an assignment claims its evidence lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pointer {
    TextDirectCell { bbox: BBox },
    /// Repeats a column header instead of citing row evidence. Never a
    /// valid terminal form.
    TextEchoHeader { raw_text: String },
    ZoneReference { target_zone_id: String },
}

impl Pointer {
    pub fn kind(&self) -> &'static str {
        match self {
            Pointer::TextDirectCell { .. } => "TEXT_DIRECT_CELL",
            Pointer::TextEchoHeader { .. } => "TEXT_ECHO_HEADER",
            Pointer::ZoneReference { .. } => "ZONE_REFERENCE",
        }
    }

    pub fn is_echo(&self) -> bool {
        matches!(self, Pointer::TextEchoHeader { .. })
    }

    pub fn target_zone(&self) -> Option<&str> {
        match self {
            Pointer::ZoneReference { target_zone_id } => Some(target_zone_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Active,
    ActiveTextDirect,
    Excluded,
    Conditional,
    Undetermined,
    Cut,
}

impl AssignmentStatus {
    pub fn is_active(self) -> bool {
        matches!(
            self,
            AssignmentStatus::Active | AssignmentStatus::ActiveTextDirect
        )
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct AssignmentConfidence {
    #[serde(default)]
    pub row: f64,
    #[serde(default)]
    pub assignment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AtomValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// The literal used for "no cap".
pub const SIN_TOPE: &str = "SIN_TOPE";

impl AtomValue {
    pub fn is_no_cap(&self) -> bool {
        matches!(self, AtomValue::Text(text) if text == SIN_TOPE)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AtomValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Atom {
    #[serde(rename = "type", default)]
    pub atom_type: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: Option<AtomValue>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub parse_confidence: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionKind {
    PrestadorException,
    Modalidad,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionAtom {
    pub kind: ConditionKind,
    pub raw_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<String>>,
}

/// An assignment atom: either a typed value or a condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AtomEntry {
    Condition(ConditionAtom),
    Value(Atom),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub id: String,
    pub row_id: String,
    pub column_id: String,
    pub pointer: Pointer,
    #[serde(default)]
    pub atoms: Vec<AtomEntry>,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub confidence: AssignmentConfidence,
    /// Audit annotations added during validation (e.g. `promoted_echo`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Assignment {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn has_condition_atom(&self) -> bool {
        self.atoms
            .iter()
            .any(|a| matches!(a, AtomEntry::Condition(_)))
    }

    pub fn value_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter().filter_map(|a| match a {
            AtomEntry::Value(atom) => Some(atom),
            AtomEntry::Condition(_) => None,
        })
    }

    /// A value atom that actually cites text: non-empty original text that
    /// parsed with some confidence.
    pub fn has_direct_text_atom(&self) -> bool {
        self.value_atoms()
            .any(|a| !a.original_text.trim().is_empty() && a.parse_confidence > 0.0)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn tag(&mut self, tag: &str) {
        if !self.has_tag(tag) {
            self.tags.push(tag.to_string());
        }
    }
}

//! QC gates.
//!
//! Every check the validators run folds into one named gate whose value is
//! PASS, WARN, or FAIL. A gate only ever gets worse while a run records into
//! it: recording PASS after FAIL leaves FAIL.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
    #[default]
    Pass,
    Warn,
    Fail,
}

impl GateStatus {
    /// The more severe of the two.
    pub fn worst(self, other: GateStatus) -> GateStatus {
        self.max(other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GateStatus::Pass => "PASS",
            GateStatus::Warn => "WARN",
            GateStatus::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named gate outcomes, ordered by gate name for stable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QcGates(BTreeMap<String, GateStatus>);

impl QcGates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a gate at PASS if it is not already present.
    pub fn open(&mut self, gate: &str) {
        self.0.entry(gate.to_string()).or_default();
    }

    /// Record an outcome; the gate keeps the worst outcome seen.
    pub fn record(&mut self, gate: &str, status: GateStatus) {
        let slot = self.0.entry(gate.to_string()).or_default();
        *slot = slot.worst(status);
    }

    /// Overwrite a gate outright. Used when a gate is re-derived from others.
    pub fn set(&mut self, gate: &str, status: GateStatus) {
        self.0.insert(gate.to_string(), status);
    }

    pub fn get(&self, gate: &str) -> Option<GateStatus> {
        self.0.get(gate).copied()
    }

    pub fn status(&self, gate: &str) -> GateStatus {
        self.get(gate).unwrap_or_default()
    }

    pub fn any(&self, status: GateStatus) -> bool {
        self.0.values().any(|s| *s == status)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, GateStatus)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge another gate set into this one, keeping the worst per name.
    pub fn absorb(&mut self, other: &QcGates) {
        for (gate, status) in other.iter() {
            self.record(gate, status);
        }
    }
}

/// Gate names. Part of the audit package contract.
pub mod gate_name {
    // Geometer
    pub const ATOMIC_COLUMNS: &str = "atomic_columns";
    pub const ZONE_TYPE_VALIDITY: &str = "zone_type_validity";
    pub const MIN_CONFIDENCE: &str = "min_confidence";
    pub const ROW_GROUPS_PRESENT: &str = "row_groups_present";
    pub const ZONE_APPLICATION_COMPLETENESS: &str = "zone_application_completeness";
    pub const CONDITION_FLAG_CONSISTENCY: &str = "condition_flag_consistency";

    // Jurist
    pub const ATOMIC_IDS: &str = "atomic_ids";
    pub const UNIQUE_ASSIGNMENT_IDS: &str = "unique_assignment_ids";
    pub const ROW_ID_INTEGRITY: &str = "row_id_integrity";
    pub const COLUMN_BBOX_CONSISTENCY: &str = "column_bbox_consistency";
    pub const UNRESOLVED_OVERLAPS: &str = "unresolved_overlaps";
    pub const CONDITION_ATOMS_PRESENT: &str = "condition_atoms_present";
    pub const PROMOTED_ECHO_DENSITY: &str = "promoted_echo_density";
    pub const SYNTHETIC_GEOMETRY_DENSITY: &str = "synthetic_geometry_density";
    pub const TERMINAL_EVIDENCE: &str = "terminal_evidence";
    pub const ATOM_VALUE_AMBIGUITY: &str = "atom_value_ambiguity";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_worst() {
        let mut gates = QcGates::new();
        gates.record("g", GateStatus::Fail);
        gates.record("g", GateStatus::Pass);
        gates.record("g", GateStatus::Warn);
        assert_eq!(gates.status("g"), GateStatus::Fail);
    }

    #[test]
    fn set_overrides() {
        let mut gates = QcGates::new();
        gates.record("g", GateStatus::Fail);
        gates.set("g", GateStatus::Pass);
        assert_eq!(gates.status("g"), GateStatus::Pass);
    }

    #[test]
    fn serializes_as_flat_sorted_map() {
        let mut gates = QcGates::new();
        gates.open("zeta");
        gates.record("alpha", GateStatus::Warn);
        insta::assert_json_snapshot!(gates, @r###"
        {
          "alpha": "WARN",
          "zeta": "PASS"
        }
        "###);
    }
}

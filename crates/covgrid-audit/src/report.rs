//! Validator reports and the finding accumulator both validators share.

use covgrid_kernel::{GateStatus, QcGates, Severity, Warning};
use serde::{Deserialize, Serialize};

/// Review verdict for a validator run or a whole package.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    #[default]
    Pass,
    Warn,
    NeedsReview,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Pass => "PASS",
            ReviewStatus::Warn => "WARN",
            ReviewStatus::NeedsReview => "NEEDS_REVIEW",
        }
    }

    /// FAIL anywhere needs review; otherwise WARN anywhere warns.
    pub fn from_gates(gates: &QcGates) -> Self {
        if gates.any(GateStatus::Fail) {
            ReviewStatus::NeedsReview
        } else if gates.any(GateStatus::Warn) {
            ReviewStatus::Warn
        } else {
            ReviewStatus::Pass
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gates plus the warnings that moved them.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Findings {
    pub gates: QcGates,
    pub warnings: Vec<Warning>,
}

impl Findings {
    pub fn with_gates(names: &[&str]) -> Self {
        let mut gates = QcGates::new();
        for name in names {
            gates.open(name);
        }
        Self {
            gates,
            warnings: Vec::new(),
        }
    }

    /// Record `warning` and fold `status` into the warning's gate.
    pub fn push(&mut self, status: GateStatus, warning: Warning) {
        if let Some(gate) = warning.gate.as_deref() {
            self.gates.record(gate, status);
        }
        self.warnings.push(warning);
    }

    pub fn fail(
        &mut self,
        warning_type: &str,
        gate: &str,
        refs: Vec<String>,
        message: impl Into<String>,
    ) {
        self.push(
            GateStatus::Fail,
            Warning::error(warning_type, Some(gate), refs, message),
        );
    }

    pub fn warn(
        &mut self,
        warning_type: &str,
        gate: &str,
        refs: Vec<String>,
        message: impl Into<String>,
    ) {
        self.push(
            GateStatus::Warn,
            Warning::warning(warning_type, Some(gate), refs, message),
        );
    }

    /// A finding that leaves every gate untouched.
    pub fn note(&mut self, severity: Severity, warning_type: &str, refs: Vec<String>, message: String) {
        self.warnings
            .push(Warning::new(warning_type, severity, None, refs, message));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneCoverageMetrics {
    /// Rows whose policy is REQUIRE.
    pub expected_rows: usize,
    pub covered_expected_rows: usize,
    /// NONE rows that nonetheless intersect a zone.
    pub unexpected_zone_hits: usize,
    /// `covered_expected_rows / expected_rows`, 1.0 when nothing is expected.
    pub coverage_rate: f64,
    /// Set when the map has no rows, so absence of coverage must be justified.
    pub require_rows_justified_absence: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometerReport {
    pub status: ReviewStatus,
    pub warnings: Vec<Warning>,
    pub gates: QcGates,
    pub zone_coverage_metrics: ZoneCoverageMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JuristReport {
    pub status: ReviewStatus,
    pub warnings: Vec<Warning>,
    pub gates: QcGates,
    pub promoted_echo_count: usize,
    /// Pseudo-zones created from echo pointers.
    pub promoted_zone_count: usize,
    pub synthetic_zone_count: usize,
    pub undetermined_count: usize,
    /// Zones the jurist re-typed to EXCLUSION because their text lists exceptions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zone_upgrades: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use covgrid_kernel::gate_name;

    #[test]
    fn review_status_from_gates() {
        let mut gates = QcGates::new();
        gates.open(gate_name::ATOMIC_IDS);
        assert_eq!(ReviewStatus::from_gates(&gates), ReviewStatus::Pass);
        gates.record(gate_name::ROW_GROUPS_PRESENT, GateStatus::Warn);
        assert_eq!(ReviewStatus::from_gates(&gates), ReviewStatus::Warn);
        gates.record(gate_name::ATOMIC_IDS, GateStatus::Fail);
        assert_eq!(ReviewStatus::from_gates(&gates), ReviewStatus::NeedsReview);
    }

    #[test]
    fn findings_fold_into_named_gate() {
        let mut findings = Findings::with_gates(&[gate_name::ATOMIC_IDS]);
        findings.warn("X", gate_name::ATOMIC_IDS, vec![], "first");
        findings.fail("Y", gate_name::ATOMIC_IDS, vec![], "second");
        findings.warn("Z", gate_name::ATOMIC_IDS, vec![], "third");
        assert_eq!(findings.gates.status(gate_name::ATOMIC_IDS), GateStatus::Fail);
        assert_eq!(findings.warnings.len(), 3);
    }

    #[test]
    fn status_serializes_screaming() {
        assert_eq!(
            serde_json::to_value(ReviewStatus::NeedsReview).unwrap(),
            serde_json::json!("NEEDS_REVIEW")
        );
    }
}

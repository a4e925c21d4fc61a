//! Audit package assembly.
//!
//! Merges the geometer and jurist reports into one package: the spatial map
//! (with jurist zone upgrades applied and pseudo-zones appended), the
//! corrected assignments, every warning, the merged gates, and the overall
//! verdict.

use crate::echo::PROMOTED_ECHO_TAG;
use crate::report::{GeometerReport, JuristReport, ReviewStatus, ZoneCoverageMetrics};
use chrono::{SecondsFormat, Utc};
use covgrid_kernel::{
    Assignment, AssignmentStatus, GateStatus, QcGates, SpatialMap, Warning, Zone, ZoneType,
    gate_name,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Resolution order when several kinds of evidence apply to one cell.
pub const PRECEDENCE_LAW: &str =
    "EXCLUSION > ACTIVE_TEXT_DIRECT > ZONE_GRAPHIC_RULE(ROW_BAND) > ZONE_GRAPHIC_RULE(RECT_FALL)";

/// Version of the audit package contract.
pub const AUDIT_PACKAGE_SPEC_VERSION: &str = "1.0";

/// Caller-supplied provenance for a package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageContext {
    #[serde(default)]
    pub source_document: String,
    #[serde(default)]
    pub page: u32,
    /// RFC 3339 timestamp. Stamped with the current time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub pipeline_version: String,
    pub spec_version: String,
    pub source_document: String,
    pub page: u32,
    pub timestamp: String,
    pub precedence_law: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub overall_status: ReviewStatus,
    pub avg_confidence: f64,
    pub undetermined_count: usize,
    pub conditional_count: usize,
    pub promoted_echo_count: usize,
    pub promoted_zone_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPackage {
    pub metadata: PackageMetadata,
    pub spatial_map: SpatialMap,
    pub assignments: Vec<Assignment>,
    pub warnings: Vec<Warning>,
    pub qc_gates: QcGates,
    pub zone_coverage_metrics: ZoneCoverageMetrics,
    pub quality_metrics: QualityMetrics,
}

impl AuditPackage {
    pub fn status(&self) -> ReviewStatus {
        self.quality_metrics.overall_status
    }
}

pub fn package(
    map: &SpatialMap,
    assignments: Vec<Assignment>,
    geometer: GeometerReport,
    jurist: JuristReport,
    pseudo_zones: Vec<Zone>,
    context: PackageContext,
) -> AuditPackage {
    let mut qc_gates = geometer.gates.clone();
    qc_gates.absorb(&jurist.gates);
    // Column atomicity is only established when both the map's columns and
    // the ids that reference them are atomic.
    let atomic = geometer
        .gates
        .status(gate_name::ATOMIC_COLUMNS)
        .worst(jurist.gates.status(gate_name::ATOMIC_IDS));
    qc_gates.set(gate_name::ATOMIC_COLUMNS, atomic);

    let mut spatial_map = map.clone();
    for zone in spatial_map
        .zones
        .iter_mut()
        .filter(|z| jurist.zone_upgrades.contains(&z.id))
    {
        zone.zone_type = ZoneType::Exclusion;
    }
    spatial_map.zones.extend(pseudo_zones);

    let mut warnings = geometer.warnings;
    warnings.extend(jurist.warnings);

    let undetermined_count = assignments
        .iter()
        .filter(|a| a.status == AssignmentStatus::Undetermined)
        .count();
    let conditional_count = assignments
        .iter()
        .filter(|a| a.status == AssignmentStatus::Conditional)
        .count();
    let promoted_echo_count = assignments
        .iter()
        .filter(|a| a.has_tag(PROMOTED_ECHO_TAG))
        .count();
    let avg_confidence = if assignments.is_empty() {
        0.0
    } else {
        assignments
            .iter()
            .map(|a| a.confidence.assignment)
            .sum::<f64>()
            / assignments.len() as f64
    };

    let overall_status = if qc_gates.any(GateStatus::Fail) || undetermined_count > 0 {
        ReviewStatus::NeedsReview
    } else if conditional_count > 0 || qc_gates.any(GateStatus::Warn) {
        ReviewStatus::Warn
    } else {
        ReviewStatus::Pass
    };

    let metadata = PackageMetadata {
        pipeline_version: env!("CARGO_PKG_VERSION").to_string(),
        spec_version: AUDIT_PACKAGE_SPEC_VERSION.to_string(),
        source_document: context.source_document,
        page: context.page,
        timestamp: context
            .timestamp
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        precedence_law: PRECEDENCE_LAW.to_string(),
    };

    info!(
        status = %overall_status,
        assignments = assignments.len(),
        warnings = warnings.len(),
        undetermined = undetermined_count,
        "audit package assembled"
    );

    AuditPackage {
        metadata,
        spatial_map,
        assignments,
        warnings,
        qc_gates,
        zone_coverage_metrics: geometer.zone_coverage_metrics,
        quality_metrics: QualityMetrics {
            overall_status,
            avg_confidence,
            undetermined_count,
            conditional_count,
            promoted_echo_count,
            promoted_zone_count: jurist.promoted_zone_count,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> PackageContext {
        PackageContext {
            source_document: "plan.pdf".to_string(),
            page: 3,
            timestamp: Some("2026-01-01T00:00:00Z".to_string()),
        }
    }

    fn assignment(id: &str, status: &str, confidence: f64) -> Assignment {
        serde_json::from_value(json!({
            "id": id, "row_id": "R1", "column_id": "C1",
            "pointer": {"type": "TEXT_DIRECT_CELL", "bbox": [0, 0, 1, 1]},
            "status": status,
            "confidence": {"row": 1.0, "assignment": confidence}
        }))
        .unwrap()
    }

    #[test]
    fn atomic_columns_folds_in_atomic_ids() {
        let mut jurist = JuristReport::default();
        jurist.gates.record(gate_name::ATOMIC_IDS, GateStatus::Fail);
        let mut geometer = GeometerReport::default();
        geometer.gates.open(gate_name::ATOMIC_COLUMNS);

        let pkg = package(
            &SpatialMap::default(),
            Vec::new(),
            geometer,
            jurist,
            Vec::new(),
            context(),
        );
        assert_eq!(pkg.qc_gates.status(gate_name::ATOMIC_COLUMNS), GateStatus::Fail);
        assert_eq!(pkg.qc_gates.status(gate_name::ATOMIC_IDS), GateStatus::Fail);
        assert_eq!(pkg.status(), ReviewStatus::NeedsReview);
    }

    #[test]
    fn conditional_assignment_warns() {
        let pkg = package(
            &SpatialMap::default(),
            vec![assignment("A1", "CONDITIONAL", 0.8), assignment("A2", "ACTIVE", 0.6)],
            GeometerReport::default(),
            JuristReport::default(),
            Vec::new(),
            context(),
        );
        let metrics = &pkg.quality_metrics;
        assert_eq!(metrics.overall_status, ReviewStatus::Warn);
        assert_eq!(metrics.conditional_count, 1);
        assert!((metrics.avg_confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn metadata_carries_provenance_and_precedence() {
        let pkg = package(
            &SpatialMap::default(),
            Vec::new(),
            GeometerReport::default(),
            JuristReport::default(),
            Vec::new(),
            context(),
        );
        assert_eq!(pkg.status(), ReviewStatus::Pass);
        assert_eq!(pkg.metadata.pipeline_version, env!("CARGO_PKG_VERSION"));
        let metadata = PackageMetadata {
            pipeline_version: "[version]".to_string(),
            ..pkg.metadata
        };
        insta::assert_json_snapshot!(metadata, @r###"
        {
          "pipeline_version": "[version]",
          "spec_version": "1.0",
          "source_document": "plan.pdf",
          "page": 3,
          "timestamp": "2026-01-01T00:00:00Z",
          "precedence_law": "EXCLUSION > ACTIVE_TEXT_DIRECT > ZONE_GRAPHIC_RULE(ROW_BAND) > ZONE_GRAPHIC_RULE(RECT_FALL)"
        }
        "###);
    }

    #[test]
    fn missing_timestamp_is_stamped() {
        let pkg = package(
            &SpatialMap::default(),
            Vec::new(),
            GeometerReport::default(),
            JuristReport::default(),
            Vec::new(),
            PackageContext::default(),
        );
        assert!(chrono::DateTime::parse_from_rfc3339(&pkg.metadata.timestamp).is_ok());
    }

    #[test]
    fn zone_upgrades_and_pseudo_zones_land_in_the_map() {
        let map: SpatialMap = serde_json::from_value(json!({
            "columns": [],
            "zones": [{"id": "Z1", "zone_type": "GRAPHIC_RULE"}]
        }))
        .unwrap();
        let jurist = JuristReport {
            zone_upgrades: vec!["Z1".to_string()],
            promoted_zone_count: 1,
            ..JuristReport::default()
        };
        let pseudo: Zone =
            serde_json::from_value(json!({"id": "PZ_A1", "zone_type": "GRAPHIC_RULE"})).unwrap();
        let pkg = package(
            &map,
            Vec::new(),
            GeometerReport::default(),
            jurist,
            vec![pseudo],
            context(),
        );
        assert_eq!(pkg.spatial_map.zones.len(), 2);
        assert_eq!(pkg.spatial_map.zones[0].zone_type, ZoneType::Exclusion);
        assert_eq!(pkg.quality_metrics.promoted_zone_count, 1);
    }
}

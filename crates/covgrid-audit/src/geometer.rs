//! Structural validation of the spatial map.
//!
//! The geometer never looks at assignments. It checks that columns are
//! atomic, zones are well typed and confident enough, and that each row's
//! zone requirement (REQUIRE / NONE / ALLOW) is met.

use crate::config::AuditRules;
use crate::report::{Findings, GeometerReport, ReviewStatus, ZoneCoverageMetrics};
use covgrid_kernel::geometry;
use covgrid_kernel::{
    GateStatus, Row, RowZonePolicy, SpatialMap, Warning, ZoneRequirement, ZoneType, gate_name,
    warning_type,
};
use regex::Regex;
use tracing::{debug, warn};

const GEOMETER_GATES: &[&str] = &[
    gate_name::ATOMIC_COLUMNS,
    gate_name::ZONE_TYPE_VALIDITY,
    gate_name::MIN_CONFIDENCE,
    gate_name::ROW_GROUPS_PRESENT,
    gate_name::ZONE_APPLICATION_COMPLETENESS,
    gate_name::CONDITION_FLAG_CONSISTENCY,
];

pub fn validate(map: &SpatialMap, rules: &AuditRules) -> GeometerReport {
    let mut findings = Findings::with_gates(GEOMETER_GATES);

    check_atomic_columns(map, rules, &mut findings);
    check_zone_types(map, &mut findings);
    check_zone_confidence(map, rules, &mut findings);
    check_row_groups(map, &mut findings);
    let zone_coverage_metrics = check_zone_application(map, &mut findings);
    check_condition_flags(map, rules, &mut findings);

    let status = ReviewStatus::from_gates(&findings.gates);
    debug!(
        status = %status,
        warnings = findings.warnings.len(),
        coverage_rate = zone_coverage_metrics.coverage_rate,
        "geometer finished"
    );
    GeometerReport {
        status,
        warnings: findings.warnings,
        gates: findings.gates,
        zone_coverage_metrics,
    }
}

fn check_atomic_columns(map: &SpatialMap, rules: &AuditRules, findings: &mut Findings) {
    for column in &map.columns {
        if rules.is_merged_id(&column.id) {
            findings.fail(
                warning_type::NON_ATOMIC_COLUMN,
                gate_name::ATOMIC_COLUMNS,
                vec![column.id.clone()],
                format!(
                    "column {} merges more than one logical column; split it upstream",
                    column.id
                ),
            );
        }
    }

    for (i, a) in map.columns.iter().enumerate() {
        for b in &map.columns[i + 1..] {
            if geometry::overlaps(&a.x_range, &b.x_range) {
                findings.fail(
                    warning_type::OVERLAPPING_COLUMNS,
                    gate_name::ATOMIC_COLUMNS,
                    vec![a.id.clone(), b.id.clone()],
                    format!("columns {} and {} share horizontal extent", a.id, b.id),
                );
            }
        }
    }
}

fn check_zone_types(map: &SpatialMap, findings: &mut Findings) {
    for zone in &map.zones {
        if let ZoneType::Other(raw) = &zone.zone_type {
            findings.fail(
                warning_type::INVALID_ZONE_TYPE,
                gate_name::ZONE_TYPE_VALIDITY,
                vec![zone.id.clone()],
                format!(
                    "zone {} has type {raw:?}; expected GRAPHIC_RULE, EXCLUSION or CUT",
                    zone.id
                ),
            );
        }
    }
}

fn check_zone_confidence(map: &SpatialMap, rules: &AuditRules, findings: &mut Findings) {
    let floor = rules.policy.min_zone_confidence;
    for zone in map.zones.iter().filter(|z| !z.synthetic_geometry) {
        if zone.confidence.geometry < floor {
            findings.fail(
                warning_type::LOW_ZONE_CONFIDENCE,
                gate_name::MIN_CONFIDENCE,
                vec![zone.id.clone()],
                format!(
                    "zone {} geometry confidence {:.2} is below {floor:.2}",
                    zone.id, zone.confidence.geometry
                ),
            );
        }
    }
}

fn check_row_groups(map: &SpatialMap, findings: &mut Findings) {
    if map.row_groups.as_ref().is_none_or(Vec::is_empty) {
        findings.push(
            GateStatus::Warn,
            Warning::info(
                warning_type::ROW_GROUPS_MISSING,
                Some(gate_name::ROW_GROUPS_PRESENT),
                Vec::new(),
                "no row groups declared; grouping is informational only",
            ),
        );
    }
}

/// Compiled row-zone policy. Rules whose pattern does not compile are
/// reported and skipped.
struct CompiledPolicy {
    default: ZoneRequirement,
    rules: Vec<(Regex, ZoneRequirement)>,
}

impl CompiledPolicy {
    fn compile(policy: Option<&RowZonePolicy>, findings: &mut Findings) -> Self {
        let Some(policy) = policy else {
            return Self {
                default: ZoneRequirement::Allow,
                rules: Vec::new(),
            };
        };
        let mut rules = Vec::with_capacity(policy.rules.len());
        for rule in &policy.rules {
            match Regex::new(&rule.pattern) {
                Ok(re) => rules.push((re, rule.policy)),
                Err(err) => {
                    warn!(pattern = %rule.pattern, error = %err, "skipping row policy rule");
                    findings.warn(
                        warning_type::INVALID_POLICY_PATTERN,
                        gate_name::ZONE_APPLICATION_COMPLETENESS,
                        vec![rule.pattern.clone()],
                        format!("row policy pattern {:?} does not compile: {err}", rule.pattern),
                    );
                }
            }
        }
        Self {
            default: policy.default,
            rules,
        }
    }

    fn requirement(&self, row_id: &str) -> ZoneRequirement {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(row_id))
            .map(|(_, requirement)| *requirement)
            .unwrap_or(self.default)
    }
}

/// Zones that count as coverage for `row`: anything but EXCLUSION that
/// intersects it.
fn covering_zones<'a>(map: &'a SpatialMap, row: &'a Row) -> impl Iterator<Item = &'a str> + 'a {
    map.zones
        .iter()
        .filter(move |z| z.zone_type != ZoneType::Exclusion && z.intersects_row(row))
        .map(|z| z.id.as_str())
}

fn check_zone_application(map: &SpatialMap, findings: &mut Findings) -> ZoneCoverageMetrics {
    let mut metrics = ZoneCoverageMetrics::default();

    if map.rows.is_empty() {
        metrics.coverage_rate = 1.0;
        metrics.require_rows_justified_absence = true;
        findings.warn(
            warning_type::NO_ROWS,
            gate_name::ZONE_APPLICATION_COMPLETENESS,
            Vec::new(),
            "spatial map has no rows; zone coverage cannot be evaluated",
        );
        return metrics;
    }

    let policy = CompiledPolicy::compile(map.row_zone_policy.as_ref(), findings);
    for row in &map.rows {
        let covering: Vec<&str> = covering_zones(map, row).collect();
        match policy.requirement(&row.id) {
            ZoneRequirement::Require => {
                metrics.expected_rows += 1;
                if covering.is_empty() {
                    findings.fail(
                        warning_type::MISSING_REQUIRED_ZONE,
                        gate_name::ZONE_APPLICATION_COMPLETENESS,
                        vec![row.id.clone()],
                        format!("row {} requires a zone but none intersects it", row.id),
                    );
                } else {
                    metrics.covered_expected_rows += 1;
                }
            }
            ZoneRequirement::NoZone => {
                if !covering.is_empty() {
                    metrics.unexpected_zone_hits += 1;
                    let mut refs = vec![row.id.clone()];
                    refs.extend(covering.iter().map(|id| id.to_string()));
                    findings.warn(
                        warning_type::UNEXPECTED_ZONE,
                        gate_name::ZONE_APPLICATION_COMPLETENESS,
                        refs,
                        format!(
                            "row {} expects no zone but intersects {}",
                            row.id,
                            covering.join(", ")
                        ),
                    );
                }
            }
            ZoneRequirement::Allow => {}
        }
    }

    metrics.coverage_rate = if metrics.expected_rows == 0 {
        1.0
    } else {
        metrics.covered_expected_rows as f64 / metrics.expected_rows as f64
    };
    metrics
}

fn check_condition_flags(map: &SpatialMap, rules: &AuditRules, findings: &mut Findings) {
    for zone in &map.zones {
        if !zone.has_conditions && rules.is_exception_text(zone.text()) {
            findings.fail(
                warning_type::CONDITION_FLAG_MISSING,
                gate_name::CONDITION_FLAG_CONSISTENCY,
                vec![zone.id.clone()],
                format!(
                    "zone {} text lists exceptions or providers but has_conditions is false",
                    zone.id
                ),
            );
        }
    }
}

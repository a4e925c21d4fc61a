//! Assignment validation and self-correction.
//!
//! The jurist checks draft assignments against the spatial map in a fixed
//! order of stages, each folding into one or more gates:
//!
//! 1. atomicity and uniqueness of ids
//! 2. row id integrity
//! 3. bbox midpoint vs. declared column
//! 4. overlap groups (several active assignments on one cell)
//! 5. exception zones: upgrade to EXCLUSION, require condition atoms
//! 6. header-band echo promotion (policy gated) and its density
//! 7. echo → pseudo-zone conversion and synthetic geometry density
//! 8. terminal evidence, including ghost rules (zone references with no zone)
//! 9. atom value ambiguity
//!
//! It corrects what it can (zone types, echo pointers, overlap statuses) and
//! fails the rest. It never picks a winner among overlapping assignments.

use crate::config::{AuditRules, HeaderBandPolicy};
use crate::echo::{self, FallbackCursor, PROMOTED_ECHO_TAG};
use crate::report::{Findings, JuristReport, ReviewStatus};
use covgrid_kernel::geometry;
use covgrid_kernel::normalize::unit;
use covgrid_kernel::{
    Assignment, AssignmentStatus, GateStatus, Pointer, Severity, SpatialMap, Zone, ZoneType,
    gate_name, warning_type,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

pub const OVERLAP_TAG: &str = "overlap";

const JURIST_GATES: &[&str] = &[
    gate_name::ATOMIC_IDS,
    gate_name::UNIQUE_ASSIGNMENT_IDS,
    gate_name::ROW_ID_INTEGRITY,
    gate_name::COLUMN_BBOX_CONSISTENCY,
    gate_name::UNRESOLVED_OVERLAPS,
    gate_name::CONDITION_ATOMS_PRESENT,
    gate_name::PROMOTED_ECHO_DENSITY,
    gate_name::SYNTHETIC_GEOMETRY_DENSITY,
    gate_name::TERMINAL_EVIDENCE,
    gate_name::ATOM_VALUE_AMBIGUITY,
];

/// Jurist output: the report plus the corrected assignment set and the
/// pseudo-zones that now back former echo pointers.
#[derive(Debug, Clone, PartialEq)]
pub struct JuristOutcome {
    pub report: JuristReport,
    pub assignments: Vec<Assignment>,
    pub pseudo_zones: Vec<Zone>,
}

pub fn validate(
    assignments: &[Assignment],
    map: &SpatialMap,
    header_band: Option<&HeaderBandPolicy>,
    rules: &AuditRules,
) -> JuristOutcome {
    let mut findings = Findings::with_gates(JURIST_GATES);
    let mut fixed = assignments.to_vec();

    check_ids(&fixed, rules, &mut findings);
    check_row_ids(&fixed, map, &mut findings);
    check_bbox_columns(&fixed, map, rules, &mut findings);
    resolve_overlaps(&mut fixed, &mut findings);
    let zone_upgrades = check_exception_zones(&fixed, map, rules, &mut findings);
    let promoted_echo_count = promote_header_band(&mut fixed, header_band, rules, &mut findings);

    let mut cursor = FallbackCursor::below(map, rules.policy.fallback_row_height);
    let conversion = echo::convert_echoes(&mut fixed, map, rules, &mut cursor, &mut findings);
    check_synthetic_density(fixed.len(), conversion.synthetic_count, rules, &mut findings);

    check_terminal_evidence(&fixed, map, &conversion.pseudo_zones, &mut findings);
    check_atom_values(&fixed, rules, &mut findings);

    let undetermined_count = fixed
        .iter()
        .filter(|a| a.status == AssignmentStatus::Undetermined)
        .count();
    let status = if findings.gates.any(GateStatus::Fail) || undetermined_count > 0 {
        ReviewStatus::NeedsReview
    } else {
        ReviewStatus::Pass
    };

    debug!(
        status = %status,
        assignments = fixed.len(),
        promoted = promoted_echo_count,
        pseudo_zones = conversion.pseudo_zones.len(),
        undetermined = undetermined_count,
        "jurist finished"
    );

    JuristOutcome {
        report: JuristReport {
            status,
            warnings: findings.warnings,
            gates: findings.gates,
            promoted_echo_count,
            promoted_zone_count: conversion.pseudo_zones.len(),
            synthetic_zone_count: conversion.synthetic_count,
            undetermined_count,
            zone_upgrades,
        },
        assignments: fixed,
        pseudo_zones: conversion.pseudo_zones,
    }
}

// Stage 1
fn check_ids(assignments: &[Assignment], rules: &AuditRules, findings: &mut Findings) {
    let mut reported_columns = BTreeSet::new();
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();

    for assignment in assignments {
        if rules.is_merged_id(&assignment.id) {
            findings.fail(
                warning_type::NON_ATOMIC_ID,
                gate_name::ATOMIC_IDS,
                vec![assignment.id.clone()],
                format!("assignment id {} encodes a merged column", assignment.id),
            );
        }
        if rules.is_merged_id(&assignment.column_id)
            && reported_columns.insert(assignment.column_id.as_str())
        {
            findings.fail(
                warning_type::NON_ATOMIC_ID,
                gate_name::ATOMIC_IDS,
                vec![assignment.column_id.clone()],
                format!(
                    "assignments target merged column id {}",
                    assignment.column_id
                ),
            );
        }
        *seen.entry(assignment.id.as_str()).or_default() += 1;
    }

    for (id, count) in seen.into_iter().filter(|(_, count)| *count > 1) {
        findings.fail(
            warning_type::DUPLICATE_ASSIGNMENT_ID,
            gate_name::UNIQUE_ASSIGNMENT_IDS,
            vec![id.to_string()],
            format!("assignment id {id} appears {count} times"),
        );
    }
}

// Stage 2
fn check_row_ids(assignments: &[Assignment], map: &SpatialMap, findings: &mut Findings) {
    for assignment in assignments {
        if map.row(&assignment.row_id).is_none() {
            findings.fail(
                warning_type::ROW_NOT_FOUND,
                gate_name::ROW_ID_INTEGRITY,
                vec![assignment.id.clone(), assignment.row_id.clone()],
                format!(
                    "assignment {} names row {} which is not in the spatial map",
                    assignment.id, assignment.row_id
                ),
            );
        }
    }
}

// Stage 3
fn check_bbox_columns(
    assignments: &[Assignment],
    map: &SpatialMap,
    rules: &AuditRules,
    findings: &mut Findings,
) {
    let epsilon = rules.policy.bbox_epsilon;
    for assignment in assignments {
        let Pointer::TextDirectCell { bbox } = &assignment.pointer else {
            continue;
        };
        let mid = geometry::bbox_x_mid(bbox);

        let Some(declared) = map.column(&assignment.column_id) else {
            findings.fail(
                warning_type::UNKNOWN_COLUMN,
                gate_name::COLUMN_BBOX_CONSISTENCY,
                vec![assignment.id.clone(), assignment.column_id.clone()],
                format!(
                    "assignment {} names column {} which is not in the spatial map",
                    assignment.id, assignment.column_id
                ),
            );
            continue;
        };
        if geometry::contains(&declared.x_range, mid, epsilon) {
            continue;
        }

        let actual = map
            .column_at(mid, 0.0)
            .or_else(|| map.column_at(mid, epsilon));
        match actual {
            Some(actual) => findings.fail(
                warning_type::COLUMN_BBOX_MISMATCH,
                gate_name::COLUMN_BBOX_CONSISTENCY,
                vec![
                    assignment.id.clone(),
                    declared.id.clone(),
                    actual.id.clone(),
                ],
                format!(
                    "assignment {} declares column {} but its bbox midpoint x={mid:.1} lies in column {}",
                    assignment.id, declared.id, actual.id
                ),
            ),
            None => findings.fail(
                warning_type::BBOX_OUTSIDE_COLUMNS,
                gate_name::COLUMN_BBOX_CONSISTENCY,
                vec![assignment.id.clone(), declared.id.clone()],
                format!(
                    "assignment {} bbox midpoint x={mid:.1} lies outside every column",
                    assignment.id
                ),
            ),
        }
    }
}

// Stage 4
fn resolve_overlaps(assignments: &mut [Assignment], findings: &mut Findings) {
    let mut cells: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for (idx, assignment) in assignments.iter().enumerate() {
        if assignment.is_active() {
            cells
                .entry((assignment.row_id.clone(), assignment.column_id.clone()))
                .or_default()
                .push(idx);
        }
    }

    for ((row_id, column_id), members) in cells.into_iter().filter(|(_, m)| m.len() > 1) {
        let ids: Vec<String> = members.iter().map(|&i| assignments[i].id.clone()).collect();
        warn!(row = %row_id, column = %column_id, members = ?ids, "unresolved overlap");
        findings.fail(
            warning_type::UNRESOLVED_OVERLAP,
            gate_name::UNRESOLVED_OVERLAPS,
            ids.clone(),
            format!(
                "cell ({row_id}, {column_id}) has {} active assignments: {}",
                ids.len(),
                ids.join(", ")
            ),
        );
        for idx in members {
            let assignment = &mut assignments[idx];
            assignment.status = AssignmentStatus::Undetermined;
            assignment.tag(OVERLAP_TAG);
        }
    }
}

// Stage 5
fn check_exception_zones(
    assignments: &[Assignment],
    map: &SpatialMap,
    rules: &AuditRules,
    findings: &mut Findings,
) -> Vec<String> {
    let exception_zones: BTreeSet<&str> = map
        .zones
        .iter()
        .filter(|z| rules.is_exception_text(z.text()))
        .map(|z| z.id.as_str())
        .collect();

    let mut upgrades = Vec::new();
    for zone in map
        .zones
        .iter()
        .filter(|z| exception_zones.contains(z.id.as_str()) && z.zone_type != ZoneType::Exclusion)
    {
        info!(zone = %zone.id, from = ?zone.zone_type, "zone type upgraded to EXCLUSION");
        findings.note(
            Severity::Info,
            warning_type::ZONE_TYPE_UPGRADED,
            vec![zone.id.clone()],
            format!(
                "zone {} lists exceptions; type upgraded from {:?} to EXCLUSION",
                zone.id, zone.zone_type
            ),
        );
        upgrades.push(zone.id.clone());
    }

    for assignment in assignments {
        let Some(target) = assignment.pointer.target_zone() else {
            continue;
        };
        if exception_zones.contains(target) && !assignment.has_condition_atom() {
            findings.fail(
                warning_type::MISSING_CONDITION_ATOM,
                gate_name::CONDITION_ATOMS_PRESENT,
                vec![assignment.id.clone(), target.to_string()],
                format!(
                    "assignment {} references exception zone {target} but carries no condition atom",
                    assignment.id
                ),
            );
        }
    }

    upgrades
}

// Stage 6
fn promote_header_band(
    assignments: &mut [Assignment],
    header_band: Option<&HeaderBandPolicy>,
    rules: &AuditRules,
    findings: &mut Findings,
) -> usize {
    let Some(band) = header_band else {
        return 0;
    };

    // Cells of an unresolved overlap group stay blocked even though their
    // members were downgraded by the overlap stage.
    let mut occupied: BTreeSet<(String, String)> = assignments
        .iter()
        .filter(|a| (a.is_active() && !a.pointer.is_echo()) || a.has_tag(OVERLAP_TAG))
        .map(|a| (a.row_id.clone(), a.column_id.clone()))
        .collect();

    let mut promoted = 0;
    for assignment in assignments
        .iter_mut()
        .filter(|a| a.pointer.is_echo() && !a.has_tag(OVERLAP_TAG))
    {
        if assignment.confidence.row < band.min_row_confidence
            || assignment.confidence.assignment < band.min_assignment_confidence
        {
            continue;
        }
        let cell = (assignment.row_id.clone(), assignment.column_id.clone());
        if occupied.contains(&cell) {
            findings.note(
                Severity::Warning,
                warning_type::ECHO_PROMOTION_BLOCKED,
                vec![assignment.id.clone()],
                format!(
                    "echo on assignment {} not promoted: cell ({}, {}) already has an active assignment",
                    assignment.id, cell.0, cell.1
                ),
            );
            continue;
        }

        assignment.status = AssignmentStatus::Active;
        assignment.tag(PROMOTED_ECHO_TAG);
        occupied.insert(cell);
        promoted += 1;
        findings.note(
            Severity::Info,
            warning_type::ECHO_PROMOTED,
            vec![assignment.id.clone()],
            format!(
                "echo on assignment {} promoted to ACTIVE (row {:.2}, assignment {:.2})",
                assignment.id, assignment.confidence.row, assignment.confidence.assignment
            ),
        );
    }

    let limit = rules.policy.promotion_density_limit;
    if promoted > limit {
        findings.fail(
            warning_type::PROMOTION_DENSITY_EXCEEDED,
            gate_name::PROMOTED_ECHO_DENSITY,
            Vec::new(),
            format!("{promoted} echoes promoted; more than {limit} needs review"),
        );
    } else if promoted > 0 {
        findings.gates.record(gate_name::PROMOTED_ECHO_DENSITY, GateStatus::Warn);
    }
    promoted
}

// Stage 7 (density half; conversion lives in `echo`)
fn check_synthetic_density(
    total: usize,
    synthetic: usize,
    rules: &AuditRules,
    findings: &mut Findings,
) {
    if total == 0 || synthetic == 0 {
        return;
    }
    let density = synthetic as f64 / total as f64;
    let limit = rules.policy.synthetic_density_limit;
    if density > limit {
        findings.fail(
            warning_type::SYNTHETIC_DENSITY_EXCEEDED,
            gate_name::SYNTHETIC_GEOMETRY_DENSITY,
            Vec::new(),
            format!(
                "{synthetic} of {total} assignments rely on synthetic geometry ({:.0}% > {:.0}%)",
                density * 100.0,
                limit * 100.0
            ),
        );
    }
}

// Stage 8
fn check_terminal_evidence(
    assignments: &[Assignment],
    map: &SpatialMap,
    pseudo_zones: &[Zone],
    findings: &mut Findings,
) {
    let known_zones: BTreeSet<&str> = map
        .zones
        .iter()
        .chain(pseudo_zones)
        .map(|z| z.id.as_str())
        .collect();

    for assignment in assignments {
        match &assignment.pointer {
            Pointer::TextEchoHeader { .. } => findings.fail(
                warning_type::ECHO_TERMINAL,
                gate_name::TERMINAL_EVIDENCE,
                vec![assignment.id.clone()],
                format!(
                    "assignment {} still cites a header echo as its evidence",
                    assignment.id
                ),
            ),
            Pointer::ZoneReference { target_zone_id } => {
                if !known_zones.contains(target_zone_id.as_str()) {
                    findings.fail(
                        warning_type::DANGLING_ZONE_REFERENCE,
                        gate_name::TERMINAL_EVIDENCE,
                        vec![assignment.id.clone(), target_zone_id.clone()],
                        format!(
                            "assignment {} references unknown zone {target_zone_id}",
                            assignment.id
                        ),
                    );
                } else if assignment.is_active() && !assignment.has_direct_text_atom() {
                    findings.warn(
                        warning_type::WEAK_EVIDENCE,
                        gate_name::TERMINAL_EVIDENCE,
                        vec![assignment.id.clone(), target_zone_id.clone()],
                        format!(
                            "assignment {} is active on zone {target_zone_id} without a direct-text atom",
                            assignment.id
                        ),
                    );
                }
            }
            Pointer::TextDirectCell { .. } => {}
        }
    }
}

// Stage 9
fn check_atom_values(assignments: &[Assignment], rules: &AuditRules, findings: &mut Findings) {
    for assignment in assignments {
        for atom in assignment.value_atoms() {
            if atom.value.is_none() && !unit::is_trivial(&atom.unit) {
                findings.fail(
                    warning_type::AMBIGUOUS_ATOM_VALUE,
                    gate_name::ATOM_VALUE_AMBIGUITY,
                    vec![assignment.id.clone()],
                    format!(
                        "atom {:?} on assignment {} has unit {} but no value",
                        atom.key, assignment.id, atom.unit
                    ),
                );
            }
            if rules.is_copay_atom(&atom.atom_type) {
                let tokens = rules.unit_tokens_in(&atom.original_text);
                if tokens.len() > 1 {
                    findings.fail(
                        warning_type::MIXED_UNIT_ATOM,
                        gate_name::ATOM_VALUE_AMBIGUITY,
                        vec![assignment.id.clone()],
                        format!(
                            "copay atom {:?} on assignment {} mixes units {}",
                            atom.original_text,
                            assignment.id,
                            tokens.join(", ")
                        ),
                    );
                }
            }
        }
    }
}

//! Echo pointers to pseudo-zones.
//!
//! A `TEXT_ECHO_HEADER` pointer cites a header band rather than the cell, so
//! it is never terminal evidence. Every echo is converted into a
//! `ZONE_REFERENCE` backed by a generated graphic-rule zone whose geometry is
//! taken from the assignment's column and row. Echo text that lists
//! exceptions yields an EXCLUSION zone instead, and the assignment must then
//! carry a condition atom. When the row is unknown the
//! y-band comes from an explicit [`FallbackCursor`] and the zone is marked
//! synthetic.

use crate::config::AuditRules;
use crate::report::Findings;
use covgrid_kernel::geometry::Span;
use covgrid_kernel::{
    Assignment, AssignmentStatus, GeometricScope, Pointer, ScopeMode, Severity, SpatialMap, Zone,
    ZoneConfidence, ZoneType, gate_name, warning_type,
};
use std::collections::BTreeSet;
use tracing::{debug, info};

pub const PROMOTED_ECHO_TAG: &str = "promoted_echo";
pub const ECHO_CONVERTED_TAG: &str = "echo_converted";
pub const PSEUDO_ZONE_PREFIX: &str = "PZ_";

/// Allocates y-bands for pseudo-zones whose row has no known geometry.
///
/// Bands are stacked below the lowest known row, one row height apart, in
/// the order they are requested. The cursor is owned by a single jurist run.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackCursor {
    next_y: f64,
    row_height: f64,
}

impl FallbackCursor {
    pub fn new(origin_y: f64, row_height: f64) -> Self {
        Self {
            next_y: origin_y,
            row_height,
        }
    }

    pub fn below(map: &SpatialMap, row_height: f64) -> Self {
        Self::new(map.rows_bottom().unwrap_or(0.0), row_height)
    }

    pub fn advance(&mut self) -> Span {
        let band = [self.next_y, self.next_y + self.row_height];
        self.next_y += self.row_height;
        band
    }
}

/// Result of converting every echo in an assignment set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EchoConversion {
    pub pseudo_zones: Vec<Zone>,
    pub synthetic_count: usize,
}

/// Convert every echo pointer in `assignments` into a zone reference.
///
/// Promoted echoes (tagged by the header-band stage) keep their status.
/// An echo that was not promoted cannot stay active on header evidence and
/// is downgraded to UNDETERMINED.
pub(crate) fn convert_echoes(
    assignments: &mut [Assignment],
    map: &SpatialMap,
    rules: &AuditRules,
    cursor: &mut FallbackCursor,
    findings: &mut Findings,
) -> EchoConversion {
    let mut taken: BTreeSet<String> = map.zones.iter().map(|z| z.id.clone()).collect();
    let mut out = EchoConversion::default();

    for assignment in assignments.iter_mut() {
        let Pointer::TextEchoHeader { raw_text } = &assignment.pointer else {
            continue;
        };
        let raw_text = raw_text.clone();

        if !assignment.has_tag(PROMOTED_ECHO_TAG) && assignment.is_active() {
            assignment.status = AssignmentStatus::Undetermined;
            findings.note(
                Severity::Warning,
                warning_type::ECHO_NOT_PROMOTED,
                vec![assignment.id.clone()],
                format!(
                    "assignment {} was active on header echo {raw_text:?} without promotion; downgraded to UNDETERMINED",
                    assignment.id
                ),
            );
        }

        let (y_range, synthetic) = match map.row(&assignment.row_id) {
            Some(row) => (row.y_range, false),
            None => (cursor.advance(), true),
        };
        let x_range = map.column(&assignment.column_id).map(|c| c.x_range);
        let zone_id = unique_zone_id(&assignment.id, &mut taken);
        let geometry_confidence = if synthetic {
            rules.policy.synthetic_zone_confidence
        } else {
            rules.policy.anchored_zone_confidence
        };

        let exception = rules.is_exception_text(&raw_text);
        if exception {
            info!(zone = %zone_id, "pseudo-zone lists exceptions; created as EXCLUSION");
            findings.note(
                Severity::Info,
                warning_type::ZONE_TYPE_UPGRADED,
                vec![assignment.id.clone(), zone_id.clone()],
                format!(
                    "pseudo-zone {zone_id} lists exceptions; type upgraded from GraphicRule to EXCLUSION"
                ),
            );
            if !assignment.has_condition_atom() {
                findings.fail(
                    warning_type::MISSING_CONDITION_ATOM,
                    gate_name::CONDITION_ATOMS_PRESENT,
                    vec![assignment.id.clone(), zone_id.clone()],
                    format!(
                        "assignment {} references exception zone {zone_id} but carries no condition atom",
                        assignment.id
                    ),
                );
            }
        }

        let zone = Zone {
            id: zone_id.clone(),
            zone_type: if exception {
                ZoneType::Exclusion
            } else {
                ZoneType::GraphicRule
            },
            scope_mode: ScopeMode::RectFall,
            geometric_scope: GeometricScope {
                x_range,
                y_range: Some(y_range),
            },
            has_conditions: exception,
            contains_text: Some(raw_text),
            confidence: ZoneConfidence {
                geometry: geometry_confidence,
                text: assignment.confidence.assignment,
            },
            applies_to_columns: vec![assignment.column_id.clone()],
            synthetic_geometry: synthetic,
        };

        if synthetic {
            out.synthetic_count += 1;
            findings.note(
                Severity::Warning,
                warning_type::SYNTHETIC_GEOMETRY,
                vec![assignment.id.clone(), zone_id.clone()],
                format!(
                    "row {} has no geometry; pseudo-zone {zone_id} uses fallback band {:?}",
                    assignment.row_id, y_range
                ),
            );
            debug!(zone = %zone_id, y0 = y_range[0], y1 = y_range[1], "synthetic pseudo-zone band");
        }

        assignment.pointer = Pointer::ZoneReference {
            target_zone_id: zone_id.clone(),
        };
        assignment.tag(ECHO_CONVERTED_TAG);
        findings.note(
            Severity::Info,
            warning_type::ECHO_CONVERTED,
            vec![assignment.id.clone(), zone_id.clone()],
            format!(
                "echo on assignment {} converted to zone reference {zone_id}",
                assignment.id
            ),
        );
        info!(assignment = %assignment.id, zone = %zone_id, synthetic, "echo converted to pseudo-zone");
        out.pseudo_zones.push(zone);
    }

    out
}

fn unique_zone_id(assignment_id: &str, taken: &mut BTreeSet<String>) -> String {
    let base = format!("{PSEUDO_ZONE_PREFIX}{assignment_id}");
    let mut candidate = base.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{base}_{n}");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

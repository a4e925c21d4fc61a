//! # covgrid audit
//!
//! Validates an extracted benefits grid before anything downstream trusts
//! it. Two validators run over the same inputs and a packager merges them:
//!
//! ```text
//! SpatialMap ──► geometer::validate ──► GeometerReport ─┐
//!     │                                                 ├─► packager::package ──► AuditPackage
//!     └──┬──► jurist::validate ──► JuristOutcome ───────┘
//! Assignments     (corrected assignments + pseudo-zones)
//! ```
//!
//! Nothing here fails on bad content: every defect becomes a warning and a
//! gate outcome. Errors are reserved for unusable configuration.

pub mod config;
pub mod echo;
pub mod geometer;
pub mod jurist;
pub mod packager;
pub mod report;

pub use config::{AuditConfigError, AuditPolicy, AuditRules, HeaderBandPolicy};
pub use echo::{EchoConversion, FallbackCursor};
pub use jurist::JuristOutcome;
pub use packager::{
    AuditPackage, PRECEDENCE_LAW, PackageContext, PackageMetadata, QualityMetrics, package,
};
pub use report::{GeometerReport, JuristReport, ReviewStatus, ZoneCoverageMetrics};

use covgrid_kernel::{Assignment, SpatialMap};

/// Run the geometer, the jurist, and the packager over one page.
///
/// Header-band promotion follows `rules.policy.header_band`.
pub fn audit(
    map: &SpatialMap,
    assignments: &[Assignment],
    rules: &AuditRules,
    context: PackageContext,
) -> AuditPackage {
    let geometer = geometer::validate(map, rules);
    let outcome = jurist::validate(assignments, map, rules.policy.header_band.as_ref(), rules);
    package(
        map,
        outcome.assignments,
        geometer,
        outcome.report,
        outcome.pseudo_zones,
        context,
    )
}

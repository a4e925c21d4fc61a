use crate::support::{
    audit_rules_or_exit, load_config_or_exit, print_json_or_exit, print_warnings,
    read_json_file_or_exit,
};
use covgrid_audit::{AuditPackage, PackageContext, ReviewStatus, audit};
use covgrid_kernel::{Assignment, SpatialMap};

pub struct Args {
    pub spatial_map: String,
    pub assignments: String,
    pub config: Option<String>,
    pub source_document: String,
    pub page: u32,
    pub timestamp: Option<String>,
    pub allow_review: bool,
    pub json: bool,
}

pub fn run(args: Args) {
    let config = load_config_or_exit(args.config.as_deref());
    let rules = audit_rules_or_exit(config.audit);
    let map: SpatialMap = read_json_file_or_exit(&args.spatial_map, "spatial map");
    let assignments: Vec<Assignment> = read_json_file_or_exit(&args.assignments, "assignments");

    let package = audit(
        &map,
        &assignments,
        &rules,
        PackageContext {
            source_document: args.source_document,
            page: args.page,
            timestamp: args.timestamp,
        },
    );

    if args.json {
        print_json_or_exit(&package, "audit package");
    } else {
        print_human_summary(&package);
    }

    if package.status() != ReviewStatus::Pass && !args.allow_review {
        std::process::exit(1);
    }
}

fn print_human_summary(package: &AuditPackage) {
    let metrics = &package.quality_metrics;
    println!("covgrid audit");
    if !package.metadata.source_document.is_empty() {
        println!(
            "  Source: {} (page {})",
            package.metadata.source_document, package.metadata.page
        );
    }
    println!("  Status: {}", metrics.overall_status);
    println!("  Assignments: {}", package.assignments.len());
    println!(
        "  Undetermined: {}  Conditional: {}",
        metrics.undetermined_count, metrics.conditional_count
    );
    println!(
        "  Promoted echoes: {}  Promoted zones: {}",
        metrics.promoted_echo_count, metrics.promoted_zone_count
    );
    println!("  Avg confidence: {:.3}", metrics.avg_confidence);
    println!(
        "  Zone coverage: {}/{} ({:.2})",
        package.zone_coverage_metrics.covered_expected_rows,
        package.zone_coverage_metrics.expected_rows,
        package.zone_coverage_metrics.coverage_rate
    );
    println!("  Gates:");
    for (name, status) in package.qc_gates.iter() {
        println!("    - {name}: {status}");
    }
    print_warnings(&package.warnings);
}

use crate::support::{
    audit_rules_or_exit, load_config_or_exit, print_json_or_exit, print_warnings,
    read_json_file_or_exit,
};
use covgrid_audit::{ReviewStatus, geometer};
use covgrid_kernel::SpatialMap;

pub fn run(spatial_map: String, config: Option<String>, allow_review: bool, json_output: bool) {
    let config = load_config_or_exit(config.as_deref());
    let rules = audit_rules_or_exit(config.audit);
    let map: SpatialMap = read_json_file_or_exit(&spatial_map, "spatial map");

    let report = geometer::validate(&map, &rules);

    if json_output {
        print_json_or_exit(&report, "geometer report");
    } else {
        println!("covgrid geometer");
        println!(
            "  Map: {} columns, {} rows, {} zones",
            map.columns.len(),
            map.rows.len(),
            map.zones.len()
        );
        println!("  Status: {}", report.status);
        println!("  Gates:");
        for (name, status) in report.gates.iter() {
            println!("    - {name}: {status}");
        }
        print_warnings(&report.warnings);
    }

    if report.status != ReviewStatus::Pass && !allow_review {
        std::process::exit(1);
    }
}

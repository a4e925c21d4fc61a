use serde_json::{Value, json};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "covgrid-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write_json(&self, name: &str, value: &Value) -> String {
        let path = self.path.join(name);
        fs::write(&path, serde_json::to_vec_pretty(value).expect("fixture serializes"))
            .expect("fixture should be written");
        path.to_string_lossy().into_owned()
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_covgrid<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_covgrid");
    Command::new(bin)
        .args(args)
        .output()
        .expect("covgrid command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn spatial_map() -> Value {
    json!({
        "columns": [
            {"id": "COL_PRESTACION", "x_range": [0, 100]},
            {"id": "COL_PREF_PCT", "x_range": [100, 160]},
            {"id": "COL_LE_PCT", "x_range": [160, 220]}
        ],
        "rows": [
            {"id": "R_DIA_CAMA", "y_range": [100, 112], "raw_text": "Día cama"},
            {"id": "R_HONORARIOS", "y_range": [112, 124], "raw_text": "Honorarios"}
        ],
        "zones": [],
        "row_groups": [{"id": "G_HOSP", "row_ids": ["R_DIA_CAMA", "R_HONORARIOS"]}]
    })
}

fn direct(id: &str, row: &str, column: &str, x: [f64; 2]) -> Value {
    json!({
        "id": id,
        "row_id": row,
        "column_id": column,
        "pointer": {"type": "TEXT_DIRECT_CELL", "bbox": [x[0], 100.0, x[1], 112.0]},
        "atoms": [{"type": "PORCENTAJE", "key": "pct", "value": 90.0, "unit": "PCT",
                   "original_text": "90%", "parse_confidence": 1.0}],
        "status": "ACTIVE_TEXT_DIRECT",
        "confidence": {"row": 0.95, "assignment": 0.93}
    })
}

#[test]
fn audit_clean_page_json() {
    let tmp = TempDirGuard::new("audit-clean");
    let map = tmp.write_json("map.json", &spatial_map());
    let assignments = tmp.write_json(
        "assignments.json",
        &json!([
            direct("A1", "R_DIA_CAMA", "COL_PREF_PCT", [110.0, 150.0]),
            direct("A2", "R_DIA_CAMA", "COL_LE_PCT", [170.0, 210.0]),
        ]),
    );

    let output = run_covgrid([
        "audit",
        map.as_str(),
        assignments.as_str(),
        "--source-document",
        "plan.pdf",
        "--page",
        "3",
        "--timestamp",
        "2026-01-01T00:00:00Z",
        "--json",
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["quality_metrics"]["overall_status"], "PASS");
    assert_eq!(payload["metadata"]["source_document"], "plan.pdf");
    assert_eq!(payload["metadata"]["page"], 3);
    assert_eq!(payload["metadata"]["timestamp"], "2026-01-01T00:00:00Z");
    assert_eq!(payload["qc_gates"]["unresolved_overlaps"], "PASS");
    assert_eq!(payload["assignments"].as_array().map(Vec::len), Some(2));
}

#[test]
fn audit_overlap_needs_review_and_exits_nonzero() {
    let tmp = TempDirGuard::new("audit-overlap");
    let map = tmp.write_json("map.json", &spatial_map());
    let assignments = tmp.write_json(
        "assignments.json",
        &json!([
            direct("A1", "R_DIA_CAMA", "COL_PREF_PCT", [110.0, 150.0]),
            direct("A2", "R_DIA_CAMA", "COL_PREF_PCT", [112.0, 148.0]),
        ]),
    );

    let strict = run_covgrid(["audit", map.as_str(), assignments.as_str(), "--json"]);
    assert_failure(&strict);
    let payload = parse_json_stdout(&strict);
    assert_eq!(payload["quality_metrics"]["overall_status"], "NEEDS_REVIEW");
    assert_eq!(payload["qc_gates"]["unresolved_overlaps"], "FAIL");

    let lenient = run_covgrid([
        "audit",
        map.as_str(),
        assignments.as_str(),
        "--allow-review",
    ]);
    assert_success(&lenient);
    let text = String::from_utf8_lossy(&lenient.stdout);
    assert!(text.contains("Status: NEEDS_REVIEW"), "{text}");
    assert!(text.contains("UNRESOLVED_OVERLAP"), "{text}");
}

#[test]
fn geometer_reports_gates() {
    let tmp = TempDirGuard::new("geometer");
    let mut map = spatial_map();
    map["columns"][2]["x_range"] = json!([150, 220]);
    let map = tmp.write_json("map.json", &map);

    let output = run_covgrid(["geometer", map.as_str(), "--json", "--allow-review"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["status"], "NEEDS_REVIEW");
    assert_eq!(payload["gates"]["atomic_columns"], "FAIL");
}

#[test]
fn normalize_reads_units() {
    let output = run_covgrid(["normalize", "16,0 UF", "--key", "tope", "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    let atom = &payload["atoms"][0];
    assert_eq!(atom["value"], 16.0);
    assert_eq!(atom["unit"], "UF");
    assert_eq!(atom["key"], "tope");

    let rejected = run_covgrid(["normalize", "50 XP", "--json"]);
    assert_success(&rejected);
    let payload = parse_json_stdout(&rejected);
    assert_eq!(payload["atoms"][0]["unit"], "UNKNOWN");
    assert_eq!(payload["atoms"][0]["parse_confidence"], 0.0);
    assert!(!payload["warnings"].as_array().expect("warnings array").is_empty());
}

#[test]
fn canonize_keeps_cut_preferente_latent() {
    let tmp = TempDirGuard::new("canonize");
    let blocks = tmp.write_json(
        "blocks.json",
        &json!([
            {"id": "B1", "text": "90% Clínica Alemana", "column": 1, "row_id": "R1", "segment_id": "S1"},
            {"id": "B2", "text": "Sólo libre elección", "column": 1, "row_id": "R1", "segment_id": "S1"},
            {"id": "B3", "text": "Sin tope", "column": 4, "row_id": "R1", "segment_id": "S1"},
            {"id": "C1", "text": "Tope 5 UF", "column": 2, "row_id": "R2"}
        ]),
    );

    let output = run_covgrid(["canonize", blocks.as_str(), "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    let rows = payload.as_array().expect("rows array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["row_id"], "R1");
    assert_eq!(rows[0]["state"]["inheritance_cut"], true);
    assert_eq!(
        rows[0]["state"]["latent_options"][0]["reason"],
        "HERENCIA_CORTADA"
    );

    let only_r2 = run_covgrid(["canonize", blocks.as_str(), "--row", "R2", "--json"]);
    assert_success(&only_r2);
    let payload = parse_json_stdout(&only_r2);
    assert_eq!(payload.as_array().map(Vec::len), Some(1));

    let missing = run_covgrid(["canonize", blocks.as_str(), "--row", "R9"]);
    assert_failure(&missing);
}

#[test]
fn canonize_uses_supplied_options() {
    let tmp = TempDirGuard::new("canonize-options");
    let blocks = tmp.write_json(
        "blocks.json",
        &json!([
            {"id": "B1", "text": "Sólo libre elección", "column": 0, "row_id": "R1", "segment_id": "S1"}
        ]),
    );
    let options = tmp.write_json(
        "options.json",
        &json!([
            {"id": "custom", "modality": "preferente", "scopes": ["PORCENTAJE"], "percentage": 90.0}
        ]),
    );

    let output = run_covgrid([
        "canonize",
        blocks.as_str(),
        "--row",
        "R1",
        "--options",
        options.as_str(),
        "--json",
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    let row = &payload[0];
    assert_eq!(row["graph"]["options"].as_array().map(Vec::len), Some(1));
    assert_eq!(row["state"]["latent_options"][0]["option_id"], "custom");
    assert_eq!(
        row["state"]["latent_options"][0]["reason"],
        "HERENCIA_CORTADA"
    );

    let without_row = run_covgrid(["canonize", blocks.as_str(), "--options", options.as_str()]);
    assert_failure(&without_row);
}

#[test]
fn invalid_config_is_rejected() {
    let tmp = TempDirGuard::new("config");
    let config = tmp.path().join("covgrid.toml");
    fs::write(&config, "[audit]\nexception_pattern = \"(\"\n").expect("config written");
    let map = tmp.write_json("map.json", &spatial_map());

    let output = run_covgrid([
        OsStr::new("geometer"),
        OsStr::new(&map),
        OsStr::new("--config"),
        config.as_os_str(),
    ]);
    assert_failure(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: invalid audit policy"), "{stderr}");
}

#[test]
fn missing_input_file_fails_cleanly() {
    let output = run_covgrid(["geometer", "/nonexistent/covgrid-map.json"]);
    assert_failure(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: failed to load spatial map"), "{stderr}");
}

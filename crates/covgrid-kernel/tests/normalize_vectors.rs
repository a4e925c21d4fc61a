//! Integration tests: normalizer literal vectors.
//!
//! Each vector is a raw token and the value/unit/confidence the normalizer
//! must produce for it, plus the idempotence check: normalizing an atom's
//! own `original_text` again yields the same atom.

use covgrid_kernel::normalize::{normalize, normalize_atom, unit};
use covgrid_kernel::{AtomValue, Severity};
use serde_json::{Value, json};

fn vectors() -> Vec<(&'static str, Value, &'static str, f64)> {
    vec![
        ("16,0 UF", json!(16.0), "UF", 1.0),
        ("Sin Tope", json!("SIN_TOPE"), "NONE", 1.0),
        ("60 VAM", json!(60.0), "VAM", 1.0),
        ("2,0 AC2", json!(2.0), "AC2", 1.0),
        ("1.5 V.A.", json!(1.5), "VA", 1.0),
        ("90%", json!(90.0), "PCT", 1.0),
        ("Sólo libre elección", json!(false), "EXCLUSION", 1.0),
        ("50 XP", json!("50 XP"), "UNKNOWN", 0.0),
    ]
}

#[test]
fn literal_vectors() {
    for (raw, value, expected_unit, confidence) in vectors() {
        let (atom, _) = normalize_atom(raw, "vector");
        assert_eq!(
            serde_json::to_value(&atom.value).unwrap(),
            value,
            "value for {raw:?}"
        );
        assert_eq!(atom.unit, expected_unit, "unit for {raw:?}");
        assert_eq!(atom.parse_confidence, confidence, "confidence for {raw:?}");
        assert_eq!(atom.original_text, raw.trim());
    }
}

#[test]
fn normalizing_original_text_is_idempotent() {
    for (raw, ..) in vectors() {
        let (first, _) = normalize_atom(raw, "vector");
        let (second, _) = normalize_atom(&first.original_text, "vector");
        assert_eq!(first, second, "idempotence for {raw:?}");
    }
}

#[test]
fn partial_unit_is_rejected_with_warning() {
    let out = normalize("50 XP", "copago");
    assert_eq!(out.atoms.len(), 1);
    let atom = &out.atoms[0];
    assert_eq!(atom.unit, unit::UNKNOWN);
    assert_eq!(atom.parse_confidence, 0.0);
    assert_eq!(atom.value, Some(AtomValue::Text("50 XP".to_string())));

    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].severity, Severity::Warning);
    assert!(out.warnings[0].is("UNPARSEABLE_TOKEN"));
    assert!(out.warnings[0].mentions("copago"));
}

#[test]
fn no_cap_beats_numeric_forms() {
    // Literal order is fixed: the no-cap phrase is checked first.
    let (atom, _) = normalize_atom("  sin   tope ", "k");
    assert!(atom.value.as_ref().is_some_and(AtomValue::is_no_cap));
    assert_eq!(atom.original_text, "sin   tope");
}

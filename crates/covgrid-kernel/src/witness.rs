//! Structured warnings with deterministic witness identifiers.
//!
//! Every validation finding is a [`Warning`]. Its `warning_id` depends only on
//! the finding's semantic key, so two runs over the same input produce the
//! same ids and two audit packages can be diffed finding by finding.
//!
//! Algorithm:
//! 1. Build canonical key `{schema: 1, type, gate, refs}` (refs sorted)
//! 2. Serialize with sorted keys and no whitespace (RFC 8785 style)
//! 3. warning_id = "w1_" || base32hex_lower(SHA256(keyBytes))

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One validation finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Warning {
    /// Finding class, e.g. `UNRESOLVED_OVERLAP`.
    #[serde(rename = "type")]
    pub warning_type: String,

    /// Human-readable description, surfaced verbatim to the reviewer.
    pub message: String,

    pub severity: Severity,

    /// The gate this finding folds into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,

    /// Ids of the assignments, zones, rows or columns concerned (sorted).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<String>,

    #[serde(default)]
    pub warning_id: String,
}

impl Warning {
    pub fn new(
        warning_type: impl Into<String>,
        severity: Severity,
        gate: Option<&str>,
        refs: Vec<String>,
        message: impl Into<String>,
    ) -> Self {
        let warning_type = warning_type.into();
        let mut refs = refs;
        refs.sort();
        refs.dedup();
        let warning_id = compute_warning_id(&warning_type, gate, &refs);
        Self {
            warning_type,
            message: message.into(),
            severity,
            gate: gate.map(String::from),
            refs,
            warning_id,
        }
    }

    pub fn info(
        warning_type: impl Into<String>,
        gate: Option<&str>,
        refs: Vec<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(warning_type, Severity::Info, gate, refs, message)
    }

    pub fn warning(
        warning_type: impl Into<String>,
        gate: Option<&str>,
        refs: Vec<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(warning_type, Severity::Warning, gate, refs, message)
    }

    pub fn error(
        warning_type: impl Into<String>,
        gate: Option<&str>,
        refs: Vec<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(warning_type, Severity::Error, gate, refs, message)
    }

    pub fn is(&self, warning_type: &str) -> bool {
        self.warning_type == warning_type
    }

    pub fn mentions(&self, id: &str) -> bool {
        self.refs.iter().any(|r| r == id)
    }
}

/// Compute a warning id from the canonical key fields.
pub fn compute_warning_id(warning_type: &str, gate: Option<&str>, refs: &[String]) -> String {
    let key = canonical_warning_key(warning_type, gate, refs);
    let hash = Sha256::digest(jcs_serialize_value(&key));
    format!("w1_{}", base32hex_lower_no_pad(&hash))
}

fn canonical_warning_key(warning_type: &str, gate: Option<&str>, refs: &[String]) -> Value {
    let mut map = serde_json::Map::new();
    map.insert("schema".to_string(), Value::Number(1.into()));
    map.insert("type".to_string(), Value::String(warning_type.to_string()));
    map.insert(
        "gate".to_string(),
        gate.map(|g| Value::String(g.to_string()))
            .unwrap_or(Value::Null),
    );
    map.insert(
        "refs".to_string(),
        Value::Array(refs.iter().cloned().map(Value::String).collect()),
    );
    Value::Object(map)
}

/// Canonical serialization: sorted keys, no whitespace.
///
/// Keys are only ever strings, integers, and arrays of strings, so plain
/// serde_json escaping covers everything else RFC 8785 asks for.
fn jcs_serialize_value(value: &Value) -> Vec<u8> {
    match value {
        Value::Array(arr) => {
            let mut buf = vec![b'['];
            for (i, v) in arr.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                buf.extend_from_slice(&jcs_serialize_value(v));
            }
            buf.push(b']');
            buf
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut buf = vec![b'{'];
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                buf.extend_from_slice(json_string(key).as_bytes());
                buf.push(b':');
                buf.extend_from_slice(&jcs_serialize_value(&map[*key]));
            }
            buf.push(b'}');
            buf
        }
        Value::String(s) => json_string(s).into_bytes(),
        other => other.to_string().into_bytes(),
    }
}

fn json_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// RFC 4648 base32hex encoding, lowercase, without padding.
fn base32hex_lower_no_pad(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuv";

    let mut result = String::new();
    let mut bits: u64 = 0;
    let mut num_bits: u32 = 0;

    for &byte in data {
        bits = (bits << 8) | (byte as u64);
        num_bits += 8;
        while num_bits >= 5 {
            num_bits -= 5;
            let idx = ((bits >> num_bits) & 0x1f) as usize;
            result.push(ALPHABET[idx] as char);
        }
    }
    if num_bits > 0 {
        let idx = ((bits << (5 - num_bits)) & 0x1f) as usize;
        result.push(ALPHABET[idx] as char);
    }

    result
}

/// Warning classes, grouped by the taxonomy reviewers triage with.
pub mod warning_type {
    // structural
    pub const NON_ATOMIC_COLUMN: &str = "NON_ATOMIC_COLUMN";
    pub const OVERLAPPING_COLUMNS: &str = "OVERLAPPING_COLUMNS";
    pub const NON_ATOMIC_ID: &str = "NON_ATOMIC_ID";
    pub const DUPLICATE_ASSIGNMENT_ID: &str = "DUPLICATE_ASSIGNMENT_ID";
    pub const INVALID_ZONE_TYPE: &str = "INVALID_ZONE_TYPE";
    pub const LOW_ZONE_CONFIDENCE: &str = "LOW_ZONE_CONFIDENCE";
    pub const ROW_GROUPS_MISSING: &str = "ROW_GROUPS_MISSING";
    pub const MISSING_REQUIRED_ZONE: &str = "MISSING_REQUIRED_ZONE";
    pub const UNEXPECTED_ZONE: &str = "UNEXPECTED_ZONE";
    pub const NO_ROWS: &str = "NO_ROWS";
    pub const INVALID_POLICY_PATTERN: &str = "INVALID_POLICY_PATTERN";
    pub const CONDITION_FLAG_MISSING: &str = "CONDITION_FLAG_MISSING";

    // geometric
    pub const ROW_NOT_FOUND: &str = "ROW_NOT_FOUND";
    pub const COLUMN_BBOX_MISMATCH: &str = "COLUMN_BBOX_MISMATCH";
    pub const BBOX_OUTSIDE_COLUMNS: &str = "BBOX_OUTSIDE_COLUMNS";
    pub const UNKNOWN_COLUMN: &str = "UNKNOWN_COLUMN";

    // evidentiary
    pub const ZONE_TYPE_UPGRADED: &str = "ZONE_TYPE_UPGRADED";
    pub const MISSING_CONDITION_ATOM: &str = "MISSING_CONDITION_ATOM";
    pub const ECHO_PROMOTED: &str = "ECHO_PROMOTED";
    pub const ECHO_PROMOTION_BLOCKED: &str = "ECHO_PROMOTION_BLOCKED";
    pub const ECHO_NOT_PROMOTED: &str = "ECHO_NOT_PROMOTED";
    pub const ECHO_CONVERTED: &str = "ECHO_CONVERTED";
    pub const SYNTHETIC_GEOMETRY: &str = "SYNTHETIC_GEOMETRY";
    pub const ECHO_TERMINAL: &str = "ECHO_TERMINAL";
    pub const WEAK_EVIDENCE: &str = "WEAK_EVIDENCE";
    pub const DANGLING_ZONE_REFERENCE: &str = "DANGLING_ZONE_REFERENCE";
    pub const AMBIGUOUS_ATOM_VALUE: &str = "AMBIGUOUS_ATOM_VALUE";
    pub const MIXED_UNIT_ATOM: &str = "MIXED_UNIT_ATOM";
    pub const UNPARSEABLE_TOKEN: &str = "UNPARSEABLE_TOKEN";
    pub const UNREADABLE_MAGNITUDE: &str = "UNREADABLE_MAGNITUDE";
    pub const FOREIGN_BLOCK: &str = "FOREIGN_BLOCK";

    // density
    pub const PROMOTION_DENSITY_EXCEEDED: &str = "PROMOTION_DENSITY_EXCEEDED";
    pub const SYNTHETIC_DENSITY_EXCEEDED: &str = "SYNTHETIC_DENSITY_EXCEEDED";

    // overlap
    pub const UNRESOLVED_OVERLAP: &str = "UNRESOLVED_OVERLAP";
}

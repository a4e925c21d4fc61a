//! Validator policy: thresholds and patterns, injected rather than global.
//!
//! `AuditPolicy` is the serializable form (the `[audit]` table of
//! `covgrid.toml`); [`AuditPolicy::compile`] turns it into [`AuditRules`]
//! with every pattern compiled once.

use covgrid_kernel::CovgridError;
use covgrid_kernel::error::compile_pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_EXCEPTION_PATTERN: &str = r"(?i)\b(?:excepto|salvo|except[uú]a|excepci[oó]n(?:es)?|excluye|exclu[ií]do|no\s+cubre|s[oó]lo\s+en\s+prestadores)\b|\bprestadores?\s*:";
pub const DEFAULT_MERGED_ID_PATTERN: &str = r"(?i)PREF_?LE|LE_?PREF|[+&|/]|_AND_|_Y_";

#[derive(Debug, Error)]
pub enum AuditConfigError {
    #[error("audit.{field}: {source}")]
    Pattern {
        field: &'static str,
        #[source]
        source: CovgridError,
    },

    #[error("audit.{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
}

/// Confidence thresholds an echo-header pointer must clear to be promoted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderBandPolicy {
    pub min_row_confidence: f64,
    pub min_assignment_confidence: f64,
}

impl Default for HeaderBandPolicy {
    fn default() -> Self {
        Self {
            min_row_confidence: 0.85,
            min_assignment_confidence: 0.85,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditPolicy {
    /// Floor for non-synthetic zone geometry confidence.
    pub min_zone_confidence: f64,
    /// Tolerance when testing a bbox midpoint against its column.
    pub bbox_epsilon: f64,
    /// More promotions than this fails the whole package.
    pub promotion_density_limit: usize,
    /// Maximum share of assignments backed by synthetic geometry.
    pub synthetic_density_limit: f64,
    pub fallback_row_height: f64,
    pub anchored_zone_confidence: f64,
    pub synthetic_zone_confidence: f64,
    pub exception_pattern: String,
    pub merged_id_pattern: String,
    /// Unit tokens that must not co-occur in one copay string.
    pub mixed_unit_tokens: Vec<String>,
    /// Atom types (case-insensitive) subject to the mixed-unit check.
    pub copay_atom_types: Vec<String>,
    /// Promotion is disabled when absent.
    pub header_band: Option<HeaderBandPolicy>,
}

impl Default for AuditPolicy {
    fn default() -> Self {
        Self {
            min_zone_confidence: 0.8,
            bbox_epsilon: 2.0,
            promotion_density_limit: 5,
            synthetic_density_limit: 0.30,
            fallback_row_height: 12.0,
            anchored_zone_confidence: 0.96,
            synthetic_zone_confidence: 0.80,
            exception_pattern: DEFAULT_EXCEPTION_PATTERN.to_string(),
            merged_id_pattern: DEFAULT_MERGED_ID_PATTERN.to_string(),
            mixed_unit_tokens: ["UF", "VAM", "V.A.", "AC2", "%"]
                .into_iter()
                .map(String::from)
                .collect(),
            copay_atom_types: vec!["COPAGO".to_string(), "COPAY".to_string()],
            header_band: None,
        }
    }
}

impl AuditPolicy {
    pub fn compile(self) -> Result<AuditRules, AuditConfigError> {
        check_unit_interval("min_zone_confidence", self.min_zone_confidence)?;
        check_unit_interval("synthetic_density_limit", self.synthetic_density_limit)?;
        check_unit_interval("anchored_zone_confidence", self.anchored_zone_confidence)?;
        check_unit_interval("synthetic_zone_confidence", self.synthetic_zone_confidence)?;
        if !(self.bbox_epsilon >= 0.0) {
            return Err(AuditConfigError::OutOfRange {
                field: "bbox_epsilon",
                expected: "non-negative",
                value: self.bbox_epsilon,
            });
        }
        if !(self.fallback_row_height > 0.0) {
            return Err(AuditConfigError::OutOfRange {
                field: "fallback_row_height",
                expected: "positive",
                value: self.fallback_row_height,
            });
        }
        if let Some(band) = &self.header_band {
            check_unit_interval("header_band.min_row_confidence", band.min_row_confidence)?;
            check_unit_interval(
                "header_band.min_assignment_confidence",
                band.min_assignment_confidence,
            )?;
        }

        let exception = compile_field("exception_pattern", &self.exception_pattern)?;
        let merged_id = compile_field("merged_id_pattern", &self.merged_id_pattern)?;
        let unit_tokens = self
            .mixed_unit_tokens
            .iter()
            .map(|token| {
                compile_field("mixed_unit_tokens", &unit_token_pattern(token))
                    .map(|re| (token.clone(), re))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AuditRules {
            policy: self,
            exception,
            merged_id,
            unit_tokens,
        })
    }
}

/// A compiled [`AuditPolicy`].
#[derive(Debug, Clone)]
pub struct AuditRules {
    pub policy: AuditPolicy,
    exception: Regex,
    merged_id: Regex,
    unit_tokens: Vec<(String, Regex)>,
}

impl Default for AuditRules {
    fn default() -> Self {
        AuditPolicy::default()
            .compile()
            .expect("default audit policy must compile")
    }
}

impl AuditRules {
    /// Text that lists exceptions or providers and therefore conditions the zone.
    pub fn is_exception_text(&self, text: &str) -> bool {
        self.exception.is_match(text)
    }

    /// Ids that encode a legacy merge of two logical columns.
    pub fn is_merged_id(&self, id: &str) -> bool {
        self.merged_id.is_match(id)
    }

    /// Distinct configured unit tokens found in `text`, in configured order.
    pub fn unit_tokens_in(&self, text: &str) -> Vec<&str> {
        self.unit_tokens
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(token, _)| token.as_str())
            .collect()
    }

    pub fn is_copay_atom(&self, atom_type: &str) -> bool {
        self.policy
            .copay_atom_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(atom_type.trim()))
    }
}

fn unit_token_pattern(token: &str) -> String {
    let escaped = regex::escape(token);
    let starts_word = token.chars().next().is_some_and(char::is_alphanumeric);
    let ends_word = token.chars().last().is_some_and(char::is_alphanumeric);
    format!(
        "(?i){}{}{}",
        if starts_word { r"\b" } else { "" },
        escaped,
        if ends_word { r"\b" } else { "" }
    )
}

fn compile_field(field: &'static str, pattern: &str) -> Result<Regex, AuditConfigError> {
    compile_pattern(pattern).map_err(|source| AuditConfigError::Pattern { field, source })
}

fn check_unit_interval(field: &'static str, value: f64) -> Result<(), AuditConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AuditConfigError::OutOfRange {
            field,
            expected: "within [0, 1]",
            value,
        })
    }
}

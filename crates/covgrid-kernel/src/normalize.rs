//! Atom normalizer: raw evidence text to typed value + unit atoms.
//!
//! Literal forms are tried in a fixed order and must match the whole token.
//! A near miss such as `"50 XP"` is rejected rather than read as the closest
//! unit; the normalizer never guesses.

use crate::assignment::{Atom, AtomValue, SIN_TOPE};
use crate::witness::{Warning, warning_type};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Unit spellings emitted by the normalizer.
pub mod unit {
    pub const UF: &str = "UF";
    pub const VAM: &str = "VAM";
    pub const VA: &str = "VA";
    pub const AC2: &str = "AC2";
    pub const PCT: &str = "PCT";
    pub const NONE: &str = "NONE";
    pub const EXCLUSION: &str = "EXCLUSION";
    pub const UNKNOWN: &str = "UNKNOWN";

    /// Units that carry no magnitude; a null value is fine for these.
    pub fn is_trivial(unit: &str) -> bool {
        let unit = unit.trim();
        unit.is_empty() || unit.eq_ignore_ascii_case(NONE) || unit.eq_ignore_ascii_case(UNKNOWN)
    }
}

/// Atom type spellings emitted by the normalizer.
pub mod atom_type {
    pub const TOPE: &str = "TOPE";
    pub const EXCLUSION: &str = "EXCLUSION";
    pub const MONTO: &str = "MONTO";
    pub const MULTIPLICADOR: &str = "MULTIPLICADOR";
    pub const PORCENTAJE: &str = "PORCENTAJE";
    pub const RAW: &str = "RAW";
}

/// Normalizer output: one or more atoms plus parse warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    pub atoms: Vec<Atom>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Copy)]
enum Literal {
    NoCap,
    LibreEleccionOnly,
    Amount {
        unit: &'static str,
        atom_type: &'static str,
    },
}

struct LiteralRule {
    pattern: Regex,
    literal: Literal,
}

const NUMBER: &str = r"(\d+(?:[.,]\d+)?)";

fn literal_rules() -> &'static [LiteralRule] {
    static RULES: OnceLock<Vec<LiteralRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let table: [(String, Literal); 7] = [
            (r"(?i)^sin\s+tope$".to_string(), Literal::NoCap),
            (
                r"(?i)^(?:s[oó]lo|solamente|[uú]nicamente)\s+(?:(?:en|por|v[ií]a|cobertura|modalidad)\s+)*libre\s+elecci[oó]n\.?$"
                    .to_string(),
                Literal::LibreEleccionOnly,
            ),
            (
                format!(r"(?i)^{NUMBER}\s*UF$"),
                Literal::Amount {
                    unit: unit::UF,
                    atom_type: atom_type::MONTO,
                },
            ),
            (
                format!(r"(?i)^{NUMBER}\s*VAM$"),
                Literal::Amount {
                    unit: unit::VAM,
                    atom_type: atom_type::MULTIPLICADOR,
                },
            ),
            (
                format!(r"(?i)^{NUMBER}\s*V\.\s?A\.?$"),
                Literal::Amount {
                    unit: unit::VA,
                    atom_type: atom_type::MULTIPLICADOR,
                },
            ),
            (
                format!(r"(?i)^{NUMBER}\s*(?:veces\s+)?AC2$"),
                Literal::Amount {
                    unit: unit::AC2,
                    atom_type: atom_type::MULTIPLICADOR,
                },
            ),
            (
                format!(r"^{NUMBER}\s*%$"),
                Literal::Amount {
                    unit: unit::PCT,
                    atom_type: atom_type::PORCENTAJE,
                },
            ),
        ];
        table
            .into_iter()
            .map(|(pattern, literal)| LiteralRule {
                pattern: Regex::new(&pattern).expect("normalizer literal regex must compile"),
                literal,
            })
            .collect()
    })
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex must compile"))
}

/// Parse a decimal that may use `,` or `.` as the decimal separator.
pub fn parse_decimal(text: &str) -> Option<f64> {
    text.trim().replace(',', ".").parse::<f64>().ok()
}

/// Normalize a raw token. Parts separated by `;` or line breaks are parsed
/// independently, each against the whole-string forms.
pub fn normalize(raw: &str, key: &str) -> Normalized {
    let parts: Vec<&str> = raw
        .split([';', '\n'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut out = Normalized::default();
    if parts.is_empty() {
        let (atom, warning) = normalize_atom(raw, key);
        out.atoms.push(atom);
        out.warnings.extend(warning);
        return out;
    }
    for part in parts {
        let (atom, warning) = normalize_atom(part, key);
        out.atoms.push(atom);
        out.warnings.extend(warning);
    }
    out
}

/// Normalize a single token into exactly one atom.
pub fn normalize_atom(raw: &str, key: &str) -> (Atom, Option<Warning>) {
    let original_text = raw.trim().to_string();
    let collapsed = whitespace_re()
        .replace_all(&original_text, " ")
        .into_owned();

    for rule in literal_rules() {
        let Some(caps) = rule.pattern.captures(&collapsed) else {
            continue;
        };
        let atom = match rule.literal {
            Literal::NoCap => Atom {
                atom_type: atom_type::TOPE.to_string(),
                key: key.to_string(),
                value: Some(AtomValue::Text(SIN_TOPE.to_string())),
                unit: unit::NONE.to_string(),
                original_text,
                parse_confidence: 1.0,
            },
            Literal::LibreEleccionOnly => Atom {
                atom_type: atom_type::EXCLUSION.to_string(),
                key: key.to_string(),
                value: Some(AtomValue::Bool(false)),
                unit: unit::EXCLUSION.to_string(),
                original_text,
                parse_confidence: 1.0,
            },
            Literal::Amount { unit, atom_type } => {
                let Some(value) = caps.get(1).and_then(|m| parse_decimal(m.as_str())) else {
                    continue;
                };
                Atom {
                    atom_type: atom_type.to_string(),
                    key: key.to_string(),
                    value: Some(AtomValue::Number(value)),
                    unit: unit.to_string(),
                    original_text,
                    parse_confidence: 1.0,
                }
            }
        };
        return (atom, None);
    }

    let refs = if key.is_empty() {
        Vec::new()
    } else {
        vec![key.to_string()]
    };
    let warning = Warning::warning(
        warning_type::UNPARSEABLE_TOKEN,
        None,
        refs,
        format!("token {original_text:?} matches no recognized literal form"),
    );
    let atom = Atom {
        atom_type: atom_type::RAW.to_string(),
        key: key.to_string(),
        value: Some(AtomValue::Text(original_text.clone())),
        unit: unit::UNKNOWN.to_string(),
        original_text,
        parse_confidence: 0.0,
    };
    (atom, Some(warning))
}

//! Semantic operators detected per block.

use crate::block::{Block, Scope};
use crate::vocabulary::Lexicon;
use covgrid_kernel::normalize::{normalize_atom, parse_decimal};
use covgrid_kernel::{Cap, Warning, warning_type};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestrictionKind {
    TopeEvento,
    TopeAnualNfe,
    Porcentaje,
}

impl RestrictionKind {
    /// Scopes that carry a restriction.
    pub fn for_scope(scope: Scope) -> Option<Self> {
        match scope {
            Scope::TopeEvento => Some(RestrictionKind::TopeEvento),
            Scope::TopeAnualNfe => Some(RestrictionKind::TopeAnualNfe),
            Scope::Porcentaje => Some(RestrictionKind::Porcentaje),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// "Sólo libre elección": preferente coverage does not carry over.
    HerenciaCortada { source_block: String },
    /// Coverage switches to a financial sub-domain (medicamentos, traslados...).
    CambioDominioFinanciero { source_block: String, term: String },
    Restriction {
        kind: RestrictionKind,
        cap: Cap,
        source_block: String,
    },
}

impl Operator {
    pub fn source_block(&self) -> &str {
        match self {
            Operator::HerenciaCortada { source_block }
            | Operator::CambioDominioFinanciero { source_block, .. }
            | Operator::Restriction { source_block, .. } => source_block,
        }
    }

    pub fn is_inheritance_cut(&self) -> bool {
        matches!(self, Operator::HerenciaCortada { .. })
    }
}

/// A classified block with the operators detected on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockReading {
    #[serde(flatten)]
    pub block: Block,
    pub operators: Vec<Operator>,
}

fn magnitude_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\d+(?:[.,]\d+)?\s*(?:%|UF\b|VAM\b|V\.\s?A\.?|(?:veces\s+)?AC2\b)")
            .expect("magnitude regex must compile")
    })
}

fn bare_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("bare number regex must compile"))
}

/// Operators for one block, in the order they apply.
pub fn detect(block: &Block, lexicon: &Lexicon) -> (Vec<Operator>, Vec<Warning>) {
    let mut operators = Vec::new();
    let mut warnings = Vec::new();

    if lexicon.cuts_inheritance(&block.text) {
        operators.push(Operator::HerenciaCortada {
            source_block: block.id.clone(),
        });
    }
    if let Some(term) = lexicon.domain_shift_in(&block.text) {
        operators.push(Operator::CambioDominioFinanciero {
            source_block: block.id.clone(),
            term: term.to_string(),
        });
    }
    if let Some(kind) = RestrictionKind::for_scope(block.scope) {
        let cap = read_cap(&block.text, kind, lexicon);
        if let Cap::Unknown { raw } = &cap {
            warnings.push(Warning::warning(
                warning_type::UNREADABLE_MAGNITUDE,
                None,
                vec![block.id.clone()],
                format!("block {} restriction magnitude {raw:?} could not be read", block.id),
            ));
        }
        operators.push(Operator::Restriction {
            kind,
            cap,
            source_block: block.id.clone(),
        });
    }

    (operators, warnings)
}

/// Read a restriction magnitude out of free text.
///
/// A no-cap phrase wins; otherwise the first number with a recognized unit is
/// normalized. A bare number only counts in an event-cap block, where it is
/// read in the vocabulary's default unit.
pub fn read_cap(text: &str, kind: RestrictionKind, lexicon: &Lexicon) -> Cap {
    if lexicon.is_no_cap(text) {
        return Cap::NoCap;
    }
    if let Some(m) = magnitude_re().find(text) {
        let (atom, _) = normalize_atom(m.as_str(), "");
        return Cap::from_atom(&atom);
    }
    let bare = bare_number_re()
        .find(text)
        .and_then(|m| parse_decimal(m.as_str()));
    match bare {
        Some(value) if kind == RestrictionKind::TopeEvento => {
            Cap::amount(lexicon.event_cap_default_unit(), value)
        }
        _ => Cap::unknown(text.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Effect;

    fn block(id: &str, text: &str, scope: Scope) -> Block {
        Block {
            id: id.to_string(),
            text: text.to_string(),
            column: 0,
            row_id: "R1".to_string(),
            segment_id: "S1".to_string(),
            effect: Effect::Neutro,
            scope,
        }
    }

    #[test]
    fn caps_from_text() {
        let lex = Lexicon::default();
        assert_eq!(read_cap("Sin Tope", RestrictionKind::TopeAnualNfe, &lex), Cap::NoCap);
        assert_eq!(
            read_cap("Tope 16,0 UF por evento", RestrictionKind::TopeEvento, &lex),
            Cap::amount("UF", 16.0)
        );
        assert_eq!(
            read_cap("hasta 2,5 veces AC2", RestrictionKind::TopeEvento, &lex),
            Cap::amount("AC2", 2.5)
        );
        assert_eq!(
            read_cap("80% Clínica X", RestrictionKind::Porcentaje, &lex),
            Cap::amount("PCT", 80.0)
        );
    }

    #[test]
    fn bare_number_defaults_to_uf_only_for_event_caps() {
        let lex = Lexicon::default();
        assert_eq!(
            read_cap("12", RestrictionKind::TopeEvento, &lex),
            Cap::amount("UF", 12.0)
        );
        assert_eq!(
            read_cap("12", RestrictionKind::TopeAnualNfe, &lex),
            Cap::unknown("12")
        );
    }

    #[test]
    fn operators_in_application_order() {
        let lex = Lexicon::default();
        let b = block(
            "B7",
            "Sólo libre elección; medicamentos tope 10 UF",
            Scope::TopeEvento,
        );
        let (ops, warnings) = detect(&b, &lex);
        assert!(warnings.is_empty());
        assert_eq!(ops.len(), 3);
        assert!(ops[0].is_inheritance_cut());
        assert!(matches!(
            &ops[1],
            Operator::CambioDominioFinanciero { term, .. } if term == "medicamentos"
        ));
        assert!(matches!(
            &ops[2],
            Operator::Restriction { kind: RestrictionKind::TopeEvento, cap, .. }
                if *cap == Cap::amount("UF", 10.0)
        ));
        assert!(ops.iter().all(|op| op.source_block() == "B7"));
    }

    #[test]
    fn unreadable_magnitude_warns() {
        let lex = Lexicon::default();
        let (ops, warnings) = detect(&block("B1", "ver nota", Scope::TopeAnualNfe), &lex);
        assert_eq!(ops.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].is(warning_type::UNREADABLE_MAGNITUDE));
    }

    #[test]
    fn unscoped_block_has_no_restriction() {
        let lex = Lexicon::default();
        let (ops, _) = detect(&block("B1", "Día cama", Scope::FinancialDomain), &lex);
        assert!(ops.is_empty());
    }
}

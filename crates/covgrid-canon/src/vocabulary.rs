//! Injected classification vocabulary.
//!
//! Every keyword list and pattern the canonizer classifies with lives here
//! as data. [`Vocabulary`] is the serializable `[canon]` table;
//! [`Vocabulary::compile`] produces [`Lexicon`], the compiled rule tables the
//! classifier and operator detector read. Rule order is the precedence order.

use crate::block::{Effect, Scope};
use crate::graph::Modality;
use covgrid_kernel::CovgridError;
use covgrid_kernel::error::compile_pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("canon.{field}: {source}")]
    Pattern {
        field: String,
        #[source]
        source: CovgridError,
    },

    #[error("canon.{field}: term list is empty")]
    EmptyTerms { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectRule {
    pub pattern: String,
    pub effect: Effect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRule {
    pub pattern: String,
    pub scope: Scope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnScope {
    pub column: u32,
    pub scope: Scope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnModality {
    pub column: u32,
    pub modality: Modality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// First match wins; no match is NEUTRO.
    pub effect_rules: Vec<EffectRule>,
    /// Text scope rules tried after `column_scopes`, before the term lists.
    pub scope_rules: Vec<ScopeRule>,
    /// Columns whose scope is fixed by position.
    pub column_scopes: Vec<ColumnScope>,
    /// Columns whose modality is fixed by position.
    pub column_modalities: Vec<ColumnModality>,
    /// Provider names; a match scopes the block PREFERENTE_RED.
    pub provider_names: Vec<String>,
    /// Modality markers; a match scopes the block PREFERENTE_MODAL.
    pub modality_markers: Vec<String>,
    pub libre_eleccion_pattern: String,
    pub domain_shift_terms: Vec<String>,
    pub inheritance_cut_pattern: String,
    pub no_cap_pattern: String,
    /// Unit for a bare number in an event-cap column.
    pub event_cap_default_unit: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            effect_rules: vec![
                EffectRule {
                    pattern: r"(?i)\bsin\s+tope\b".to_string(),
                    effect: Effect::Expansivo,
                },
                EffectRule {
                    pattern: r"(?i)\b(?:tope|m[aá]ximo|l[ií]mite|veces)\b|\d\s*(?:UF|VAM|AC2)\b|\d\s*V\.\s?A\."
                        .to_string(),
                    effect: Effect::Limitante,
                },
            ],
            scope_rules: vec![ScopeRule {
                pattern: "%".to_string(),
                scope: Scope::Porcentaje,
            }],
            column_scopes: vec![
                ColumnScope {
                    column: 2,
                    scope: Scope::TopeEvento,
                },
                ColumnScope {
                    column: 3,
                    scope: Scope::TopeEvento,
                },
                ColumnScope {
                    column: 4,
                    scope: Scope::TopeAnualNfe,
                },
            ],
            column_modalities: vec![
                ColumnModality {
                    column: 2,
                    modality: Modality::Preferente,
                },
                ColumnModality {
                    column: 3,
                    modality: Modality::LibreEleccion,
                },
            ],
            provider_names: [
                "clínica",
                "clinica",
                "hospital",
                "centro médico",
                "integramédica",
                "redsalud",
                "prestadores en convenio",
                "convenio",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            modality_markers: ["preferente", "modalidad", "plan cerrado", "red cerrada"]
                .into_iter()
                .map(String::from)
                .collect(),
            libre_eleccion_pattern: r"(?i)\blibre\s+elecci[oó]n\b".to_string(),
            domain_shift_terms: [
                "medicamentos",
                "materiales",
                "insumos",
                "traslados",
                "prótesis",
                "ortesis",
                "quimioterapia",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            inheritance_cut_pattern:
                r"(?i)\b(?:s[oó]lo|solamente|[uú]nicamente)\s+(?:(?:en|por|v[ií]a|cobertura|modalidad)\s+)*libre\s+elecci[oó]n\b"
                    .to_string(),
            no_cap_pattern: r"(?i)\bsin\s+tope\b".to_string(),
            event_cap_default_unit: "UF".to_string(),
        }
    }
}

impl Vocabulary {
    pub fn compile(self) -> Result<Lexicon, VocabularyError> {
        let effect_rules = self
            .effect_rules
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                compile_field(format!("effect_rules[{i}]"), &rule.pattern)
                    .map(|re| (re, rule.effect))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let scope_rules = self
            .scope_rules
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                compile_field(format!("scope_rules[{i}]"), &rule.pattern).map(|re| (re, rule.scope))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let providers = term_pattern("provider_names", &self.provider_names)?;
        let modality_markers = term_pattern("modality_markers", &self.modality_markers)?;
        let domain_shift = term_pattern("domain_shift_terms", &self.domain_shift_terms)?;
        let libre_eleccion =
            compile_field("libre_eleccion_pattern".to_string(), &self.libre_eleccion_pattern)?;
        let inheritance_cut =
            compile_field("inheritance_cut_pattern".to_string(), &self.inheritance_cut_pattern)?;
        let no_cap = compile_field("no_cap_pattern".to_string(), &self.no_cap_pattern)?;

        Ok(Lexicon {
            effect_rules,
            scope_rules,
            providers,
            modality_markers,
            domain_shift,
            libre_eleccion,
            inheritance_cut,
            no_cap,
            vocabulary: self,
        })
    }
}

/// A compiled [`Vocabulary`].
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub vocabulary: Vocabulary,
    effect_rules: Vec<(Regex, Effect)>,
    scope_rules: Vec<(Regex, Scope)>,
    providers: Regex,
    modality_markers: Regex,
    domain_shift: Regex,
    libre_eleccion: Regex,
    inheritance_cut: Regex,
    no_cap: Regex,
}

impl Default for Lexicon {
    fn default() -> Self {
        Vocabulary::default()
            .compile()
            .expect("default canon vocabulary must compile")
    }
}

impl Lexicon {
    pub fn effect_of(&self, text: &str) -> Effect {
        self.effect_rules
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, effect)| *effect)
            .unwrap_or(Effect::Neutro)
    }

    pub fn column_scope(&self, column: u32) -> Option<Scope> {
        self.vocabulary
            .column_scopes
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.scope)
    }

    pub fn column_modality(&self, column: u32) -> Option<Modality> {
        self.vocabulary
            .column_modalities
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.modality)
    }

    pub fn text_scope(&self, text: &str) -> Option<Scope> {
        self.scope_rules
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, scope)| *scope)
    }

    pub fn mentions_provider(&self, text: &str) -> bool {
        self.providers.is_match(text)
    }

    /// Provider names found in `text`, as written there.
    pub fn providers_in(&self, text: &str) -> Vec<String> {
        self.providers
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    pub fn mentions_modality(&self, text: &str) -> bool {
        self.modality_markers.is_match(text)
    }

    pub fn mentions_libre_eleccion(&self, text: &str) -> bool {
        self.libre_eleccion.is_match(text)
    }

    /// The first domain-shift term in `text`.
    pub fn domain_shift_in<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.domain_shift.find(text).map(|m| m.as_str())
    }

    pub fn cuts_inheritance(&self, text: &str) -> bool {
        self.inheritance_cut.is_match(text)
    }

    pub fn is_no_cap(&self, text: &str) -> bool {
        self.no_cap.is_match(text)
    }

    pub fn event_cap_default_unit(&self) -> &str {
        &self.vocabulary.event_cap_default_unit
    }
}

/// One case-insensitive alternation over `terms`, each bounded as a word.
fn term_pattern(field: &'static str, terms: &[String]) -> Result<Regex, VocabularyError> {
    let alternatives: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(regex::escape)
        .collect();
    if alternatives.is_empty() {
        return Err(VocabularyError::EmptyTerms { field });
    }
    compile_field(
        field.to_string(),
        &format!(r"(?i)\b(?:{})\b", alternatives.join("|")),
    )
}

fn compile_field(field: String, pattern: &str) -> Result<Regex, VocabularyError> {
    compile_pattern(pattern).map_err(|source| VocabularyError::Pattern { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_rules_in_order() {
        let lex = Lexicon::default();
        assert_eq!(lex.effect_of("Sin tope"), Effect::Expansivo);
        // "sin tope" is checked before the generic "tope" vocabulary.
        assert_eq!(lex.effect_of("sin tope anual"), Effect::Expansivo);
        assert_eq!(lex.effect_of("Tope 16 UF por evento"), Effect::Limitante);
        assert_eq!(lex.effect_of("2,0 AC2"), Effect::Limitante);
        assert_eq!(lex.effect_of("3 V.A."), Effect::Limitante);
        assert_eq!(lex.effect_of("90%"), Effect::Neutro);
    }

    #[test]
    fn term_lists_match_whole_words() {
        let lex = Lexicon::default();
        assert!(lex.mentions_provider("80% en Clínica Alemana"));
        assert_eq!(lex.providers_in("Hospital del Trabajador"), vec!["Hospital"]);
        assert!(!lex.mentions_provider("hospitalario"));
        assert_eq!(lex.domain_shift_in("Tope Medicamentos 10 UF"), Some("Medicamentos"));
    }

    #[test]
    fn synthetic_vocabulary() {
        let vocab = Vocabulary {
            provider_names: vec!["acme".to_string()],
            domain_shift_terms: vec!["widgets".to_string()],
            ..Vocabulary::default()
        };
        let lex = vocab.compile().unwrap();
        assert!(lex.mentions_provider("ACME only"));
        assert!(!lex.mentions_provider("Clínica"));
        assert!(lex.domain_shift_in("widgets cap").is_some());
    }

    #[test]
    fn empty_term_list_is_rejected() {
        let vocab = Vocabulary {
            modality_markers: vec!["  ".to_string()],
            ..Vocabulary::default()
        };
        assert!(matches!(
            vocab.compile(),
            Err(VocabularyError::EmptyTerms {
                field: "modality_markers"
            })
        ));
    }

    #[test]
    fn bad_rule_names_its_index() {
        let mut vocab = Vocabulary::default();
        vocab.scope_rules.push(ScopeRule {
            pattern: "[".to_string(),
            scope: Scope::Porcentaje,
        });
        let err = vocab.compile().unwrap_err();
        assert!(err.to_string().starts_with("canon.scope_rules[1]"));
    }

    #[test]
    fn vocabulary_from_toml() {
        let vocab: Vocabulary = toml::from_str(
            r#"
            provider_names = ["Clínica Dávila"]
            event_cap_default_unit = "VAM"

            [[column_scopes]]
            column = 5
            scope = "TOPE_ANUAL_NFE"
            "#,
        )
        .unwrap();
        let lex = vocab.compile().unwrap();
        assert_eq!(lex.column_scope(5), Some(Scope::TopeAnualNfe));
        assert_eq!(lex.column_scope(2), None);
        assert_eq!(lex.event_cap_default_unit(), "VAM");
    }
}

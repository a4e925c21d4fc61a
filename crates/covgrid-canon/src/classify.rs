//! Block classification: text and column position to effect and scope.
//!
//! Both are pure lookups against the [`Lexicon`] rule tables. Scope is
//! resolved by column position first, then by the ordered text rules, then
//! by provider and modality vocabulary, and defaults to FINANCIAL_DOMAIN.

use crate::block::{Block, BlockInput, Effect, Scope};
use crate::vocabulary::Lexicon;

pub fn classify(input: &BlockInput, lexicon: &Lexicon) -> Block {
    Block::from_input(
        input,
        effect_of(&input.text, lexicon),
        scope_of(input.column, &input.text, lexicon),
    )
}

pub fn effect_of(text: &str, lexicon: &Lexicon) -> Effect {
    lexicon.effect_of(text)
}

pub fn scope_of(column: u32, text: &str, lexicon: &Lexicon) -> Scope {
    if let Some(scope) = lexicon.column_scope(column) {
        return scope;
    }
    if let Some(scope) = lexicon.text_scope(text) {
        return scope;
    }
    if lexicon.mentions_provider(text) {
        Scope::PreferenteRed
    } else if lexicon.mentions_modality(text) {
        Scope::PreferenteModal
    } else {
        Scope::FinancialDomain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(text: &str, column: u32) -> BlockInput {
        BlockInput {
            id: "B1".to_string(),
            text: text.to_string(),
            column,
            row_id: "R1".to_string(),
            segment_id: "S1".to_string(),
        }
    }

    #[test]
    fn column_position_wins_over_text() {
        let lex = Lexicon::default();
        assert_eq!(scope_of(2, "90%", &lex), Scope::TopeEvento);
        assert_eq!(scope_of(3, "Clínica Alemana", &lex), Scope::TopeEvento);
        assert_eq!(scope_of(4, "Sin tope", &lex), Scope::TopeAnualNfe);
    }

    #[test]
    fn text_fallbacks_in_order() {
        let lex = Lexicon::default();
        assert_eq!(scope_of(1, "80% Clínica Alemana", &lex), Scope::Porcentaje);
        assert_eq!(scope_of(0, "Clínica Alemana", &lex), Scope::PreferenteRed);
        assert_eq!(scope_of(0, "Modalidad preferente", &lex), Scope::PreferenteModal);
        assert_eq!(scope_of(0, "Día cama", &lex), Scope::FinancialDomain);
    }

    #[test]
    fn classify_table() {
        let lex = Lexicon::default();
        let rows: Vec<(String, Effect, Scope)> = [
            ("Sin tope", 4),
            ("Tope 16,0 UF", 2),
            ("90%", 1),
            ("Sólo libre elección", 0),
        ]
        .into_iter()
        .map(|(text, column)| {
            let block = classify(&input(text, column), &lex);
            (block.text, block.effect, block.scope)
        })
        .collect();
        insta::assert_json_snapshot!(rows, @r###"
        [
          [
            "Sin tope",
            "EXPANSIVO",
            "TOPE_ANUAL_NFE"
          ],
          [
            "Tope 16,0 UF",
            "LIMITANTE",
            "TOPE_EVENTO"
          ],
          [
            "90%",
            "NEUTRO",
            "PORCENTAJE"
          ],
          [
            "Sólo libre elección",
            "NEUTRO",
            "FINANCIAL_DOMAIN"
          ]
        ]
        "###);
    }
}

//! Row text blocks and their classification enums.

use serde::{Deserialize, Serialize};

/// What a block does to the options it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
    /// Caps or narrows coverage.
    Limitante,
    Neutro,
    /// Lifts a cap ("sin tope").
    Expansivo,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    PreferenteRed,
    PreferenteModal,
    Porcentaje,
    TopeEvento,
    TopeAnualNfe,
    FinancialDomain,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::PreferenteRed => "PREFERENTE_RED",
            Scope::PreferenteModal => "PREFERENTE_MODAL",
            Scope::Porcentaje => "PORCENTAJE",
            Scope::TopeEvento => "TOPE_EVENTO",
            Scope::TopeAnualNfe => "TOPE_ANUAL_NFE",
            Scope::FinancialDomain => "FINANCIAL_DOMAIN",
        }
    }
}

/// A row's free-text fragment as read from the table, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInput {
    pub id: String,
    pub text: String,
    /// Zero-based column index.
    pub column: u32,
    pub row_id: String,
    /// Sub-line of the row the block belongs to; blocks sharing a segment
    /// describe the same coverage path.
    #[serde(default)]
    pub segment_id: String,
}

/// A classified block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub text: String,
    pub column: u32,
    pub row_id: String,
    pub segment_id: String,
    pub effect: Effect,
    pub scope: Scope,
}

impl Block {
    pub fn from_input(input: &BlockInput, effect: Effect, scope: Scope) -> Self {
        Self {
            id: input.id.clone(),
            text: input.text.clone(),
            column: input.column,
            row_id: input.row_id.clone(),
            segment_id: input.segment_id.clone(),
            effect,
            scope,
        }
    }
}

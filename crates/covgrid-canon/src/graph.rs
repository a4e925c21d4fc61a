//! The row's option graph: stably identified candidate coverage paths.
//!
//! Options are built per `(modality, segment)` from the row's blocks. Two
//! options of the same modality coexist when they come from different
//! segments (e.g. 90% in one clinic, 80% elsewhere), so identity is never
//! the modality alone.

use crate::block::{Block, Scope};
use crate::operator::{BlockReading, Operator, RestrictionKind};
use crate::vocabulary::Lexicon;
use covgrid_kernel::Cap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Preferente,
    LibreEleccion,
}

impl Modality {
    pub fn as_str(self) -> &'static str {
        match self {
            Modality::Preferente => "preferente",
            Modality::LibreEleccion => "libre_eleccion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionNode {
    pub id: String,
    pub modality: Modality,
    #[serde(default)]
    pub scopes: BTreeSet<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub providers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_cap: Option<Cap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_cap: Option<Cap>,
}

impl OptionNode {
    pub fn option_id(row_id: &str, modality: Modality, segment_id: &str) -> String {
        format!("{row_id}:{}:{segment_id}", modality.as_str())
    }

    pub fn touches(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionGraph {
    pub options: Vec<OptionNode>,
}

impl OptionGraph {
    pub fn new(options: Vec<OptionNode>) -> Self {
        Self { options }
    }

    pub fn get(&self, id: &str) -> Option<&OptionNode> {
        self.options.iter().find(|o| o.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|o| o.id.as_str())
    }

    pub fn with_modality(&self, modality: Modality) -> impl Iterator<Item = &OptionNode> {
        self.options.iter().filter(move |o| o.modality == modality)
    }

    pub fn touching(&self, scope: Scope) -> impl Iterator<Item = &OptionNode> {
        self.options.iter().filter(move |o| o.touches(scope))
    }

    /// Build one option per `(modality, segment)` found in `readings`.
    ///
    /// A block names its modality by text (libre elección, providers,
    /// modality markers) or by column position. Blocks that name none belong
    /// to every option of their segment; a segment where no block names a
    /// modality yields a single libre-elección option.
    pub fn build(row_id: &str, readings: &[BlockReading], lexicon: &Lexicon) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for reading in readings {
            let segment = reading.block.segment_id.as_str();
            if !segments.contains(&segment) {
                segments.push(segment);
            }
        }

        let mut options = Vec::new();
        for segment in segments {
            let members: Vec<(&BlockReading, Option<Modality>)> = readings
                .iter()
                .filter(|r| r.block.segment_id == segment)
                .map(|r| (r, modality_hint(&r.block, lexicon)))
                .collect();

            let mut modalities: Vec<Modality> = Vec::new();
            for modality in members.iter().filter_map(|(_, hint)| *hint) {
                if !modalities.contains(&modality) {
                    modalities.push(modality);
                }
            }
            if modalities.is_empty() {
                modalities.push(Modality::LibreEleccion);
            }

            for modality in modalities {
                let attached: Vec<&BlockReading> = members
                    .iter()
                    .filter(|(_, hint)| hint.is_none_or(|m| m == modality))
                    .map(|(r, _)| *r)
                    .collect();
                options.push(option_from(row_id, segment, modality, &attached, lexicon));
            }
        }
        Self { options }
    }
}

/// The modality a block names, if any.
pub fn modality_hint(block: &Block, lexicon: &Lexicon) -> Option<Modality> {
    if lexicon.mentions_libre_eleccion(&block.text) {
        Some(Modality::LibreEleccion)
    } else if lexicon.mentions_provider(&block.text)
        || lexicon.mentions_modality(&block.text)
        || matches!(block.scope, Scope::PreferenteRed | Scope::PreferenteModal)
    {
        Some(Modality::Preferente)
    } else {
        lexicon.column_modality(block.column)
    }
}

fn option_from(
    row_id: &str,
    segment: &str,
    modality: Modality,
    attached: &[&BlockReading],
    lexicon: &Lexicon,
) -> OptionNode {
    let mut node = OptionNode {
        id: OptionNode::option_id(row_id, modality, segment),
        modality,
        scopes: attached.iter().map(|r| r.block.scope).collect(),
        percentage: None,
        providers: Vec::new(),
        event_cap: None,
        annual_cap: None,
    };

    for reading in attached {
        for provider in lexicon.providers_in(&reading.block.text) {
            if !node.providers.contains(&provider) {
                node.providers.push(provider);
            }
        }
        for operator in &reading.operators {
            let Operator::Restriction { kind, cap, .. } = operator else {
                continue;
            };
            match kind {
                RestrictionKind::Porcentaje => {
                    if let (None, Cap::Amount { value, .. }) = (node.percentage, cap) {
                        node.percentage = Some(*value);
                    }
                }
                RestrictionKind::TopeEvento => {
                    node.event_cap.get_or_insert_with(|| cap.clone());
                }
                RestrictionKind::TopeAnualNfe => {
                    node.annual_cap.get_or_insert_with(|| cap.clone());
                }
            }
        }
    }
    node
}

//! Row canonicalization.
//!
//! ```text
//! blocks ─► classify ─► detect ─► apply (first pass: flags, domain, restrictions)
//!                          │
//!                          └─► OptionGraph ─► re-interpret in document order
//!                                             (HERENCIA_CORTADA, LIMITANTE, EXPANSIVO)
//! ```
//!
//! Each row starts from an empty state and shares nothing with other rows.

use crate::block::{BlockInput, Effect};
use crate::classify::classify;
use crate::graph::{Modality, OptionGraph, OptionNode};
use crate::operator::{BlockReading, detect};
use crate::state::{LatentReason, LineState, apply};
use crate::vocabulary::Lexicon;
use covgrid_kernel::{Warning, warning_type};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub row_id: String,
    pub blocks: Vec<BlockReading>,
    pub graph: OptionGraph,
    pub state: LineState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl CanonicalRow {
    pub fn active(&self) -> impl Iterator<Item = &OptionNode> {
        self.graph
            .options
            .iter()
            .filter(|o| self.state.is_active(&o.id))
    }
}

/// Canonicalize one row's blocks, given in document order.
///
/// `options` replaces the option graph built from the blocks when supplied.
/// Blocks that belong to another row are reported and ignored.
pub fn canonize_row(
    row_id: &str,
    inputs: &[BlockInput],
    options: Option<Vec<OptionNode>>,
    lexicon: &Lexicon,
) -> CanonicalRow {
    let mut warnings = Vec::new();
    let mut readings = Vec::with_capacity(inputs.len());
    for input in inputs {
        if input.row_id != row_id {
            warnings.push(Warning::warning(
                warning_type::FOREIGN_BLOCK,
                None,
                vec![input.id.clone(), input.row_id.clone()],
                format!(
                    "block {} belongs to row {}, not {row_id}; ignored",
                    input.id, input.row_id
                ),
            ));
            continue;
        }
        let block = classify(input, lexicon);
        let (operators, block_warnings) = detect(&block, lexicon);
        warnings.extend(block_warnings);
        readings.push(BlockReading { block, operators });
    }

    let graph = match options {
        Some(options) => OptionGraph::new(options),
        None => OptionGraph::build(row_id, &readings, lexicon),
    };

    let first_pass = readings
        .iter()
        .fold(LineState::seeded(graph.ids()), |state, r| {
            apply(state, &r.operators)
        });
    let state = reinterpret(first_pass, &graph, &readings);

    debug!(
        row = %row_id,
        blocks = readings.len(),
        options = graph.options.len(),
        active = state.active_options.len(),
        latent = state.latent_options.len(),
        inheritance_cut = state.inheritance_cut,
        "row canonized"
    );

    CanonicalRow {
        row_id: row_id.to_string(),
        blocks: readings,
        graph,
        state,
        warnings,
    }
}

/// Second pass: move options between active and latent block by block.
fn reinterpret(
    mut state: LineState,
    graph: &OptionGraph,
    readings: &[BlockReading],
) -> LineState {
    for reading in readings {
        let block = &reading.block;

        if reading.operators.iter().any(|op| op.is_inheritance_cut()) {
            for option in graph.with_modality(Modality::Preferente) {
                state.cut_inheritance(&option.id, block.scope, &block.id);
            }
        }

        match block.effect {
            Effect::Limitante => {
                for option in graph.touching(block.scope) {
                    state.deactivate(
                        &option.id,
                        LatentReason::LimitanteTope,
                        block.scope,
                        &block.id,
                    );
                }
            }
            Effect::Expansivo => {
                for option in graph.touching(block.scope) {
                    state.reactivate(&option.id);
                }
            }
            Effect::Neutro => {}
        }
    }
    state
}

/// Canonicalize blocks for many rows. Rows are grouped by `row_id` in first
/// appearance order; block order within a row is preserved.
pub fn canonize_rows(inputs: &[BlockInput], lexicon: &Lexicon) -> Vec<CanonicalRow> {
    let mut rows: Vec<(&str, Vec<BlockInput>)> = Vec::new();
    for input in inputs {
        match rows.iter_mut().find(|(id, _)| *id == input.row_id) {
            Some((_, blocks)) => blocks.push(input.clone()),
            None => rows.push((input.row_id.as_str(), vec![input.clone()])),
        }
    }
    rows.into_iter()
        .map(|(row_id, blocks)| canonize_row(row_id, &blocks, None, lexicon))
        .collect()
}

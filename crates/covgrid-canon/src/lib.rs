//! # covgrid canon
//!
//! Row-scoped interpretation of a benefits grid's free text. Each row is
//! read in isolation:
//!
//! 1. [`classify`] assigns every block an [`Effect`] and a [`Scope`] from
//!    its text and column, using an injected [`Vocabulary`].
//! 2. [`operator::detect`] reads the block's semantic operators
//!    (inheritance cut, financial domain shift, cap restrictions).
//! 3. [`engine::canonize_row`] folds them into a [`LineState`] and
//!    re-interprets the row's [`OptionGraph`] block by block, so options move
//!    between active and latent but are never lost.

pub mod block;
pub mod classify;
pub mod engine;
pub mod graph;
pub mod operator;
pub mod state;
pub mod vocabulary;

pub use block::{Block, BlockInput, Effect, Scope};
pub use classify::classify;
pub use engine::{CanonicalRow, canonize_row, canonize_rows};
pub use graph::{Modality, OptionGraph, OptionNode};
pub use operator::{BlockReading, Operator, RestrictionKind};
pub use state::{Domain, LatentOption, LatentReason, LineState, Restriction, apply};
pub use vocabulary::{Lexicon, Vocabulary, VocabularyError};

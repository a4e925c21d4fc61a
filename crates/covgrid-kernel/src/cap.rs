//! Cap (tope) values as one tagged variant.

use crate::assignment::{Atom, AtomValue};
use crate::normalize::unit;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cap {
    /// "Sin tope".
    NoCap,
    Amount { unit: String, value: f64 },
    /// Text that could not be read as a cap; kept for the reviewer.
    Unknown { raw: String },
}

impl Cap {
    pub fn amount(unit: &str, value: f64) -> Self {
        Cap::Amount {
            unit: unit.to_string(),
            value,
        }
    }

    pub fn unknown(raw: impl Into<String>) -> Self {
        Cap::Unknown { raw: raw.into() }
    }

    pub fn from_atom(atom: &Atom) -> Self {
        match &atom.value {
            Some(value) if value.is_no_cap() => Cap::NoCap,
            Some(AtomValue::Number(n)) if !unit::is_trivial(&atom.unit) => {
                Cap::amount(&atom.unit, *n)
            }
            _ => Cap::unknown(atom.original_text.clone()),
        }
    }

    pub fn is_no_cap(&self) -> bool {
        matches!(self, Cap::NoCap)
    }
}

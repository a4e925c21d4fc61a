//! # covgrid kernel
//!
//! Shared contracts for auditing an extracted benefits grid: the spatial map
//! produced by the upstream layout reader, the draft assignments that point
//! from a grid cell to its evidence, and the typed atoms parsed out of raw
//! evidence text.
//!
//! Nothing in this crate decides whether a document is trustworthy. It only
//! fixes the vocabulary the validators speak:
//!
//! ```text
//! SpatialMap            ← columns, rows, zones, row-zone policy
//!     │
//! Assignment            ← (row, column) → Pointer + atoms + status
//!     │
//! Atom / Cap            ← normalized value + unit + confidence
//!     │
//! GateStatus, Warning   ← PASS/FAIL/WARN per named gate, witnessed warnings
//! ```

pub mod assignment;
pub mod cap;
pub mod error;
pub mod gate;
pub mod geometry;
pub mod io;
pub mod normalize;
pub mod spatial;
pub mod witness;

pub use assignment::{
    Assignment, AssignmentConfidence, AssignmentStatus, Atom, AtomEntry, AtomValue,
    ConditionAtom, ConditionKind, Pointer,
};
pub use cap::Cap;
pub use error::CovgridError;
pub use gate::{GateStatus, QcGates, gate_name};
pub use geometry::{BBox, Span};
pub use normalize::{Normalized, normalize, normalize_atom};
pub use spatial::{
    Column, GeometricScope, Row, RowGroup, RowZonePolicy, RowZoneRule, ScopeMode, SpatialMap,
    Zone, ZoneConfidence, ZoneRequirement, ZoneType,
};
pub use witness::{Severity, Warning, warning_type};

//! The spatial map: columns, rows, and graphic zones of one table page.

use crate::geometry::{self, Span};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub id: String,
    pub x_range: Span,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Row {
    pub id: String,
    pub y_range: Span,
    #[serde(default)]
    pub raw_text: String,
}

/// Zone type. Unknown spellings are kept verbatim so the geometer can
/// report them instead of the whole document failing to load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneType {
    GraphicRule,
    Exclusion,
    Cut,
    #[serde(untagged)]
    Other(String),
}

impl ZoneType {
    pub fn is_known(&self) -> bool {
        !matches!(self, ZoneType::Other(_))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeMode {
    #[default]
    RectFall,
    RowBand,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GeometricScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_range: Option<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_range: Option<Span>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ZoneConfidence {
    #[serde(default)]
    pub geometry: f64,
    #[serde(default)]
    pub text: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Zone {
    pub id: String,
    pub zone_type: ZoneType,
    #[serde(default)]
    pub scope_mode: ScopeMode,
    #[serde(default)]
    pub geometric_scope: GeometricScope,
    /// The zone's text. Extractors that only flag text presence send a
    /// boolean; that carries no text and is read as `None`.
    #[serde(default, deserialize_with = "text_or_flag")]
    pub contains_text: Option<String>,
    #[serde(default)]
    pub confidence: ZoneConfidence,
    #[serde(default)]
    pub applies_to_columns: Vec<String>,
    #[serde(default)]
    pub has_conditions: bool,
    #[serde(default)]
    pub synthetic_geometry: bool,
}

impl Zone {
    pub fn text(&self) -> &str {
        self.contains_text.as_deref().unwrap_or("")
    }

    /// Row/zone intersection: a ROW_BAND zone spans the whole row axis, a
    /// RECT_FALL zone needs its y-range to overlap the row's.
    pub fn intersects_row(&self, row: &Row) -> bool {
        match self.scope_mode {
            ScopeMode::RowBand => true,
            ScopeMode::RectFall => self
                .geometric_scope
                .y_range
                .as_ref()
                .is_some_and(|y| geometry::overlaps(y, &row.y_range)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ZoneRequirement {
    #[serde(rename = "REQUIRE")]
    Require,
    #[serde(rename = "NONE")]
    NoZone,
    #[default]
    #[serde(rename = "ALLOW")]
    Allow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowZoneRule {
    /// Regular expression matched against the row id.
    pub pattern: String,
    pub policy: ZoneRequirement,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowZonePolicy {
    #[serde(default)]
    pub default: ZoneRequirement,
    /// Evaluated in order; first match wins.
    #[serde(default)]
    pub rules: Vec<RowZoneRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowGroup {
    pub id: String,
    #[serde(default)]
    pub row_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SpatialMap {
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_groups: Option<Vec<RowGroup>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_zone_policy: Option<RowZonePolicy>,
}

impl SpatialMap {
    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn row(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// The first column whose x-range contains `x` (widened by `epsilon`).
    pub fn column_at(&self, x: f64, epsilon: f64) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| geometry::contains(&c.x_range, x, epsilon))
    }

    /// Bottom edge of the lowest known row, if any.
    pub fn rows_bottom(&self) -> Option<f64> {
        self.rows
            .iter()
            .map(|r| geometry::bounds(&r.y_range).1)
            .reduce(f64::max)
    }
}

fn full_confidence() -> f64 {
    1.0
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrFlag {
    Text(String),
    // Presence flag only; the value is dropped.
    #[allow(dead_code)]
    Flag(bool),
}

fn text_or_flag<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<TextOrFlag>::deserialize(deserializer)? {
        Some(TextOrFlag::Text(text)) => Some(text),
        Some(TextOrFlag::Flag(_)) | None => None,
    })
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Text primitive, label span, and form field types for label association.
//!
//! These are plain values shared between the association engine, the
//! vision refinement stage, and the CLI. Geometry is expressed either in
//! page-relative `[0, 1]` units or in absolute page points; [`Rect`]
//! carries no unit tag, so conversion is the caller's responsibility (see
//! [`Rect::looks_absolute`]).

pub mod textract;

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Width and height of a page in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    /// Page width in points.
    pub width: f64,
    /// Page height in points.
    pub height: f64,
}

impl PageSize {
    /// US Letter (8.5 x 11 in at 72 dpi).
    pub const LETTER: Self = Self {
        width: 612.0,
        height: 792.0,
    };

    /// Creates a page size from width and height in points.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns `true` if both dimensions are finite and positive.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// An axis-aligned rectangle as `[x0, y0, x1, y1]`.
///
/// Serialized as a four-element array, matching the widget/template
/// field format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Rect {
    /// Left edge.
    pub x0: f64,
    /// Top edge.
    pub y0: f64,
    /// Right edge.
    pub x1: f64,
    /// Bottom edge.
    pub y1: f64,
}

impl From<[f64; 4]> for Rect {
    fn from([x0, y0, x1, y1]: [f64; 4]) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

impl From<Rect> for [f64; 4] {
    fn from(r: Rect) -> Self {
        [r.x0, r.y0, r.x1, r.y1]
    }
}

impl Rect {
    /// Creates a rectangle from its corners, reordering swapped edges.
    #[must_use]
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Rectangle width (never negative).
    #[must_use]
    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).max(0.0)
    }

    /// Rectangle height (never negative).
    #[must_use]
    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).max(0.0)
    }

    /// Centre point as `(x, y)`.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Smallest rectangle containing both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Returns `true` if any coordinate exceeds 1, i.e. the rectangle is
    /// expressed in absolute page points rather than relative units.
    #[must_use]
    pub fn looks_absolute(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .any(|v| *v > 1.0)
    }

    /// Divides every coordinate by the page dimensions.
    #[must_use]
    pub fn to_relative(&self, page: PageSize) -> Self {
        Self::new(
            self.x0 / page.width,
            self.y0 / page.height,
            self.x1 / page.width,
            self.y1 / page.height,
        )
    }

    /// Multiplies every coordinate by the page dimensions.
    #[must_use]
    pub fn to_absolute(&self, page: PageSize) -> Self {
        Self::new(
            self.x0 * page.width,
            self.y0 * page.height,
            self.x1 * page.width,
            self.y1 * page.height,
        )
    }

    /// Clamps every coordinate into `[min_x, max_x] x [min_y, max_y]`.
    #[must_use]
    pub fn clamp(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(
            self.x0.clamp(min_x, max_x),
            self.y0.clamp(min_y, max_y),
            self.x1.clamp(min_x, max_x),
            self.y1.clamp(min_y, max_y),
        )
    }

    /// Returns `true` if the rectangle has zero area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

/// A page-relative bounding box as `[left, top, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge, relative to page width.
    pub left: f64,
    /// Top edge, relative to page height.
    pub top: f64,
    /// Width, relative to page width.
    pub width: f64,
    /// Height, relative to page height.
    pub height: f64,
}

impl BoundingBox {
    /// Converts to corner form. Negative sizes collapse to zero.
    #[must_use]
    pub fn to_rect(&self) -> Rect {
        Rect::new(
            self.left,
            self.top,
            self.left + self.width.max(0.0),
            self.top + self.height.max(0.0),
        )
    }

    /// Vertical centre.
    #[must_use]
    pub fn center_y(&self) -> f64 {
        self.top + self.height.max(0.0) / 2.0
    }
}

/// Granularity of an OCR text primitive.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PrimitiveKind {
    /// A single OCR word token.
    Word,
    /// A full OCR text line.
    Line,
}

/// A typed OCR text primitive on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPrimitive {
    /// Word or line.
    pub kind: PrimitiveKind,
    /// Zero-based page index.
    pub page: u32,
    /// Raw OCR text.
    pub text: String,
    /// Page-relative bounding box.
    pub bbox: BoundingBox,
}

/// A colon-terminated run of words that reads as one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSpan {
    /// Normalized span text, always non-empty and never noise.
    pub text: String,
    /// Union of the contributing word boxes (relative units).
    pub bbox: Rect,
    /// Quantized vertical centre of the source line.
    pub row_center_y: f64,
}

/// A heading-shaped line used to name the section enclosing a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionHeader {
    /// Zero-based page index.
    pub page: u32,
    /// Top edge of the heading line (relative units).
    pub y: f64,
    /// Normalized uppercase heading text.
    pub text: String,
}

/// Kind of form field, as reported by widget introspection or a template.
///
/// Deserializes from widget type codes (`1` button, `2` checkbox, `3`
/// combobox, `4` listbox, `5` radio button, `6` signature, `7` text) or
/// from lowercase names. Anything unrecognised becomes [`Self::Other`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldType {
    /// Push button.
    Button,
    /// Checkbox.
    Checkbox,
    /// Combo box / dropdown.
    Combobox,
    /// List box.
    Listbox,
    /// Radio button.
    RadioButton,
    /// Signature field.
    Signature,
    /// Free text input.
    #[default]
    Text,
    /// Unrecognised widget type.
    Other,
}

impl FieldType {
    /// Maps a widget type code to a field type.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Button,
            2 => Self::Checkbox,
            3 => Self::Combobox,
            4 => Self::Listbox,
            5 => Self::RadioButton,
            6 => Self::Signature,
            7 => Self::Text,
            _ => Self::Other,
        }
    }

    /// Whether the printed label conventionally sits to the right of the
    /// widget rather than to its left or above.
    #[must_use]
    pub const fn is_checkbox_like(self) -> bool {
        matches!(self, Self::Checkbox | Self::RadioButton)
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(i64),
            Name(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Self::from_code(code),
            Raw::Name(name) => name
                .trim()
                .to_lowercase()
                .replace([' ', '-'], "_")
                .parse()
                .unwrap_or(Self::Other),
        })
    }
}

/// A form field to be labeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCandidate {
    /// Zero-based page index.
    pub page: u32,
    /// Field rectangle, in absolute points or relative units.
    pub rect: Rect,
    /// Widget type; missing means free text.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    /// Existing field name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Existing label, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Any other properties of the source record (e.g. `value`), carried
    /// through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FieldCandidate {
    /// Creates a field with no name, label, or extra properties.
    #[must_use]
    pub fn new(page: u32, rect: Rect, field_type: FieldType) -> Self {
        Self {
            page,
            rect,
            field_type: Some(field_type),
            name: None,
            label: None,
            extra: serde_json::Map::new(),
        }
    }

    /// The declared type, defaulting to [`FieldType::Text`].
    #[must_use]
    pub fn kind(&self) -> FieldType {
        self.field_type.unwrap_or_default()
    }
}

/// Where a resolved label came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LabelSource {
    /// A colon-cut label span.
    Span,
    /// A whole OCR line (proximity fallback).
    Line,
    /// The label the field already carried.
    Existing,
    /// Replaced by the vision oracle.
    Vision,
    /// No label could be justified.
    #[default]
    None,
}

/// A field enriched with its resolved label, section, and unique name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResult {
    /// Zero-based page index.
    pub page: u32,
    /// Field rectangle exactly as supplied.
    pub rect: Rect,
    /// Widget type; missing means free text.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    /// Unique name within the extraction run.
    pub name: String,
    /// Resolved label, if any.
    #[serde(default)]
    pub label: Option<String>,
    /// Enclosing section heading, if any.
    #[serde(default)]
    pub section: Option<String>,
    /// Best candidate texts in match order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_candidates: Vec<String>,
    /// Where `label` came from.
    #[serde(default)]
    pub label_source: LabelSource,
    /// Pass-through properties of the source record.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FieldResult {
    /// The declared type, defaulting to [`FieldType::Text`].
    #[must_use]
    pub fn kind(&self) -> FieldType {
        self.field_type.unwrap_or_default()
    }
}

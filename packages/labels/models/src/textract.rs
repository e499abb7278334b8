//! OCR oracle wire format.
//!
//! Mirrors the subset of a Textract-style `AnalyzeDocument` response the
//! association engine reads: `Blocks` with a `BlockType`, `Text`, 1-based
//! `Page`, and a relative `Geometry.BoundingBox`. Everything else in the
//! response is ignored.

use serde::{Deserialize, Serialize};

use crate::{BoundingBox, PrimitiveKind};

/// One page (or one image) worth of OCR blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockPage {
    /// Raw blocks, in oracle order.
    #[serde(default, alias = "Blocks")]
    pub blocks: Vec<TextractBlock>,
}

/// A single OCR block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextractBlock {
    /// `WORD`, `LINE`, `PAGE`, `KEY_VALUE_SET`, `TABLE`, ...
    pub block_type: String,
    /// Recognized text (absent for structural blocks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// 1-based page number; absent for single-image responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Block geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<TextractGeometry>,
}

/// Block geometry container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextractGeometry {
    /// Axis-aligned box in page-relative units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<TextractBoundingBox>,
}

/// Page-relative bounding box as emitted by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextractBoundingBox {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl From<TextractBoundingBox> for BoundingBox {
    fn from(b: TextractBoundingBox) -> Self {
        Self {
            left: b.left,
            top: b.top,
            width: b.width,
            height: b.height,
        }
    }
}

impl TextractBlock {
    /// The primitive kind for `WORD`/`LINE` blocks, `None` for anything else.
    #[must_use]
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.block_type.as_str() {
            "WORD" => Some(PrimitiveKind::Word),
            "LINE" => Some(PrimitiveKind::Line),
            _ => None,
        }
    }

    /// The bounding box, if the block carries one.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.geometry
            .as_ref()
            .and_then(|g| g.bounding_box)
            .map(BoundingBox::from)
    }
}

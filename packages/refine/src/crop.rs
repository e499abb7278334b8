//! Crop windows around fields.
//!
//! The window is where the printed label is expected to sit: a strip to
//! the right of checkbox-like widgets, and a wider box to the left of (and
//! slightly above) every other widget. Offsets are in PDF points so the
//! window covers the same physical area whatever the page size.

use form_labeler_labels_models::{FieldType, PageSize, Rect};

use crate::RefineError;

/// Offsets from the field edges, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropOffsets {
    /// Added to the anchor edge for the window's left side.
    pub left: f64,
    /// Added to the field top for the window's top side.
    pub top: f64,
    /// Added to the anchor edge for the window's right side.
    pub right: f64,
    /// Added to the field bottom for the window's bottom side.
    pub bottom: f64,
}

/// Window to the right of a checkbox, anchored on its right edge.
pub const CHECKBOX_OFFSETS: CropOffsets = CropOffsets {
    left: 8.0,
    top: -12.0,
    right: 260.0,
    bottom: 12.0,
};

/// Window to the left of other fields, anchored on their left edge.
pub const LEFT_OFFSETS: CropOffsets = CropOffsets {
    left: -320.0,
    top: -30.0,
    right: 24.0,
    bottom: 24.0,
};

/// Computes the page-relative crop window for a field.
///
/// `rect` may be in points or relative units (auto-detected as in label
/// resolution).
///
/// # Errors
///
/// Returns [`RefineError::Crop`] if the page size is unusable or the
/// window falls entirely outside the page.
pub fn crop_region(rect: &Rect, kind: FieldType, page: PageSize) -> Result<Rect, RefineError> {
    if !page.is_usable() {
        return Err(RefineError::Crop {
            message: format!("unusable page size {}x{}", page.width, page.height),
        });
    }

    let points = if rect.looks_absolute() {
        Rect::new(rect.x0, rect.y0, rect.x1, rect.y1)
    } else {
        rect.to_absolute(page)
    };

    let (anchor, offsets) = if kind.is_checkbox_like() {
        (points.x1, CHECKBOX_OFFSETS)
    } else {
        (points.x0, LEFT_OFFSETS)
    };

    let window = Rect::new(
        anchor + offsets.left,
        points.y0 + offsets.top,
        anchor + offsets.right,
        points.y1 + offsets.bottom,
    )
    .clamp(0.0, 0.0, page.width, page.height);

    if window.is_empty() {
        return Err(RefineError::Crop {
            message: format!(
                "crop window for field at [{:.1}, {:.1}, {:.1}, {:.1}] is outside the page",
                points.x0, points.y0, points.x1, points.y1
            ),
        });
    }

    Ok(window.to_relative(page))
}

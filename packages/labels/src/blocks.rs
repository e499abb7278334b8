//! OCR block normalization and line reconstruction.
//!
//! Flattens per-page oracle output into one sequence of
//! [`TextPrimitive`]s with 0-based page indices, then rebuilds text lines
//! from word tokens by quantizing each word's vertical centre. The
//! reconstructed lines feed span cutting; native `LINE` blocks (topped up
//! with reconstructed lines where the oracle left gaps) feed section
//! detection and the whole-line fallback.

use std::collections::BTreeMap;

use form_labeler_labels_models::textract::BlockPage;
use form_labeler_labels_models::{BoundingBox, PrimitiveKind, Rect, TextPrimitive};

use crate::filter::normalize_text;

/// Converts raw oracle pages into primitives.
///
/// `pages[i]` is the batch for 1-based page `i + 1`; blocks without a
/// `Page` tag inherit that number. Non-text blocks and blocks without
/// geometry are skipped. Output pages are 0-based.
#[must_use]
pub fn flatten_block_pages(pages: &[BlockPage]) -> Vec<TextPrimitive> {
    let mut primitives = Vec::new();
    let mut skipped = 0_usize;

    for (batch_page, page) in (1_u32..).zip(pages) {
        for block in &page.blocks {
            let Some(kind) = block.primitive_kind() else {
                continue;
            };
            let Some(bbox) = block.bounding_box() else {
                skipped += 1;
                continue;
            };
            let page_number = block.page.unwrap_or(batch_page);

            primitives.push(TextPrimitive {
                kind,
                page: page_number.saturating_sub(1),
                text: block.text.clone().unwrap_or_default(),
                bbox,
            });
        }
    }

    if skipped > 0 {
        log::debug!("Skipped {skipped} text blocks without geometry");
    }
    log::debug!(
        "Flattened {} pages into {} text primitives",
        pages.len(),
        primitives.len()
    );

    primitives
}

/// Words sharing one quantized vertical centre on one page, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedLine {
    /// Zero-based page index.
    pub page: u32,
    /// Quantized vertical centre.
    pub center_y: f64,
    /// Member words sorted by left edge.
    pub words: Vec<TextPrimitive>,
}

impl ReconstructedLine {
    /// Normalized line text.
    #[must_use]
    pub fn text(&self) -> String {
        normalize_text(
            &self
                .words
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    /// Union of the word boxes.
    #[must_use]
    pub fn rect(&self) -> Option<Rect> {
        self.words
            .iter()
            .map(|w| w.bbox.to_rect())
            .reduce(|a, b| a.union(&b))
    }

    /// The line as a `LINE` primitive.
    #[must_use]
    pub fn to_primitive(&self) -> Option<TextPrimitive> {
        let rect = self.rect()?;
        Some(TextPrimitive {
            kind: PrimitiveKind::Line,
            page: self.page,
            text: self.text(),
            bbox: BoundingBox {
                left: rect.x0,
                top: rect.y0,
                width: rect.width(),
                height: rect.height(),
            },
        })
    }
}

/// Quantizes a coordinate to `precision` decimal places as an integer key.
#[allow(clippy::cast_possible_truncation)]
fn quantize(value: f64, precision: u32) -> i64 {
    let scale = 10_f64.powi(i32::try_from(precision.min(9)).unwrap_or(9));
    (value * scale).round() as i64
}

/// Groups `WORD` primitives into lines keyed by `(page, quantized centre)`.
///
/// Lines come back ordered by page, then top to bottom.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reconstruct_lines(primitives: &[TextPrimitive], precision: u32) -> Vec<ReconstructedLine> {
    let mut groups: BTreeMap<(u32, i64), Vec<TextPrimitive>> = BTreeMap::new();

    for word in primitives.iter().filter(|p| p.kind == PrimitiveKind::Word) {
        let key = (word.page, quantize(word.bbox.center_y(), precision));
        groups.entry(key).or_default().push(word.clone());
    }

    let scale = 10_f64.powi(i32::try_from(precision.min(9)).unwrap_or(9));

    groups
        .into_iter()
        .map(|((page, key), mut words)| {
            words.sort_by(|a, b| a.bbox.left.total_cmp(&b.bbox.left));
            ReconstructedLine {
                page,
                center_y: key as f64 / scale,
                words,
            }
        })
        .collect()
}

/// Returns the line primitives for every page: native `LINE` blocks plus
/// any reconstructed line whose centre no native line covers.
#[must_use]
pub fn complete_lines(
    primitives: &[TextPrimitive],
    reconstructed: &[ReconstructedLine],
) -> Vec<TextPrimitive> {
    let native: Vec<&TextPrimitive> = primitives
        .iter()
        .filter(|p| p.kind == PrimitiveKind::Line)
        .collect();

    let mut lines: Vec<TextPrimitive> = native.iter().map(|p| (*p).clone()).collect();
    let mut added = 0_usize;

    for line in reconstructed {
        let Some(prim) = line.to_primitive() else {
            continue;
        };
        let (cx, cy) = prim.bbox.to_rect().center();
        let covered = native.iter().any(|n| {
            let r = n.bbox.to_rect();
            n.page == prim.page && r.x0 <= cx && cx <= r.x1 && r.y0 <= cy && cy <= r.y1
        });
        if !covered {
            lines.push(prim);
            added += 1;
        }
    }

    if added > 0 {
        log::debug!(
            "Reconstructed {added} lines missing from OCR line output ({} native)",
            native.len()
        );
    }

    lines
}

/// The normalized text layer for one extraction run.
#[derive(Debug, Clone, Default)]
pub struct TextLayout {
    /// Every primitive, 0-based pages.
    pub primitives: Vec<TextPrimitive>,
    /// Lines rebuilt from words.
    pub lines: Vec<ReconstructedLine>,
    /// Native lines topped up with reconstructed ones.
    pub line_primitives: Vec<TextPrimitive>,
}

impl TextLayout {
    /// Builds the layout from already-flattened primitives.
    #[must_use]
    pub fn from_primitives(primitives: Vec<TextPrimitive>, precision: u32) -> Self {
        let lines = reconstruct_lines(&primitives, precision);
        let line_primitives = complete_lines(&primitives, &lines);
        Self {
            primitives,
            lines,
            line_primitives,
        }
    }

    /// Builds the layout from raw oracle pages.
    #[must_use]
    pub fn from_block_pages(pages: &[BlockPage], precision: u32) -> Self {
        Self::from_primitives(flatten_block_pages(pages), precision)
    }
}

#[cfg(test)]
mod tests {
    use form_labeler_labels_models::textract::{
        TextractBlock, TextractBoundingBox, TextractGeometry,
    };

    use super::*;

    fn block(kind: &str, text: &str, page: Option<u32>, bbox: Option<[f64; 4]>) -> TextractBlock {
        TextractBlock {
            block_type: kind.to_string(),
            text: Some(text.to_string()),
            page,
            geometry: bbox.map(|[left, top, width, height]| TextractGeometry {
                bounding_box: Some(TextractBoundingBox {
                    left,
                    top,
                    width,
                    height,
                }),
            }),
        }
    }

    fn word(page: u32, text: &str, left: f64, top: f64) -> TextPrimitive {
        TextPrimitive {
            kind: PrimitiveKind::Word,
            page,
            text: text.to_string(),
            bbox: BoundingBox {
                left,
                top,
                width: 0.05,
                height: 0.01,
            },
        }
    }

    #[test]
    fn missing_page_tag_inherits_batch_page() {
        let pages = vec![
            BlockPage {
                blocks: vec![block("WORD", "A:", None, Some([0.1, 0.1, 0.05, 0.01]))],
            },
            BlockPage {
                blocks: vec![
                    block("WORD", "B:", None, Some([0.1, 0.1, 0.05, 0.01])),
                    block("WORD", "C:", Some(5), Some([0.1, 0.2, 0.05, 0.01])),
                ],
            },
        ];
        let prims = flatten_block_pages(&pages);
        let pages: Vec<u32> = prims.iter().map(|p| p.page).collect();
        assert_eq!(pages, vec![0, 1, 4]);
    }

    #[test]
    fn skips_structural_and_geometryless_blocks() {
        let pages = vec![BlockPage {
            blocks: vec![
                block("PAGE", "", None, Some([0.0, 0.0, 1.0, 1.0])),
                block("KEY_VALUE_SET", "", None, Some([0.1, 0.1, 0.2, 0.1])),
                block("WORD", "lost", None, None),
                block("LINE", "kept", None, Some([0.1, 0.1, 0.3, 0.02])),
            ],
        }];
        let prims = flatten_block_pages(&pages);
        assert_eq!(prims.len(), 1);
        assert_eq!(prims[0].kind, PrimitiveKind::Line);
        assert_eq!(prims[0].text, "kept");
    }

    #[test]
    fn groups_words_by_quantized_centre_and_sorts_left_to_right() {
        let words = vec![
            word(0, "NAME:", 0.30, 0.500),
            word(0, "FULL", 0.10, 0.500),
            word(0, "OTHER:", 0.10, 0.600),
            word(1, "NAME:", 0.10, 0.500),
        ];
        let lines = reconstruct_lines(&words, 3);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].page, 0);
        assert_eq!(lines[0].text(), "FULL NAME:");
        assert!((lines[0].center_y - 0.505).abs() < 1e-9);
        assert_eq!(lines[1].text(), "OTHER:");
        assert_eq!(lines[2].page, 1);
    }

    #[test]
    fn ignores_line_primitives_when_reconstructing() {
        let mut prims = vec![word(0, "A:", 0.1, 0.1)];
        prims.push(TextPrimitive {
            kind: PrimitiveKind::Line,
            ..word(0, "A:", 0.1, 0.1)
        });
        assert_eq!(reconstruct_lines(&prims, 3).len(), 1);
    }

    #[test]
    fn reconstructed_lines_fill_gaps_in_native_lines() {
        let mut prims = vec![
            word(0, "COVERED:", 0.10, 0.10),
            word(0, "MISSING", 0.10, 0.50),
            word(0, "LINE:", 0.16, 0.50),
        ];
        prims.push(TextPrimitive {
            kind: PrimitiveKind::Line,
            page: 0,
            text: "COVERED:".to_string(),
            bbox: BoundingBox {
                left: 0.09,
                top: 0.095,
                width: 0.1,
                height: 0.02,
            },
        });
        let layout = TextLayout::from_primitives(prims, 3);
        let texts: Vec<&str> = layout
            .line_primitives
            .iter()
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(texts, vec!["COVERED:", "MISSING LINE:"]);
    }

    #[test]
    fn words_only_layout_builds_all_lines() {
        let layout = TextLayout::from_primitives(
            vec![word(0, "ONE:", 0.1, 0.1), word(0, "TWO:", 0.1, 0.2)],
            3,
        );
        assert_eq!(layout.line_primitives.len(), 2);
        assert!(
            layout
                .line_primitives
                .iter()
                .all(|l| l.kind == PrimitiveKind::Line)
        );
    }
}

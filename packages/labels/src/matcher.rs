//! Geometric label candidate matching.
//!
//! Every field is matched against the label spans of its page under a
//! type-specific rule:
//!
//! - checkbox-like fields take the nearest span to their **right** on the
//!   same row band;
//! - every other field takes the nearest span to its **left** on the same
//!   row band, and failing that the nearest span **above** it within a
//!   vertical window.
//!
//! When no span qualifies, whole OCR lines near the field are tried as a
//! proximity fallback. Candidates are ranked by a total order (distance
//! first, text last) so the winner is reproducible for identical input.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use form_labeler_labels_models::{
    FieldCandidate, FieldType, LabelSource, LabelSpan, PageSize, Rect, TextPrimitive,
};

use crate::config::{GeometryConfig, LabelConfig};
use crate::filter::{is_all_caps, is_noise, normalize_text, word_count};

/// Converts a field rectangle into clamped page-relative units.
///
/// Rectangles with any coordinate above 1 are treated as absolute points
/// and divided by the page's size from `page_sizes`, or by the configured
/// default page size when the page is missing or unusable.
#[must_use]
pub fn relative_field_rect(
    field: &FieldCandidate,
    page_sizes: &BTreeMap<u32, PageSize>,
    geometry: &GeometryConfig,
) -> Rect {
    let rect = Rect::new(field.rect.x0, field.rect.y0, field.rect.x1, field.rect.y1);

    let rect = if rect.looks_absolute() {
        let size = match page_sizes.get(&field.page) {
            Some(size) if size.is_usable() => *size,
            _ => {
                log::debug!(
                    "No page size for page {}, assuming {}x{}",
                    field.page,
                    geometry.default_page_width,
                    geometry.default_page_height
                );
                PageSize::new(geometry.default_page_width, geometry.default_page_height)
            }
        };
        rect.to_relative(size)
    } else {
        rect
    };

    rect.clamp(0.0, 0.0, 1.0, 1.0)
}

/// The winning label for one field and its runners-up.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMatch {
    /// Chosen label text.
    pub label: String,
    /// Whether the label came from a span or a whole line.
    pub source: LabelSource,
    /// Ranked candidate texts, best first, winner included.
    pub candidates: Vec<String>,
}

/// Text with geometry, from either a span or a line.
#[derive(Debug, Clone)]
struct Candidate {
    text: String,
    rect: Rect,
    center_y: f64,
}

impl Candidate {
    fn from_span(span: &LabelSpan) -> Self {
        Self {
            text: span.text.clone(),
            rect: span.bbox,
            center_y: span.row_center_y,
        }
    }

    fn from_line(line: &TextPrimitive) -> Self {
        let rect = line.bbox.to_rect();
        Self {
            text: normalize_text(&line.text),
            center_y: rect.center().1,
            rect,
        }
    }

    fn has_colon(&self) -> bool {
        self.text.ends_with(':')
    }

    /// All-caps text without a colon reads as a heading, not a label.
    fn looks_like_heading(&self) -> bool {
        !self.has_colon() && is_all_caps(&self.text)
    }
}

/// Sort key: `(primary, secondary, colon rank, -length, text)`.
#[derive(Debug, Clone)]
struct Ranked {
    primary: f64,
    secondary: f64,
    colon_rank: u8,
    len: usize,
    text: String,
}

impl Ranked {
    fn new(candidate: &Candidate, primary: f64, secondary: f64, prefer_colon: bool) -> Self {
        Self {
            primary,
            secondary,
            colon_rank: u8::from(prefer_colon && !candidate.has_colon()),
            len: candidate.text.chars().count(),
            text: candidate.text.clone(),
        }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        self.primary
            .total_cmp(&other.primary)
            .then_with(|| self.secondary.total_cmp(&other.secondary))
            .then_with(|| self.colon_rank.cmp(&other.colon_rank))
            .then_with(|| other.len.cmp(&self.len))
            .then_with(|| self.text.cmp(&other.text))
    }
}

fn in_row_band(candidate: &Candidate, field_center_y: f64, geometry: &GeometryConfig) -> bool {
    (candidate.center_y - field_center_y).abs() <= geometry.row_tolerance
}

/// Right-side same-row candidates for checkbox-like fields.
fn rank_right(candidates: &[Candidate], field: &Rect, geometry: &GeometryConfig) -> Vec<Ranked> {
    let (_, fcy) = field.center();
    candidates
        .iter()
        .filter(|c| in_row_band(c, fcy, geometry) && c.rect.x0 >= field.x1)
        .filter(|c| !c.looks_like_heading())
        .filter_map(|c| {
            let gap = c.rect.x0 - field.x1;
            (geometry.checkbox_min_dx..=geometry.checkbox_max_dx)
                .contains(&gap)
                .then(|| Ranked::new(c, gap, 0.0, true))
        })
        .collect()
}

/// Left-side same-row candidates that overlap the field vertically.
fn rank_left(candidates: &[Candidate], field: &Rect, geometry: &GeometryConfig) -> Vec<Ranked> {
    let (_, fcy) = field.center();
    candidates
        .iter()
        .filter(|c| in_row_band(c, fcy, geometry) && c.rect.x1 <= field.x0)
        .filter(|c| c.rect.y0 <= field.y1 && c.rect.y1 >= field.y0)
        .map(|c| Ranked::new(c, field.x0 - c.rect.x1, 0.0, true))
        .collect()
}

/// Candidates ending above the field within the vertical window.
fn rank_above(candidates: &[Candidate], field: &Rect, geometry: &GeometryConfig) -> Vec<Ranked> {
    let (fcx, _) = field.center();
    candidates
        .iter()
        .filter(|c| c.rect.y1 <= field.y0 && field.y0 - c.rect.y1 <= geometry.above_window)
        .map(|c| {
            let dy = field.y0 - c.rect.y1;
            let hx = (c.rect.center().0 - fcx).abs();
            Ranked::new(c, dy, hx, false)
        })
        .collect()
}

/// Lines left of or above the field, by centre distance.
fn rank_nearby(candidates: &[Candidate], field: &Rect, geometry: &GeometryConfig) -> Vec<Ranked> {
    let (fcx, fcy) = field.center();
    candidates
        .iter()
        .filter(|c| c.rect.x1 <= field.x0 || c.rect.y1 <= field.y0)
        .filter(|c| !c.looks_like_heading())
        .filter_map(|c| {
            let (cx, cy) = c.rect.center();
            let dist = (cx - fcx).hypot(cy - fcy);
            (dist <= geometry.proximity_max_distance).then(|| Ranked::new(c, dist, 0.0, true))
        })
        .collect()
}

fn span_candidates(
    kind: FieldType,
    rect: &Rect,
    spans: &[Candidate],
    geometry: &GeometryConfig,
) -> Vec<Ranked> {
    if kind.is_checkbox_like() {
        return rank_right(spans, rect, geometry);
    }
    let left = rank_left(spans, rect, geometry);
    if left.is_empty() {
        rank_above(spans, rect, geometry)
    } else {
        left
    }
}

fn line_candidates(
    kind: FieldType,
    rect: &Rect,
    lines: &[TextPrimitive],
    config: &LabelConfig,
) -> Vec<Ranked> {
    let geometry = &config.geometry;
    let lines: Vec<Candidate> = lines
        .iter()
        .map(Candidate::from_line)
        .filter(|c| {
            !c.text.is_empty()
                && !is_noise(&c.text)
                && word_count(&c.text) <= geometry.max_label_words
        })
        .collect();

    if kind.is_checkbox_like() {
        rank_right(&lines, rect, geometry)
    } else {
        rank_nearby(&lines, rect, geometry)
    }
}

/// Picks the best label for one field.
///
/// `rect` must already be page-relative (see [`relative_field_rect`]);
/// `spans` and `lines` must belong to the field's page. Returns `None` when
/// nothing qualifies.
#[must_use]
pub fn match_field(
    kind: FieldType,
    rect: &Rect,
    spans: &[LabelSpan],
    lines: &[TextPrimitive],
    config: &LabelConfig,
) -> Option<LabelMatch> {
    let span_pool: Vec<Candidate> = spans
        .iter()
        .map(Candidate::from_span)
        .filter(|c| !is_noise(&c.text))
        .collect();

    let mut ranked = span_candidates(kind, rect, &span_pool, &config.geometry);
    let mut source = LabelSource::Span;

    if ranked.is_empty() && config.matching.line_fallback {
        ranked = line_candidates(kind, rect, lines, config);
        source = LabelSource::Line;
    }

    ranked.sort_by(Ranked::cmp);

    let mut candidates: Vec<String> = Vec::new();
    for r in ranked {
        if candidates.len() >= config.geometry.candidate_count.max(1) {
            break;
        }
        if !candidates.contains(&r.text) {
            candidates.push(r.text);
        }
    }

    let label = candidates.first()?.clone();
    Some(LabelMatch {
        label,
        source,
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use form_labeler_labels_models::{BoundingBox, PrimitiveKind};

    use super::*;

    fn span(text: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> LabelSpan {
        LabelSpan {
            text: text.to_string(),
            bbox: Rect::new(x0, y0, x1, y1),
            row_center_y: (y0 + y1) / 2.0,
        }
    }

    fn line(text: &str, left: f64, top: f64, width: f64) -> TextPrimitive {
        TextPrimitive {
            kind: PrimitiveKind::Line,
            page: 0,
            text: text.to_string(),
            bbox: BoundingBox {
                left,
                top,
                width,
                height: 0.02,
            },
        }
    }

    fn text_field() -> Rect {
        Rect::new(0.40, 0.49, 0.70, 0.51)
    }

    #[test]
    fn nearest_left_span_on_the_row_wins() {
        let spans = vec![
            span("FULL LEGAL NAME:", 0.05, 0.49, 0.20, 0.51),
            span("NAME:", 0.30, 0.49, 0.38, 0.51),
            span("ABOVE LABEL:", 0.40, 0.29, 0.55, 0.31),
        ];
        let m = match_field(FieldType::Text, &text_field(), &spans, &[], &LabelConfig::default())
            .unwrap();
        assert_eq!(m.label, "NAME:");
        assert_eq!(m.source, LabelSource::Span);
        assert_eq!(m.candidates, vec!["NAME:", "FULL LEGAL NAME:"]);
    }

    #[test]
    fn falls_back_to_span_above_within_window() {
        let spans = vec![
            span("Mailing address:", 0.40, 0.44, 0.55, 0.46),
            span("Far above:", 0.40, 0.20, 0.50, 0.22),
        ];
        let m = match_field(FieldType::Text, &text_field(), &spans, &[], &LabelConfig::default())
            .unwrap();
        assert_eq!(m.label, "Mailing address:");
        assert_eq!(m.candidates.len(), 1);
    }

    #[test]
    fn above_ties_break_on_horizontal_offset() {
        let spans = vec![
            span("Off to the side:", 0.05, 0.44, 0.15, 0.46),
            span("Centered label:", 0.50, 0.44, 0.60, 0.46),
        ];
        let m = match_field(FieldType::Text, &text_field(), &spans, &[], &LabelConfig::default())
            .unwrap();
        assert_eq!(m.label, "Centered label:");
    }

    #[test]
    fn equal_gaps_prefer_the_longer_text() {
        let field = Rect::new(0.50, 0.49, 0.70, 0.51);
        let spans = vec![
            span("DOB:", 0.40, 0.49, 0.45, 0.51),
            span("DATE OF BIRTH:", 0.40, 0.49, 0.45, 0.51),
        ];
        let m = match_field(FieldType::Text, &field, &spans, &[], &LabelConfig::default()).unwrap();
        assert_eq!(m.label, "DATE OF BIRTH:");
    }

    #[test]
    fn checkbox_only_considers_right_side() {
        let field = Rect::new(0.10, 0.49, 0.12, 0.51);
        let spans = vec![
            span("Closer left:", 0.05, 0.49, 0.095, 0.51),
            span("I agree:", 0.14, 0.49, 0.25, 0.51),
        ];
        let m = match_field(FieldType::Checkbox, &field, &spans, &[], &LabelConfig::default())
            .unwrap();
        assert_eq!(m.label, "I agree:");
        assert_eq!(m.candidates, vec!["I agree:"]);

        let left_only = vec![span("Closer left:", 0.05, 0.49, 0.095, 0.51)];
        assert!(
            match_field(FieldType::Checkbox, &field, &left_only, &[], &LabelConfig::default())
                .is_none()
        );
    }

    #[test]
    fn checkbox_gap_is_bounded() {
        let field = Rect::new(0.10, 0.49, 0.12, 0.51);
        let spans = vec![span("Too far:", 0.60, 0.49, 0.70, 0.51)];
        assert!(
            match_field(FieldType::RadioButton, &field, &spans, &[], &LabelConfig::default())
                .is_none()
        );
    }

    #[test]
    fn checkbox_line_fallback_rejects_headings() {
        let field = Rect::new(0.10, 0.49, 0.12, 0.51);
        let lines = vec![line("YES", 0.13, 0.49, 0.05), line("Married", 0.20, 0.49, 0.08)];
        let m = match_field(FieldType::Checkbox, &field, &[], &lines, &LabelConfig::default())
            .unwrap();
        assert_eq!(m.label, "Married");
        assert_eq!(m.source, LabelSource::Line);
    }

    #[test]
    fn row_band_excludes_other_rows() {
        let spans = vec![span("Next row:", 0.20, 0.55, 0.35, 0.57)];
        let mut config = LabelConfig::default();
        config.matching.line_fallback = false;
        assert!(match_field(FieldType::Text, &text_field(), &spans, &[], &config).is_none());
    }

    #[test]
    fn noise_is_never_selected() {
        let lines = vec![line("Page 2 of 10", 0.20, 0.49, 0.15)];
        assert!(
            match_field(FieldType::Text, &text_field(), &[], &lines, &LabelConfig::default())
                .is_none()
        );
    }

    #[test]
    fn line_fallback_uses_nearest_line() {
        let lines = vec![
            line("Name of employer", 0.25, 0.49, 0.13),
            line("Something further away", 0.00, 0.30, 0.10),
            line(
                "This is a very long line of instructions that cannot be a label",
                0.0,
                0.45,
                0.39,
            ),
        ];
        let m = match_field(FieldType::Text, &text_field(), &[], &lines, &LabelConfig::default())
            .unwrap();
        assert_eq!(m.label, "Name of employer");
        assert_eq!(m.source, LabelSource::Line);
    }

    #[test]
    fn line_fallback_can_be_disabled() {
        let lines = vec![line("Name of employer", 0.20, 0.49, 0.18)];
        let mut config = LabelConfig::default();
        config.matching.line_fallback = false;
        assert!(match_field(FieldType::Text, &text_field(), &[], &lines, &config).is_none());
    }

    #[test]
    fn absolute_rect_uses_page_size_or_letter_default() {
        let field = FieldCandidate::new(1, Rect::new(61.2, 396.0, 306.0, 411.84), FieldType::Text);
        let geometry = GeometryConfig::default();

        let assumed = relative_field_rect(&field, &BTreeMap::new(), &geometry);
        assert!((assumed.x0 - 0.1).abs() < 1e-9);
        assert!((assumed.y0 - 0.5).abs() < 1e-9);

        let sizes = BTreeMap::from([(1, PageSize::new(612.0, 1008.0))]);
        let legal = relative_field_rect(&field, &sizes, &geometry);
        assert!((legal.y0 - 396.0 / 1008.0).abs() < 1e-9);

        let unusable = BTreeMap::from([(1, PageSize::new(0.0, 0.0))]);
        assert_eq!(relative_field_rect(&field, &unusable, &geometry), assumed);
    }

    #[test]
    fn relative_rect_is_clamped() {
        let field = FieldCandidate::new(0, Rect::new(-0.1, 0.2, 0.5, 0.3), FieldType::Text);
        let rect = relative_field_rect(&field, &BTreeMap::new(), &GeometryConfig::default());
        assert!(rect.x0.abs() < f64::EPSILON);
        assert!((rect.x1 - 0.5).abs() < f64::EPSILON);
    }
}

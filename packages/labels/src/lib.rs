#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Label association engine for detected form fields.
//!
//! Given OCR text primitives for a document and the rectangles of its form
//! fields, infers for every field a short printed **label**, the enclosing
//! **section** heading, and a **name** that is unique within the run. The
//! pipeline is pure and synchronous:
//!
//! 1. [`blocks`] flattens oracle pages and rebuilds lines from words.
//! 2. [`spans`] cuts each line into colon-terminated label spans.
//! 3. [`sections`] indexes heading-shaped lines per page.
//! 4. [`matcher`] picks the best span (or line) for each field.
//! 5. [`naming`] synthesizes and de-duplicates field names.
//!
//! [`filter`] holds the noise and suspect predicates used throughout.

pub mod blocks;
pub mod config;
pub mod filter;
pub mod matcher;
pub mod naming;
pub mod sections;
pub mod spans;

use std::collections::BTreeMap;

use form_labeler_labels_models::textract::BlockPage;
use form_labeler_labels_models::{FieldCandidate, FieldResult, LabelSource, PageSize, TextPrimitive};

pub use blocks::TextLayout;
pub use config::{DEFAULT_CONFIG_TOML, LabelConfig, Lexicon};
pub use filter::{is_noise, is_suspect};
pub use naming::{NameRegistry, slugify};
pub use sections::SectionIndex;

/// Errors that can occur while loading association inputs.
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    /// TOML config parsing failed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output keys owned by [`FieldResult`]; stale copies in a field's
/// pass-through properties are dropped.
const RESULT_KEYS: &[&str] = &["section", "labelCandidates", "labelSource"];

/// The outcome of one association run.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Enriched fields, in input order.
    pub fields: Vec<FieldResult>,
    /// Headings detected across the document.
    pub sections: SectionIndex,
    /// Every name handed out during the run.
    pub registry: NameRegistry,
}

/// Resolves label, section, and unique name for every field.
///
/// `page_sizes` maps 0-based page indices to their size in points and is
/// only consulted for fields whose rect is in absolute units; pages
/// missing from it fall back to the configured default size. Fields
/// without a qualifying candidate keep the label they came with.
#[must_use]
pub fn resolve_labels(
    layout: &TextLayout,
    fields: &[FieldCandidate],
    page_sizes: &BTreeMap<u32, PageSize>,
    config: &LabelConfig,
) -> Resolution {
    let spans = spans::spans_by_page(&layout.lines);
    let sections = SectionIndex::build(&layout.line_primitives, &config.sections);

    let mut lines_by_page: BTreeMap<u32, Vec<TextPrimitive>> = BTreeMap::new();
    for line in &layout.line_primitives {
        lines_by_page.entry(line.page).or_default().push(line.clone());
    }

    let mut registry = NameRegistry::new();
    let mut matched = 0_usize;

    let results = fields
        .iter()
        .map(|field| {
            let rect = matcher::relative_field_rect(field, page_sizes, &config.geometry);
            let section = sections.lookup(field.page, rect.y0).map(|h| h.text.clone());

            let found = matcher::match_field(
                field.kind(),
                &rect,
                spans.get(&field.page).map_or(&[][..], Vec::as_slice),
                lines_by_page.get(&field.page).map_or(&[][..], Vec::as_slice),
                config,
            );

            let (label, label_source, label_candidates) = match found {
                Some(m) => {
                    matched += 1;
                    (Some(m.label), m.source, m.candidates)
                }
                None => {
                    let existing = field.label.clone().filter(|l| !l.trim().is_empty());
                    let source = if existing.is_some() {
                        LabelSource::Existing
                    } else {
                        LabelSource::None
                    };
                    (existing, source, Vec::new())
                }
            };

            let base = naming::base_name(
                field.name.as_deref(),
                label.as_deref(),
                section.as_deref(),
                &config.lexicon,
                &config.naming,
            );
            let name = registry.claim(&base);

            let mut extra = field.extra.clone();
            for key in RESULT_KEYS {
                extra.remove(*key);
            }

            FieldResult {
                page: field.page,
                rect: field.rect,
                field_type: field.field_type,
                name,
                label,
                section,
                label_candidates,
                label_source,
                extra,
            }
        })
        .collect::<Vec<_>>();

    log::info!(
        "Matched labels for {matched}/{} fields ({} sections, {} pages with spans)",
        results.len(),
        sections.len(),
        spans.len()
    );

    Resolution {
        fields: results,
        sections,
        registry,
    }
}

/// [`resolve_labels`] over raw oracle pages.
#[must_use]
pub fn resolve_block_pages(
    pages: &[BlockPage],
    fields: &[FieldCandidate],
    page_sizes: &BTreeMap<u32, PageSize>,
    config: &LabelConfig,
) -> Resolution {
    let layout = TextLayout::from_block_pages(pages, config.geometry.line_precision);
    resolve_labels(&layout, fields, page_sizes, config)
}

#[cfg(test)]
mod tests {
    use form_labeler_labels_models::{BoundingBox, FieldType, PrimitiveKind, Rect};

    use super::*;

    fn word(page: u32, text: &str, left: f64, top: f64, width: f64) -> TextPrimitive {
        TextPrimitive {
            kind: PrimitiveKind::Word,
            page,
            text: text.to_string(),
            bbox: BoundingBox {
                left,
                top,
                width,
                height: 0.012,
            },
        }
    }

    /// A field in absolute Letter points from relative corners.
    fn letter_field(
        page: u32,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        kind: FieldType,
    ) -> FieldCandidate {
        FieldCandidate::new(
            page,
            Rect::new(x0, y0, x1, y1).to_absolute(PageSize::LETTER),
            kind,
        )
    }

    fn resolve(words: Vec<TextPrimitive>, fields: &[FieldCandidate]) -> Resolution {
        let layout = TextLayout::from_primitives(words, 3);
        resolve_labels(&layout, fields, &BTreeMap::new(), &LabelConfig::default())
    }

    #[test]
    fn multi_label_row_assigns_each_field_its_own_label() {
        let words = vec![
            word(0, "CITY:", 0.05, 0.494, 0.05),
            word(0, "_______", 0.11, 0.494, 0.15),
            word(0, "STATE:", 0.30, 0.494, 0.06),
            word(0, "_____", 0.37, 0.494, 0.10),
            word(0, "ZIP:", 0.50, 0.494, 0.04),
            word(0, "______", 0.55, 0.494, 0.12),
        ];
        let fields = vec![
            letter_field(0, 0.11, 0.49, 0.26, 0.51, FieldType::Text),
            letter_field(0, 0.37, 0.49, 0.47, 0.51, FieldType::Text),
            letter_field(0, 0.55, 0.49, 0.67, 0.51, FieldType::Text),
        ];

        let resolution = resolve(words, &fields);
        let labels: Vec<Option<&str>> = resolution
            .fields
            .iter()
            .map(|f| f.label.as_deref())
            .collect();
        assert_eq!(labels, vec![Some("CITY:"), Some("STATE:"), Some("ZIP:")]);

        let names: Vec<&str> = resolution.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["city", "state", "zip"]);
        assert!(resolution.fields.iter().all(|f| f.label_source == LabelSource::Span));
        assert_eq!(resolution.fields[0].rect, fields[0].rect);
    }

    #[test]
    fn same_base_name_is_deduplicated() {
        let words = vec![
            word(0, "SIGNATURE:", 0.05, 0.394, 0.10),
            word(0, "SIGNATURE:", 0.05, 0.594, 0.10),
        ];
        let fields = vec![
            FieldCandidate::new(0, Rect::new(0.20, 0.39, 0.50, 0.41), FieldType::Signature),
            FieldCandidate::new(0, Rect::new(0.20, 0.59, 0.50, 0.61), FieldType::Signature),
        ];

        let resolution = resolve(words, &fields);
        let names: Vec<&str> = resolution.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["signature", "signature-2"]);
        assert_eq!(resolution.registry.len(), 2);
    }

    #[test]
    fn section_slug_is_appended_and_deduplicated() {
        let words = vec![
            word(0, "APPLICANT", 0.10, 0.10, 0.15),
            word(0, "DETAILS", 0.27, 0.10, 0.12),
            word(0, "SIGNATURE:", 0.05, 0.394, 0.10),
            word(0, "SIGNATURE:", 0.05, 0.594, 0.10),
        ];
        let fields = vec![
            FieldCandidate::new(0, Rect::new(0.20, 0.39, 0.50, 0.41), FieldType::Signature),
            FieldCandidate::new(0, Rect::new(0.20, 0.59, 0.50, 0.61), FieldType::Signature),
            FieldCandidate::new(0, Rect::new(0.20, 0.05, 0.50, 0.07), FieldType::Text),
        ];

        let resolution = resolve(words, &fields);
        assert_eq!(resolution.sections.len(), 1);
        assert_eq!(resolution.fields[0].section.as_deref(), Some("APPLICANT DETAILS"));
        assert_eq!(resolution.fields[0].name, "signature_applicant-details");
        assert_eq!(resolution.fields[1].name, "signature_applicant-details-2");
        assert_eq!(resolution.fields[2].section, None);
        assert_eq!(resolution.fields[2].name, "field");
    }

    #[test]
    fn resolution_is_idempotent() {
        let words = vec![
            word(0, "NAME:", 0.05, 0.194, 0.06),
            word(0, "NAME:", 0.05, 0.294, 0.06),
            word(0, "Yes:", 0.14, 0.394, 0.04),
        ];
        let fields = vec![
            FieldCandidate::new(0, Rect::new(0.20, 0.19, 0.50, 0.21), FieldType::Text),
            FieldCandidate::new(0, Rect::new(0.20, 0.29, 0.50, 0.31), FieldType::Text),
            FieldCandidate::new(0, Rect::new(0.10, 0.39, 0.12, 0.41), FieldType::Checkbox),
        ];

        let first = resolve(words.clone(), &fields);
        let second = resolve(words, &fields);
        assert_eq!(first.fields, second.fields);
        assert_eq!(first.fields[1].name, "name-2");
        assert_eq!(first.fields[2].label.as_deref(), Some("Yes:"));
    }

    #[test]
    fn unmatched_field_keeps_existing_label_and_name() {
        let mut field = FieldCandidate::new(0, Rect::new(0.20, 0.49, 0.50, 0.51), FieldType::Text);
        field.name = Some("employer".to_string());
        field.label = Some("Employer".to_string());
        field
            .extra
            .insert("value".to_string(), serde_json::json!("ACME"));
        field
            .extra
            .insert("section".to_string(), serde_json::json!("STALE"));

        let resolution = resolve(vec![word(0, "Page 2 of 10", 0.05, 0.494, 0.12)], &[field]);
        let result = &resolution.fields[0];
        assert_eq!(result.label.as_deref(), Some("Employer"));
        assert_eq!(result.label_source, LabelSource::Existing);
        assert_eq!(result.name, "employer");
        assert_eq!(result.extra["value"], "ACME");
        assert!(!result.extra.contains_key("section"));
    }

    #[test]
    fn noise_never_becomes_a_label() {
        let words = vec![
            word(0, "Page", 0.05, 0.494, 0.04),
            word(0, "2", 0.10, 0.494, 0.01),
            word(0, "of", 0.12, 0.494, 0.02),
            word(0, "10", 0.15, 0.494, 0.02),
        ];
        let fields = vec![FieldCandidate::new(
            0,
            Rect::new(0.20, 0.49, 0.50, 0.51),
            FieldType::Text,
        )];

        let resolution = resolve(words, &fields);
        assert_eq!(resolution.fields[0].label, None);
        assert_eq!(resolution.fields[0].label_source, LabelSource::None);
        assert_eq!(resolution.fields[0].name, "field");
    }

    #[test]
    fn resolves_from_raw_block_pages() {
        let json = r#"{"Blocks": [
            {"BlockType": "WORD", "Text": "EMAIL:",
             "Geometry": {"BoundingBox":
                 {"Left": 0.05, "Top": 0.494, "Width": 0.08, "Height": 0.012}}}
        ]}"#;
        let pages: Vec<BlockPage> = vec![BlockPage::default(), serde_json::from_str(json).unwrap()];
        let fields = vec![FieldCandidate::new(
            1,
            Rect::new(0.20, 0.49, 0.50, 0.51),
            FieldType::Text,
        )];

        let resolution =
            resolve_block_pages(&pages, &fields, &BTreeMap::new(), &LabelConfig::default());
        assert_eq!(resolution.fields[0].label.as_deref(), Some("EMAIL:"));
        assert_eq!(resolution.fields[0].name, "email");
    }
}

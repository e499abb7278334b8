//! Colon-delimited label span extraction.
//!
//! A printed row such as `CITY: ____ STATE: ____ ZIP: ____` reconstructs
//! into one line, but it carries three labels. Walking the line's words
//! left to right and closing a segment at every token that ends in `:`
//! yields one [`LabelSpan`] per label, each boxed by its own words only.
//! Words after the last colon never form a span, and fill-in blanks
//! (`____`) break a segment so that text before a blank cannot bleed into
//! the next label.

use std::collections::BTreeMap;

use form_labeler_labels_models::LabelSpan;

use crate::blocks::ReconstructedLine;
use crate::filter::{is_filler, is_noise, normalize_text};

/// Cuts one reconstructed line into label spans.
#[must_use]
pub fn cut_spans(line: &ReconstructedLine) -> Vec<LabelSpan> {
    let mut spans = Vec::new();
    let mut seg_start = 0;

    for (i, word) in line.words.iter().enumerate() {
        let token = word.text.trim();

        if is_filler(token) {
            seg_start = i + 1;
            continue;
        }
        if !token.ends_with(':') {
            continue;
        }

        let segment = &line.words[seg_start..=i];
        seg_start = i + 1;

        let text = normalize_text(
            &segment
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        );
        if text.is_empty() || is_label_noise(&text) {
            log::trace!("Dropping noise span '{text}' on page {}", line.page);
            continue;
        }

        let Some(bbox) = segment
            .iter()
            .map(|w| w.bbox.to_rect())
            .reduce(|a, b| a.union(&b))
        else {
            continue;
        };

        spans.push(LabelSpan {
            text,
            bbox,
            row_center_y: line.center_y,
        });
    }

    spans
}

/// Noise check that also looks through a trailing colon (`Page:`).
fn is_label_noise(text: &str) -> bool {
    is_noise(text) || is_noise(text.trim_end_matches(':').trim())
}

/// Cuts every line and groups the resulting spans by page.
#[must_use]
pub fn spans_by_page(lines: &[ReconstructedLine]) -> BTreeMap<u32, Vec<LabelSpan>> {
    let mut by_page: BTreeMap<u32, Vec<LabelSpan>> = BTreeMap::new();

    for line in lines {
        let spans = cut_spans(line);
        if !spans.is_empty() {
            by_page.entry(line.page).or_default().extend(spans);
        }
    }

    log::debug!(
        "Cut {} label spans across {} pages",
        by_page.values().map(Vec::len).sum::<usize>(),
        by_page.len()
    );

    by_page
}

#[cfg(test)]
mod tests {
    use form_labeler_labels_models::{BoundingBox, PrimitiveKind, TextPrimitive};

    use super::*;

    fn line(tokens: &[(&str, f64, f64)]) -> ReconstructedLine {
        ReconstructedLine {
            page: 0,
            center_y: 0.505,
            words: tokens
                .iter()
                .map(|(text, left, width)| TextPrimitive {
                    kind: PrimitiveKind::Word,
                    page: 0,
                    text: (*text).to_string(),
                    bbox: BoundingBox {
                        left: *left,
                        top: 0.5,
                        width: *width,
                        height: 0.01,
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn multi_label_row_yields_one_span_per_label() {
        let row = line(&[
            ("CITY:", 0.05, 0.05),
            ("_______", 0.11, 0.15),
            ("STATE:", 0.30, 0.06),
            ("_____", 0.37, 0.10),
            ("ZIP:", 0.50, 0.04),
            ("______", 0.55, 0.12),
        ]);
        let spans = cut_spans(&row);
        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["CITY:", "STATE:", "ZIP:"]);

        assert!((spans[0].bbox.x0 - 0.05).abs() < 1e-12);
        assert!((spans[0].bbox.x1 - 0.10).abs() < 1e-12);
        assert!((spans[1].bbox.x0 - 0.30).abs() < 1e-12);
        assert!((spans[1].bbox.x1 - 0.36).abs() < 1e-12);
        assert!((spans[2].bbox.x0 - 0.50).abs() < 1e-12);
        assert!((spans[2].bbox.x1 - 0.54).abs() < 1e-12);
        assert!(spans.iter().all(|s| (s.row_center_y - 0.505).abs() < 1e-12));
    }

    #[test]
    fn multi_word_labels_keep_all_their_words() {
        let row = line(&[
            ("BUSINESS", 0.05, 0.08),
            ("ADDRESS:", 0.14, 0.08),
            ("UNIT:", 0.60, 0.05),
        ]);
        let spans = cut_spans(&row);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "BUSINESS ADDRESS:");
        assert!((spans[0].bbox.x0 - 0.05).abs() < 1e-12);
        assert!((spans[0].bbox.x1 - 0.22).abs() < 1e-12);
        assert_eq!(spans[1].text, "UNIT:");
    }

    #[test]
    fn trailing_words_without_colon_are_discarded() {
        let row = line(&[
            ("NAME:", 0.05, 0.05),
            ("John", 0.20, 0.05),
            ("Smith", 0.26, 0.05),
        ]);
        let spans = cut_spans(&row);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "NAME:");
    }

    #[test]
    fn line_without_colon_yields_nothing() {
        let row = line(&[
            ("Page", 0.4, 0.04),
            ("2", 0.45, 0.01),
            ("of", 0.47, 0.02),
            ("10", 0.5, 0.02),
        ]);
        assert!(cut_spans(&row).is_empty());
    }

    #[test]
    fn noise_segments_are_dropped() {
        let row = line(&[
            ("Page:", 0.05, 0.05),
            ("12:", 0.20, 0.02),
            ("Applicant", 0.30, 0.08),
            ("name:", 0.39, 0.05),
        ]);
        let spans = cut_spans(&row);
        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Applicant name:"]);
    }

    #[test]
    fn filler_breaks_a_segment() {
        let row = line(&[
            ("Name", 0.05, 0.05),
            ("______", 0.11, 0.20),
            ("Date", 0.35, 0.04),
            ("of", 0.40, 0.02),
            ("birth:", 0.43, 0.05),
        ]);
        let spans = cut_spans(&row);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Date of birth:");
        assert!((spans[0].bbox.x0 - 0.35).abs() < 1e-12);
    }

    #[test]
    fn groups_spans_by_page() {
        let mut second = line(&[("EMAIL:", 0.1, 0.05)]);
        second.page = 3;
        for w in &mut second.words {
            w.page = 3;
        }
        let by_page = spans_by_page(&[line(&[("PHONE:", 0.1, 0.05)]), second]);
        assert_eq!(by_page.len(), 2);
        assert_eq!(by_page[&0][0].text, "PHONE:");
        assert_eq!(by_page[&3][0].text, "EMAIL:");
    }
}

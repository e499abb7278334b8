//! Section heading detection and lookup.

use std::collections::BTreeMap;

use form_labeler_labels_models::{SectionHeader, TextPrimitive};

use crate::config::SectionConfig;
use crate::filter::{is_all_caps, is_noise, normalize_text};

/// Returns `true` if a line is shaped like a section heading: non-empty,
/// not noise, uppercase, within the length bounds, and wide enough.
#[must_use]
pub fn is_header_line(line: &TextPrimitive, config: &SectionConfig) -> bool {
    let text = normalize_text(&line.text);
    let len = text.chars().count();

    !text.is_empty()
        && !is_noise(&text)
        && is_all_caps(&text)
        && (config.min_len..=config.max_len).contains(&len)
        && line.bbox.width >= config.min_width
}

/// Headings per page, each list sorted top to bottom.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionIndex {
    pages: BTreeMap<u32, Vec<SectionHeader>>,
}

impl SectionIndex {
    /// Scans line primitives for headings.
    #[must_use]
    pub fn build(lines: &[TextPrimitive], config: &SectionConfig) -> Self {
        let index = Self::from_headers(
            lines
                .iter()
                .filter(|l| is_header_line(l, config))
                .map(|line| SectionHeader {
                    page: line.page,
                    y: line.bbox.top,
                    text: normalize_text(&line.text),
                }),
        );
        log::debug!("Detected {} section headers", index.len());
        index
    }

    /// Indexes already-detected headings.
    #[must_use]
    pub fn from_headers(headers: impl IntoIterator<Item = SectionHeader>) -> Self {
        let mut pages: BTreeMap<u32, Vec<SectionHeader>> = BTreeMap::new();
        for header in headers {
            pages.entry(header.page).or_default().push(header);
        }
        for headers in pages.values_mut() {
            headers.sort_by(|a, b| a.y.total_cmp(&b.y).then_with(|| a.text.cmp(&b.text)));
        }
        Self { pages }
    }

    /// The closest heading at or above `y` on `page`.
    #[must_use]
    pub fn lookup(&self, page: u32, y: f64) -> Option<&SectionHeader> {
        self.pages
            .get(&page)?
            .iter()
            .take_while(|h| h.y <= y)
            .last()
    }

    /// All headings in `(page, y)` order.
    pub fn headers(&self) -> impl Iterator<Item = &SectionHeader> {
        self.pages.values().flatten()
    }

    /// Total number of headings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    /// Returns `true` if no headings were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

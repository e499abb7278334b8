//! Field name synthesis and run-scoped de-duplication.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::{Lexicon, NamingConfig};

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("valid regex"));

/// Lowercase ASCII slug with runs of non-alphanumerics collapsed to `-`.
///
/// Accented letters fold to their base letter (`Número` becomes
/// `numero`); anything without an ASCII decomposition is dropped. Returns
/// `fallback` if nothing survives.
#[must_use]
pub fn slugify(text: &str, fallback: &str) -> String {
    let ascii: String = text.nfkd().filter(char::is_ascii).collect();
    let slug = NON_ALNUM_RE
        .replace_all(ascii.trim(), "-")
        .trim_matches('-')
        .to_lowercase();

    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// Returns `true` if an existing name should be replaced.
fn is_placeholder(name: &str, lexicon: &Lexicon) -> bool {
    name.is_empty()
        || lexicon
            .placeholder_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && name.starts_with(prefix.as_str()))
}

/// Builds the pre-deduplication name for a field.
///
/// A usable existing name is kept. A blank or placeholder name is replaced
/// by the label's slug; with no label the placeholder itself is kept, and
/// with neither the lexicon's default name is used. A section, when
/// present, is appended as a slug suffix.
#[must_use]
pub fn base_name(
    existing: Option<&str>,
    label: Option<&str>,
    section: Option<&str>,
    lexicon: &Lexicon,
    naming: &NamingConfig,
) -> String {
    let existing = existing.map(str::trim).unwrap_or_default();
    let label = label.map(str::trim).filter(|l| !l.is_empty());

    let mut name = if !is_placeholder(existing, lexicon) {
        existing.to_string()
    } else if let Some(label) = label {
        slugify(label, &lexicon.default_name)
    } else if !existing.is_empty() {
        existing.to_string()
    } else {
        lexicon.default_name.clone()
    };

    if let Some(section) = section {
        let slug = slugify(section, "");
        if !slug.is_empty() {
            name.push_str(&naming.section_separator);
            name.push_str(&slug);
        }
    }

    name
}

/// Run-scoped name allocator.
///
/// The first claim of a base name gets it verbatim; later claims get
/// `-2`, `-3`, ... in claim order. A suffixed name that collides with a
/// name already handed out skips ahead to the next free suffix, so no
/// name is ever returned twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameRegistry {
    counts: BTreeMap<String, u32>,
    assigned: BTreeSet<String>,
}

impl NameRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a name derived from `base` that has not been claimed yet.
    pub fn claim(&mut self, base: &str) -> String {
        let count = self.counts.entry(base.to_string()).or_insert(0);
        *count += 1;

        let mut candidate = if *count == 1 {
            base.to_string()
        } else {
            format!("{base}-{count}")
        };
        while self.assigned.contains(&candidate) {
            *count += 1;
            candidate = format!("{base}-{count}");
        }

        self.assigned.insert(candidate.clone());
        candidate
    }

    /// Returns `true` if `name` has been handed out.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.assigned.contains(name)
    }

    /// Number of names handed out.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    /// Returns `true` if nothing has been claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

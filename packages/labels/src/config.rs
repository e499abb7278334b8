//! Association tunables.
//!
//! [`LabelConfig`] is loaded once (from the embedded default, a TOML file,
//! or both) and passed by reference into every entry point. Nothing in the
//! engine reads the environment or keeps process-wide state.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::LabelError;

/// The shipped default configuration, identical to [`LabelConfig::default`].
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// All tunables for one association run.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Distances and thresholds for geometric matching.
    pub geometry: GeometryConfig,
    /// Section header detection.
    pub sections: SectionConfig,
    /// Known-good labels, generic words, and naming fallbacks.
    pub lexicon: Lexicon,
    /// Name synthesis.
    pub naming: NamingConfig,
    /// Matcher behaviour switches.
    pub matching: MatchingConfig,
}

/// Distances are in page-relative units unless noted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Same-row tolerance between vertical centres.
    pub row_tolerance: f64,
    /// Vertical search window above a field.
    pub above_window: f64,
    /// Minimum gap between a checkbox and a label to its right.
    pub checkbox_min_dx: f64,
    /// Maximum gap between a checkbox and a label to its right.
    pub checkbox_max_dx: f64,
    /// Decimal places for word-centre quantization.
    pub line_precision: u32,
    /// Fallback page width in points.
    pub default_page_width: f64,
    /// Fallback page height in points.
    pub default_page_height: f64,
    /// Cap on centre distance for whole-line proximity matches.
    pub proximity_max_distance: f64,
    /// Lines with more words are never labels.
    pub max_label_words: usize,
    /// Ranked candidates kept per field.
    pub candidate_count: usize,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            row_tolerance: 0.03,
            above_window: 0.08,
            checkbox_min_dx: 0.0,
            checkbox_max_dx: 0.30,
            line_precision: 3,
            default_page_width: 612.0,
            default_page_height: 792.0,
            proximity_max_distance: 0.25,
            max_label_words: 10,
            candidate_count: 5,
        }
    }
}

/// Section header shape constraints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    /// Minimum line width as a fraction of page width.
    pub min_width: f64,
    /// Minimum heading length in characters.
    pub min_len: usize,
    /// Maximum heading length in characters.
    pub max_len: usize,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            min_width: 0.18,
            min_len: 3,
            max_len: 20,
        }
    }
}

/// Word lists consulted by the suspect predicate and name synthesis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    /// Full label strings that are never suspect.
    pub whitelist: BTreeSet<String>,
    /// Short labels that are complete as-is (e.g. `ZIP:`).
    pub short_ok: BTreeSet<String>,
    /// Lowercase label texts too generic to trust, compared with any
    /// trailing colon kept.
    pub generic_words: BTreeSet<String>,
    /// Labels shorter than this (in characters) are suspect.
    pub min_label_len: usize,
    /// Existing field names starting with any of these are replaced.
    pub placeholder_prefixes: Vec<String>,
    /// Name used when neither an existing name nor a label is available.
    pub default_name: String,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            whitelist: BTreeSet::new(),
            short_ok: ["ZIP:", "CITY:", "UNIT:", "STATE:", "DOB:", "SSN:", "ID:"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            generic_words: [
                "information",
                "name",
                "zip",
                "city",
                "page",
                "state",
                "value",
                "application",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            min_label_len: 6,
            placeholder_prefixes: vec!["undefined".to_string()],
            default_name: "field".to_string(),
        }
    }
}

/// Legacy whitelist file: `{"whitelist": [...], "short_ok": [...]}`.
#[derive(Debug, Default, Deserialize)]
struct LexiconFile {
    #[serde(default)]
    whitelist: Vec<String>,
    #[serde(default)]
    short_ok: Vec<String>,
}

impl Lexicon {
    /// Extends the whitelist and short-label set from a legacy JSON
    /// whitelist document.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Json`] if the document is not valid JSON of
    /// the expected shape.
    pub fn merge_json_str(&mut self, json: &str) -> Result<(), LabelError> {
        let file: LexiconFile = serde_json::from_str(json)?;
        self.whitelist.extend(file.whitelist);
        self.short_ok.extend(file.short_ok);
        Ok(())
    }

    /// Reads a legacy JSON whitelist file and merges it in.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError`] if the file cannot be read or parsed.
    pub fn merge_json_file(&mut self, path: &Path) -> Result<(), LabelError> {
        let json = std::fs::read_to_string(path)?;
        self.merge_json_str(&json)?;
        log::info!(
            "Loaded label lexicon from {}: {} whitelist, {} short_ok",
            path.display(),
            self.whitelist.len(),
            self.short_ok.len()
        );
        Ok(())
    }
}

/// Name synthesis options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Joins a base name and its section slug.
    pub section_separator: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            section_separator: "_".to_string(),
        }
    }
}

/// Matcher switches.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Fall back to whole OCR lines when no colon span qualifies.
    pub line_fallback: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            line_fallback: true,
        }
    }
}

impl LabelConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Toml`] if the document is malformed.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, LabelError> {
        Ok(toml::de::from_str(toml_str)?)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, LabelError> {
        let toml_str = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&toml_str)?;
        log::debug!("Loaded label config from {}", path.display());
        Ok(config)
    }
}

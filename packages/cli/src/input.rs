//! JSON input and output files.

use std::collections::BTreeMap;
use std::path::Path;

use form_labeler_labels_models::PageSize;
use form_labeler_labels_models::textract::BlockPage;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// OCR output: a list of pages, or a single page.
#[derive(Deserialize)]
#[serde(untagged)]
enum BlocksFile {
    Pages(Vec<BlockPage>),
    Page(BlockPage),
}

/// A field list, bare or under one of the known wrapper keys.
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldsFile<T> {
    Plain(Vec<T>),
    Fields { fields: Vec<T> },
    Widgets { widgets_labeled: Vec<T> },
}

/// Parses OCR block pages.
///
/// # Errors
///
/// Returns an error if the JSON matches neither shape.
pub fn parse_blocks(json: &str) -> Result<Vec<BlockPage>, serde_json::Error> {
    Ok(match serde_json::from_str(json)? {
        BlocksFile::Pages(pages) => pages,
        BlocksFile::Page(page) => vec![page],
    })
}

/// Parses a field list.
///
/// # Errors
///
/// Returns an error if the JSON is not a field list.
pub fn parse_fields<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, serde_json::Error> {
    Ok(match serde_json::from_str(json)? {
        FieldsFile::Plain(fields)
        | FieldsFile::Fields { fields }
        | FieldsFile::Widgets {
            widgets_labeled: fields,
        } => fields,
    })
}

/// Parses `{"<page>": {"width": .., "height": ..}}`.
///
/// # Errors
///
/// Returns an error if the JSON is not a page-size map.
pub fn parse_page_sizes(json: &str) -> Result<BTreeMap<u32, PageSize>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Reads a file to a string.
///
/// # Errors
///
/// Returns an error naming the file if it cannot be read.
pub fn read(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()).into())
}

/// Writes pretty JSON to `out`, or to stdout when absent.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_json(
    value: &serde_json::Value,
    out: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = serde_json::to_string_pretty(value)?;
    if let Some(path) = out {
        std::fs::write(path, text)?;
        log::info!("Wrote {}", path.display());
    } else {
        println!("{text}");
    }
    Ok(())
}

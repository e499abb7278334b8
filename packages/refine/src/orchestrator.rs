//! Suspect label escalation.
//!
//! Per field: `Resolved -> Final` when the label is trusted, otherwise
//! `Resolved -> Escalated -> Confirmed | Unchanged`. Escalated fields are
//! fanned out to the oracle with bounded concurrency and merged back only
//! after every call has finished.

use std::sync::Arc;
use std::time::Duration;

use form_labeler_ai::providers::VisionProvider;
use form_labeler_labels::Lexicon;
use form_labeler_labels::filter::{is_suspect, normalize_text, word_count};
use form_labeler_labels_models::{FieldResult, LabelSource};
use futures::stream::{self, StreamExt as _};
use strum_macros::AsRefStr;

use crate::pages::PageImageSource;
use crate::progress::ProgressCallback;
use crate::{RefineConfig, RefineError, crop};

/// Terminal refinement state of one field.
#[derive(Debug, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RefinementOutcome {
    /// The label was trusted and never escalated.
    Final,
    /// The oracle supplied a replacement label.
    Confirmed {
        /// Label before refinement.
        previous: Option<String>,
        /// Label written back.
        label: String,
    },
    /// Escalation failed; the field was left as it was.
    Unchanged(RefineError),
}

/// Outcome for the field at `index` in the input.
#[derive(Debug)]
pub struct FieldOutcome {
    /// Position in the input field list.
    pub index: usize,
    /// The field's name.
    pub name: String,
    /// What happened.
    pub outcome: RefinementOutcome,
}

/// Refined fields plus one outcome per field.
///
/// `outcomes` is empty when refinement was skipped entirely (disabled or
/// no provider).
#[derive(Debug)]
pub struct RefinementReport {
    /// Fields in input order.
    pub fields: Vec<FieldResult>,
    /// Outcomes in input order.
    pub outcomes: Vec<FieldOutcome>,
}

impl RefinementReport {
    /// Number of fields whose label was replaced.
    #[must_use]
    pub fn confirmed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, RefinementOutcome::Confirmed { .. }))
            .count()
    }

    /// Number of escalated fields left unchanged.
    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, RefinementOutcome::Unchanged(_)))
            .count()
    }
}

/// Cleans an oracle answer into a label.
///
/// Collapses whitespace, strips wrapping quotes, and appends a colon to
/// short phrases that lack one. Returns `None` for an empty answer.
#[must_use]
pub fn normalize_answer(answer: &str, max_words: usize) -> Option<String> {
    let text = normalize_text(answer.trim().trim_matches(|c| c == '"' || c == '`'));
    if text.is_empty() {
        return None;
    }
    if !text.ends_with(':') && word_count(&text) <= max_words {
        return Some(format!("{text}:"));
    }
    Some(text)
}

/// Crops around one field and asks the oracle for its label.
///
/// Rate-limited calls are retried up to `max_attempts` times with linear
/// backoff; every other failure is returned immediately.
///
/// # Errors
///
/// Returns [`RefineError`] if cropping fails, the oracle fails or times
/// out, or the answer is empty.
pub async fn refine_field(
    field: &FieldResult,
    pages: &dyn PageImageSource,
    provider: &dyn VisionProvider,
    config: &RefineConfig,
) -> Result<String, RefineError> {
    let page_size = pages.page_size(field.page).ok_or_else(|| RefineError::Crop {
        message: format!("no page image for page {}", field.page),
    })?;
    let region = crop::crop_region(&field.rect, field.kind(), page_size)?;
    let png = pages.render_crop(field.page, &region)?;

    let attempts = config.max_attempts.max(1);
    let timeout = Duration::from_secs(config.call_timeout_secs);

    for attempt in 1..=attempts {
        let call = provider.read_label(&png, &config.prompt, config.max_tokens);
        let result = tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| RefineError::Timeout {
                seconds: config.call_timeout_secs,
            })?;

        match result {
            Ok(answer) => {
                return normalize_answer(&answer, config.max_answer_words)
                    .ok_or(RefineError::EmptyAnswer);
            }
            Err(e) if e.is_rate_limited() && attempt < attempts => {
                let delay = Duration::from_millis(config.backoff_step_ms * u64::from(attempt));
                log::debug!(
                    "Rate limited refining '{}' (attempt {attempt}/{attempts}), \
                     retrying in {delay:?}",
                    field.name
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(RefineError::EmptyAnswer)
}

/// Escalates every suspect label to the oracle and merges confirmed
/// answers back.
///
/// Never fails: a field whose escalation fails keeps its label, name, and
/// section untouched. With refinement disabled or no provider the input
/// comes back unchanged.
pub async fn refine_suspect_labels(
    mut fields: Vec<FieldResult>,
    pages: &dyn PageImageSource,
    provider: Option<&dyn VisionProvider>,
    config: &RefineConfig,
    lexicon: &Lexicon,
    progress: &Arc<dyn ProgressCallback>,
) -> RefinementReport {
    let provider = match provider {
        Some(provider) if config.enabled => provider,
        _ => {
            log::info!(
                "Vision refinement disabled; leaving {} fields as resolved",
                fields.len()
            );
            progress.finish("Vision refinement disabled".to_string());
            return RefinementReport {
                fields,
                outcomes: Vec::new(),
            };
        }
    };

    let suspects: Vec<usize> = fields
        .iter()
        .enumerate()
        .filter(|(_, f)| is_suspect(f.label.as_deref(), lexicon))
        .map(|(i, _)| i)
        .collect();

    log::info!(
        "Escalating {}/{} suspect labels to {} (concurrency={})",
        suspects.len(),
        fields.len(),
        provider.name(),
        config.concurrency.max(1)
    );
    progress.set_message(format!("Refining labels with {}", provider.name()));
    progress.set_total(suspects.len() as u64);

    let results: Vec<(usize, Result<String, RefineError>)> = {
        let fields = &fields;
        stream::iter(suspects.iter().map(|&index| async move {
            let result = refine_field(&fields[index], pages, provider, config).await;
            progress.inc(1);
            (index, result)
        }))
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await
    };

    let mut outcomes: Vec<FieldOutcome> = fields
        .iter()
        .enumerate()
        .filter(|(i, _)| !suspects.contains(i))
        .map(|(index, f)| FieldOutcome {
            index,
            name: f.name.clone(),
            outcome: RefinementOutcome::Final,
        })
        .collect();

    for (index, result) in results {
        let field = &mut fields[index];
        let outcome = match result {
            Ok(label) => {
                log::debug!("Refined '{}': {:?} -> '{label}'", field.name, field.label);
                let previous = field.label.replace(label.clone());
                field.label_source = LabelSource::Vision;
                RefinementOutcome::Confirmed { previous, label }
            }
            Err(e) => {
                log::warn!("Vision refinement skipped for '{}': {e}", field.name);
                RefinementOutcome::Unchanged(e)
            }
        };
        outcomes.push(FieldOutcome {
            index,
            name: field.name.clone(),
            outcome,
        });
    }

    outcomes.sort_by_key(|o| o.index);

    let report = RefinementReport { fields, outcomes };
    progress.finish(format!(
        "Refined {} labels ({} unchanged)",
        report.confirmed(),
        report.unchanged()
    ));
    log::info!(
        "Vision refinement complete: {} confirmed, {} unchanged",
        report.confirmed(),
        report.unchanged()
    );

    report
}

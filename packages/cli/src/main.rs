#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for form field labeling.
//!
//! `resolve` attaches labels, sections, and names to detected fields from
//! OCR output. `refine` sends suspect labels to a vision model for a
//! second opinion.
//!
//! Uses `indicatif-log-bridge` (via [`form_labeler_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress`.

mod input;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use form_labeler_cli_utils::IndicatifProgress;
use form_labeler_labels::{DEFAULT_CONFIG_TOML, LabelConfig, resolve_block_pages};
use form_labeler_labels_models::{FieldCandidate, FieldResult};
use form_labeler_refine::{
    RasterPages, RefineConfig, RefinementOutcome, null_progress, refine_suspect_labels,
};
use serde_json::json;

#[derive(Parser)]
#[command(name = "form_labeler", about = "Form field label resolution tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve labels, sections, and unique names for detected fields
    Resolve {
        /// OCR block pages (JSON list of `{"Blocks": [...]}` pages)
        #[arg(long)]
        blocks: PathBuf,
        /// Detected fields (JSON list, or `{"widgets_labeled": [...]}`)
        #[arg(long)]
        fields: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
        /// Per-page sizes in points, e.g. `{"0": {"width": 612, "height": 792}}`
        #[arg(long)]
        page_sizes: Option<PathBuf>,
        /// Write output here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Ask a vision model to re-read suspect labels
    Refine {
        /// Resolved fields (output of `resolve`)
        #[arg(long)]
        fields: PathBuf,
        /// Page images in page order, rendered at `--dpi`
        #[arg(long, num_args = 1.., required = true)]
        pages: Vec<PathBuf>,
        /// Resolution the page images were rendered at.
        #[arg(long, default_value = "200")]
        dpi: f64,
        /// Maximum oracle calls in flight.
        #[arg(long, default_value = "4")]
        concurrency: usize,
        /// Attempts per field when rate limited.
        #[arg(long, default_value = "3")]
        max_attempts: u32,
        /// Per-call timeout in seconds.
        #[arg(long, default_value = "30")]
        timeout_secs: u64,
        /// Skip refinement (also disabled by `USE_VISION=0`)
        #[arg(long)]
        no_vision: bool,
        #[command(flatten)]
        config: ConfigArgs,
        /// Write output here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the built-in label configuration
    Config,
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// Label configuration TOML (defaults to the built-in configuration)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Legacy whitelist JSON (`{"whitelist": [...], "short_ok": [...]}`)
    #[arg(long)]
    lexicon: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> Result<LabelConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => LabelConfig::load(path)?,
            None => LabelConfig::default(),
        };
        if let Some(path) = &self.lexicon {
            config.lexicon.merge_json_file(path)?;
            log::info!(
                "Loaded lexicon from {} ({} whitelisted labels)",
                path.display(),
                config.lexicon.whitelist.len()
            );
        }
        Ok(config)
    }
}

fn vision_disabled_by_env() -> bool {
    std::env::var("USE_VISION").is_ok_and(|v| matches!(v.trim(), "0" | "false" | "off"))
}

fn resolve(
    blocks: &Path,
    fields: &Path,
    config: &ConfigArgs,
    page_sizes: Option<&Path>,
    out: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = config.load()?;
    let pages = input::parse_blocks(&input::read(blocks)?)?;
    let candidates: Vec<FieldCandidate> = input::parse_fields(&input::read(fields)?)?;
    let page_sizes = match page_sizes {
        Some(path) => input::parse_page_sizes(&input::read(path)?)?,
        None => BTreeMap::new(),
    };

    log::info!(
        "Resolving {} fields against {} OCR pages",
        candidates.len(),
        pages.len()
    );
    let resolution = resolve_block_pages(&pages, &candidates, &page_sizes, &config);

    input::write_json(&json!({ "fields": resolution.fields }), out)
}

async fn refine(
    multi: &form_labeler_cli_utils::MultiProgress,
    fields: &Path,
    pages: &[PathBuf],
    refine_config: RefineConfig,
    dpi: f64,
    config: &ConfigArgs,
    out: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let label_config = config.load()?;
    let fields: Vec<FieldResult> = input::parse_fields(&input::read(fields)?)?;
    let images = RasterPages::open(pages, dpi)?;
    log::info!("Loaded {} page images at {dpi} dpi", images.len());

    let provider = if refine_config.enabled {
        form_labeler_ai::providers::create_provider_from_env()?
    } else {
        None
    };

    let progress = if provider.is_some() {
        IndicatifProgress::batch_bar(multi, "Refining labels")
    } else {
        null_progress()
    };
    let report = refine_suspect_labels(
        fields,
        &images,
        provider.as_deref(),
        &refine_config,
        &label_config.lexicon,
        &progress,
    )
    .await;

    let outcomes: Vec<serde_json::Value> = report
        .outcomes
        .iter()
        .map(|o| {
            let detail = match &o.outcome {
                RefinementOutcome::Final => serde_json::Value::Null,
                RefinementOutcome::Confirmed { previous, label } => {
                    json!({ "previous": previous, "label": label })
                }
                RefinementOutcome::Unchanged(e) => json!({ "error": e.to_string() }),
            };
            json!({
                "index": o.index,
                "name": o.name,
                "outcome": o.outcome.as_ref(),
                "detail": detail,
            })
        })
        .collect();

    input::write_json(
        &json!({ "fields": report.fields, "outcomes": outcomes }),
        out,
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = form_labeler_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            blocks,
            fields,
            config,
            page_sizes,
            out,
        } => resolve(
            &blocks,
            &fields,
            &config,
            page_sizes.as_deref(),
            out.as_deref(),
        )?,
        Commands::Refine {
            fields,
            pages,
            dpi,
            concurrency,
            max_attempts,
            timeout_secs,
            no_vision,
            config,
            out,
        } => {
            let refine_config = RefineConfig {
                enabled: !no_vision && !vision_disabled_by_env(),
                concurrency,
                max_attempts,
                call_timeout_secs: timeout_secs,
                ..RefineConfig::default()
            };
            refine(
                &multi,
                &fields,
                &pages,
                refine_config,
                dpi,
                &config,
                out.as_deref(),
            )
            .await?;
        }
        Commands::Config => print!("{DEFAULT_CONFIG_TOML}"),
    }

    Ok(())
}

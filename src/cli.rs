//! Command-line surface: argument parsing and one handler per command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::pipeline::batch_completion::{BatchCompleter, CompletionError, LabelStore};
use crate::pipeline::corpus::{combine_tables, CorpusFormatter, FileOrder};
use crate::pipeline::extraction::pdfium::PdfiumRenderer;
use crate::pipeline::extraction::{
    DocumentExtractor, OcrEngine, PdfTextExtractor, TesseractCli, TextExtractor, UnavailableOcr,
};
use crate::pipeline::labeling::{DeviceSelection, OllamaProducer};

#[derive(Parser, Debug)]
#[command(
    name = "resume-labeler",
    version,
    about = "Build resume/job-description match datasets with a locally hosted model"
)]
pub struct Cli {
    /// Config file (defaults to <config_dir>/resume-labeler/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Label every (JD, Resume) pair, resuming from the existing output
    Complete {
        /// Pair list with JD and Resume columns
        #[arg(long)]
        pairs: PathBuf,
        /// Label table, created or extended in place
        #[arg(long)]
        output: PathBuf,
        /// Ollama model name
        #[arg(long)]
        model: Option<String>,
        /// Context window in tokens
        #[arg(long)]
        context_window: Option<u32>,
        /// auto, gpu or cpu
        #[arg(long)]
        device: Option<DeviceSelection>,
        /// Replace cells naming an existing document with its extracted text
        #[arg(long, default_value_t = false)]
        resolve_documents: bool,
    },
    /// Extract every document in a directory into a (filename, text) table
    Extract {
        #[arg(long)]
        input_dir: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Process files in random order
        #[arg(long, default_value_t = false)]
        shuffle: bool,
        /// Seed for a reproducible shuffle (implies --shuffle)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Extract one document (or validate raw text) and print the result
    ExtractOne {
        /// File path or resume text
        input: String,
    },
    /// Pair every job description with every resume
    Combine {
        /// Table with a "Job Description" column
        #[arg(long)]
        jds: PathBuf,
        /// Table with a "Resume" column
        #[arg(long)]
        resumes: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

pub fn handle_command(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Complete {
            pairs,
            output,
            model,
            context_window,
            device,
            resolve_documents,
        } => {
            if let Some(model) = model {
                config.model.name = model;
            }
            if let Some(context_window) = context_window {
                config.model.context_window = context_window;
            }
            if let Some(device) = device {
                config.model.device = device;
            }
            config.validate()?;
            complete(&config, &pairs, &output, resolve_documents)
        }
        Command::Extract {
            input_dir,
            output,
            shuffle,
            seed,
        } => {
            config.validate_extraction()?;
            let order = match (seed, shuffle) {
                (Some(seed), _) => FileOrder::Seeded(seed),
                (None, true) => FileOrder::Shuffled,
                (None, false) => FileOrder::Sorted,
            };
            let extractor = build_extractor(&config);
            let summary = CorpusFormatter::new(&extractor)
                .with_order(order)
                .run(&input_dir, &output)?;
            println!(
                "Extracted {} of {} files into {}",
                summary.extracted,
                summary.total_files,
                output.display()
            );
            Ok(())
        }
        Command::ExtractOne { input } => {
            config.validate_extraction()?;
            let extracted = build_extractor(&config).extract(&input)?;
            info!(
                strategy = extracted.strategy.map_or("text", |s| s.as_str()),
                chars = extracted.char_count,
                "Extracted"
            );
            println!("{}", extracted.text);
            Ok(())
        }
        Command::Combine {
            jds,
            resumes,
            output,
        } => {
            let count = combine_tables(&jds, &resumes, &output)?;
            println!("Wrote {count} pairs to {}", output.display());
            Ok(())
        }
    }
}

fn complete(config: &AppConfig, pairs: &Path, output: &Path, resolve_documents: bool) -> Result<()> {
    let producer =
        OllamaProducer::connect(config.to_model_settings()).map_err(CompletionError::ModelLoad)?;
    let store = LabelStore::new(output);

    let extractor = resolve_documents.then(|| build_extractor(config));
    let mut completer = BatchCompleter::new(&producer);
    if let Some(extractor) = &extractor {
        completer = completer.with_document_resolver(extractor);
    }

    let summary = completer.run(pairs, &store, None)?;
    println!(
        "Run {} with {} on {}: {} labeled, {} skipped, {} already done, {} total ({} ms)",
        summary.run_id,
        producer.settings().model,
        producer.hardware().processor_label,
        summary.accepted,
        summary.skipped.len(),
        summary.start_index,
        summary.total_rows,
        summary.duration_ms
    );
    for skipped in &summary.skipped {
        println!("  row {} [{}]: {}", skipped.index, skipped.kind, skipped.reason);
    }
    Ok(())
}

/// Wire up the real OCR and PDF backends. Missing backends degrade to the
/// strategies that do not need them instead of failing startup.
pub fn build_extractor(config: &AppConfig) -> DocumentExtractor {
    let mut extractor = DocumentExtractor::new(build_ocr_engine(config), Box::new(PdfTextExtractor))
        .with_min_chars(config.min_input_chars)
        .with_render_dpi(config.render_dpi);

    match PdfiumRenderer::new() {
        Ok(renderer) => extractor = extractor.with_pdf_renderer(Box::new(renderer)),
        Err(e) => warn!(error = %e, "PDFium unavailable, scanned PDFs cannot be OCR'd"),
    }
    extractor
}

fn build_ocr_engine(config: &AppConfig) -> Box<dyn OcrEngine + Send + Sync> {
    #[cfg(feature = "ocr")]
    if let Some(dir) = &config.ocr.tessdata_dir {
        match crate::pipeline::extraction::BundledTesseract::new(dir, &config.ocr.languages) {
            Ok(engine) => return Box::new(engine),
            Err(e) => warn!(error = %e, "Bundled Tesseract unavailable, trying the CLI"),
        }
    }

    match TesseractCli::new(
        &config.ocr.binary,
        &config.ocr.languages,
        config.ocr.tessdata_dir.clone(),
    ) {
        Ok(engine) => Box::new(engine),
        Err(e) => {
            warn!(error = %e, "Tesseract unavailable, images will not be OCR'd");
            Box::new(UnavailableOcr::new(e.to_string()))
        }
    }
}

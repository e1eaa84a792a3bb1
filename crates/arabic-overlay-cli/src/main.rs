//! Arabic Overlay CLI - build translation overlay PDFs for extracted documents.
//!
//! Input is an extracted document: a JSON file with one entry per page
//! carrying the page dimensions and its text blocks with bounding boxes.
//! Output is a PDF with one overlay page per input page, ready to be
//! composited onto the original document.

use anyhow::{Context, Result};
use arabic_overlay_core::{
    AppConfig, ExtractedDocument, Lang, OverlayTranslator, TextColor, combine_overlay_pages,
};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, ValueEnum)]
enum ColorOption {
    Black,
    DarkRed,
    Blue,
}

impl From<ColorOption> for TextColor {
    fn from(opt: ColorOption) -> Self {
        match opt {
            ColorOption::Black => Self::black(),
            ColorOption::DarkRed => Self::dark_red(),
            ColorOption::Blue => Self::blue(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "arabic-overlay")]
#[command(author, version, about = "Build Arabic translation overlays for extracted PDF pages", long_about = None)]
struct Args {
    /// Input extracted document (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Output PDF file (default: input-overlay.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language code
    #[arg(short = 's', long, default_value = "en")]
    source: String,

    /// Target language code
    #[arg(short = 't', long, default_value = "ar")]
    target: String,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_API_BASE", default_value = "http://localhost:8080/v1")]
    api_base: String,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY")]
    api_key: Option<String>,

    /// Model name for OpenAI-compatible API
    #[arg(long, env = "OPENAI_MODEL", default_value = "default_model")]
    model: String,

    /// Overlay text color
    #[arg(long, value_enum, default_value = "black")]
    color: ColorOption,

    /// Font file to use for overlay text (tried before the built-in candidates)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Process only specific pages (e.g., "1-5" or "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Disable caching
    #[arg(long)]
    no_cache: bool,
}

fn parse_page_range(pages: &str, total: usize) -> Result<Vec<usize>> {
    let mut result = Vec::new();

    for part in pages.split(',') {
        let part = part.trim();
        if part.contains('-') {
            let range: Vec<&str> = part.split('-').collect();
            if range.len() == 2 {
                let start: usize = range[0].parse().context("Invalid page range start")?;
                let end: usize = range[1].parse().context("Invalid page range end")?;
                for p in start..=end {
                    if p > 0 && p <= total {
                        result.push(p - 1); // Convert to 0-indexed
                    }
                }
            }
        } else {
            let page: usize = part.parse().context("Invalid page number")?;
            if page > 0 && page <= total {
                result.push(page - 1); // Convert to 0-indexed
            }
        }
    }

    result.sort_unstable();
    result.dedup();
    Ok(result)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    // Override config with CLI arguments
    config.source_lang = Lang::new(&args.source);
    config.target_lang = Lang::new(&args.target);
    config.text_color = args.color.into();

    if let Some(font_path) = args.font {
        config.font.paths.insert(0, font_path);
    }

    if args.no_cache {
        config.cache.memory_enabled = false;
        config.cache.disk_enabled = false;
    }

    // Configure translator
    config.translator =
        arabic_overlay_core::TranslatorConfig::new(args.api_base, args.api_key, args.model);

    // Load extracted document
    info!("Loading extracted document: {}", args.input.display());
    let json = std::fs::read_to_string(&args.input)
        .context(format!("Failed to read input: {}", args.input.display()))?;
    let doc: ExtractedDocument = serde_json::from_str(&json)
        .context(format!("Failed to parse input: {}", args.input.display()))?;

    let total_pages = doc.pages.len();
    info!("Document has {} pages", total_pages);

    // Determine which pages to process
    let pages = if let Some(ref page_spec) = args.pages {
        parse_page_range(page_spec, total_pages)?
    } else {
        (0..total_pages).collect()
    };

    if pages.is_empty() {
        anyhow::bail!("No valid pages to process");
    }

    info!("Building overlays for {} pages", pages.len());

    // Create translator
    let translator = OverlayTranslator::new(config.clone())
        .context("Failed to initialize translator")?;

    if !translator.has_font() {
        tracing::warn!("No Arabic font found; overlay glyphs may render incorrectly");
    }

    // Setup progress bar
    #[allow(clippy::cast_possible_truncation)]
    let pb = ProgressBar::new(pages.len() as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    // Build overlay pages
    let mut overlay_pages = Vec::with_capacity(pages.len());

    for &page_num in &pages {
        pb.set_message(format!("Page {}", page_num + 1));

        let result = translator
            .process_page(&doc.pages[page_num], page_num)
            .await
            .context(format!("Failed to process page {}", page_num + 1))?;

        if result.stats.failed > 0 {
            pb.println(format!(
                "Page {}: {} blocks could not be rendered",
                page_num + 1,
                result.stats.failed
            ));
        }

        overlay_pages.push(result.pdf_bytes);
        pb.inc(1);
    }

    pb.finish_with_message("Overlay complete");

    // Combine pages
    let output_bytes =
        combine_overlay_pages(&overlay_pages).context("Failed to combine overlay pages")?;

    // Determine output path
    let output_path = args.output.unwrap_or_else(|| {
        let stem = args
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        args.input.with_file_name(format!("{stem}-overlay.pdf"))
    });

    // Save output
    std::fs::write(&output_path, output_bytes)
        .context(format!("Failed to write output: {}", output_path.display()))?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!("Overlay PDF saved to: {}", output_path.display());
    }

    Ok(())
}

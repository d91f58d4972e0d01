//! CLI binary for costsheet.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SheetConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use costsheet::{
    generate, inspect, ImageSkip, PageSize, ProgressCallback, SheetConfig, SheetProgressCallback,
    Stage, TriggerTable,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────

/// Terminal progress callback: a spinner naming the current stage, with one
/// log line per finished stage printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl SheetProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message("");
    }

    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        self.bar.println(format!(
            "  {} {:<18} {}",
            green("✓"),
            stage.to_string(),
            dim(detail)
        ));
    }

    fn on_image_skipped(&self, skip: &ImageSkip) {
        self.bar.println(format!("  {} {}", yellow("⚠"), dim(&skip.to_string())));
    }

    fn on_run_complete(&self, _output: &Path) {
        self.bar.finish_and_clear();
    }
}

// Runs when `main` returns, including on error, so a failed run does not
// leave a stale spinner line above the error report.
impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Defaults: input_doc.pdf → generated_output.pdf, image in extract_images/
  costsheet

  # Explicit paths
  costsheet spec.pdf -o costing.pdf --image-dir images/

  # Show what would be priced, write nothing
  costsheet --parse-only spec.pdf

  # Custom trigger table, A4 output, JSON summary
  costsheet spec.pdf --triggers triggers.json --page-size a4 --json

TRIGGER TABLE FORMAT (--triggers):
  [
    { "kind": "field", "match": { "contains": "Style:" }, "field": "style" },
    { "kind": "spec",  "match": { "regex": "(?i)zip" },
      "placement": "Zip", "composition": "Metal", "quantity": 1, "rate": 1.2 }
  ]
  Fields: style, sizes, email, care_address. First matching entry wins.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to an existing libpdfium
  RUST_LOG          Override log filter (e.g. costsheet=debug)
"#;

/// Build a priced costing sheet PDF from a garment spec PDF.
#[derive(Parser, Debug)]
#[command(
    name = "costsheet",
    version,
    about = "Build a priced costing sheet PDF from a garment spec PDF",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input spec PDF.
    #[arg(env = "COSTSHEET_INPUT", default_value = "input_doc.pdf")]
    input: PathBuf,

    /// Costing sheet to write.
    #[arg(short, long, env = "COSTSHEET_OUTPUT", default_value = "generated_output.pdf")]
    output: PathBuf,

    /// Directory receiving main_image.<ext>.
    #[arg(long, env = "COSTSHEET_IMAGE_DIR", default_value = "extract_images")]
    image_dir: PathBuf,

    /// Title printed at the top of the sheet.
    #[arg(long, env = "COSTSHEET_TITLE", default_value = "Costing Sheet")]
    title: String,

    /// Output page size: letter or a4.
    #[arg(long, env = "COSTSHEET_PAGE_SIZE", default_value = "letter")]
    page_size: PageSize,

    /// Edge of the square image box in points (16–1000).
    #[arg(long, env = "COSTSHEET_IMAGE_SIZE", default_value_t = 300.0)]
    image_size: f32,

    /// Skip image extraction; the sheet has no image section.
    #[arg(long, env = "COSTSHEET_NO_IMAGE")]
    no_image: bool,

    /// JSON trigger table replacing the built-in labels and keywords.
    #[arg(long, env = "COSTSHEET_TRIGGERS")]
    triggers: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "COSTSHEET_PASSWORD")]
    password: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Print the parsed record only; write no files.
    #[arg(long)]
    parse_only: bool,

    /// Print structured JSON instead of the confirmation lines.
    #[arg(long, env = "COSTSHEET_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "COSTSHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "COSTSHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "COSTSHEET_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // per-stage lines carry the same information.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.parse_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SheetProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Parse-only mode ──────────────────────────────────────────────────
    if cli.parse_only {
        let record = inspect(&config).context("Failed to parse input document")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&record).context("Failed to serialise record")?
            );
        } else {
            for kind in costsheet::FieldKind::ALL {
                println!("{:<14}{}", format!("{}:", kind.label()), record.field(kind));
            }
            for spec in &record.specs {
                println!(
                    "  {:<18} {:<36} {:>3} × {:>6.2} = {:>7.2}",
                    spec.placement,
                    spec.composition,
                    spec.quantity,
                    spec.rate,
                    spec.total()
                );
            }
            println!("{:<14}{:.2}", "Total Cost:", record.grand_total());
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let output = generate(&config).context("Costing sheet generation failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
        return Ok(());
    }

    let image = output
        .image_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "none".to_string());
    println!("Output PDF generated at: {}", output.output_path.display());
    println!("Main image extracted to: {image}");

    if !cli.quiet {
        eprintln!(
            "{}  {} spec lines  total {}  {} page(s)  {}ms",
            green("✔"),
            output.stats.spec_lines,
            bold(&format!("{:.2}", output.stats.grand_total)),
            output.stats.sheet_pages,
            output.stats.total_duration_ms,
        );
        if output.stats.images_skipped > 0 {
            eprintln!(
                "   {} embedded image(s) could not be decoded",
                yellow(&output.stats.images_skipped.to_string())
            );
        }
    }

    Ok(())
}

/// Map CLI args to `SheetConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SheetConfig> {
    let mut builder = SheetConfig::builder()
        .input(&cli.input)
        .output(&cli.output)
        .image_dir(&cli.image_dir)
        .title(&cli.title)
        .page_size(cli.page_size)
        .image_box_pt(cli.image_size)
        .extract_image(!cli.no_image);

    if let Some(ref path) = cli.triggers {
        let table = TriggerTable::from_path(path)
            .with_context(|| format!("Failed to load trigger table from {}", path.display()))?;
        builder = builder.triggers(table);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

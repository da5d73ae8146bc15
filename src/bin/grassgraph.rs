//! CLI binary for grassgraph.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GraphConfig` and writes the resulting image.

use anyhow::{Context, Result};
use clap::Parser;
use grassgraph::{
    get_graph, get_graph_svg, write_atomically, AnchorPolicy, GraphConfig, GraphProgressCallback,
    ProgressCallback, RasterBackend, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that names the running stage and logs one line per finished stage.
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
        bar.set_prefix("grassgraph");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl GraphProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        let msg = match stage {
            Stage::Fetch => "fetching profile page…",
            Stage::Rewrite => "extracting graph…",
            Stage::Rasterize => "rasterising…",
        };
        self.bar.set_message(msg);
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<10} {}",
            green("✓"),
            stage,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Keep the line short; the full error is printed by main.
        let first_line = error.lines().next().unwrap_or(error);
        self.bar
            .println(format!("  {} {:<10} {}", red("✗"), stage, red(first_line)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Write octocat.png using ImageMagick
  grassgraph octocat

  # Render in-process, no ImageMagick needed
  grassgraph --backend resvg octocat -o graph.png

  # Only extract and restyle the SVG
  grassgraph --svg-only octocat -o octocat.svg

  # Machine-readable run statistics
  grassgraph --json octocat

BACKENDS:
  magick   runs `convert -geometry 870x155 -rotate 0 <in.svg> <out.png>`
  resvg    pure-Rust renderer built into the binary

ENVIRONMENT VARIABLES:
  GRASSGRAPH_BACKEND      magick | resvg
  GRASSGRAPH_CONVERTER    Converter program for the magick backend
  GRASSGRAPH_BASE_URL     Profile host (default https://github.com)
  RUST_LOG                Log filter, e.g. grassgraph=debug
"#;

/// Fetch a GitHub contribution graph and save it as a PNG.
#[derive(Parser, Debug)]
#[command(
    name = "grassgraph",
    version,
    about = "Fetch a GitHub contribution graph and save it as a PNG",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// GitHub username whose graph to fetch.
    username: String,

    /// Output file. Default: <USERNAME>.png (or .svg with --svg-only).
    #[arg(short, long, env = "GRASSGRAPH_OUTPUT")]
    output: Option<PathBuf>,

    /// Write the rewritten SVG instead of rasterising it.
    #[arg(long)]
    svg_only: bool,

    /// Rasteriser: magick or resvg.
    #[arg(long, env = "GRASSGRAPH_BACKEND", value_enum, default_value = "magick")]
    backend: BackendArg,

    /// Program invoked by the magick backend.
    #[arg(long, env = "GRASSGRAPH_CONVERTER", default_value = "convert")]
    converter: String,

    /// Profile host the username is appended to.
    #[arg(long, env = "GRASSGRAPH_BASE_URL", default_value = "https://github.com")]
    base_url: String,

    /// HTTP timeout in seconds. Default: none, wait for the network stack.
    #[arg(long, env = "GRASSGRAPH_TIMEOUT")]
    timeout: Option<u64>,

    /// Directory for the converter's temporary files.
    #[arg(long, env = "GRASSGRAPH_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Forward the page unchanged when no graph is found instead of failing.
    #[arg(long)]
    pass_through: bool,

    /// Print run statistics as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "GRASSGRAPH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GRASSGRAPH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "GRASSGRAPH_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum BackendArg {
    Magick,
    Resvg,
}

impl From<BackendArg> for RasterBackend {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Magick => RasterBackend::Magick,
            BackendArg::Resvg => RasterBackend::Resvg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep library logs
    // to errors while it is on.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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
    let spinner = show_progress.then(CliProgressCallback::new);
    let config = build_config(&cli, spinner.clone().map(|s| s as ProgressCallback))?;

    let output_path = cli.output.clone().unwrap_or_else(|| {
        let ext = if cli.svg_only { "svg" } else { "png" };
        PathBuf::from(format!("{}.{}", cli.username, ext))
    });

    // ── Run ──────────────────────────────────────────────────────────────
    let result = run(&cli, &config, &output_path).await;
    if let Some(ref s) = spinner {
        s.finish();
    }
    result
}

async fn run(cli: &Cli, config: &GraphConfig, output_path: &Path) -> Result<()> {
    if cli.svg_only {
        let svg = get_graph_svg(&cli.username, config)
            .await
            .context("Graph extraction failed")?;
        write_atomically(output_path, svg.as_bytes())
            .await
            .context("Failed to write SVG")?;

        if !cli.quiet {
            eprintln!(
                "{}  {} bytes of SVG  →  {}",
                green("✔"),
                svg.len(),
                bold(&output_path.display().to_string()),
            );
        }
        return Ok(());
    }

    let output = get_graph(&cli.username, config)
        .await
        .context("Graph retrieval failed")?;
    write_atomically(output_path, &output.png)
        .await
        .context("Failed to write PNG")?;

    if cli.json {
        let json =
            serde_json::to_string_pretty(&output.stats).context("Failed to serialise stats")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{}  {}x{} px  {}ms  →  {}",
            green("✔"),
            output.width,
            output.height,
            output.stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        if output.stats.http_status >= 400 {
            eprintln!(
                "   {}",
                dim(&format!("profile page answered HTTP {}", output.stats.http_status))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `GraphConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GraphConfig> {
    let policy = if cli.pass_through {
        AnchorPolicy::PassThrough
    } else {
        AnchorPolicy::FailFast
    };

    let mut builder = GraphConfig::builder()
        .base_url(&cli.base_url)
        .backend(cli.backend.clone().into())
        .converter_program(&cli.converter)
        .anchor_policy(policy);

    if let Some(secs) = cli.timeout {
        builder = builder.fetch_timeout_secs(secs);
    }
    if let Some(ref dir) = cli.temp_dir {
        builder = builder.temp_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

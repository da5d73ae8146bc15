//! # grassgraph
//!
//! Fetch a user's public contribution graph from their GitHub profile page,
//! restyle the embedded SVG, and rasterise it to an 870×155 PNG.
//!
//! ## Pipeline Overview
//!
//! ```text
//! username
//!  │
//!  ├─ 1. Fetch      GET https://github.com/<username>
//!  ├─ 2. Rewrite    cut out the graph <svg>, drop hidden day labels,
//!  │                swap in a Less/More legend, outline empty cells
//!  └─ 3. Rasterise  ImageMagick `convert` (default) or in-process resvg
//! ```
//!
//! There is no caching and no retry: the first failing stage aborts the
//! call and its error is returned as-is.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grassgraph::{get_graph, GraphConfig, RasterBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GraphConfig::builder()
//!         .backend(RasterBackend::Resvg)
//!         .build()?;
//!     let output = get_graph("octocat", &config).await?;
//!     std::fs::write("octocat.png", &output.png)?;
//!     eprintln!("{}x{} px in {}ms", output.width, output.height,
//!         output.stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `grassgraph` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AnchorPolicy, Geometry, GraphConfig, GraphConfigBuilder, RasterBackend};
pub use convert::{
    get_graph, get_graph_svg, get_graph_sync, get_graph_to_file, write_atomically, GraphPipeline,
};
pub use error::GraphError;
pub use output::{GraphOutput, GraphStats};
pub use pipeline::fetch::{FetchedPage, Fetcher, HttpFetcher};
pub use pipeline::raster::{MagickRasterizer, Rasterizer, ResvgRasterizer};
pub use pipeline::rewrite::{rewrite_markup, MarkupRewriter, PatternRewriter};
pub use progress::{GraphProgressCallback, NoopProgressCallback, ProgressCallback, Stage};

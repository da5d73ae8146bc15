//! Rasterisation: SVG text → PNG bytes at a fixed geometry.
//!
//! Two backends implement [`Rasterizer`]:
//!
//! * [`MagickRasterizer`] shells out to ImageMagick's `convert`. The SVG is
//!   written into a fresh per-call temporary directory, converted next to
//!   itself, and read back. The directory is a [`TempDir`], so both files
//!   disappear on every return path, and concurrent calls never share paths.
//! * [`ResvgRasterizer`] renders in-process with resvg and touches no files.
//!
//! Both are blocking; [`crate::convert`] drives them from `spawn_blocking`.

use crate::config::{Geometry, GraphConfig, RasterBackend};
use crate::error::GraphError;
use once_cell::sync::Lazy;
use resvg::{tiny_skia, usvg};
use std::io::Cursor;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info};

const SVG_FILE: &str = "graph.svg";
const PNG_FILE: &str = "graph.png";

/// Render an SVG document to encoded PNG bytes of exactly `geometry`.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, svg: &str, geometry: Geometry) -> Result<Vec<u8>, GraphError>;
}

/// Pick the backend named in `config`.
pub fn rasterizer_for(config: &GraphConfig) -> Arc<dyn Rasterizer> {
    match config.backend {
        RasterBackend::Magick => {
            let mut magick = MagickRasterizer::new(config.converter_program.clone());
            magick.temp_root = config.temp_dir.clone();
            Arc::new(magick)
        }
        RasterBackend::Resvg => Arc::new(ResvgRasterizer::new()),
    }
}

// ── External converter ───────────────────────────────────────────────────────

/// Invokes `<program> -geometry WxH -rotate 0 <input.svg> <output.png>`.
#[derive(Debug, Clone)]
pub struct MagickRasterizer {
    pub program: String,
    /// Parent for the per-call temp dir; the OS temp dir when `None`.
    pub temp_root: Option<PathBuf>,
}

impl MagickRasterizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            temp_root: None,
        }
    }

    fn work_dir(&self) -> Result<TempDir, GraphError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("grassgraph-");
        let dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map_err(|e| GraphError::FileWrite {
            path: self.temp_root.clone().unwrap_or_else(std::env::temp_dir),
            source: e,
        })
    }
}

impl Rasterizer for MagickRasterizer {
    fn rasterize(&self, svg: &str, geometry: Geometry) -> Result<Vec<u8>, GraphError> {
        // Dropped on every return path below; removal errors are ignored.
        let work_dir = self.work_dir()?;
        let svg_path = work_dir.path().join(SVG_FILE);
        let png_path = work_dir.path().join(PNG_FILE);

        std::fs::write(&svg_path, svg).map_err(|e| GraphError::FileWrite {
            path: svg_path.clone(),
            source: e,
        })?;

        info!("Running {} -geometry {} -rotate 0", self.program, geometry);
        let output = Command::new(&self.program)
            .arg("-geometry")
            .arg(geometry.to_string())
            .arg("-rotate")
            .arg("0")
            .arg(&svg_path)
            .arg(&png_path)
            .output()
            .map_err(|e| GraphError::conversion(&self.program, format!("could not start: {e}")))?;

        if !output.stdout.is_empty() {
            debug!("{} stdout: {}", self.program, String::from_utf8_lossy(&output.stdout));
        }
        if !output.stderr.is_empty() {
            debug!("{} stderr: {}", self.program, String::from_utf8_lossy(&output.stderr));
        }

        if !output.status.success() {
            return Err(GraphError::conversion(
                &self.program,
                format!("exited with {}", output.status),
            ));
        }

        let png = std::fs::read(&png_path)
            .map_err(|e| GraphError::read(format!("'{}'", png_path.display()), e))?;
        debug!("{} produced {} bytes", self.program, png.len());
        Ok(png)
    }
}

// ── In-process renderer ──────────────────────────────────────────────────────

/// System fonts, scanned once per process on first render so the legend
/// text has a face to use.
static SYSTEM_FONTS: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    debug!("resvg: loaded {} font faces", db.len());
    Arc::new(db)
});

/// resvg-backed rasteriser.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResvgRasterizer;

impl ResvgRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl Rasterizer for ResvgRasterizer {
    fn rasterize(&self, svg: &str, geometry: Geometry) -> Result<Vec<u8>, GraphError> {
        let opts = usvg::Options {
            fontdb: Arc::clone(&*SYSTEM_FONTS),
            ..Default::default()
        };

        let tree = usvg::Tree::from_str(svg, &opts)
            .map_err(|e| GraphError::conversion("resvg", format!("invalid SVG: {e}")))?;

        let mut pixmap = tiny_skia::Pixmap::new(geometry.width, geometry.height)
            .ok_or_else(|| GraphError::conversion("resvg", format!("cannot allocate {geometry}")))?;

        // Fit inside the target while keeping the aspect ratio.
        let size = tree.size();
        let scale = (geometry.width as f32 / size.width()).min(geometry.height as f32 / size.height());
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap.as_mut(),
        );

        pixmap
            .encode_png()
            .map_err(|e| GraphError::conversion("resvg", format!("PNG encoding failed: {e}")))
    }
}

// ── Output probe ─────────────────────────────────────────────────────────────

/// Decode just the image header and return `(width, height)`.
pub fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), GraphError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| GraphError::read("rasterised image", e))?
        .into_dimensions()
        .map_err(|e| GraphError::read("rasterised image", e))
}

//! Pipeline entry points.
//!
//! [`get_graph`] is the one-call API. [`GraphPipeline`] exposes the same
//! chain with each stage injectable, which is how tests substitute a canned
//! fetch and how callers can plug in their own rasteriser.

use crate::config::{Geometry, GraphConfig};
use crate::error::GraphError;
use crate::output::{GraphOutput, GraphStats};
use crate::pipeline::fetch::{validate_identifier, Fetcher, HttpFetcher};
use crate::pipeline::raster::{self, probe_dimensions, Rasterizer};
use crate::pipeline::rewrite::{MarkupRewriter, PatternRewriter};
use crate::progress::Stage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Fetch, rewrite and rasterise the contribution graph of `identifier`.
///
/// # Errors
/// The first failing stage aborts the call:
/// - [`GraphError::InvalidIdentifier`] before any network I/O
/// - [`GraphError::Network`] / [`GraphError::Read`] from the fetch
/// - [`GraphError::AnchorNotFound`] when the page has no graph (fail-fast policy)
/// - [`GraphError::FileWrite`] / [`GraphError::Conversion`] / [`GraphError::Read`]
///   from the rasteriser
///
/// # Example
/// ```rust,no_run
/// use grassgraph::{get_graph, GraphConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let output = get_graph("octocat", &GraphConfig::default()).await?;
/// std::fs::write("octocat.png", &output.png)?;
/// # Ok(())
/// # }
/// ```
pub async fn get_graph(
    identifier: impl AsRef<str>,
    config: &GraphConfig,
) -> Result<GraphOutput, GraphError> {
    GraphPipeline::new(config)?.run(identifier.as_ref()).await
}

/// Fetch and rewrite only; returns the standalone SVG document.
pub async fn get_graph_svg(
    identifier: impl AsRef<str>,
    config: &GraphConfig,
) -> Result<String, GraphError> {
    GraphPipeline::new(config)?.svg(identifier.as_ref()).await
}

/// Synchronous wrapper around [`get_graph`].
///
/// Creates a temporary tokio runtime internally.
pub fn get_graph_sync(
    identifier: impl AsRef<str>,
    config: &GraphConfig,
) -> Result<GraphOutput, GraphError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| GraphError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(get_graph(identifier, config))
}

/// Rasterise the graph and write the PNG to `output_path`.
pub async fn get_graph_to_file(
    identifier: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &GraphConfig,
) -> Result<GraphStats, GraphError> {
    let output = get_graph(identifier, config).await?;
    write_atomically(output_path.as_ref(), &output.png).await?;
    Ok(output.stats)
}

/// Write `bytes` to `path` via a sibling temp file and a rename, so readers
/// never observe a half-written image.
pub async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), GraphError> {
    let write_err = |e| GraphError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

// ── Pipeline ─────────────────────────────────────────────────────────────

/// The fetch → rewrite → rasterise chain with injectable stages.
pub struct GraphPipeline<F: Fetcher = HttpFetcher> {
    config: GraphConfig,
    fetcher: F,
    rewriter: Arc<dyn MarkupRewriter>,
    rasterizer: Arc<dyn Rasterizer>,
}

impl GraphPipeline<HttpFetcher> {
    /// Production pipeline: reqwest fetch, pattern rewrite, configured backend.
    pub fn new(config: &GraphConfig) -> Result<Self, GraphError> {
        Ok(Self::from_parts(config, HttpFetcher::new(config)?))
    }
}

/// What the first two stages hand to the third.
struct Rewritten {
    url: String,
    http_status: u16,
    fetched_bytes: usize,
    svg: String,
    fetch_duration_ms: u64,
    rewrite_duration_ms: u64,
}

impl<F: Fetcher> GraphPipeline<F> {
    /// Pipeline around a caller-supplied fetcher; the rewriter and rasteriser
    /// follow `config`.
    pub fn from_parts(config: &GraphConfig, fetcher: F) -> Self {
        Self {
            config: config.clone(),
            fetcher,
            rewriter: Arc::new(PatternRewriter::new(config.anchor_policy)),
            rasterizer: raster::rasterizer_for(config),
        }
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn MarkupRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Run all three stages.
    pub async fn run(&self, identifier: &str) -> Result<GraphOutput, GraphError> {
        let total_start = Instant::now();
        let rewritten = self.fetch_and_rewrite(identifier).await?;

        // ── Step 3: Rasterise ────────────────────────────────────────────
        self.stage_start(Stage::Rasterize);
        let started = Instant::now();
        let rasterizer = Arc::clone(&self.rasterizer);
        let svg = rewritten.svg.clone();
        let rastered = tokio::task::spawn_blocking(move || {
            rasterizer.rasterize(&svg, Geometry::GRAPH)
        })
        .await
        .map_err(|e| GraphError::Internal(format!("Rasterise task panicked: {}", e)))
        .and_then(|r| r)
        .and_then(|png| {
            let (w, h) = probe_dimensions(&png)?;
            Ok((png, w, h))
        });
        let ((png, width, height), raster_duration_ms) =
            self.stage_end(Stage::Rasterize, started, rastered)?;

        let stats = GraphStats {
            identifier: identifier.to_string(),
            url: rewritten.url,
            http_status: rewritten.http_status,
            fetched_bytes: rewritten.fetched_bytes,
            svg_bytes: rewritten.svg.len(),
            png_bytes: png.len(),
            width,
            height,
            fetch_duration_ms: rewritten.fetch_duration_ms,
            rewrite_duration_ms: rewritten.rewrite_duration_ms,
            raster_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Graph for '{}' ready: {}x{} px, {} bytes, {}ms total",
            identifier, width, height, stats.png_bytes, stats.total_duration_ms
        );

        Ok(GraphOutput {
            png,
            svg: rewritten.svg,
            width,
            height,
            stats,
        })
    }

    /// Run the fetch and rewrite stages only.
    pub async fn svg(&self, identifier: &str) -> Result<String, GraphError> {
        Ok(self.fetch_and_rewrite(identifier).await?.svg)
    }

    async fn fetch_and_rewrite(&self, identifier: &str) -> Result<Rewritten, GraphError> {
        validate_identifier(identifier)?;
        let url = self.config.profile_url(identifier);

        // ── Step 1: Fetch ────────────────────────────────────────────────
        self.stage_start(Stage::Fetch);
        let started = Instant::now();
        let fetched = self.fetcher.fetch(&url).await;
        let (page, fetch_duration_ms) = self.stage_end(Stage::Fetch, started, fetched)?;

        // ── Step 2: Rewrite ──────────────────────────────────────────────
        self.stage_start(Stage::Rewrite);
        let started = Instant::now();
        let rewritten = self.rewriter.rewrite(&page.body);
        let (svg, rewrite_duration_ms) = self.stage_end(Stage::Rewrite, started, rewritten)?;

        Ok(Rewritten {
            url: page.url,
            http_status: page.status,
            fetched_bytes: page.body.len(),
            svg,
            fetch_duration_ms,
            rewrite_duration_ms,
        })
    }

    fn stage_start(&self, stage: Stage) {
        debug!("Stage {} started", stage);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_start(stage);
        }
    }

    /// Report the outcome of `stage` and attach its duration.
    fn stage_end<T>(
        &self,
        stage: Stage,
        started: Instant,
        result: Result<T, GraphError>,
    ) -> Result<(T, u64), GraphError> {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if let Some(ref cb) = self.config.progress_callback {
            match &result {
                Ok(_) => cb.on_stage_complete(stage, elapsed_ms),
                Err(e) => cb.on_stage_error(stage, &e.to_string()),
            }
        }
        result.map(|v| (v, elapsed_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnchorPolicy;
    use crate::pipeline::fetch::FetchedPage;
    use crate::progress::GraphProgressCallback;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const PAGE: &str = r##"<html><body><svg width="828" height="128" class="js-calendar-graph-svg"><g transform="translate(10, 20)"><rect class="day" width="11" height="11" fill="#ebedf0"/></g></svg><p>chrome</p></body></html>"##;

    struct StaticFetcher {
        status: u16,
        body: &'static str,
        calls: AtomicUsize,
    }

    impl StaticFetcher {
        fn new(body: &'static str) -> Self {
            Self {
                status: 200,
                body,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, GraphError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchedPage {
                url: url.to_string(),
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }

    struct FailingFetcher;

    impl Fetcher for FailingFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, GraphError> {
            Err(GraphError::Network {
                url: url.to_string(),
                reason: "connection refused".into(),
            })
        }
    }

    /// Returns a blank PNG of the requested size and remembers the SVG.
    #[derive(Default)]
    struct BlankRasterizer {
        seen: Mutex<Option<String>>,
    }

    impl Rasterizer for BlankRasterizer {
        fn rasterize(&self, svg: &str, geometry: Geometry) -> Result<Vec<u8>, GraphError> {
            *self.seen.lock().unwrap() = Some(svg.to_string());
            let img = image::RgbaImage::new(geometry.width, geometry.height);
            let mut buf = Vec::new();
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .map_err(|e| GraphError::conversion("blank", e.to_string()))?;
            Ok(buf)
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl GraphProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.0.lock().unwrap().push(format!("start:{stage}"));
        }
        fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
            self.0.lock().unwrap().push(format!("done:{stage}"));
        }
        fn on_stage_error(&self, stage: Stage, _error: &str) {
            self.0.lock().unwrap().push(format!("error:{stage}"));
        }
    }

    #[tokio::test]
    async fn run_produces_png_and_stats() {
        let raster = Arc::new(BlankRasterizer::default());
        let pipeline = GraphPipeline::from_parts(&GraphConfig::default(), StaticFetcher::new(PAGE))
            .with_rasterizer(raster.clone());

        let out = pipeline.run("octocat").await.unwrap();

        assert_eq!((out.width, out.height), (870, 155));
        assert_eq!(out.stats.url, "https://github.com/octocat");
        assert_eq!(out.stats.http_status, 200);
        assert_eq!(out.stats.fetched_bytes, PAGE.len());
        assert_eq!(out.stats.svg_bytes, out.svg.len());
        assert_eq!(out.stats.png_bytes, out.png.len());
        assert!(!out.svg.contains("chrome"));

        let seen = raster.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen, out.svg);
    }

    #[tokio::test]
    async fn invalid_identifier_never_reaches_the_network() {
        let fetcher = StaticFetcher::new(PAGE);
        let pipeline = GraphPipeline::from_parts(&GraphConfig::default(), fetcher);
        let err = pipeline.run("../admin").await.unwrap_err();
        assert!(matches!(err, GraphError::InvalidIdentifier { .. }));
        assert_eq!(pipeline.fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_error_aborts_before_rasterising() {
        let raster = Arc::new(BlankRasterizer::default());
        let pipeline = GraphPipeline::from_parts(&GraphConfig::default(), FailingFetcher)
            .with_rasterizer(raster.clone());

        let err = pipeline.run("octocat").await.unwrap_err();
        assert!(matches!(err, GraphError::Network { .. }));
        assert!(raster.seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_anchor_fails_fast_by_default() {
        let raster = Arc::new(BlankRasterizer::default());
        let pipeline = GraphPipeline::from_parts(
            &GraphConfig::default(),
            StaticFetcher::new("<html>404</html>"),
        )
        .with_rasterizer(raster.clone());

        let err = pipeline.run("octocat").await.unwrap_err();
        assert!(matches!(err, GraphError::AnchorNotFound { .. }));
        assert!(raster.seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn pass_through_forwards_page_to_rasteriser() {
        let config = GraphConfig::builder()
            .anchor_policy(AnchorPolicy::PassThrough)
            .build()
            .unwrap();
        let raster = Arc::new(BlankRasterizer::default());
        let pipeline = GraphPipeline::from_parts(&config, StaticFetcher::new("<html>404</html>"))
            .with_rasterizer(raster.clone());

        pipeline.run("octocat").await.unwrap();
        assert_eq!(
            raster.seen.lock().unwrap().as_deref(),
            Some("<html>404</html>")
        );
    }

    #[tokio::test]
    async fn progress_events_follow_stage_order() {
        let rec = Arc::new(Recorder::default());
        let config = GraphConfig::builder()
            .progress_callback(rec.clone())
            .build()
            .unwrap();
        let pipeline = GraphPipeline::from_parts(&config, StaticFetcher::new(PAGE))
            .with_rasterizer(Arc::new(BlankRasterizer::default()));

        pipeline.run("octocat").await.unwrap();
        assert_eq!(
            *rec.0.lock().unwrap(),
            vec![
                "start:fetch",
                "done:fetch",
                "start:rewrite",
                "done:rewrite",
                "start:rasterize",
                "done:rasterize"
            ]
        );
    }

    #[tokio::test]
    async fn progress_reports_failing_stage() {
        let rec = Arc::new(Recorder::default());
        let config = GraphConfig::builder()
            .progress_callback(rec.clone())
            .build()
            .unwrap();
        let pipeline = GraphPipeline::from_parts(&config, StaticFetcher::new("no graph"));

        assert!(pipeline.run("octocat").await.is_err());
        assert_eq!(
            rec.0.lock().unwrap().last().map(String::as_str),
            Some("error:rewrite")
        );
    }

    #[tokio::test]
    async fn svg_stops_after_rewrite() {
        let raster = Arc::new(BlankRasterizer::default());
        let pipeline = GraphPipeline::from_parts(&GraphConfig::default(), StaticFetcher::new(PAGE))
            .with_rasterizer(raster.clone());

        let svg = pipeline.svg("octocat").await.unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(raster.seen.lock().unwrap().is_none());
    }

    #[test]
    fn sync_wrapper_surfaces_identifier_errors() {
        let err = get_graph_sync("", &GraphConfig::default()).unwrap_err();
        assert!(matches!(err, GraphError::InvalidIdentifier { .. }));
    }

    #[test]
    fn write_atomically_creates_parents_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.png");

        tokio_test::block_on(write_atomically(&path, b"png-bytes")).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");
        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.png")]);
    }
}

//! Configuration types for fetching and rasterising a contribution graph.
//!
//! All behaviour is controlled through [`GraphConfig`], built via its
//! [`GraphConfigBuilder`]. Styling and output geometry are deliberately not
//! part of the configuration: the rewritten graph always has the same shape
//! and is always rasterised at [`Geometry::GRAPH`].

use crate::error::GraphError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default profile host; the identifier is appended as the first path segment.
pub const DEFAULT_BASE_URL: &str = "https://github.com";

/// Default external conversion utility (ImageMagick).
pub const DEFAULT_CONVERTER: &str = "convert";

/// Configuration for one graph retrieval.
///
/// Built via [`GraphConfig::builder()`] or using [`GraphConfig::default()`].
///
/// # Example
/// ```rust
/// use grassgraph::{GraphConfig, RasterBackend};
///
/// let config = GraphConfig::builder()
///     .backend(RasterBackend::Resvg)
///     .fetch_timeout_secs(20)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Scheme and host the identifier is appended to. Default: `https://github.com`.
    pub base_url: String,

    /// Whole-request timeout for the profile fetch in seconds.
    /// If None, no timeout is set and the fetch waits as long as the
    /// platform's network stack does.
    pub fetch_timeout_secs: Option<u64>,

    /// `User-Agent` header sent with the fetch. Default: `grassgraph/<version>`.
    pub user_agent: String,

    /// Which rasteriser turns the SVG into a PNG. Default: [`RasterBackend::Magick`].
    pub backend: RasterBackend,

    /// Program invoked by the `Magick` backend. Default: `convert`.
    pub converter_program: String,

    /// Parent directory for the per-call temporary directory.
    /// If None, uses the OS temp dir.
    pub temp_dir: Option<PathBuf>,

    /// What to do when the page has no contribution-graph `<svg>` tag.
    /// Default: [`AnchorPolicy::FailFast`].
    pub anchor_policy: AnchorPolicy,

    /// Optional per-stage progress events.
    #[serde(skip)]
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            fetch_timeout_secs: None,
            user_agent: concat!("grassgraph/", env!("CARGO_PKG_VERSION")).to_string(),
            backend: RasterBackend::default(),
            converter_program: DEFAULT_CONVERTER.to_string(),
            temp_dir: None,
            anchor_policy: AnchorPolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphConfig")
            .field("base_url", &self.base_url)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("backend", &self.backend)
            .field("converter_program", &self.converter_program)
            .field("temp_dir", &self.temp_dir)
            .field("anchor_policy", &self.anchor_policy)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn GraphProgressCallback>"),
            )
            .finish()
    }
}

impl GraphConfig {
    /// Create a new builder for `GraphConfig`.
    pub fn builder() -> GraphConfigBuilder {
        GraphConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build the profile URL for `identifier`.
    pub fn profile_url(&self, identifier: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), identifier)
    }
}

/// Builder for [`GraphConfig`].
#[derive(Debug)]
pub struct GraphConfigBuilder {
    config: GraphConfig,
}

impl GraphConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = Some(secs);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn backend(mut self, backend: RasterBackend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn converter_program(mut self, program: impl Into<String>) -> Self {
        self.config.converter_program = program.into();
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn anchor_policy(mut self, policy: AnchorPolicy) -> Self {
        self.config.anchor_policy = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GraphConfig, GraphError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(GraphError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.fetch_timeout_secs == Some(0) {
            return Err(GraphError::InvalidConfig(
                "Fetch timeout must be ≥ 1 second".into(),
            ));
        }
        if c.converter_program.trim().is_empty() {
            return Err(GraphError::InvalidConfig(
                "Converter program must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Rasterisation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterBackend {
    /// Shell out to ImageMagick's `convert` (default).
    #[default]
    Magick,
    /// Render in-process with resvg; no external binary, no temp files.
    Resvg,
}

/// Behaviour when the opening `<svg class="js-calendar-graph-svg">` anchor
/// is missing from the fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorPolicy {
    /// Fail with [`GraphError::AnchorNotFound`] before rasterising (default).
    #[default]
    FailFast,
    /// Forward the page unchanged and let the rasteriser reject it.
    PassThrough,
}

/// Output pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    /// The fixed size every graph is rasterised at.
    pub const GRAPH: Geometry = Geometry {
        width: 870,
        height: 155,
    };
}

impl fmt::Display for Geometry {
    /// ImageMagick geometry syntax, e.g. `870x155`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

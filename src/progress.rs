//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn GraphProgressCallback>`] via
//! [`crate::config::GraphConfigBuilder::progress_callback`] to be told when
//! each stage starts, finishes, or fails. The CLI uses this to drive a
//! spinner; library callers can forward the events anywhere they like.
//!
//! # Example
//!
//! ```rust
//! use grassgraph::{GraphConfig, GraphProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl GraphProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{stage} took {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = GraphConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn GraphProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One step of the fetch → rewrite → rasterise chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Fetch,
    Rewrite,
    Rasterize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Rewrite => "rewrite",
            Stage::Rasterize => "rasterize",
        };
        f.write_str(name)
    }
}

/// Called by the pipeline around each stage.
///
/// All methods default to no-ops so callers only override what they need.
/// Stages run strictly in order, but the rasterise stage is driven from a
/// blocking worker thread, hence the `Send + Sync` bound.
pub trait GraphProgressCallback: Send + Sync {
    /// Called just before `stage` begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when `stage` finished successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when `stage` failed. No further stage events follow.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// Default callback when none is configured.
pub struct NoopProgressCallback;

impl GraphProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GraphConfig`].
pub type ProgressCallback = Arc<dyn GraphProgressCallback>;

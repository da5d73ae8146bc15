//! Error type for the grassgraph library.
//!
//! Every stage of the pipeline fails into the same [`GraphError`] enum and
//! the first failure aborts the whole call. There is no partial result: a
//! graph is either fully rasterised or not produced at all. Temporary files
//! are still cleaned up on the error path (see [`crate::pipeline::raster`]).

use std::path::PathBuf;
use thiserror::Error;

/// Boxed underlying cause, for variants fed by more than one library.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// All errors returned by the grassgraph library.
#[derive(Debug, Error)]
pub enum GraphError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The profile handle cannot be turned into a request URL.
    #[error("Invalid profile identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    // ── Fetch errors ──────────────────────────────────────────────────────
    /// Connection could not be established or the transport failed.
    #[error("Failed to fetch '{url}': {reason}\nCheck your internet connection.")]
    Network { url: String, reason: String },

    /// A response body or an output file could not be read in full.
    #[error("Failed to read {what}: {source}")]
    Read {
        what: String,
        #[source]
        source: BoxError,
    },

    // ── Rewrite errors ────────────────────────────────────────────────────
    /// The page does not contain the contribution-graph `<svg>` tag.
    #[error(
        "No contribution graph found in the fetched page (missing anchor {anchor}).\n\
Use the pass-through anchor policy to forward the page unchanged."
    )]
    AnchorNotFound { anchor: &'static str },

    // ── Rasterisation errors ──────────────────────────────────────────────
    /// The transient SVG file could not be written.
    #[error("Failed to write temporary file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converter could not be started, exited with failure, or (for the
    /// in-process backend) could not parse or encode the document.
    #[error("Conversion with '{program}' failed: {detail}")]
    Conversion { program: String, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output image file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GraphError {
    pub(crate) fn read(what: impl Into<String>, source: impl Into<BoxError>) -> Self {
        GraphError::Read {
            what: what.into(),
            source: source.into(),
        }
    }

    pub(crate) fn conversion(program: impl Into<String>, detail: impl Into<String>) -> Self {
        GraphError::Conversion {
            program: program.into(),
            detail: detail.into(),
        }
    }
}

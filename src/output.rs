//! Result types returned by the pipeline.

use serde::{Deserialize, Serialize};

/// A rasterised contribution graph.
#[derive(Debug, Clone)]
pub struct GraphOutput {
    /// Encoded PNG bytes.
    pub png: Vec<u8>,
    /// The rewritten SVG document the PNG was produced from.
    pub svg: String,
    /// Pixel width decoded from the PNG header.
    pub width: u32,
    /// Pixel height decoded from the PNG header.
    pub height: u32,
    pub stats: GraphStats,
}

/// Byte counts and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub identifier: String,
    pub url: String,
    /// HTTP status of the profile response; non-2xx is not an error.
    pub http_status: u16,
    pub fetched_bytes: usize,
    pub svg_bytes: usize,
    pub png_bytes: usize,
    pub width: u32,
    pub height: u32,
    pub fetch_duration_ms: u64,
    pub rewrite_duration_ms: u64,
    pub raster_duration_ms: u64,
    pub total_duration_ms: u64,
}

//! Pipeline stages for turning a profile handle into a PNG.
//!
//! Each submodule implements exactly one step behind a narrow trait, so a
//! stage can be swapped (a structural HTML parser, an in-process renderer)
//! without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ rewrite ──▶ raster
//! (HTTP)    (regex)     (convert / resvg)
//! ```
//!
//! 1. [`fetch`]   — GET the profile page; the only stage with network I/O
//! 2. [`rewrite`] — cut the graph `<svg>` out of the page and restyle it
//! 3. [`raster`]  — render the SVG at 870×155; blocking, so it runs under
//!    `spawn_blocking`

pub mod fetch;
pub mod raster;
pub mod rewrite;

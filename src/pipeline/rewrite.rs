//! Markup rewrite: carve the contribution graph out of the profile page.
//!
//! The profile page embeds the graph as an inline `<svg>` somewhere in the
//! middle of a large HTML document. Only that fragment needs to survive, and
//! its shape is fixed, so extraction is done with anchor patterns rather
//! than a full HTML parse. The steps run in a fixed order, each on the
//! output of the previous one:
//!
//! 1. Replace everything up to and including the opening graph `<svg>` with
//!    a fixed opening tag and a white background rectangle.
//! 2. Drop the four hidden day labels (Sun, Tue, Thu, Sat).
//! 3. Replace everything from the trailing anchor to the end of the document
//!    with a fixed "Less … More" legend and the closing tags.
//! 4. Restyle the "no activity" fill as a bordered white cell.
//!
//! The whole procedure sits behind [`MarkupRewriter`] so a structural
//! parser can replace [`PatternRewriter`] without touching other stages.

use crate::config::AnchorPolicy;
use crate::error::GraphError;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Turns a fetched page into a standalone SVG document.
pub trait MarkupRewriter: Send + Sync {
    fn rewrite(&self, raw: &str) -> Result<String, GraphError>;
}

/// The anchor-pattern rewriter described in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternRewriter {
    pub policy: AnchorPolicy,
}

impl PatternRewriter {
    pub fn new(policy: AnchorPolicy) -> Self {
        Self { policy }
    }
}

impl MarkupRewriter for PatternRewriter {
    fn rewrite(&self, raw: &str) -> Result<String, GraphError> {
        rewrite_markup(raw, self.policy)
    }
}

/// Apply all four rewrite steps to `raw`.
///
/// When the opening anchor is missing, [`AnchorPolicy::FailFast`] returns
/// [`GraphError::AnchorNotFound`] and [`AnchorPolicy::PassThrough`] returns
/// `raw` unchanged.
pub fn rewrite_markup(raw: &str, policy: AnchorPolicy) -> Result<String, GraphError> {
    let s = match replace_opening(raw) {
        Some(s) => s,
        None => match policy {
            AnchorPolicy::FailFast => {
                return Err(GraphError::AnchorNotFound {
                    anchor: GRAPH_ANCHOR,
                })
            }
            AnchorPolicy::PassThrough => {
                warn!("No {} anchor in page; passing it through", GRAPH_ANCHOR);
                return Ok(raw.to_string());
            }
        },
    };
    let s = strip_day_labels(&s);
    let s = replace_trailer(&s);
    let s = restyle_empty_cells(&s);

    debug!("Rewrote {} bytes of markup → {} bytes of SVG", raw.len(), s.len());
    Ok(s)
}

// ── Step 1: Opening tag ──────────────────────────────────────────────────────

const GRAPH_ANCHOR: &str = r#"<svg class="js-calendar-graph-svg">"#;

/// The opening tag fixes the canvas; the rectangle gives the graph an opaque
/// backdrop.
pub const OPENING_FRAGMENT: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="870" height="155" class="js-calendar-graph-svg">
		<rect x="0" y="0" width="828" height="128" fill="white" stroke="none"/>"#;

static RE_OPENING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[\s\S]*?<svg[^>]*\bclass="js-calendar-graph-svg"[^>]*>"#).unwrap()
});

/// Step 1. Returns `None` when the graph's `<svg>` tag is not present.
pub fn replace_opening(input: &str) -> Option<String> {
    let m = RE_OPENING.find(input)?;
    let mut out = String::with_capacity(OPENING_FRAGMENT.len() + input.len() - m.end());
    out.push_str(OPENING_FRAGMENT);
    out.push_str(&input[m.end()..]);
    Some(out)
}

// ── Step 2: Hidden day labels ────────────────────────────────────────────────

const HIDDEN_DAY_LABELS: [&str; 4] = [
    r#"<text text-anchor="start" class="wday" dx="-10" dy="8" style="display: none;">Sun</text>"#,
    r#"<text text-anchor="start" class="wday" dx="-10" dy="32" style="display: none;">Tue</text>"#,
    r#"<text text-anchor="start" class="wday" dx="-10" dy="57" style="display: none;">Thu</text>"#,
    r#"<text text-anchor="start" class="wday" dx="-10" dy="81" style="display: none;">Sat</text>"#,
];

/// Step 2. Each label is removed at its first occurrence, if any.
pub fn strip_day_labels(input: &str) -> String {
    HIDDEN_DAY_LABELS
        .iter()
        .fold(input.to_string(), |acc, label| acc.replacen(label, "", 1))
}

// ── Step 3: Legend and closing tags ──────────────────────────────────────────

/// Five swatches from "no activity" to "most activity", then the closing
/// tags for the graph's outer `<g>` and the `<svg>`.
pub const LEGEND_FRAGMENT: &str = r##"
		<text x="675" y="125">Less</text>
		<g transform="translate(709,15)">
			<rect width="11" height="11" x="0" y="99" fill="#ebedf0"/>
		</g>
		<g transform="translate(724,15)">
			<rect width="11" height="11" y="99" fill="#9be9a8"/>
		</g>
		<g transform="translate(739,15)">
			<rect width="11" height="11" y="99" fill="#40c463"/>
		</g>
		<g transform="translate(754,15)">
			<rect width="11" height="11" y="99" fill="#30a14e"/>
		</g>
		<g transform="translate(769,15)">
			<rect width="11" height="11" y="99" fill="#216e39"/>
		</g>
		<text x="788" y="125">More</text>
	</g>
	</svg>"##;

/// The last day label, or, once step 2 has removed it, the `</g></svg>`
/// pair that closes the graph. Everything from there on is page chrome.
static RE_TRAILER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:<text[^>]*>Sat</text>|</g>\s*</svg>)[\s\S]*\z").unwrap()
});

/// Step 3. Input without a trailing anchor is returned unchanged.
pub fn replace_trailer(input: &str) -> String {
    match RE_TRAILER.find(input) {
        Some(m) => {
            let mut out = String::with_capacity(m.start() + LEGEND_FRAGMENT.len());
            out.push_str(&input[..m.start()]);
            out.push_str(LEGEND_FRAGMENT);
            out
        }
        None => input.to_string(),
    }
}

// ── Step 4: Empty-cell style ─────────────────────────────────────────────────

const EMPTY_CELL_FILL: &str = r##"fill="#ebedf0""##;

/// Light grey disappears on white backgrounds; draw it as an outlined cell.
pub const EMPTY_CELL_STYLE: &str = r#"style="fill:white;stroke:#bcbdc0;stroke-width:1""#;

/// Step 4. Replaces every `fill="#ebedf0"`; other fills are left alone.
pub fn restyle_empty_cells(input: &str) -> String {
    input.replace(EMPTY_CELL_FILL, EMPTY_CELL_STYLE)
}

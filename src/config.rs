/// Marker substring identifying a flow-completion line in simulator output.
pub const FINISHED_MARKER: &str = "finished";

/// A finished-flow line tokenizes into exactly this many whitespace fields.
pub const FLOW_LINE_TOKENS: usize = 9;

/// Small flows: size in (0, 100KB].
pub const SMALL_FLOW_MAX_BYTES: u64 = 100 * 1024;

/// Median flows: size in (100KB, 1MB]. Anything above is large.
pub const MEDIAN_FLOW_MAX_BYTES: u64 = 1024 * 1024;

/// Tail quantile reported for the small-flow bucket.
pub const SMALL_TAIL_QUANTILE: f64 = 0.99;

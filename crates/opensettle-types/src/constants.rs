//! System-wide constants for the OpenSettle settlement engine.

/// Relative rounding error is measured in parts per million.
pub const ROUNDING_ERROR_SCALE: u128 = 1_000_000;

/// Maximum tolerated relative rounding error (0.1%) in `ROUNDING_ERROR_SCALE` units.
pub const MAX_ROUNDING_ERROR: u128 = 1_000;

/// Default maximum nesting depth of composite asset data.
pub const DEFAULT_MAX_COMPOSITE_DEPTH: usize = 8;

/// Width of one ABI word in composite payloads.
pub const WORD_SIZE: usize = 32;

/// Width of an asset type tag.
pub const ASSET_TYPE_TAG_SIZE: usize = 4;


//! Utility functions module
//!
//! Contains the interval clock and helpers for size parsing and
//! report formatting.

pub mod clock;
pub mod units;

// Re-export commonly used functions
pub use clock::{floor_elapsed, Clock, TimingSample, MIN_ELAPSED_SECS};
pub use units::{
    format_hex, format_hms, format_iops, format_kbps, format_test_size, parse_size,
    size_or_default,
};

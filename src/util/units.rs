//! Units parsing and formatting utilities
//!
//! Parses test-size arguments and formats throughput, IOPS, elapsed time
//! and pattern values the way the reports print them.

use crate::{DEFAULT_TEST_SIZE, MIN_TEST_SIZE};
use tracing::warn;

/// Parse a size argument such as `4M`, `300K` or `65536`
///
/// Leading digits are read as a decimal number; a `K` or `M` suffix
/// (either case) multiplies by 1024 or 1048576. Anything after the
/// suffix is ignored. Values below 64K are rejected.
///
/// # Examples
/// ```
/// use disktest::util::units::parse_size;
///
/// assert_eq!(parse_size("4M").unwrap(), 4194304);
/// assert_eq!(parse_size("300k").unwrap(), 307200);
/// assert!(parse_size("16K").is_err());
/// ```
pub fn parse_size(input: &str) -> Result<u64, String> {
    let input = input.trim();
    let digits_end = input
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(input.len());

    let number: u64 = if digits_end == 0 {
        0
    } else {
        input[..digits_end]
            .parse()
            .map_err(|_| format!("Invalid number: {}", &input[..digits_end]))?
    };

    let multiplier = match input[digits_end..].chars().next() {
        Some('K') | Some('k') => 1024,
        Some('M') | Some('m') => 1024 * 1024,
        _ => 1,
    };

    let value = number
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Size too large: {}", input))?;

    if value < MIN_TEST_SIZE {
        return Err(format!("Size must be 64K or more, got {}", input));
    }

    Ok(value)
}

/// Parse a size argument, falling back to the 4MB default when invalid
pub fn size_or_default(input: &str) -> u64 {
    if input.trim().is_empty() {
        return DEFAULT_TEST_SIZE;
    }
    match parse_size(input) {
        Ok(size) => size,
        Err(reason) => {
            warn!(input, %reason, "Size parameter must be 64K or more. Using default");
            DEFAULT_TEST_SIZE
        }
    }
}

/// Format a throughput value in KB/s
pub fn format_kbps(kbps: f64) -> String {
    format!("{:.2} KB/s", kbps)
}

/// Format an IOPS value
pub fn format_iops(iops: f64) -> String {
    format!("{:.1} IOPS", iops)
}

/// Format elapsed seconds as `HH:MM:SS`
///
/// # Examples
/// ```
/// use disktest::util::units::format_hms;
///
/// assert_eq!(format_hms(3725.4), "01:02:05");
/// ```
pub fn format_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Format a test size the way the pattern tests announce it
pub fn format_test_size(bytes: u64) -> String {
    if bytes > 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{} KB", bytes / 1024)
    }
}

/// Format a 16-bit pattern as `0xHHHH`
pub fn format_hex(value: u16) -> String {
    format!("0x{:04X}", value)
}

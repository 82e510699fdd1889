//! DiskTest - disk and interface performance and reliability testing
//!
//! Drives sequential, random and bit-pattern workloads against a test file,
//! timing them with a monotonic clock and reporting throughput, IOPS and
//! block-level data integrity.

use std::fmt;
use std::path::PathBuf;

pub mod bench;
pub mod cli;
pub mod config;
pub mod console;
pub mod io;
pub mod logging;
pub mod models;
pub mod util;

// Common error types
#[derive(Debug)]
pub enum DiskTestError {
    /// Test file could not be created or opened
    IoError(std::io::Error),
    /// Configuration validation or parsing error
    ConfigError(String),
    /// Not enough free space for a single pattern block
    InsufficientSpace(String),
    /// Read-only mode was requested but no test file exists
    TestFileMissing(PathBuf),
    /// A single read or write failed inside a transfer loop
    TransferError(String),
}

impl fmt::Display for DiskTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskTestError::IoError(err) => write!(f, "I/O error: {}", err),
            DiskTestError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            DiskTestError::InsufficientSpace(msg) => write!(f, "Insufficient disk space: {}", msg),
            DiskTestError::TestFileMissing(path) => {
                write!(f, "Test file not found: {}", path.display())
            }
            DiskTestError::TransferError(msg) => write!(f, "Transfer error: {}", msg),
        }
    }
}

impl std::error::Error for DiskTestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiskTestError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DiskTestError {
    fn from(err: std::io::Error) -> Self {
        DiskTestError::IoError(err)
    }
}

impl From<toml::de::Error> for DiskTestError {
    fn from(err: toml::de::Error) -> Self {
        DiskTestError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_json::Error> for DiskTestError {
    fn from(err: serde_json::Error) -> Self {
        DiskTestError::ConfigError(format!("JSON serialization error: {}", err))
    }
}

impl DiskTestError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Result type alias for DiskTest operations
pub type Result<T> = std::result::Result<T, DiskTestError>;

/// Error handling utilities
pub mod error {
    use super::DiskTestError;

    /// Convert error to user-friendly message with suggestions
    pub fn user_friendly_message(error: &DiskTestError) -> String {
        match error {
            DiskTestError::IoError(err) => match err.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    "Permission denied. Check that the test directory is writable.".to_string()
                }
                std::io::ErrorKind::NotFound => {
                    "Test file could not be opened. Check the drive is still attached.".to_string()
                }
                _ => format!("Failed to access test file: {}", err),
            },
            DiskTestError::InsufficientSpace(_) => {
                "Insufficient disk space. At least 32K of free space is required.".to_string()
            }
            DiskTestError::TestFileMissing(path) => format!(
                "Read-only test mode needs an existing test file; {} was not found.",
                path.display()
            ),
            DiskTestError::ConfigError(msg) => {
                format!("Configuration error: {}. Check your settings.", msg)
            }
            _ => error.to_string(),
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "disktest";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CONFIG_FILE: &str = "disktest.toml";
pub const DEFAULT_FILENAME: &str = "TEST$$$.FIL";
pub const DEFAULT_TEST_SIZE: u64 = 4 * 1024 * 1024;
pub const MIN_TEST_SIZE: u64 = 64 * 1024;
pub const DEFAULT_SEEKS: usize = 256;
/// Transfer size of sequential and pattern I/O
pub const BLOCK_SIZE: usize = 32 * 1024;
/// Number of 16-bit words in one pattern block
pub const BLOCK_WORDS: usize = BLOCK_SIZE / 2;
pub const SECTOR_SIZE: u64 = 512;

//! Configuration management module
//!
//! Holds the per-session test configuration, the seek-count presets and
//! the optional TOML defaults file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::util::units::size_or_default;
use crate::{
    DiskTestError, Result, APP_NAME, BLOCK_SIZE, CONFIG_FILE, DEFAULT_FILENAME, DEFAULT_SEEKS,
    DEFAULT_TEST_SIZE, MIN_TEST_SIZE,
};

/// Parameters of one test session; not modified once the session starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfiguration {
    /// Test file location
    pub test_path: PathBuf,
    /// Test file size in bytes
    pub file_size: u64,
    /// Number of transfers in each random test
    pub seeks: usize,
    /// Grow the test file to all free space on the volume
    pub use_all_space: bool,
    /// Only read an existing test file
    pub read_only: bool,
    /// Render progress while testing
    pub show_progress: bool,
    /// Which session to run
    pub mode: SessionMode,
}

/// The supported test sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    /// Sequential throughput plus random IOPS
    Standard,
    /// Exhaustive bit-pattern test of the whole file
    MediaTest,
    /// Interactive electrical pattern menu
    SignalTest,
}

impl SessionMode {
    pub fn description(&self) -> &'static str {
        match self {
            SessionMode::Standard => "Performance test",
            SessionMode::MediaTest => "Media pattern test",
            SessionMode::SignalTest => "Signal pattern test",
        }
    }
}

/// Seek-count presets for the random tests
///
/// Ordered by precedence: when several are given the greatest wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeekProfile {
    Max,
    High,
    Low,
    Min,
}

impl SeekProfile {
    pub fn seeks(&self) -> usize {
        match self {
            SeekProfile::Max => 4096,
            SeekProfile::High => 1024,
            SeekProfile::Low => 128,
            SeekProfile::Min => 32, // floppy drives
        }
    }

    /// Match a command-line token such as `maxseeks`
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "maxseeks" => Some(SeekProfile::Max),
            "highseeks" => Some(SeekProfile::High),
            "lowseeks" => Some(SeekProfile::Low),
            "minseeks" => Some(SeekProfile::Min),
            _ => None,
        }
    }
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self {
            test_path: PathBuf::from(DEFAULT_FILENAME),
            file_size: DEFAULT_TEST_SIZE,
            seeks: DEFAULT_SEEKS,
            use_all_space: false,
            read_only: false,
            show_progress: true,
            mode: SessionMode::Standard,
        }
    }
}

impl TestConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of whole 32KB blocks in the test file
    pub fn block_count(&self) -> u64 {
        self.file_size / BLOCK_SIZE as u64
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.test_path.as_os_str().is_empty() {
            return Err(DiskTestError::ConfigError(
                "Test file path must not be empty".to_string(),
            ));
        }

        if self.file_size < MIN_TEST_SIZE {
            return Err(DiskTestError::ConfigError(format!(
                "Test size must be at least {} bytes, got {}",
                MIN_TEST_SIZE, self.file_size
            )));
        }

        if self.seeks == 0 {
            return Err(DiskTestError::ConfigError(
                "Seek count must be greater than 0".to_string(),
            ));
        }

        if self.read_only && self.mode != SessionMode::Standard {
            return Err(DiskTestError::ConfigError(format!(
                "{} cannot run in read-only mode",
                self.mode.description()
            )));
        }

        Ok(())
    }

    /// Set the test file location
    pub fn with_test_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.test_path = path.into();
        self
    }

    /// Set the test file size
    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = size;
        self
    }

    /// Set the random-test seek count
    pub fn with_seeks(mut self, seeks: usize) -> Self {
        self.seeks = seeks;
        self
    }

    /// Size the test file from free space instead of `file_size`
    pub fn with_all_space(mut self, all: bool) -> Self {
        self.use_all_space = all;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Optional defaults read from `disktest.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Test file name or path
    pub test_file: Option<PathBuf>,
    /// Test size, e.g. "8M"
    pub size: Option<String>,
    /// Seek count for random tests
    pub seeks: Option<usize>,
    /// Show progress
    pub progress: Option<bool>,
}

impl ConfigFile {
    /// Load defaults from the standard config file location
    /// Returns empty defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        match Self::config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load defaults from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DiskTestError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `$CONFIG_HOME/disktest/disktest.toml`
    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Build a configuration from these defaults
    pub fn apply(&self, mut config: TestConfiguration) -> TestConfiguration {
        if let Some(path) = &self.test_file {
            config.test_path = path.clone();
        }
        if let Some(size) = &self.size {
            config.file_size = size_or_default(size);
        }
        if let Some(seeks) = self.seeks {
            config.seeks = seeks;
        }
        if let Some(progress) = self.progress {
            config.show_progress = progress;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = TestConfiguration::default();
        assert_eq!(config.test_path, PathBuf::from("TEST$$$.FIL"));
        assert_eq!(config.file_size, 4 * 1024 * 1024);
        assert_eq!(config.seeks, 256);
        assert_eq!(config.block_count(), 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(TestConfiguration::new().with_file_size(1024).validate().is_err());
        assert!(TestConfiguration::new().with_seeks(0).validate().is_err());
        assert!(TestConfiguration::new()
            .with_read_only(true)
            .with_mode(SessionMode::MediaTest)
            .validate()
            .is_err());
        assert!(TestConfiguration::new().with_test_path("").validate().is_err());
    }

    #[test]
    fn test_seek_profiles() {
        assert_eq!(SeekProfile::from_token("maxseeks").unwrap().seeks(), 4096);
        assert_eq!(SeekProfile::from_token("HIGHSEEKS").unwrap().seeks(), 1024);
        assert_eq!(SeekProfile::from_token("lowseeks").unwrap().seeks(), 128);
        assert_eq!(SeekProfile::from_token("minseeks").unwrap().seeks(), 32);
        assert!(SeekProfile::from_token("seeks").is_none());
    }

    #[test]
    fn test_config_file_apply() {
        let file = ConfigFile::parse(
            r#"
            test_file = "D:/DISKTEST.FIL"
            size = "8M"
            seeks = 64
            progress = false
            "#,
        )
        .unwrap();

        let config = file.apply(TestConfiguration::new());
        assert_eq!(config.test_path, PathBuf::from("D:/DISKTEST.FIL"));
        assert_eq!(config.file_size, 8 * 1024 * 1024);
        assert_eq!(config.seeks, 64);
        assert!(!config.show_progress);
    }

    #[test]
    fn test_config_file_small_size_falls_back() {
        let file = ConfigFile::parse("size = \"10K\"").unwrap();
        assert_eq!(file.apply(TestConfiguration::new()).file_size, DEFAULT_TEST_SIZE);
    }

    #[test]
    fn test_config_file_missing_and_malformed() {
        let temp_dir = tempdir().unwrap();
        let missing = ConfigFile::load_from(&temp_dir.path().join("none.toml")).unwrap();
        assert_eq!(missing, ConfigFile::default());

        let bad = temp_dir.path().join("bad.toml");
        fs::write(&bad, "seeks = \"many\"").unwrap();
        assert!(matches!(
            ConfigFile::load_from(&bad),
            Err(DiskTestError::ConfigError(_))
        ));
    }

    #[test]
    fn test_config_file_path() {
        if let Some(path) = ConfigFile::config_file_path() {
            assert!(path.to_string_lossy().contains("disktest.toml"));
        }
    }
}

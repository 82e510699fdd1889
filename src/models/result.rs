//! Session result data models
//!
//! Each session produces one report. Reports are printed by the console
//! layer and can be serialized to JSON; nothing is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::bench::pattern::PatternTestResult;
use crate::bench::random::RandomSample;
use crate::bench::sequential::ThroughputSample;
use crate::config::TestConfiguration;
use crate::Result;

/// Complete session result with the configuration it ran under
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// When the session finished
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub test_file: PathBuf,
    pub file_size: u64,
    pub seeks: usize,
    pub read_only: bool,
    pub results: SessionResults,
}

/// Results of whichever session ran
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "session", rename_all = "snake_case")]
pub enum SessionResults {
    Standard(StandardReport),
    MediaTest(MediaReport),
    SignalTest(SignalReport),
}

/// Sequential throughput and random IOPS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardReport {
    /// Absent in read-only mode
    pub write: Option<ThroughputSample>,
    pub read: ThroughputSample,
    /// 8K mixed (or pure read when read-only) random pass
    pub mixed: RandomSample,
    /// 512-byte random read pass
    pub sector: RandomSample,
    /// `1000 / sector IOPS`
    pub average_access_ms: f64,
}

/// One media-test pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternOutcome {
    pub name: String,
    pub value: u16,
    pub walking: bool,
    pub result: PatternTestResult,
}

/// Exhaustive pattern test over the whole file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaReport {
    pub file_size: u64,
    /// Patterns that ran, in table order
    pub patterns: Vec<PatternOutcome>,
    /// Erroneous 32KB blocks across all patterns
    pub total_errors: u64,
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    /// The user quit before every pattern ran
    pub aborted: bool,
    /// Pattern whose in-memory self-check failed, stopping the test
    pub ram_fault: Option<String>,
}

/// One signal-test menu selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRun {
    pub name: String,
    pub verified: bool,
    pub result: PatternTestResult,
}

/// Interactive signal test
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalReport {
    pub runs: Vec<SignalRun>,
    pub total_errors: u64,
    pub aborted: bool,
}

impl SessionReport {
    pub fn new(config: &TestConfiguration, results: SessionResults) -> Self {
        Self {
            timestamp: Utc::now(),
            version: crate::VERSION.to_string(),
            test_file: config.test_path.clone(),
            file_size: config.file_size,
            seeks: config.seeks,
            read_only: config.read_only,
            results,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Errors found by a pattern session; 0 for the standard test
    pub fn total_errors(&self) -> u64 {
        match &self.results {
            SessionResults::Standard(_) => 0,
            SessionResults::MediaTest(report) => report.total_errors,
            SessionResults::SignalTest(report) => report.total_errors,
        }
    }
}

impl MediaReport {
    /// Every table pattern ran without being cut short
    pub fn is_complete(&self, table_len: usize) -> bool {
        self.ram_fault.is_none() && !self.aborted && self.patterns.len() == table_len
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(seconds.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_random(label: &str, iops: f64) -> RandomSample {
        RandomSample {
            label: label.to_string(),
            transfer_size: 512,
            read_percentage: 100,
            reads: 256,
            writes: 0,
            failures: 0,
            seconds: 256.0 / iops,
            iops,
        }
    }

    #[test]
    fn test_standard_report_json() {
        let config = TestConfiguration::new();
        let report = SessionReport::new(
            &config,
            SessionResults::Standard(StandardReport {
                write: Some(ThroughputSample::new(4 * 1024 * 1024, 128, 2.0, true)),
                read: ThroughputSample::new(4 * 1024 * 1024, 128, 1.0, true),
                mixed: sample_random("8K random, 70% read", 80.0),
                sector: sample_random("Sector random read", 100.0),
                average_access_ms: 10.0,
            }),
        );

        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["results"]["session"], "standard");
        assert_eq!(value["results"]["write"]["kbps"], 2048.0);
        assert_eq!(value["results"]["sector"]["label"], "Sector random read");
        assert_eq!(value["file_size"], 4 * 1024 * 1024);
        assert_eq!(report.total_errors(), 0);
    }

    #[test]
    fn test_media_report_roundtrip() {
        let config = TestConfiguration::new().with_file_size(64 * 1024);
        let media = MediaReport {
            file_size: 64 * 1024,
            patterns: vec![PatternOutcome {
                name: "Pattern 0x0000".to_string(),
                value: 0,
                walking: false,
                result: PatternTestResult {
                    errors: 1,
                    blocks_written: 2,
                    blocks_compared: 2,
                    ..PatternTestResult::default()
                },
            }],
            total_errors: 1,
            elapsed: Duration::from_millis(1500),
            aborted: true,
            ram_fault: None,
        };
        let report = SessionReport::new(&config, SessionResults::MediaTest(media));

        let json = report.to_json().unwrap();
        assert!(json.contains("\"session\": \"media_test\""));
        assert!(json.contains("\"elapsed\": 1.5"));

        let parsed: SessionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_errors(), 1);
        match parsed.results {
            SessionResults::MediaTest(media) => {
                assert_eq!(media.elapsed, Duration::from_millis(1500));
                assert!(!media.is_complete(10));
            }
            other => panic!("unexpected results: {:?}", other),
        }
    }
}

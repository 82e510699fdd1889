//! Sequential throughput benchmark
//!
//! Streams 32KB blocks across the whole test file from offset 0 and
//! times the full pass, including the final close.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::bench::progress::{Phase, ProgressSink, ProgressUpdate};
use crate::config::TestConfiguration;
use crate::io::disk::{read_full, write_full, FileStorage, OpenMode};
use crate::util::clock::Clock;
use crate::{DiskTestError, Result, BLOCK_SIZE};

/// Outcome of one sequential pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSample {
    /// Bytes actually transferred
    pub bytes: u64,
    /// Blocks actually transferred
    pub blocks: u64,
    /// Elapsed seconds, floored
    pub seconds: f64,
    /// Throughput in KB/s
    pub kbps: f64,
    /// False when a transfer failed and the pass stopped early
    pub completed: bool,
}

impl ThroughputSample {
    pub fn new(bytes: u64, blocks: u64, seconds: f64, completed: bool) -> Self {
        Self {
            bytes,
            blocks,
            seconds,
            kbps: (bytes as f64 / 1024.0) / seconds,
            completed,
        }
    }
}

/// Sequential benchmark executor
pub struct SequentialTester<'a> {
    storage: &'a dyn FileStorage,
    config: &'a TestConfiguration,
    buffer: Vec<u8>,
}

impl<'a> SequentialTester<'a> {
    pub fn new(storage: &'a dyn FileStorage, config: &'a TestConfiguration) -> Self {
        Self {
            storage,
            config,
            buffer: vec![0u8; BLOCK_SIZE],
        }
    }

    /// Create the test file and write it sequentially
    pub fn run_write(&mut self, progress: &mut dyn ProgressSink) -> Result<ThroughputSample> {
        let path = &self.config.test_path;
        let mut file = self.storage.create(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to create test file");
            DiskTestError::IoError(e)
        })?;

        let total = self.config.block_count();
        let mut bytes = 0u64;
        let mut blocks = 0u64;
        let mut completed = true;

        progress.phase_started("Write Speed", Phase::SequentialWrite, total);
        let clock = Clock::start();

        for block in 1..=total {
            match write_full(file.as_mut(), &self.buffer) {
                Ok(written) => {
                    bytes += written as u64;
                    blocks += 1;
                }
                Err(e) => {
                    let err = DiskTestError::TransferError(format!(
                        "write of block {} at offset {} failed: {}",
                        block,
                        (block - 1) * BLOCK_SIZE as u64,
                        e
                    ));
                    warn!(error = %err, "Write error");
                    completed = false;
                    break;
                }
            }
            progress.on_progress(&ProgressUpdate::new(Phase::SequentialWrite, block, total));
        }

        if let Err(e) = file.close() {
            warn!(error = %e, "Failed to close test file after writing");
        }
        let seconds = clock.stop();
        progress.phase_finished(Phase::SequentialWrite);

        debug!(bytes, seconds, "Sequential write finished");
        Ok(ThroughputSample::new(bytes, blocks, seconds, completed))
    }

    /// Read the existing test file sequentially
    pub fn run_read(&mut self, progress: &mut dyn ProgressSink) -> Result<ThroughputSample> {
        let path = &self.config.test_path;
        let mut file = self
            .storage
            .open(path, OpenMode::ReadOnly)
            .map_err(|e| {
                error!(path = %path.display(), error = %e, "Failed to open test file for reading");
                DiskTestError::IoError(e)
            })?;

        let total = self.config.block_count();
        let mut bytes = 0u64;
        let mut blocks = 0u64;
        let mut completed = true;

        progress.phase_started("Read Speed", Phase::SequentialRead, total);
        let clock = Clock::start();

        for block in 1..=total {
            match read_full(file.as_mut(), &mut self.buffer) {
                Ok(read) if read == BLOCK_SIZE => {
                    bytes += read as u64;
                    blocks += 1;
                }
                Ok(read) => {
                    bytes += read as u64;
                    warn!(block, read, "Read error: test file ended early");
                    completed = false;
                    break;
                }
                Err(e) => {
                    let err = DiskTestError::TransferError(format!(
                        "read of block {} failed: {}",
                        block, e
                    ));
                    warn!(error = %err, "Read error");
                    completed = false;
                    break;
                }
            }
            progress.on_progress(&ProgressUpdate::new(Phase::SequentialRead, block, total));
        }

        if let Err(e) = file.close() {
            warn!(error = %e, "Failed to close test file after reading");
        }
        let seconds = clock.stop();
        progress.phase_finished(Phase::SequentialRead);

        debug!(bytes, seconds, "Sequential read finished");
        Ok(ThroughputSample::new(bytes, blocks, seconds, completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::progress::NullProgress;
    use crate::io::disk::PlatformStorage;
    use crate::io::memory::{IoOp, MemoryStorage};
    use tempfile::tempdir;

    #[test]
    fn test_sequential_write_then_read() {
        let temp_dir = tempdir().unwrap();
        let storage = PlatformStorage::new();
        let config = TestConfiguration::new()
            .with_test_path(temp_dir.path().join("TEST$$$.FIL"))
            .with_file_size(256 * 1024);

        let mut tester = SequentialTester::new(&storage, &config);

        let mut updates = Vec::new();
        let write = tester
            .run_write(&mut |u: &ProgressUpdate| updates.push(*u))
            .unwrap();
        assert!(write.completed);
        assert_eq!(write.blocks, 8);
        assert_eq!(write.bytes, 256 * 1024);
        assert!(write.kbps > 0.0);
        assert_eq!(std::fs::metadata(&config.test_path).unwrap().len(), 256 * 1024);

        assert_eq!(updates.len(), 8);
        let last = updates.last().unwrap();
        assert_eq!(last.phase, Phase::SequentialWrite);
        assert_eq!(last.completion_percentage(), 1.0);

        let read = tester.run_read(&mut NullProgress).unwrap();
        assert!(read.completed);
        assert_eq!(read.blocks, 8);
        assert!(read.seconds > 0.0);
    }

    #[test]
    fn test_write_is_sequential_from_zero() {
        let storage = MemoryStorage::new();
        let config = TestConfiguration::new()
            .with_test_path("seq.fil")
            .with_file_size(128 * 1024);

        SequentialTester::new(&storage, &config)
            .run_write(&mut NullProgress)
            .unwrap();

        let offsets: Vec<u64> = storage
            .ops()
            .iter()
            .map(|op| match op {
                IoOp::Write { offset, .. } => *offset,
                IoOp::Read { .. } => panic!("unexpected read"),
            })
            .collect();
        assert_eq!(offsets, vec![0, 32768, 65536, 98304]);
    }

    #[test]
    fn test_write_failure_reports_partial_throughput() {
        let storage = MemoryStorage::new();
        storage.fail_writes_after(3);
        let config = TestConfiguration::new()
            .with_test_path("seq.fil")
            .with_file_size(256 * 1024);

        let sample = SequentialTester::new(&storage, &config)
            .run_write(&mut NullProgress)
            .unwrap();
        assert!(!sample.completed);
        assert_eq!(sample.blocks, 3);
        assert_eq!(sample.bytes, 3 * 32768);
        assert!(sample.kbps > 0.0);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let temp_dir = tempdir().unwrap();
        let storage = PlatformStorage::new();
        let config = TestConfiguration::new().with_test_path(temp_dir.path().join("missing.fil"));

        let result = SequentialTester::new(&storage, &config).run_read(&mut NullProgress);
        assert!(matches!(result, Err(DiskTestError::IoError(_))));
    }

    #[test]
    fn test_create_failure_is_io_error() {
        let storage = MemoryStorage::new();
        storage.fail_opens();
        let config = TestConfiguration::new().with_test_path("seq.fil");

        let result = SequentialTester::new(&storage, &config).run_write(&mut NullProgress);
        assert!(matches!(result, Err(DiskTestError::IoError(_))));
    }

    #[test]
    fn test_read_of_short_file_stops_early() {
        let storage = MemoryStorage::new();
        storage.insert("short.fil", vec![0u8; 40 * 1024]);
        let config = TestConfiguration::new()
            .with_test_path("short.fil")
            .with_file_size(128 * 1024);

        let sample = SequentialTester::new(&storage, &config)
            .run_read(&mut NullProgress)
            .unwrap();
        assert!(!sample.completed);
        assert_eq!(sample.blocks, 1);
        assert_eq!(sample.bytes, 40 * 1024);
    }
}

//! Random-access IOPS benchmark
//!
//! Seeks to sector-aligned random offsets and issues a fixed number of
//! reads or writes, split by a cyclic read/write slot pattern.

use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, warn};

use crate::bench::progress::{Phase, ProgressSink, ProgressUpdate};
use crate::config::TestConfiguration;
use crate::io::disk::{read_full, write_full, FileStorage, OpenMode};
use crate::util::clock::Clock;
use crate::{DiskTestError, Result, BLOCK_SIZE, SECTOR_SIZE};

/// Round an offset down to a 512-byte sector boundary
pub fn sector_align(offset: u64) -> u64 {
    offset & !(SECTOR_SIZE - 1)
}

/// Source of sector-aligned random file offsets
pub struct RandomPositionGenerator {
    rng: SmallRng,
}

impl RandomPositionGenerator {
    /// Seed from the wall clock; close successive calls may repeat sequences
    pub fn from_time() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self::with_seed(seed)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// `count` offsets in `[0, file_size - transfer_size]`, each sector-aligned
    pub fn generate(&mut self, count: usize, file_size: u64, transfer_size: u64) -> Vec<u64> {
        let max = file_size.saturating_sub(transfer_size);
        (0..count)
            .map(|_| {
                let pos = if max == 0 {
                    0
                } else {
                    self.rng.gen_range(0..max)
                };
                sector_align(pos)
            })
            .collect()
    }
}

/// Whether the `slot`-th transfer of a cycle (1..=10) is a read
///
/// The first `read_percentage / 10` slots of every ten read; the rest write.
pub fn is_read_slot(slot: u32, read_percentage: u32) -> bool {
    slot <= read_percentage / 10
}

/// Outcome of one random-access pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomSample {
    pub label: String,
    pub transfer_size: usize,
    pub read_percentage: u32,
    pub reads: u64,
    pub writes: u64,
    /// Seeks or transfers that returned an error
    pub failures: u64,
    pub seconds: f64,
    pub iops: f64,
}

impl RandomSample {
    /// Average access time in milliseconds
    pub fn access_time_ms(&self) -> f64 {
        if self.iops > 0.0 {
            1000.0 / self.iops
        } else {
            0.0
        }
    }
}

/// Random benchmark executor
pub struct RandomAccessTester<'a> {
    storage: &'a dyn FileStorage,
    config: &'a TestConfiguration,
    buffer: Vec<u8>,
    /// Fixed generator; each run seeds a fresh one from the clock when unset
    positions: Option<RandomPositionGenerator>,
}

impl<'a> RandomAccessTester<'a> {
    pub fn new(storage: &'a dyn FileStorage, config: &'a TestConfiguration) -> Self {
        Self {
            storage,
            config,
            buffer: vec![0u8; BLOCK_SIZE],
            positions: None,
        }
    }

    /// Use a specific position generator
    pub fn with_generator(mut self, positions: RandomPositionGenerator) -> Self {
        self.positions = Some(positions);
        self
    }

    /// Run `config.seeks` random transfers of `transfer_size` bytes
    pub fn run(
        &mut self,
        label: &str,
        transfer_size: usize,
        read_percentage: u32,
        progress: &mut dyn ProgressSink,
    ) -> Result<RandomSample> {
        if transfer_size == 0 || transfer_size > self.buffer.len() {
            return Err(DiskTestError::ConfigError(format!(
                "Transfer size must be between 1 and {} bytes",
                self.buffer.len()
            )));
        }
        if read_percentage > 100 {
            return Err(DiskTestError::ConfigError(format!(
                "Read percentage must be at most 100, got {}",
                read_percentage
            )));
        }

        let path = &self.config.test_path;
        let mode = if is_read_slot(10, read_percentage) {
            OpenMode::ReadOnly
        } else {
            OpenMode::ReadWrite
        };
        let mut file = self.storage.open(path, mode).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to open test file for random access");
            DiskTestError::IoError(e)
        })?;

        let (count, file_size) = (self.config.seeks, self.config.file_size);
        let positions = match self.positions.as_mut() {
            Some(generator) => generator.generate(count, file_size, transfer_size as u64),
            None => RandomPositionGenerator::from_time().generate(count, file_size, transfer_size as u64),
        };
        let total = positions.len() as u64;
        let buffer = &mut self.buffer[..transfer_size];

        let mut reads = 0u64;
        let mut writes = 0u64;
        let mut failures = 0u64;
        let mut slot = 1u32;

        progress.phase_started(label, Phase::RandomIo, total);
        let clock = Clock::start();

        for (index, &offset) in positions.iter().enumerate() {
            progress.on_progress(&ProgressUpdate::new(
                Phase::RandomIo,
                index as u64 + 1,
                total,
            ));

            if let Err(e) = file.seek(offset) {
                warn!(offset, error = %e, "Seek failed");
                failures += 1;
            }

            let result = if is_read_slot(slot, read_percentage) {
                reads += 1;
                read_full(file.as_mut(), buffer)
            } else {
                writes += 1;
                write_full(file.as_mut(), buffer)
            };
            if let Err(e) = result {
                warn!(offset, error = %e, "Random transfer failed");
                failures += 1;
            }

            slot += 1;
            if slot > 10 {
                slot = 1;
            }
        }

        if let Err(e) = file.close() {
            warn!(error = %e, "Failed to close test file after random test");
        }
        let seconds = clock.stop();
        progress.phase_finished(Phase::RandomIo);

        let iops = total as f64 / seconds;
        debug!(label, reads, writes, failures, iops, "Random test finished");

        Ok(RandomSample {
            label: label.to_string(),
            transfer_size,
            read_percentage,
            reads,
            writes,
            failures,
            seconds,
            iops,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::progress::NullProgress;
    use crate::io::memory::{IoOp, MemoryStorage};

    fn memory_setup(seeks: usize) -> (MemoryStorage, TestConfiguration) {
        let storage = MemoryStorage::new();
        storage.insert("rnd.fil", vec![0u8; 1024 * 1024]);
        let config = TestConfiguration::new()
            .with_test_path("rnd.fil")
            .with_file_size(1024 * 1024)
            .with_seeks(seeks);
        (storage, config)
    }

    #[test]
    fn test_positions_bounded_and_aligned() {
        let mut generator = RandomPositionGenerator::with_seed(7);
        for &(size, transfer) in &[(65536u64, 8192u64), (4 * 1024 * 1024, 512), (100_000, 512)] {
            let positions = generator.generate(2000, size, transfer);
            assert_eq!(positions.len(), 2000);
            for p in positions {
                assert!(p <= size - transfer);
                assert_eq!(p % 512, 0);
            }
        }
    }

    #[test]
    fn test_positions_degenerate_region() {
        let mut generator = RandomPositionGenerator::with_seed(1);
        assert_eq!(generator.generate(3, 512, 512), vec![0, 0, 0]);
        assert_eq!(generator.generate(2, 100, 8192), vec![0, 0]);
        assert!(generator.generate(0, 65536, 512).is_empty());
    }

    #[test]
    fn test_same_seed_same_positions() {
        let a = RandomPositionGenerator::with_seed(42).generate(16, 1 << 20, 8192);
        let b = RandomPositionGenerator::with_seed(42).generate(16, 1 << 20, 8192);
        assert_eq!(a, b);
    }

    #[test]
    fn test_sector_align() {
        assert_eq!(sector_align(0), 0);
        assert_eq!(sector_align(511), 0);
        assert_eq!(sector_align(512), 512);
        assert_eq!(sector_align(1300), 1024);
    }

    #[test]
    fn test_read_slots() {
        let reads: Vec<bool> = (1..=10).map(|n| is_read_slot(n, 70)).collect();
        assert_eq!(
            reads,
            vec![true, true, true, true, true, true, true, false, false, false]
        );
        assert!((1..=10).all(|n| is_read_slot(n, 100)));
        assert!((1..=10).all(|n| !is_read_slot(n, 0)));
        assert_eq!((1..=10).filter(|&n| is_read_slot(n, 75)).count(), 7);
    }

    #[test]
    fn test_seventy_percent_reads_then_writes() {
        let (storage, config) = memory_setup(10);
        let sample = RandomAccessTester::new(&storage, &config)
            .run("8K random, 70% read", 8192, 70, &mut NullProgress)
            .unwrap();

        assert_eq!(sample.reads, 7);
        assert_eq!(sample.writes, 3);
        assert_eq!(sample.failures, 0);

        let ops = storage.ops();
        assert_eq!(ops.len(), 10);
        assert!(ops[..7].iter().all(|op| op.is_read()));
        assert!(ops[7..].iter().all(|op| op.is_write()));
        for op in ops {
            let (IoOp::Read { offset, len } | IoOp::Write { offset, len }) = op;
            assert_eq!(len, 8192);
            assert_eq!(offset % 512, 0);
        }
    }

    #[test]
    fn test_cycle_restarts_every_ten() {
        let (storage, config) = memory_setup(25);
        let sample = RandomAccessTester::new(&storage, &config)
            .run("mixed", 512, 70, &mut NullProgress)
            .unwrap();

        // 7 + 7 + 5 reads over 10 + 10 + 5 transfers
        assert_eq!(sample.reads, 19);
        assert_eq!(sample.writes, 6);
        let ops = storage.ops();
        assert!(ops[10..17].iter().all(|op| op.is_read()));
        assert!(ops[17..20].iter().all(|op| op.is_write()));
    }

    #[test]
    fn test_pure_read_opens_read_only() {
        let (storage, config) = memory_setup(32);
        let sample = RandomAccessTester::new(&storage, &config)
            .run("Sector random read", 512, 100, &mut NullProgress)
            .unwrap();
        assert_eq!(sample.reads, 32);
        assert_eq!(sample.writes, 0);
        assert_eq!(sample.failures, 0);
        assert!(sample.iops > 0.0);
        assert!(sample.access_time_ms() > 0.0);
    }

    #[test]
    fn test_progress_per_transfer() {
        let (storage, config) = memory_setup(12);
        let mut count = 0;
        RandomAccessTester::new(&storage, &config)
            .run("x", 512, 100, &mut |_: &ProgressUpdate| count += 1)
            .unwrap();
        assert_eq!(count, 12);
    }

    #[test]
    fn test_injected_generator_fixes_offsets() {
        let offsets = |seed| {
            let (storage, config) = memory_setup(20);
            RandomAccessTester::new(&storage, &config)
                .with_generator(RandomPositionGenerator::with_seed(seed))
                .run("x", 8192, 70, &mut NullProgress)
                .unwrap();
            storage
                .ops()
                .into_iter()
                .map(|op| match op {
                    IoOp::Read { offset, .. } | IoOp::Write { offset, .. } => offset,
                })
                .collect::<Vec<_>>()
        };

        let expected = RandomPositionGenerator::with_seed(9).generate(20, 1024 * 1024, 8192);
        assert_eq!(offsets(9), expected);
        assert_eq!(offsets(9), offsets(9));
    }

    #[test]
    fn test_invalid_arguments() {
        let (storage, config) = memory_setup(4);
        let mut tester = RandomAccessTester::new(&storage, &config);
        assert!(tester.run("x", 0, 50, &mut NullProgress).is_err());
        assert!(tester.run("x", 64 * 1024, 50, &mut NullProgress).is_err());
        assert!(tester.run("x", 512, 101, &mut NullProgress).is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let storage = MemoryStorage::new();
        let config = TestConfiguration::new().with_test_path("none.fil");
        let result = RandomAccessTester::new(&storage, &config).run("x", 512, 100, &mut NullProgress);
        assert!(matches!(result, Err(DiskTestError::IoError(_))));
    }
}

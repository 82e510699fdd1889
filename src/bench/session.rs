//! Test sessions
//!
//! Sequences the testers into the three sessions: the standard
//! throughput/IOPS test, the media pattern test and the interactive signal
//! test. Also sizes the test file before a session and removes it after.

use tracing::{error, info, warn};

use crate::bench::control::{AbortFlag, MenuChoice, MenuInput, SignalSource};
use crate::bench::pattern::{compare_words, PatternEngine, PatternMode, PATTERN_TABLE};
use crate::bench::progress::ProgressSink;
use crate::bench::random::RandomAccessTester;
use crate::bench::sequential::SequentialTester;
use crate::config::{SessionMode, TestConfiguration};
use crate::io::buffer::WordBlock;
use crate::io::disk::FileStorage;
use crate::models::{
    MediaReport, PatternOutcome, SessionResults, SignalReport, SignalRun, StandardReport,
};
use crate::util::clock::Clock;
use crate::{DiskTestError, Result, BLOCK_SIZE, SECTOR_SIZE};

/// In-memory buffer comparison run before each media pattern
pub type SelfCheck = fn(&[u16], &[u16]) -> usize;

/// One entry of the signal-test menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalTest {
    pub name: &'static str,
    pub description: &'static str,
    /// Words repeated across the block
    pub words: [u16; 2],
    /// Compare the data read back
    pub verify: bool,
}

impl SignalTest {
    /// Continuous write, then continuous read or a single verify pass
    pub fn mode(&self) -> PatternMode {
        let mode = PatternMode::READ | PatternMode::WRITE | PatternMode::WRITE_CONTINUOUS;
        if self.verify {
            mode | PatternMode::VERIFY
        } else {
            mode | PatternMode::READ_CONTINUOUS
        }
    }

    pub fn fill(&self, block: &mut WordBlock) {
        block.fill_cycle(&self.words);
    }
}

/// Signal-test menu, in menu order
pub const SIGNAL_TESTS: [SignalTest; 5] = [
    SignalTest {
        name: "Test 1",
        description: "For testing at DD7. Flips the bit continually, all others will be low. \
                      Line DD7 has a 10k pull-down at the interface.",
        words: [0x0080, 0x0000],
        verify: false,
    },
    SignalTest {
        name: "Test 2",
        description: "For testing at DD11. Holds the bit low and flips all other bits continually. \
                      Enables measurement of cross-talk as the line serving this bit is in the \
                      middle of the data lines on the 40-pin connector.",
        words: [0xF7FF, 0x0000],
        verify: false,
    },
    SignalTest {
        name: "Test 3",
        description: "For testing on the ISA Bus at data bit 4 (ISA slot pin A5). To enable \
                      assessment of ISA bus signal quality, flips this bit repeatedly.",
        words: [0x1000, 0x1000],
        verify: false,
    },
    SignalTest {
        name: "Test 4",
        description: "For measuring peak power consumption of the interface under read and write \
                      workloads. Total power consumption will be affected by the system (and bus) \
                      speed, since faster switching will use more power. Test patterns are 0x55AA \
                      and 0xAA55.",
        words: [0x55AA, 0xAA55],
        verify: false,
    },
    SignalTest {
        name: "Test 5",
        description: "As test 4, except that the read part of the test is a one-pass verify. This \
                      will run much slower, but will confirm, after a heavy write test, that the \
                      signals were intact.",
        words: [0x55AA, 0xAA55],
        verify: true,
    },
];

/// Size the test file for a session
///
/// Read-only sessions use the existing file's size. Otherwise the file is
/// purged, then shrunk to the free space (rounded down to 32KB) when that is
/// smaller than the requested size or `use_all_space` is set.
pub fn prepare_test_file(
    storage: &dyn FileStorage,
    config: &TestConfiguration,
) -> Result<TestConfiguration> {
    let path = &config.test_path;

    if config.read_only {
        let size = storage.file_size(path).unwrap_or(0);
        if size == 0 {
            return Err(DiskTestError::TestFileMissing(path.clone()));
        }
        info!(path = %path.display(), size, "Using existing test file");
        return Ok(config.clone().with_file_size(size));
    }

    let file = storage.create(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "Failed to create test file");
        DiskTestError::IoError(e)
    })?;
    if let Err(e) = file.close() {
        warn!(error = %e, "Failed to close purged test file");
    }

    let mut size = config.file_size;
    match storage.free_space(path) {
        Ok(free) => {
            if free < size || config.use_all_space {
                size = (free / BLOCK_SIZE as u64) * BLOCK_SIZE as u64;
                info!(free, size, "Test size set from free space");
            }
        }
        Err(e) if config.use_all_space => {
            error!(error = %e, "Free space query failed");
            return Err(DiskTestError::IoError(e));
        }
        Err(e) => warn!(error = %e, "Free space unknown; keeping requested size"),
    }

    if size < BLOCK_SIZE as u64 {
        return Err(DiskTestError::InsufficientSpace(format!(
            "{} bytes free, at least {} needed",
            size, BLOCK_SIZE
        )));
    }

    Ok(config.clone().with_file_size(size))
}

/// Delete the test file unless the session was read-only
pub fn cleanup_test_file(storage: &dyn FileStorage, config: &TestConfiguration) {
    if config.read_only {
        return;
    }
    match storage.delete(&config.test_path) {
        Ok(()) => info!(path = %config.test_path.display(), "Deleted test file"),
        Err(e) => warn!(path = %config.test_path.display(), error = %e, "Failed to delete test file"),
    }
}

/// Runs one session against a prepared test file
pub struct SessionRunner<'a> {
    storage: &'a dyn FileStorage,
    config: &'a TestConfiguration,
    abort: AbortFlag,
    self_check: SelfCheck,
}

impl<'a> SessionRunner<'a> {
    pub fn new(storage: &'a dyn FileStorage, config: &'a TestConfiguration, abort: AbortFlag) -> Self {
        Self {
            storage,
            config,
            abort,
            self_check: compare_words,
        }
    }

    /// Replace the pre-pattern buffer check
    pub fn with_self_check(mut self, check: SelfCheck) -> Self {
        self.self_check = check;
        self
    }

    /// Run the session selected by `config.mode`
    pub fn run(
        &self,
        menu: &mut dyn MenuInput,
        signals: &mut dyn SignalSource,
        progress: &mut dyn ProgressSink,
    ) -> Result<SessionResults> {
        info!(mode = self.config.mode.description(), "Starting session");
        match self.config.mode {
            SessionMode::Standard => self.run_standard(progress).map(SessionResults::Standard),
            SessionMode::MediaTest => self
                .run_media_test(signals, progress)
                .map(SessionResults::MediaTest),
            SessionMode::SignalTest => self
                .run_signal_test(menu, signals, progress)
                .map(SessionResults::SignalTest),
        }
    }

    /// Sequential write and read, then the 8K and sector random passes
    pub fn run_standard(&self, progress: &mut dyn ProgressSink) -> Result<StandardReport> {
        let mut sequential = SequentialTester::new(self.storage, self.config);
        let write = if self.config.read_only {
            None
        } else {
            Some(sequential.run_write(progress)?)
        };
        let read = sequential.run_read(progress)?;

        let mut random = RandomAccessTester::new(self.storage, self.config);
        let mixed = if self.config.read_only {
            random.run("8K random read", 8192, 100, progress)?
        } else {
            random.run("8K random, 70% read", 8192, 70, progress)?
        };
        let sector = random.run("Sector random read", SECTOR_SIZE as usize, 100, progress)?;
        let average_access_ms = sector.access_time_ms();

        Ok(StandardReport {
            write,
            read,
            mixed,
            sector,
            average_access_ms,
        })
    }

    /// Every table pattern with write, read back and verify
    pub fn run_media_test(
        &self,
        signals: &mut dyn SignalSource,
        progress: &mut dyn ProgressSink,
    ) -> Result<MediaReport> {
        let engine = PatternEngine::new(self.storage, self.config, self.abort.clone());
        let mut write_block = WordBlock::new();
        let mut read_block = WordBlock::new();
        let mut patterns = Vec::with_capacity(PATTERN_TABLE.len());
        let mut total_errors = 0;
        let mut ram_fault = None;
        let clock = Clock::start();

        for pattern in PATTERN_TABLE.iter() {
            if self.abort.is_raised() {
                break;
            }

            pattern.fill(&mut write_block);
            read_block.copy_from(&write_block);
            let name = pattern.display_name();

            if (self.self_check)(write_block.words(), read_block.words()) != 0 {
                error!(pattern = %name, "RAM error detected; cannot continue pattern testing");
                ram_fault = Some(name);
                break;
            }

            info!(pattern = %name, "Running pattern test");
            let result = engine.run_pattern(
                &name,
                &write_block,
                &mut read_block,
                PatternMode::media(),
                signals,
                progress,
            )?;
            total_errors += result.errors;
            patterns.push(PatternOutcome {
                name,
                value: pattern.value,
                walking: pattern.walking,
                result,
            });
        }

        Ok(MediaReport {
            file_size: self.config.file_size,
            patterns,
            total_errors,
            elapsed: clock.sample().duration(),
            aborted: self.abort.is_raised(),
            ram_fault,
        })
    }

    /// Menu loop until the user ends it or quits
    pub fn run_signal_test(
        &self,
        menu: &mut dyn MenuInput,
        signals: &mut dyn SignalSource,
        progress: &mut dyn ProgressSink,
    ) -> Result<SignalReport> {
        // Every signal test writes continuously until a key is pressed
        if !signals.interactive() {
            return Err(DiskTestError::ConfigError(
                "Signal tests need keyboard input to end each test".to_string(),
            ));
        }

        let engine = PatternEngine::new(self.storage, self.config, self.abort.clone());
        let entries: Vec<(&str, &str)> = SIGNAL_TESTS
            .iter()
            .map(|test| (test.name, test.description))
            .collect();
        let mut write_block = WordBlock::new();
        let mut read_block = WordBlock::new();
        let mut report = SignalReport::default();

        while !self.abort.is_raised() {
            let index = match menu.choose(&entries) {
                MenuChoice::End => break,
                MenuChoice::Run(index) => index,
            };
            let Some(test) = SIGNAL_TESTS.get(index).copied() else {
                warn!(index, "No such signal test");
                continue;
            };

            test.fill(&mut write_block);
            read_block.copy_from(&write_block);
            info!(test = test.name, verify = test.verify, "Running signal test");

            let result = engine.run_pattern(
                test.name,
                &write_block,
                &mut read_block,
                test.mode(),
                signals,
                progress,
            )?;
            report.total_errors += result.errors;
            report.runs.push(SignalRun {
                name: test.name.to_string(),
                verified: test.verify,
                result,
            });
        }

        report.aborted = self.abort.is_raised();
        Ok(report)
    }
}

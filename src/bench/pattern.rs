//! Bit-pattern media and interface tests
//!
//! Writes a 32KB block of a deterministic 16-bit pattern across the whole
//! test file, then reads every written block back and compares it word by
//! word. A block with any differing word counts as one error.
//!
//! The walking patterns rotate the value by one bit per word so that each
//! data line toggles in turn, which is easy to follow on a scope.

use serde::{Deserialize, Serialize};
use std::ops::BitOr;
use tracing::{debug, error, warn};

use crate::bench::control::{AbortFlag, Signal, SignalSource};
use crate::bench::progress::{Phase, ProgressSink, ProgressUpdate};
use crate::config::TestConfiguration;
use crate::io::buffer::WordBlock;
use crate::io::disk::{read_full, write_full, FileStorage, OpenMode, StorageFile};
use crate::util::units::format_hex;
use crate::{DiskTestError, Result, BLOCK_SIZE};

/// A 16-bit test pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitPattern {
    pub value: u16,
    /// Rotate the value by one bit per word instead of repeating it
    pub walking: bool,
    pub name: &'static str,
}

impl BitPattern {
    pub const fn fixed(value: u16) -> Self {
        Self {
            value,
            walking: false,
            name: "",
        }
    }

    pub const fn walking(value: u16, name: &'static str) -> Self {
        Self {
            value,
            walking: true,
            name,
        }
    }

    /// Name shown while the pattern runs
    pub fn display_name(&self) -> String {
        if self.walking {
            self.name.to_string()
        } else {
            format!("Pattern {}", format_hex(self.value))
        }
    }

    /// Word at `index` of a block filled with this pattern
    pub fn word_at(&self, index: usize) -> u16 {
        if self.walking {
            self.value.rotate_left((index % 16) as u32)
        } else {
            self.value
        }
    }

    /// Fill `block` with this pattern
    pub fn fill(&self, block: &mut WordBlock) {
        for (index, word) in block.words_mut().iter_mut().enumerate() {
            *word = self.word_at(index);
        }
        block.encode();
    }
}

/// Media-test patterns, run in this order
pub const PATTERN_TABLE: [BitPattern; 10] = [
    BitPattern::fixed(0x0000),
    BitPattern::fixed(0xFFFF),
    BitPattern::fixed(0xFF00),
    BitPattern::fixed(0xF00F),
    BitPattern::fixed(0xAA55),
    BitPattern::fixed(0xA55A),
    BitPattern::fixed(0x18E7),
    BitPattern::fixed(0xE718),
    BitPattern::walking(0x0001, "Walking 1s"),
    BitPattern::walking(0xFFFE, "Walking 0s"),
];

/// Compare two word buffers front to back
///
/// Returns 0 when they match, otherwise the number of words from the first
/// mismatch to the end of `source`.
pub fn compare_words(source: &[u16], destination: &[u16]) -> usize {
    let words = source.len();
    for (index, word) in source.iter().enumerate() {
        if destination.get(index) != Some(word) {
            return words - index;
        }
    }
    0
}

/// Which parts of a pattern test to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternMode(u8);

impl PatternMode {
    pub const READ: PatternMode = PatternMode(1);
    /// Re-read the written range until signalled
    pub const READ_CONTINUOUS: PatternMode = PatternMode(2);
    pub const WRITE: PatternMode = PatternMode(4);
    /// Re-write the whole file until signalled
    pub const WRITE_CONTINUOUS: PatternMode = PatternMode(8);
    pub const VERIFY: PatternMode = PatternMode(16);

    pub fn contains(&self, other: PatternMode) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(&self, other: PatternMode) -> bool {
        self.0 & other.0 != 0
    }

    /// Mode used by the media test
    pub fn media() -> Self {
        Self::READ | Self::WRITE | Self::VERIFY
    }
}

impl BitOr for PatternMode {
    type Output = PatternMode;

    fn bitor(self, rhs: PatternMode) -> PatternMode {
        PatternMode(self.0 | rhs.0)
    }
}

/// Outcome of one pattern test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternTestResult {
    /// 32KB blocks that failed comparison or could not be read back
    pub errors: u64,
    pub blocks_written: u64,
    pub blocks_compared: u64,
    pub write_failures: u64,
    pub read_failures: u64,
    /// The user skipped part of the test or quit
    pub interrupted: bool,
}

/// What ended a phase loop
enum PhaseEnd {
    Finished,
    /// Move on to the next phase, keeping this many blocks in range
    MoveOn(u64),
    SkipTest,
    Quit,
}

/// Runs pattern tests against the configured test file
pub struct PatternEngine<'a> {
    storage: &'a dyn FileStorage,
    config: &'a TestConfiguration,
    abort: AbortFlag,
}

impl<'a> PatternEngine<'a> {
    pub fn new(storage: &'a dyn FileStorage, config: &'a TestConfiguration, abort: AbortFlag) -> Self {
        Self {
            storage,
            config,
            abort,
        }
    }

    /// Write `write_block` across the file, then read back and compare
    ///
    /// `write_block` must be encoded. `read_block` is scratch space of the
    /// same size. Only failing to open the file is an error; transfer
    /// failures are logged and the loop carries on.
    pub fn run_pattern(
        &self,
        label: &str,
        write_block: &WordBlock,
        read_block: &mut WordBlock,
        mode: PatternMode,
        signals: &mut dyn SignalSource,
        progress: &mut dyn ProgressSink,
    ) -> Result<PatternTestResult> {
        let path = &self.config.test_path;
        let open_mode = if mode.contains(PatternMode::WRITE) {
            OpenMode::ReadWrite
        } else {
            OpenMode::ReadOnly
        };
        let mut file = self.storage.open(path, open_mode).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to open test file for pattern test");
            DiskTestError::IoError(e)
        })?;

        let mut result = PatternTestResult::default();
        let max = self.config.block_count();
        let mut read_max = max;

        if mode.contains(PatternMode::WRITE) && max > 0 {
            progress.phase_started(label, Phase::PatternWrite, max);
            let end = self.write_phase(file.as_mut(), write_block, mode, max, &mut result, signals, progress);
            progress.phase_finished(Phase::PatternWrite);

            read_max = match end {
                PhaseEnd::Finished => max,
                PhaseEnd::MoveOn(blocks) => blocks,
                PhaseEnd::SkipTest | PhaseEnd::Quit => 0,
            };
        }

        let wants_read = mode.intersects(PatternMode::READ | PatternMode::VERIFY);
        if wants_read && read_max > 0 && !self.abort.is_raised() {
            progress.phase_started(label, Phase::PatternCompare, read_max);
            self.compare_phase(
                file.as_mut(),
                write_block,
                read_block,
                mode,
                read_max,
                &mut result,
                signals,
                progress,
            );
            progress.phase_finished(Phase::PatternCompare);
        }

        if let Err(e) = file.close() {
            warn!(error = %e, "Failed to close test file after pattern test");
        }

        debug!(
            label,
            errors = result.errors,
            written = result.blocks_written,
            compared = result.blocks_compared,
            "Pattern test finished"
        );
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn write_phase(
        &self,
        file: &mut dyn StorageFile,
        write_block: &WordBlock,
        mode: PatternMode,
        max: u64,
        result: &mut PatternTestResult,
        signals: &mut dyn SignalSource,
        progress: &mut dyn ProgressSink,
    ) -> PhaseEnd {
        let continuous = mode.contains(PatternMode::WRITE_CONTINUOUS);
        let mut io = 0u64;
        let mut full_pass = false;
        rewind(file);

        loop {
            if self.abort.is_raised() {
                result.interrupted = true;
                return PhaseEnd::Quit;
            }
            if io == max {
                if !continuous {
                    return PhaseEnd::Finished;
                }
                full_pass = true;
                io = 0;
                rewind(file);
            }
            io += 1;

            match write_full(file, write_block.bytes()) {
                Ok(_) => result.blocks_written += 1,
                Err(e) => {
                    warn!(block = io, error = %e, "Pattern write failed");
                    result.write_failures += 1;
                    resync(file, io);
                }
            }
            progress.on_progress(&ProgressUpdate::new(Phase::PatternWrite, io, max));

            match signals.poll() {
                Signal::None => {}
                Signal::SkipBlock => {
                    if !full_pass {
                        result.interrupted = true;
                    }
                    return PhaseEnd::MoveOn(if full_pass { max } else { io });
                }
                Signal::SkipTest => {
                    result.interrupted = true;
                    return PhaseEnd::SkipTest;
                }
                Signal::Quit => {
                    self.abort.raise();
                    result.interrupted = true;
                    return PhaseEnd::Quit;
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn compare_phase(
        &self,
        file: &mut dyn StorageFile,
        write_block: &WordBlock,
        read_block: &mut WordBlock,
        mode: PatternMode,
        read_max: u64,
        result: &mut PatternTestResult,
        signals: &mut dyn SignalSource,
        progress: &mut dyn ProgressSink,
    ) -> PhaseEnd {
        let continuous = mode.contains(PatternMode::READ_CONTINUOUS);
        let verify = mode.contains(PatternMode::VERIFY);
        let mut io = 0u64;
        rewind(file);

        loop {
            if self.abort.is_raised() {
                result.interrupted = true;
                return PhaseEnd::Quit;
            }
            if io == read_max {
                if !continuous {
                    return PhaseEnd::Finished;
                }
                io = 0;
                rewind(file);
            }
            io += 1;

            let expected = read_block.byte_len();
            match read_full(file, read_block.bytes_mut()) {
                Ok(read) if read == expected => {
                    if verify {
                        read_block.decode();
                        let distance = compare_words(write_block.words(), read_block.words());
                        if distance != 0 {
                            debug!(block = io, distance, "Block failed comparison");
                            result.errors += 1;
                        }
                    }
                }
                Ok(read) => {
                    warn!(block = io, read, "Pattern read came back short");
                    result.read_failures += 1;
                    if verify {
                        result.errors += 1;
                    }
                    resync(file, io);
                }
                Err(e) => {
                    warn!(block = io, error = %e, "Pattern read failed");
                    result.read_failures += 1;
                    if verify {
                        result.errors += 1;
                    }
                    resync(file, io);
                }
            }
            result.blocks_compared += 1;
            progress.on_progress(
                &ProgressUpdate::new(Phase::PatternCompare, io, read_max).with_errors(result.errors),
            );

            match signals.poll() {
                Signal::None => {}
                Signal::SkipBlock if continuous => return PhaseEnd::MoveOn(io),
                Signal::SkipBlock => {}
                Signal::SkipTest => {
                    result.interrupted = true;
                    return PhaseEnd::SkipTest;
                }
                Signal::Quit => {
                    self.abort.raise();
                    result.interrupted = true;
                    return PhaseEnd::Quit;
                }
            }
        }
    }
}

fn rewind(file: &mut dyn StorageFile) {
    if let Err(e) = file.seek(0) {
        warn!(error = %e, "Failed to seek to start of test file");
    }
}

/// Reposition after a failed transfer so the next block stays aligned
fn resync(file: &mut dyn StorageFile, blocks_done: u64) {
    if let Err(e) = file.seek(blocks_done * BLOCK_SIZE as u64) {
        warn!(error = %e, "Failed to reposition after transfer error");
    }
}

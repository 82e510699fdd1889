//! Benchmark engine module
//!
//! Contains the sequential, random and pattern testers and the session
//! runner that sequences them.

pub mod control;
pub mod pattern;
pub mod progress;
pub mod random;
pub mod sequential;
pub mod session;

// Re-export commonly used types
pub use control::{AbortFlag, MenuChoice, MenuInput, NoSignals, Signal, SignalSource};
pub use pattern::{compare_words, BitPattern, PatternEngine, PatternMode, PatternTestResult, PATTERN_TABLE};
pub use progress::{NullProgress, Phase, ProgressSink, ProgressUpdate};
pub use random::{RandomAccessTester, RandomPositionGenerator, RandomSample};
pub use sequential::{SequentialTester, ThroughputSample};
pub use session::{cleanup_test_file, prepare_test_file, SessionRunner, SignalTest, SIGNAL_TESTS};

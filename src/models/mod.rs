//! Data models module
//!
//! Report structures produced by each test session.

pub mod result;

// Re-export commonly used types
pub use result::{
    MediaReport, PatternOutcome, SessionReport, SessionResults, SignalReport, SignalRun,
    StandardReport,
};

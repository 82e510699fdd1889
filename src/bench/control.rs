//! Interactive control of running tests
//!
//! Pattern loops poll a [`SignalSource`] once per block without blocking.
//! A quit request is shared through an [`AbortFlag`] so every enclosing
//! loop observes it at the top of its next iteration.

#[cfg(test)]
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// User request observed between transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    None,
    /// Leave the current phase and move on
    SkipBlock,
    /// Abandon the current pattern test
    SkipTest,
    /// Stop the whole session
    Quit,
}

/// Non-blocking source of user signals
pub trait SignalSource {
    fn poll(&mut self) -> Signal;

    /// Whether a signal can ever arrive, ending a continuous pass
    fn interactive(&self) -> bool {
        true
    }
}

/// Never signals
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSignals;

impl SignalSource for NoSignals {
    fn poll(&mut self) -> Signal {
        Signal::None
    }

    fn interactive(&self) -> bool {
        false
    }
}

/// Replays a fixed sequence of polls, then signals nothing
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct ScriptedSignals {
    script: VecDeque<Signal>,
}

#[cfg(test)]
impl ScriptedSignals {
    pub fn new(script: impl IntoIterator<Item = Signal>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// `Signal::None` for `polls` polls, then `signal`
    pub fn after(polls: usize, signal: Signal) -> Self {
        Self::new(std::iter::repeat(Signal::None).take(polls).chain([signal]))
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

#[cfg(test)]
impl SignalSource for ScriptedSignals {
    fn poll(&mut self) -> Signal {
        self.script.pop_front().unwrap_or(Signal::None)
    }
}

/// Session-wide quit flag
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Selection made at the signal-test menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// Run the test at this index of the menu
    Run(usize),
    End,
}

/// Blocking menu prompt
pub trait MenuInput {
    /// Present `entries` (name, description) and wait for a choice
    fn choose(&mut self, entries: &[(&str, &str)]) -> MenuChoice;
}

/// Replays fixed menu choices, then ends
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct ScriptedMenu {
    choices: VecDeque<MenuChoice>,
}

#[cfg(test)]
impl ScriptedMenu {
    pub fn new(choices: impl IntoIterator<Item = MenuChoice>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
        }
    }
}

#[cfg(test)]
impl MenuInput for ScriptedMenu {
    fn choose(&mut self, _entries: &[(&str, &str)]) -> MenuChoice {
        self.choices.pop_front().unwrap_or(MenuChoice::End)
    }
}

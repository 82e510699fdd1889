//! Console front end
//!
//! Renders progress with indicatif, turns crossterm key presses into test
//! signals and menu choices, and formats the session reports.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, warn};

use crate::bench::control::{MenuChoice, MenuInput, Signal, SignalSource};
use crate::bench::pattern::PATTERN_TABLE;
use crate::bench::progress::{Phase, ProgressSink, ProgressUpdate};
use crate::config::TestConfiguration;
use crate::models::{MediaReport, SessionReport, SessionResults, SignalReport, StandardReport};
use crate::util::units::{format_hms, format_iops, format_kbps, format_test_size};

/// Map a key press during a pattern test to a signal
///
/// `S` skips the test, `Q`, Esc and Ctrl-C quit, any other key moves on.
pub fn signal_for_key(key: KeyEvent) -> Signal {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Signal::Quit;
    }
    match key.code {
        KeyCode::Char('s') | KeyCode::Char('S') => Signal::SkipTest,
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Signal::Quit,
        _ => Signal::SkipBlock,
    }
}

/// Map a key press at the signal-test menu; other keys are ignored
pub fn menu_choice_for_key(key: KeyEvent, entries: usize) -> Option<MenuChoice> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(MenuChoice::End);
    }
    match key.code {
        KeyCode::Char('e') | KeyCode::Char('E') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(MenuChoice::End)
        }
        KeyCode::Char(c) => match c.to_digit(10) {
            Some(n) if n >= 1 && (n as usize) <= entries => Some(MenuChoice::Run(n as usize - 1)),
            _ => None,
        },
        _ => None,
    }
}

/// Holds the terminal in raw mode until dropped
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        crate::logging::set_raw_terminal(true);
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Ensure terminal is restored even on early return
        let _ = disable_raw_mode();
        crate::logging::set_raw_terminal(false);
    }
}

/// Non-blocking keyboard polling for pattern tests
#[derive(Debug, Default)]
pub struct KeyboardSignals;

impl SignalSource for KeyboardSignals {
    fn poll(&mut self) -> Signal {
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => return Signal::None,
                Err(e) => {
                    warn!(error = %e, "Keyboard poll failed");
                    return Signal::None;
                }
            }
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    let signal = signal_for_key(key);
                    debug!(?signal, "Key pressed");
                    return signal;
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!(error = %e, "Keyboard read failed");
                    return Signal::None;
                }
            }
        }
    }
}

/// Signal-test menu read from the keyboard
///
/// Expects the terminal in raw mode, so lines end in `\r\n`.
#[derive(Debug, Default)]
pub struct ConsoleMenu;

impl MenuInput for ConsoleMenu {
    fn choose(&mut self, entries: &[(&str, &str)]) -> MenuChoice {
        let mut out = io::stdout();
        let mut text = String::from("\r\n");
        for (name, description) in entries {
            text.push_str(&format!("{} - {}\r\n\r\n", name, description));
        }
        text.push_str(&format!("Enter Test (1-{}) or E to end: ", entries.len()));
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();

        loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if let Some(choice) = menu_choice_for_key(key, entries.len()) {
                        let echo = match choice {
                            MenuChoice::Run(index) => (index + 1).to_string(),
                            MenuChoice::End => "E".to_string(),
                        };
                        let _ = write!(out, "{}\r\n", echo);
                        let _ = out.flush();
                        return choice;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Menu input failed");
                    return MenuChoice::End;
                }
            }
        }
    }
}

/// indicatif progress bar per test phase
pub struct ConsoleProgress {
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<30} [{bar:40}] {pos}/{len} {prefix}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

impl ProgressSink for ConsoleProgress {
    fn phase_started(&mut self, label: &str, phase: Phase, total: u64) {
        if !self.enabled {
            return;
        }
        let bar = ProgressBar::new(total);
        bar.set_style(Self::style());
        bar.set_message(format!("{} - {}", label, phase.label()));
        self.bar = Some(bar);
    }

    fn on_progress(&mut self, update: &ProgressUpdate) {
        if let Some(bar) = &self.bar {
            bar.set_position(update.current);
            if update.errors > 0 {
                bar.set_prefix(format!("{} bad", update.errors));
            }
        }
    }

    fn phase_finished(&mut self, _phase: Phase) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}

/// Print lines, ending each with `\r\n` so output stays aligned in raw mode
pub fn print_lines(lines: &[String]) {
    let mut out = io::stdout();
    for line in lines {
        let _ = write!(out, "{}\r\n", line);
    }
    let _ = out.flush();
}

pub fn banner() -> Vec<String> {
    vec![
        format!("DiskTest version {}", crate::VERSION),
        "Disk and interface performance and reliability testing.".to_string(),
        String::new(),
    ]
}

/// Lines introducing a session
pub fn session_intro(config: &TestConfiguration) -> Vec<String> {
    use crate::config::SessionMode;

    match config.mode {
        SessionMode::Standard => vec![
            format!(
                "Configuration: {} KB test file, {} IOs in random tests.",
                config.file_size / 1024,
                config.seeks
            ),
            String::new(),
        ],
        SessionMode::MediaTest => vec![
            format!(
                "Pattern testing with {} patterns over {}.",
                PATTERN_TABLE.len(),
                format_test_size(config.file_size)
            ),
            "Press any key to skip on, S to skip test completely, Q to quit.".to_string(),
            String::new(),
        ],
        SessionMode::SignalTest => vec![
            format!(
                "XT/IDE Development Pattern Tests - using {} MB test file.",
                config.file_size / (1024 * 1024)
            ),
            "During a test press SPACE to move on to the read once the current write has \
             finished, N to skip on immediately, S to skip it, or Q to quit."
                .to_string(),
        ],
    }
}

pub fn standard_summary(report: &StandardReport) -> Vec<String> {
    let row = |label: &str, value: String| format!("{:<20}: {}", label, value);
    let mut lines = Vec::new();
    if let Some(write) = &report.write {
        lines.push(row("Write Speed", format_kbps(write.kbps)));
    }
    lines.push(row("Read Speed", format_kbps(report.read.kbps)));
    lines.push(row(&report.mixed.label, format_iops(report.mixed.iops)));
    lines.push(row(&report.sector.label, format_iops(report.sector.iops)));
    lines.push(String::new());
    lines.push(format!(
        "Average access time (includes latency and file system overhead), is {:.0} ms.",
        report.average_access_ms
    ));
    lines
}

pub fn media_summary(report: &MediaReport) -> Vec<String> {
    let mut lines = Vec::new();
    for pattern in &report.patterns {
        let status = match (pattern.result.errors, pattern.result.interrupted) {
            (0, false) => "OK".to_string(),
            (0, true) => "skipped".to_string(),
            (errors, _) => format!("{} bad blocks", errors),
        };
        lines.push(format!("{:<16}: {}", pattern.name, status));
    }
    if let Some(name) = &report.ram_fault {
        lines.push(format!("RAM Error detected with {}.", name));
        lines.push("Memory test failed - cannot continue pattern testing.".to_string());
    }
    lines.push(String::new());
    let errors = match report.total_errors {
        0 => "No".to_string(),
        n => format!("{} 32K", n),
    };
    lines.push(format!(
        "Test ran for {}. {} blocks had errors.",
        format_hms(report.elapsed.as_secs_f64()),
        errors
    ));
    lines
}

pub fn signal_summary(report: &SignalReport) -> Vec<String> {
    let errors = match report.total_errors {
        0 => "No".to_string(),
        n => n.to_string(),
    };
    vec![String::new(), format!("{} errors were encountered.", errors)]
}

/// Summary lines for any session
pub fn summary(report: &SessionReport) -> Vec<String> {
    match &report.results {
        SessionResults::Standard(standard) => standard_summary(standard),
        SessionResults::MediaTest(media) => media_summary(media),
        SessionResults::SignalTest(signal) => signal_summary(signal),
    }
}

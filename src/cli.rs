//! Command-line tokens
//!
//! Options are bare words matched without regard to case, as in
//! `disktest size=8M maxseeks`. Unknown words are collected and ignored.

use crate::config::{ConfigFile, SeekProfile, SessionMode, TestConfiguration};
use crate::util::units::size_or_default;

/// Parsed command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub help: bool,
    /// Raw value of `size=`
    pub size: Option<String>,
    pub max_size: bool,
    pub seek_profile: Option<SeekProfile>,
    pub read_only: bool,
    pub no_progress: bool,
    pub media_test: bool,
    pub signal_test: bool,
    /// Print the report as JSON
    pub json: bool,
    pub verbose: bool,
    pub unknown: Vec<String>,
}

impl CliArgs {
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cli = CliArgs::default();

        for arg in args {
            let arg = arg.as_ref();
            let token = arg.to_ascii_lowercase();

            if let Some(value) = token.strip_prefix("size=") {
                cli.size = Some(value.to_string());
                continue;
            }
            if let Some(profile) = SeekProfile::from_token(&token) {
                cli.seek_profile = cli.seek_profile.max(Some(profile));
                continue;
            }

            match token.as_str() {
                "/h" | "-h" | "/?" | "-?" => cli.help = true,
                "maxsize" => cli.max_size = true,
                "readonly" => cli.read_only = true,
                "noprogress" => cli.no_progress = true,
                "mediatest" => cli.media_test = true,
                "signaltest" => cli.signal_test = true,
                "json" => cli.json = true,
                "verbose" => cli.verbose = true,
                _ => cli.unknown.push(arg.to_string()),
            }
        }

        cli
    }

    /// Session selected on the command line
    ///
    /// Pattern sessions write the test file, so read-only always runs the
    /// standard test. The media test wins over the signal test.
    pub fn mode(&self) -> SessionMode {
        if self.read_only {
            SessionMode::Standard
        } else if self.media_test {
            SessionMode::MediaTest
        } else if self.signal_test {
            SessionMode::SignalTest
        } else {
            SessionMode::Standard
        }
    }

    /// Build the session configuration, command line over file defaults
    pub fn into_config(&self, defaults: &ConfigFile) -> TestConfiguration {
        let mut config = defaults.apply(TestConfiguration::new());

        if let Some(size) = &self.size {
            config.file_size = size_or_default(size);
        }
        if let Some(profile) = self.seek_profile {
            config.seeks = profile.seeks();
        }
        let show_progress = config.show_progress && !self.no_progress;

        config
            .with_progress(show_progress)
            .with_all_space(self.max_size)
            .with_read_only(self.read_only)
            .with_mode(self.mode())
    }
}

pub fn help_text() -> String {
    [
        "With no command line parameters, the utility will perform a file-system based",
        "performance test with a test file size of 4MB and 256 seeks, with file size",
        "truncated to available free space if it is less.",
        "",
        "Performance test specific command line options:",
        "",
        "  * maxseeks   - 4096 seeks (default is 256)",
        "  * highseeks  - 1024 seeks",
        "  * lowseeks   - 128 seeks",
        "  * minseeks   - 32 seeks (use for floppy drives)",
        "  * size=x     - specify the test file size, which will be truncated to",
        "                 available free space. To use all free space use 'maxsize'",
        "                 instead. Value is in bytes, specify K or M as required.",
        "                 examples: size=4M (default), size=16M, size=300K",
        "  * readonly   - only read an existing test file, which is kept",
        "  * noprogress - do not show progress",
        "",
        "Other tests:",
        "",
        "  * mediatest  - write, read back and verify 10 bit patterns over the file",
        "  * signaltest - interactive XT/IDE interface signal patterns",
        "",
        "Output:",
        "",
        "  * json       - print the results as JSON",
        "  * verbose    - show diagnostic logging (or set RUST_LOG)",
        "",
        "Defaults can be set in disktest.toml in the user configuration directory.",
        "",
        "Example: disktest size=8M maxseeks",
    ]
    .join("\n")
}

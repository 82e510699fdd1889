use disktest::bench::control::{AbortFlag, NoSignals};
use disktest::bench::session::{cleanup_test_file, prepare_test_file, SessionRunner};
use disktest::cli::{help_text, CliArgs};
use disktest::config::{ConfigFile, SessionMode, TestConfiguration};
use disktest::console::{self, ConsoleMenu, ConsoleProgress, KeyboardSignals, RawModeGuard};
use disktest::error::user_friendly_message;
use disktest::io::disk::PlatformStorage;
use disktest::models::{SessionReport, SessionResults};
use disktest::Result;
use std::process::ExitCode;
use tracing::{error, warn};

fn main() -> ExitCode {
    let cli = CliArgs::parse(std::env::args().skip(1));
    disktest::logging::init_logging(cli.verbose);
    for token in &cli.unknown {
        warn!(token = %token, "Ignoring unknown option");
    }

    if !cli.json {
        console::print_lines(&console::banner());
    }
    if cli.help {
        println!("{}", help_text());
        return ExitCode::SUCCESS;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Session failed");
            eprintln!("{}", user_friendly_message(&e));
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &CliArgs) -> Result<()> {
    let defaults = ConfigFile::load().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable config file");
        ConfigFile::default()
    });
    let requested = cli.into_config(&defaults);
    requested.validate()?;

    let storage = PlatformStorage::new();
    if !cli.json {
        if requested.read_only {
            println!("Read-only test mode; checking for existing test file...");
        } else {
            println!("Preparing drive...");
        }
    }
    let config = prepare_test_file(&storage, &requested)?;
    if !cli.json {
        console::print_lines(&console::session_intro(&config));
    }

    let runner = SessionRunner::new(&storage, &config, AbortFlag::new());
    let mut progress = ConsoleProgress::new(config.show_progress && !cli.json);
    let outcome = match config.mode {
        SessionMode::Standard => runner.run_standard(&mut progress).map(SessionResults::Standard),
        _ => run_interactive(&runner, &mut progress),
    };

    if !config.read_only && !cli.json {
        println!("Deleting {}.", config.test_path.display());
    }
    cleanup_test_file(&storage, &config);

    report(cli, &config, outcome?)
}

/// Pattern sessions read single key presses, which needs raw mode
fn run_interactive(runner: &SessionRunner<'_>, progress: &mut ConsoleProgress) -> Result<SessionResults> {
    match RawModeGuard::enable() {
        Ok(_guard) => runner.run(&mut ConsoleMenu, &mut KeyboardSignals, progress),
        Err(e) => {
            warn!(error = %e, "Raw mode unavailable; keys will not interrupt tests");
            runner.run(&mut ConsoleMenu, &mut NoSignals, progress)
        }
    }
}

fn report(cli: &CliArgs, config: &TestConfiguration, results: SessionResults) -> Result<()> {
    let report = SessionReport::new(config, results);
    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        console::print_lines(&console::summary(&report));
    }
    Ok(())
}

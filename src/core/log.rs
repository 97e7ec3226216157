//! Process-wide log level for the `log_*!` macros.
//!
//! Set once at startup from `--verbose`, `--quiet` and `STACTOOLS_DEBUG`.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

static LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);
static ECHO: AtomicBool = AtomicBool::new(false);

pub const DEBUG_ENV: &str = "STACTOOLS_DEBUG";

pub fn set_level(level: Level) {
    LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn level() -> Level {
    match LEVEL.load(Ordering::Relaxed) {
        0 => Level::Error,
        1 => Level::Warn,
        2 => Level::Info,
        _ => Level::Debug,
    }
}

pub fn enabled(level: Level) -> bool {
    level <= self::level()
}

/// Resolve the level from CLI flags and the debug environment value.
///
/// Quiet wins over verbose and over `STACTOOLS_DEBUG`.
pub fn resolve_level(verbose: bool, quiet: bool, debug_env: Option<&str>) -> Level {
    if quiet {
        Level::Error
    } else if verbose || debug_env.is_some_and(is_truthy) {
        Level::Debug
    } else {
        Level::Info
    }
}

/// Resolve command echoing.
///
/// `STACTOOLS_DEBUG` always echoes, even in quiet mode. `--verbose` echoes
/// unless quiet.
pub fn resolve_echo(verbose: bool, quiet: bool, debug_env: Option<&str>) -> bool {
    debug_env.is_some_and(is_truthy) || (verbose && !quiet)
}

pub fn init(verbose: bool, quiet: bool) {
    let debug_env = std::env::var(DEBUG_ENV).ok();
    set_level(resolve_level(verbose, quiet, debug_env.as_deref()));
    ECHO.store(
        resolve_echo(verbose, quiet, debug_env.as_deref()),
        Ordering::Relaxed,
    );
}

/// Whether engine commands should be echoed before they run.
pub fn echo_commands() -> bool {
    ECHO.load(Ordering::Relaxed)
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

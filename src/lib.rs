/// Macro for prefixed status logging to stderr (only when stderr is a terminal).
///
/// Usage:
/// ```ignore
/// log_status!("build", "Building stage {} as {}", stage, tag);
/// log_status!("cleanup", "Removed {}", name);
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        if $crate::log::enabled($crate::log::Level::Info)
            && ::std::io::IsTerminal::is_terminal(&::std::io::stderr())
        {
            eprintln!(concat!("[", $prefix, "] {}"), format_args!($($arg)*));
        }
    };
}

/// Prefixed warning to stderr, suppressed only in quiet mode.
#[macro_export]
macro_rules! log_warn {
    ($prefix:expr, $($arg:tt)*) => {
        if $crate::log::enabled($crate::log::Level::Warn) {
            eprintln!(concat!("[", $prefix, "] warning: {}"), format_args!($($arg)*));
        }
    };
}

/// Prefixed debug output to stderr, shown with `--verbose` or `STACTOOLS_DEBUG`.
#[macro_export]
macro_rules! log_debug {
    ($prefix:expr, $($arg:tt)*) => {
        if $crate::log::enabled($crate::log::Level::Debug) {
            eprintln!(concat!("[", $prefix, "] {}"), format_args!($($arg)*));
        }
    };
}

pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Users can write `stacbuild::build` instead of `stacbuild::core::build`
pub use core::*;
pub use utils::*;

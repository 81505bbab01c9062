#![deny(missing_docs)]
//! Shared logging utilities for the studio workspace.
//!
//! This crate provides the `studio_*` logging macros used across the codebase,
//! a per-thread job context that prefixes worker log lines, and a minimal test
//! initializer for the global logger.

use std::cell::Cell;
use std::fmt;

#[doc(hidden)]
pub use log;

thread_local! {
    /// Job id bound to the current thread, 0 when the thread serves no job.
    static CURRENT_JOB: Cell<u64> = const { Cell::new(0) };
}

/// Binds a job id to the current thread.
/// Worker threads call this once on startup; pass 0 to clear it.
pub fn set_current_job(job_id: u64) {
    CURRENT_JOB.with(|v| v.set(job_id));
}

/// Retrieves the job id bound to the current thread.
/// Returns 0 if no job has been bound.
pub fn current_job() -> u64 {
    CURRENT_JOB.with(|v| v.get())
}

/// Log line prefix for the current thread's job context.
#[doc(hidden)]
pub fn job_prefix() -> JobPrefix {
    JobPrefix(current_job())
}

/// Displays as `[job N] `, or as nothing outside a job context.
#[doc(hidden)]
pub struct JobPrefix(u64);

impl fmt::Display for JobPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            Ok(())
        } else {
            write!(f, "[job {}] ", self.0)
        }
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! studio_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! studio_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! studio_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! studio_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! studio_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

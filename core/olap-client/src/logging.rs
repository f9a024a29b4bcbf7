//! FILENAME: core/olap-client/src/logging.rs
// PURPOSE: Category-tagged logging on top of the `log` facade.
// CONTEXT: The category becomes the log target ("REST", "CELLSET", "CUBES"),
// so applications filter per subsystem with their own backend. The library
// never installs a logger.

pub use log::Level;

// ============================================================================
// WRITERS
// ============================================================================

pub fn write_log(level: Level, category: &str, message: &str) {
    log::log!(target: category, level, "{}", message);
}

pub fn write_log_enter(level: Level, category: &str, func_name: &str, params: &str) {
    if params.is_empty() {
        log::log!(target: category, level, "ENTER {}", func_name);
    } else {
        log::log!(target: category, level, "ENTER {} {}", func_name, params);
    }
}

pub fn write_log_exit(level: Level, category: &str, func_name: &str, result: &str) {
    if result.is_empty() {
        log::log!(target: category, level, "EXIT {}", func_name);
    } else {
        log::log!(target: category, level, "EXIT {} {}", func_name, result);
    }
}

// ============================================================================
// MACROS
// ============================================================================

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log($crate::logging::Level::Debug, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log($crate::logging::Level::Info, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log($crate::logging::Level::Warn, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log($crate::logging::Level::Error, $cat, &format!($($arg)*))
    };
}

/// Logs entry into an operation at debug level.
#[macro_export]
macro_rules! log_enter {
    ($cat:expr, $func:expr) => {
        $crate::logging::write_log_enter($crate::logging::Level::Debug, $cat, $func, "")
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::write_log_enter($crate::logging::Level::Debug, $cat, $func, &format!($($arg)*))
    };
}

/// Logs exit from an operation at debug level.
#[macro_export]
macro_rules! log_exit {
    ($cat:expr, $func:expr) => {
        $crate::logging::write_log_exit($crate::logging::Level::Debug, $cat, $func, "")
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::write_log_exit($crate::logging::Level::Debug, $cat, $func, &format!($($arg)*))
    };
}

// Re-export the macros so they can be imported via `use crate::logging::log_info;`
pub use log_debug;
pub use log_info;
pub use log_warn;
pub use log_error;
pub use log_enter;
pub use log_exit;

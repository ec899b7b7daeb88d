//! Tracing setup.
//!
//! Logs go to a daily file under `${MEDXZ_HOME}/logs` so they never mix with
//! command output. Filter comes from `MEDXZ_LOG`, then `RUST_LOG`.

use std::path::Path;
use std::sync::Once;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

const LOG_FILE_PREFIX: &str = "medxz.log";

/// Installs the global subscriber writing under the default logs directory.
/// Safe to call more than once.
pub fn init() {
    init_in(&crate::config::paths::logs_dir());
}

/// Installs the global subscriber writing under `dir`.
pub fn init_in(dir: &Path) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("MEDXZ_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(default_log_level()));

        let appender = match RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .build(dir)
        {
            Ok(appender) => appender,
            // Unwritable log dir: run without file logs.
            Err(_) => return,
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(appender)
            .with_ansi(false)
            .with_target(false)
            .try_init();
    });
}

fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

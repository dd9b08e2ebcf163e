//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to the console and,
//! when a log directory is configured, to JSON log files for debugging
//! long-running provisioning sessions.

use std::fs;
use std::path::Path;
use std::process;
use std::sync::OnceLock;

use chrono::Utc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging.
///
/// `verbosity` maps to a default `EnvFilter` level (`RUST_LOG` still wins
/// when set); `log_dir` enables an additional JSON file layer.
pub fn init_logging(verbosity: u8, log_dir: Option<&Path>) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let default_level = match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        let filter = || {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("demoforge={default_level}")))
        };

        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_filter(filter());

        let file_layer = log_dir.map(|dir| {
            if !dir.exists() {
                if let Err(e) = fs::create_dir_all(dir) {
                    eprintln!("failed to create log directory {}: {e}", dir.display());
                }
            }
            let filename = format!(
                "demoforge.{}.{}.log",
                process::id(),
                Utc::now().format("%Y%m%d_%H%M%S")
            );
            let appender = tracing_appender::rolling::never(dir, filename);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            // Keep the writer guard alive for the process lifetime
            std::mem::forget(guard);
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .json()
                .with_filter(filter())
        });

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }
    });
}

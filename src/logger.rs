//! File logging with daily rotation in local time.

use anyhow::Result;
use logroller::{LogRollerBuilder, Rotation, RotationAge, TimeZone};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use time::macros::format_description;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::prelude::*;

use crate::config::Config;

/// Log files are named `churnscope.YYYY-MM-DD`.
const LOG_PREFIX: &str = "churnscope";
const RETENTION_DAYS: u64 = 3;

/// Install the global subscriber writing to `config.log_path`.
///
/// `RUST_LOG` narrows the filter; the default level is DEBUG.
pub fn init(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.log_path)?;
    cleanup_old_logs(&config.log_path)?;

    let appender = LogRollerBuilder::new(config.log_path.as_path(), Path::new(LOG_PREFIX))
        .rotation(Rotation::AgeBased(RotationAge::Daily))
        .time_zone(TimeZone::Local)
        .max_keep_files(3)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create log roller: {e}"))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let time_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let local_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(OffsetTime::new(local_offset, time_format)),
        );

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {e}"))?;

    // Keep the writer alive for the rest of the process
    std::mem::forget(guard);
    Ok(())
}

/// Remove our log files not modified within the retention window.
pub fn cleanup_old_logs(log_path: &Path) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }
    let cutoff = SystemTime::now() - Duration::from_secs(RETENTION_DAYS * 24 * 60 * 60);

    for entry in fs::read_dir(log_path)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && is_own_log(&path) && modified_before(&entry, cutoff) {
            let _ = fs::remove_file(&path);
        }
    }
    Ok(())
}

fn is_own_log(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(LOG_PREFIX))
}

fn modified_before(entry: &fs::DirEntry, cutoff: SystemTime) -> bool {
    entry
        .metadata()
        .and_then(|m| m.modified())
        .is_ok_and(|modified| modified < cutoff)
}

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use env_logger::{Builder, Env, Target};

use crate::app_dirs::AppDirs;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "RUST_LOG";

/// Sends logs to `keypace.log` in the state dir when `RUST_LOG` is set.
/// The terminal belongs to the UI, so nothing is logged otherwise.
pub fn init() -> io::Result<()> {
    if std::env::var_os(LOG_ENV).is_none() {
        return Ok(());
    }
    match AppDirs::log_path() {
        Some(path) => init_to(&path),
        None => Ok(()),
    }
}

pub fn init_to(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    // a second init from tests is harmless
    let _ = Builder::from_env(Env::default().filter_or(LOG_ENV, "info"))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init();
    Ok(())
}

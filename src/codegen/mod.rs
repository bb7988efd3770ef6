//! Rust source generation from an introspected [`Schema`](crate::ir::Schema).

pub mod models;

pub use models::generate_models;

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;

pub const SNAPSHOT_FILE: &str = "build_model.rs";
pub const SNAPSHOT_LOG: &str = "migration_log.txt";

/// Copy generated model source into a fresh
/// `<history_dir>/modelBuild_<timestamp>/` directory next to a log recording
/// when it was taken. Returns the snapshot directory.
pub fn write_model_snapshot(history_dir: impl AsRef<Path>, source: &str) -> Result<PathBuf> {
    let now = Local::now();
    let dir = history_dir
        .as_ref()
        .join(format!("modelBuild_{}", now.format("%Y%m%d_%H%M%S%3f")));
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(SNAPSHOT_FILE), source)?;
    fs::write(
        dir.join(SNAPSHOT_LOG),
        format!(
            "Model snapshot {} taken at {}\n",
            SNAPSHOT_FILE,
            now.to_rfc3339()
        ),
    )?;
    info!(path = %dir.display(), "wrote model snapshot");
    Ok(dir)
}

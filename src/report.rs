//! Persisting the list of available proxies.

use crate::error::Result;
use crate::proxy::ValidatedProxy;

use chrono::Local;
use log::info;
use std::path::{Path, PathBuf};

/// Write validated proxies, one `host:port` per line, to a timestamped file in `dir`.
pub fn save_available(dir: &Path, validated: &[ValidatedProxy]) -> Result<PathBuf> {
    let filename = format!("available_proxies_{}.txt", Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(filename);

    let content: String = validated.iter().map(|proxy| format!("{proxy}\n")).collect();

    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, content)?;
    info!("Saved {} available proxies to {}", validated.len(), path.display());
    Ok(path)
}

//! Recording file expiry: delete files under `record.filepath`
//! older than `record.expire` days, capped at `record.recordmax` count.

use std::time::{Duration, SystemTime};

use gb28181_infra_common::config::RecordConfig;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Walks `record.filepath` (non-recursively; recordings are written flat
/// per device/day by the media server) and removes files whose mtime is
/// older than `record.expire` days, oldest first, stopping once at most
/// `record.recordmax` files remain.
pub fn sweep_recordings(config: &RecordConfig) -> Result<()> {
    if config.filepath.is_empty() {
        return Ok(());
    }
    let dir = std::path::Path::new(&config.filepath);
    if !dir.is_dir() {
        return Ok(());
    }

    let max_age = Duration::from_secs(config.expire as u64 * 24 * 60 * 60);
    let now = SystemTime::now();

    let mut entries: Vec<(std::path::PathBuf, SystemTime)> = std::fs::read_dir(dir)
        .map_err(|e| Error::MediaServer(format!("reading {}: {}", dir.display(), e)))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.metadata().ok().and_then(|m| m.modified().ok()).map(|mtime| (entry.path(), mtime)))
        .collect();

    entries.sort_by_key(|(_, mtime)| *mtime);

    let mut removed = 0usize;
    let overflow = entries.len().saturating_sub(config.recordmax as usize);

    for (index, (path, mtime)) in entries.iter().enumerate() {
        let age = now.duration_since(*mtime).unwrap_or_default();
        let too_old = age >= max_age;
        let over_cap = index < overflow;
        if too_old || over_cap {
            if let Err(err) = std::fs::remove_file(path) {
                warn!(path = %path.display(), %err, "failed to remove expired recording");
                continue;
            }
            removed += 1;
        }
    }
    debug!(removed, total = entries.len(), "recording expiry sweep complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn removes_nothing_when_filepath_unset() {
        let config = RecordConfig { filepath: String::new(), expire: 7, recordmax: 600 };
        assert!(sweep_recordings(&config).is_ok());
    }

    #[test]
    fn zero_day_expiry_removes_every_file() {
        let dir = tempdir();
        let path = dir.join("old.mp4");
        std::fs::File::create(&path).unwrap().write_all(b"x").unwrap();

        let config = RecordConfig { filepath: dir.to_string_lossy().to_string(), expire: 0, recordmax: 600 };
        sweep_recordings(&config).unwrap();
        assert!(!path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn recordmax_caps_surviving_file_count() {
        let dir = tempdir();
        for i in 0..5 {
            let path = dir.join(format!("rec{}.mp4", i));
            std::fs::File::create(&path).unwrap().write_all(b"x").unwrap();
        }
        let config = RecordConfig { filepath: dir.to_string_lossy().to_string(), expire: 365, recordmax: 2 };
        sweep_recordings(&config).unwrap();
        let remaining = std::fs::read_dir(&dir).unwrap().count();
        assert_eq!(remaining, 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    fn tempdir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("gb28181-recordings-test-{:?}-{:?}", std::thread::current().id(), SystemTime::now()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}

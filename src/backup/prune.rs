// logsink/src/backup/prune.rs
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

use super::artifact::{has_artifact_extension, select_expired};

/// Deletes local dump artifacts beyond the newest `retention`, ordered by
/// file modification time. Only files with a dump extension are considered;
/// anything else in the directory is left alone. Returns how many files were
/// deleted. A missing directory means there is nothing to prune.
pub fn prune(dir: &Path, retention: usize) -> Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "backup directory does not exist; nothing to prune");
            return Ok(0);
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to read backup directory: {}", dir.display()));
        }
    };

    let mut artifacts: Vec<(i64, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), "failed to read directory entry, skipping: {e}");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !has_artifact_extension(name) {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(time) => time
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0),
            Err(e) => {
                warn!(file = %path.display(), "failed to read modification time, skipping: {e}");
                continue;
            }
        };
        artifacts.push((modified, path));
    }

    let expired = select_expired(artifacts, retention);
    let mut pruned = 0;
    for path in expired {
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(file = %path.display(), "✓ pruned expired local artifact");
                pruned += 1;
            }
            Err(e) => warn!(file = %path.display(), "failed to delete local artifact, skipping: {e}"),
        }
    }
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    fn touch_with_age(dir: &Path, name: &str, age_secs: u64) {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        file.set_modified(mtime).unwrap();
    }

    #[test]
    fn test_prune_keeps_newest_artifacts() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        touch_with_age(dir.path(), "pg-appdb-2026-08-19T00-00-00-000Z.sql.gz", 400);
        touch_with_age(dir.path(), "pg-appdb-2026-08-20T00-00-00-000Z.sql.gz", 300);
        touch_with_age(dir.path(), "pg-appdb-2026-08-21T00-00-00-000Z.sql.gz", 200);
        touch_with_age(dir.path(), "pg-appdb-2026-08-22T00-00-00-000Z.sql.gz", 100);

        let pruned = prune(dir.path(), 2)?;
        assert_eq!(pruned, 2);

        let mut remaining: Vec<String> = std::fs::read_dir(dir.path())?
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec![
                "pg-appdb-2026-08-21T00-00-00-000Z.sql.gz",
                "pg-appdb-2026-08-22T00-00-00-000Z.sql.gz",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_prune_ignores_foreign_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        touch_with_age(dir.path(), "notes.txt", 500);
        touch_with_age(dir.path(), "data.gz", 500);
        touch_with_age(dir.path(), "mongo-events-2026-08-22T00-00-00-000Z.tar.gz", 100);

        let pruned = prune(dir.path(), 1)?;
        assert_eq!(pruned, 0);

        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("data.gz").exists());
        Ok(())
    }

    #[test]
    fn test_prune_under_retention_is_noop() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        touch_with_age(dir.path(), "pg-appdb-2026-08-22T00-00-00-000Z.sql.gz", 100);

        assert_eq!(prune(dir.path(), 7)?, 0);
        assert!(dir.path().join("pg-appdb-2026-08-22T00-00-00-000Z.sql.gz").exists());
        Ok(())
    }

    #[test]
    fn test_prune_missing_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("never-created");
        assert_eq!(prune(&missing, 3)?, 0);
        Ok(())
    }

    #[test]
    fn test_prune_zero_retention_clears_artifacts() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        touch_with_age(dir.path(), "pg-a-2026-08-21T00-00-00-000Z.sql.gz", 200);
        touch_with_age(dir.path(), "pg-a-2026-08-22T00-00-00-000Z.sql.gz", 100);

        assert_eq!(prune(dir.path(), 0)?, 2);
        Ok(())
    }
}

// logsink/src/backup/artifact.rs
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::config::BackendKind;

/// A dump file produced by a single backup run, compressed and ready for
/// archiving. Immutable once written; retention only ever deletes whole
/// artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct BackupArtifact {
    pub kind: BackendKind,
    pub file_name: String,
    pub local_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

fn kind_prefix(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Postgres => "pg",
        BackendKind::Mongo => "mongo",
    }
}

fn kind_extension(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Postgres => "sql.gz",
        BackendKind::Mongo => "tar.gz",
    }
}

/// Builds the artifact file name for a backup started at `created_at`:
/// `{prefix}-{db}-{timestamp}.{ext}`, e.g.
/// `pg-appdb-2026-08-23T14-05-22-123Z.sql.gz`. The timestamp is UTC with
/// millisecond precision; colons and dots are replaced with hyphens so the
/// name stays filesystem- and object-key-safe.
pub fn artifact_file_name(kind: BackendKind, db_name: &str, created_at: DateTime<Utc>) -> String {
    let stamp = created_at
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!(
        "{}-{}-{}.{}",
        kind_prefix(kind),
        db_name,
        stamp,
        kind_extension(kind)
    )
}

fn artifact_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(pg|mongo)-.+-\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}-\d{3}Z\.(sql|tar)\.gz$")
            .expect("artifact name pattern is valid")
    })
}

/// Whether `name` looks like an artifact produced by this tool. Remote
/// retention uses this to leave foreign objects in the bucket alone.
pub fn matches_artifact_name(name: &str) -> bool {
    artifact_name_pattern().is_match(name)
}

/// Looser check used for the local backup directory, where anything with a
/// dump extension is considered ours.
pub fn has_artifact_extension(name: &str) -> bool {
    name.ends_with(".sql.gz") || name.ends_with(".tar.gz")
}

/// Sorts `entries` newest-first by their millisecond sort key and returns the
/// values that fall outside the newest-`retain` window, i.e. the ones a
/// retention pass should delete. Ties keep their input order.
pub fn select_expired<T>(mut entries: Vec<(i64, T)>, retain: usize) -> Vec<T> {
    entries.sort_by(|a, b| b.0.cmp(&a.0));
    if entries.len() <= retain {
        return Vec::new();
    }
    entries.split_off(retain).into_iter().map(|(_, v)| v).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_artifact_file_name_postgres() {
        let created_at = Utc
            .with_ymd_and_hms(2026, 8, 23, 14, 5, 22)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(123))
            .unwrap();
        assert_eq!(
            artifact_file_name(BackendKind::Postgres, "appdb", created_at),
            "pg-appdb-2026-08-23T14-05-22-123Z.sql.gz"
        );
    }

    #[test]
    fn test_artifact_file_name_mongo() {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            artifact_file_name(BackendKind::Mongo, "events", created_at),
            "mongo-events-2026-01-02T03-04-05-000Z.tar.gz"
        );
    }

    #[test]
    fn test_generated_names_match_pattern() {
        let now = Utc::now();
        for (kind, db) in [
            (BackendKind::Postgres, "appdb"),
            (BackendKind::Mongo, "ev-ents"),
        ] {
            let name = artifact_file_name(kind, db, now);
            assert!(matches_artifact_name(&name), "no match for {name}");
        }
    }

    #[test]
    fn test_foreign_names_do_not_match() {
        assert!(!matches_artifact_name("random.txt"));
        assert!(!matches_artifact_name("pg-appdb-notatimestamp.sql.gz"));
        assert!(!matches_artifact_name("database_backup_2024.tar.gz"));
        assert!(!matches_artifact_name("mysql-appdb-2026-08-23T14-05-22-123Z.sql.gz"));
        // Wrong extension for a well-formed stamp.
        assert!(!matches_artifact_name("pg-appdb-2026-08-23T14-05-22-123Z.zip"));
    }

    #[test]
    fn test_has_artifact_extension() {
        assert!(has_artifact_extension("pg-appdb-2026-08-23T14-05-22-123Z.sql.gz"));
        assert!(has_artifact_extension("anything.tar.gz"));
        assert!(!has_artifact_extension("notes.txt"));
        assert!(!has_artifact_extension("partial.gz"));
    }

    #[test]
    fn test_select_expired_keeps_newest() {
        let entries = vec![(5, "e"), (1, "a"), (4, "d"), (2, "b"), (3, "c")];
        let expired = select_expired(entries, 3);
        assert_eq!(expired, vec!["b", "a"]);
    }

    #[test]
    fn test_select_expired_under_window() {
        let entries = vec![(1, "a"), (2, "b")];
        assert!(select_expired(entries, 7).is_empty());
    }

    #[test]
    fn test_select_expired_zero_retention() {
        let entries = vec![(1, "a"), (2, "b")];
        assert_eq!(select_expired(entries, 0), vec!["b", "a"]);
    }
}

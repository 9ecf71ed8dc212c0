// logsink/src/backup/logic.rs
use anyhow::Result;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, warn};

use super::artifact::BackupArtifact;
use super::s3_upload::RemoteArchiver;
use super::{db_dump, prune};
use crate::config::{AppConfig, BackupConfig, StorageConfig};

/// Where a backup run currently stands. Runs move strictly forward:
/// Idle → Dumping → Archiving → Pruning → Done, with Failed as the terminal
/// state for a run whose dump did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupPhase {
    Idle,
    Dumping,
    Archiving,
    Pruning,
    Done,
    Failed,
}

impl fmt::Display for BackupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackupPhase::Idle => "idle",
            BackupPhase::Dumping => "dumping",
            BackupPhase::Archiving => "archiving",
            BackupPhase::Pruning => "pruning",
            BackupPhase::Done => "done",
            BackupPhase::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Outcome of one backup run, returned to whoever triggered it.
#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub phase: BackupPhase,
    pub artifact: Option<BackupArtifact>,
    pub remote_key: Option<String>,
    pub pruned: usize,
}

impl BackupReport {
    fn noop() -> Self {
        BackupReport {
            phase: BackupPhase::Done,
            artifact: None,
            remote_key: None,
            pruned: 0,
        }
    }
}

/// Drives one backup run end to end: dump, remote archive, local prune.
/// Holds no run state between calls; callers are responsible for not running
/// two backups at once.
pub struct BackupOrchestrator {
    backup: BackupConfig,
    storage: StorageConfig,
    archiver: RemoteArchiver,
}

impl BackupOrchestrator {
    pub async fn new(config: &AppConfig) -> Self {
        let archiver = RemoteArchiver::new(
            config.s3.as_ref(),
            config.backup.retention,
            config.backup.upload_timeout,
        )
        .await;
        BackupOrchestrator {
            backup: config.backup.clone(),
            storage: config.storage.clone(),
            archiver,
        }
    }

    /// Runs one backup. A dump failure aborts the run with an error; upload
    /// and prune failures degrade it (logged, run still counts as Done).
    /// Disabled backups short-circuit to a no-op Done report.
    pub async fn run(&self) -> Result<BackupReport> {
        if !self.backup.enabled {
            info!("backups are disabled; nothing to do");
            return Ok(BackupReport::noop());
        }

        let mut phase = BackupPhase::Idle;
        info!(
            backend = %self.storage.kind,
            dir = %self.backup.local_dir.display(),
            "🚀 starting backup run"
        );

        transition(&mut phase, BackupPhase::Dumping);
        let artifact = match db_dump::produce(&self.backup, &self.storage).await {
            Ok(artifact) => artifact,
            Err(e) => {
                transition(&mut phase, BackupPhase::Failed);
                error!("❌ backup run failed during dump: {e:#}");
                return Err(e.context("database dump failed; backup run aborted"));
            }
        };

        transition(&mut phase, BackupPhase::Archiving);
        let remote_key = match self.archiver.archive(&artifact).await {
            Ok(key) => key,
            Err(e) => {
                warn!("remote archiving failed; artifact kept local only: {e:#}");
                None
            }
        };

        // Pruning runs regardless of how archiving went.
        transition(&mut phase, BackupPhase::Pruning);
        let pruned = match prune::prune(&self.backup.local_dir, self.backup.retention) {
            Ok(count) => count,
            Err(e) => {
                warn!("local retention sweep failed: {e:#}");
                0
            }
        };

        transition(&mut phase, BackupPhase::Done);
        info!(
            artifact = %artifact.file_name,
            uploaded = remote_key.is_some(),
            pruned,
            "✅ backup run completed"
        );
        Ok(BackupReport {
            phase,
            artifact: Some(artifact),
            remote_key,
            pruned,
        })
    }

    pub fn remote_configured(&self) -> bool {
        self.archiver.is_configured()
    }
}

fn transition(phase: &mut BackupPhase, next: BackupPhase) {
    debug!(from = %phase, to = %next, "backup phase");
    *phase = next;
}

// logsink/src/schedule/mod.rs
use anyhow::{Context, Result};
use chrono::Utc;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backup::BackupOrchestrator;

/// Parses a cron expression. Accepts the common five-field form
/// (minute hour day month weekday) by prepending a zero seconds field.
pub fn parse_schedule(expr: &str) -> Result<Schedule> {
    let normalized = normalize_cron(expr);
    Schedule::from_str(&normalized)
        .with_context(|| format!("invalid cron expression: {expr:?}"))
}

fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// Arms the backup schedule. An invalid expression disables scheduling for
/// the lifetime of the process: the error is logged and no trigger ever
/// fires, but ingestion keeps running.
pub fn spawn(
    expr: &str,
    orchestrator: Arc<BackupOrchestrator>,
    gate: Arc<Mutex<()>>,
) -> Option<JoinHandle<()>> {
    let schedule = match parse_schedule(expr) {
        Ok(schedule) => schedule,
        Err(e) => {
            error!("backup scheduling disabled: {e:#}");
            return None;
        }
    };

    info!(schedule = expr, "⏰ backup schedule armed");
    Some(tokio::spawn(run_loop(schedule, orchestrator, gate)))
}

async fn run_loop(schedule: Schedule, orchestrator: Arc<BackupOrchestrator>, gate: Arc<Mutex<()>>) {
    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            warn!("cron schedule yields no future occurrences; scheduler exiting");
            return;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        debug!(next = %next, "sleeping until next scheduled backup");
        tokio::time::sleep(wait).await;

        // Overlap guard shared with the manual trigger endpoint. If a run is
        // still in flight this tick is skipped, not queued.
        match gate.try_lock() {
            Ok(_guard) => match orchestrator.run().await {
                Ok(report) => {
                    info!(pruned = report.pruned, "scheduled backup finished");
                }
                Err(e) => error!("scheduled backup failed: {e:#}"),
            },
            Err(_) => warn!("previous backup still running; skipping this trigger"),
        }
    }
}

// logsink/src/lib.rs
//! Write-path log sink: accepts JSON log events over HTTP and persists them
//! to PostgreSQL or MongoDB, whichever is configured. A built-in backup
//! engine dumps the database on a cron schedule, ships the compressed
//! artifact to S3-compatible storage, and keeps both the local directory and
//! the bucket trimmed to a retention window.

pub mod api;
pub mod backup;
pub mod config;
pub mod schedule;
pub mod storage;

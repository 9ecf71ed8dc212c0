// logsink/src/backup/mod.rs
pub(crate) mod archive; // tarball creation for directory-shaped dumps
pub mod artifact; // artifact naming and retention ordering
pub(crate) mod db_dump; // external dump tool execution
pub mod logic; // run orchestration
pub(crate) mod prune; // local retention sweep
pub(crate) mod s3_upload; // remote archive upload and retention

pub use artifact::BackupArtifact;
pub use logic::{BackupOrchestrator, BackupPhase, BackupReport};

// logsink/src/backup/archive.rs
use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::debug;
use walkdir::WalkDir;

/// Packs the contents of `source_dir` into a gzipped tarball at
/// `archive_dest_path`. Paths inside the archive are relative to
/// `source_dir`, so unpacking reproduces the dump layout without the
/// scratch-directory prefix.
pub fn create_tar_gz_archive(source_dir: &Path, archive_dest_path: &Path) -> Result<PathBuf> {
    if !source_dir.is_dir() {
        anyhow::bail!(
            "source for archival is not a directory: {}",
            source_dir.display()
        );
    }
    if let Some(parent) = archive_dest_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create parent directory for archive: {}",
                    parent.display()
                )
            })?;
        }
    }

    debug!(
        source = %source_dir.display(),
        dest = %archive_dest_path.display(),
        "creating tar.gz archive"
    );

    let archive_file = File::create(archive_dest_path).with_context(|| {
        format!(
            "failed to create archive file: {}",
            archive_dest_path.display()
        )
    })?;
    let encoder = GzEncoder::new(archive_file, Compression::default());
    let mut tar_builder = Builder::new(encoder);

    for entry in WalkDir::new(source_dir) {
        let entry = entry
            .with_context(|| format!("failed to walk directory: {}", source_dir.display()))?;
        let path = entry.path();
        let name = path.strip_prefix(source_dir).with_context(|| {
            format!(
                "failed to strip prefix {} from {}",
                source_dir.display(),
                path.display()
            )
        })?;

        // The walk yields source_dir itself first; skip it.
        if name.as_os_str().is_empty() {
            continue;
        }

        if path.is_dir() {
            tar_builder.append_dir(name, path).with_context(|| {
                format!("failed to append directory {} to archive", path.display())
            })?;
        } else if path.is_file() {
            tar_builder.append_path_with_name(path, name).with_context(|| {
                format!(
                    "failed to append file {} as {} to archive",
                    path.display(),
                    name.display()
                )
            })?;
        }
    }

    let encoder = tar_builder.into_inner().with_context(|| {
        format!(
            "failed to finalize tar stream for archive: {}",
            archive_dest_path.display()
        )
    })?;
    encoder.finish().with_context(|| {
        format!(
            "failed to finish gzip encoding for archive: {}",
            archive_dest_path.display()
        )
    })?;

    debug!(dest = %archive_dest_path.display(), "✓ tar.gz archive created");
    Ok(archive_dest_path.to_path_buf())
}

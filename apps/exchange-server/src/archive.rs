//! Archive extraction
//!
//! Uploaded files the installed extractor recognises are recorded as pending
//! archives. The next import of the session drains the list and unpacks each
//! archive into the working directory.

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Signature at the start of a ZIP local file header
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Unpacks received archives into the working directory
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Whether the file at `path` is an archive this extractor can unpack
    async fn is_archive(&self, path: &Path) -> bool;

    /// Unpack `archive` into `target`, returning the number of files written
    async fn extract(&self, archive: &Path, target: &Path) -> Result<usize, ArchiveError>;
}

/// ZIP support via the `zip` crate
#[derive(Debug, Clone, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArchiveExtractor for ZipExtractor {
    async fn is_archive(&self, path: &Path) -> bool {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || has_zip_magic(&path))
            .await
            .unwrap_or(false)
    }

    async fn extract(&self, archive: &Path, target: &Path) -> Result<usize, ArchiveError> {
        let archive: PathBuf = archive.to_path_buf();
        let target: PathBuf = target.to_path_buf();

        let written = tokio::task::spawn_blocking(move || extract_zip(&archive, &target)).await??;

        Ok(written)
    }
}

/// Copy the regular files of a ZIP archive below `target`.
///
/// Symlink entries and names escaping `target` are skipped, and an existing
/// symlink at a destination is never written through. Returns the number of
/// files written.
fn extract_zip(archive: &Path, target: &Path) -> Result<usize, ArchiveError> {
    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut written = 0;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_string();

        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(entry = %name, "Skipping archive entry outside the working directory");
            continue;
        };
        if entry.is_symlink() {
            tracing::warn!(entry = %name, "Skipping symlink archive entry");
            continue;
        }

        let destination = target.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&destination)?;
            continue;
        }

        if is_symlink(&destination) {
            tracing::warn!(entry = %name, "Refusing to extract over a symlink");
            continue;
        }
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out = std::fs::File::create(&destination)?;
        std::io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    Ok(written)
}

/// Whether `path` itself is a symlink, without following it
pub fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

fn has_zip_magic(path: &Path) -> bool {
    let mut header = [0u8; 4];
    std::fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut header))
        .map(|_| header == ZIP_MAGIC)
        .unwrap_or(false)
}

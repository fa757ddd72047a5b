//! Blueprint packaging and archive detection.

use cloudify_core::Error;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::Result;

/// File name suffixes recognised as blueprint archives.
pub const SUPPORTED_ARCHIVE_EXTENSIONS: &[&str] =
    &[".zip", ".tar", ".tar.gz", ".tgz", ".tar.bz2", ".tbz2"];

const TAR_MAGIC_OFFSET: usize = 257;

/// Packs blueprint directories for upload.
#[cfg_attr(test, mockall::automock)]
pub trait BlueprintPackager: Send + Sync {
    /// Archive `blueprint_dir` into a new file inside `dest_dir` and return its path.
    ///
    /// The caller owns `dest_dir` and removes it afterwards.
    fn pack(&self, blueprint_dir: &Path, dest_dir: &Path) -> Result<PathBuf>;

    /// Returns true if `path` names an archive that can be staged as-is.
    fn is_supported_archive(&self, path: &str) -> bool;
}

/// Packs directories into uncompressed tar archives.
///
/// The archive holds the directory under a single top-level folder named
/// after it, which is the layout the manager expects.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarPackager;

impl TarPackager {
    /// Create a packager.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl BlueprintPackager for TarPackager {
    fn pack(&self, blueprint_dir: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let packaging_error =
            |err: std::io::Error| Error::PackagingFailed(format!("{}: {err}", blueprint_dir.display()));

        if !blueprint_dir.is_dir() {
            return Err(Error::PackagingFailed(format!(
                "{} is not a directory",
                blueprint_dir.display()
            )));
        }

        let blueprint_dir = blueprint_dir.canonicalize().map_err(packaging_error)?;
        let name = blueprint_dir
            .file_name()
            .map_or_else(|| "blueprint".to_string(), |n| n.to_string_lossy().into_owned());
        let archive_path = dest_dir.join(format!("{name}.tar"));

        let file = File::create(&archive_path).map_err(packaging_error)?;
        let mut builder = tar::Builder::new(file);
        builder.follow_symlinks(false);
        builder
            .append_dir_all(&name, &blueprint_dir)
            .map_err(packaging_error)?;
        builder
            .into_inner()
            .and_then(|file| file.sync_all())
            .map_err(packaging_error)?;

        debug!(
            source = %blueprint_dir.display(),
            archive = %archive_path.display(),
            "packed blueprint directory"
        );
        Ok(archive_path)
    }

    fn is_supported_archive(&self, path: &str) -> bool {
        is_supported_archive(path)
    }
}

/// Returns true if `path` has a supported archive extension, or names an
/// existing file starting with a zip, gzip, bzip2 or tar signature.
#[must_use]
pub fn is_supported_archive(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    if SUPPORTED_ARCHIVE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(ext))
    {
        return true;
    }

    let path = Path::new(path);
    path.is_file() && has_archive_signature(path).unwrap_or(false)
}

fn has_archive_signature(path: &Path) -> std::io::Result<bool> {
    let mut header = Vec::with_capacity(TAR_MAGIC_OFFSET + 5);
    File::open(path)?
        .take((TAR_MAGIC_OFFSET + 5) as u64)
        .read_to_end(&mut header)?;

    let zip = header.starts_with(b"PK\x03\x04");
    let gzip = header.starts_with(&[0x1f, 0x8b]);
    let bzip2 = header.starts_with(b"BZh");
    let tar = header.get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5) == Some(b"ustar".as_slice());
    Ok(zip || gzip || bzip2 || tar)
}

/// MIME type for an archive, guessed from its file name.
#[must_use]
pub fn guess_content_type(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        "application/gzip"
    } else if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") {
        "application/x-bzip2"
    } else if lower.ends_with(".tar") {
        "application/x-tar"
    } else if lower.ends_with(".zip") {
        "application/zip"
    } else {
        "application/octet-stream"
    }
}

//! Where a staged blueprint revision comes from.

use cloudify_core::Error;
use std::path::{Path, PathBuf};
use url::Url;

use crate::Result;

/// Location of a blueprint archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveLocation {
    /// Archive on the local filesystem; its bytes are uploaded.
    Local(PathBuf),
    /// Archive the manager downloads itself.
    Remote(Url),
}

/// Classify an archive path-or-URL string.
///
/// An existing local entry always wins. Otherwise a string that parses as a
/// URL is remote, unless its scheme is a single letter: `C:\bp\app.zip`
/// parses with scheme `c` but is a Windows drive path.
#[must_use]
pub fn classify_archive_location(location: &str) -> ArchiveLocation {
    classify_location(location, Path::new(location).exists())
}

fn classify_location(location: &str, exists_locally: bool) -> ArchiveLocation {
    if exists_locally {
        return ArchiveLocation::Local(PathBuf::from(location));
    }
    match Url::parse(location) {
        Ok(url) if url.scheme().len() > 1 => ArchiveLocation::Remote(url),
        _ => ArchiveLocation::Local(PathBuf::from(location)),
    }
}

/// Blueprint revision to stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlueprintSource {
    /// Directory packed into a temporary archive before upload.
    Directory {
        /// Directory to pack.
        path: PathBuf,
        /// Main blueprint file, relative to the directory.
        application_file_name: Option<String>,
    },
    /// Ready-made archive.
    Archive {
        /// Where the archive lives.
        location: ArchiveLocation,
        /// Main blueprint file inside the archive.
        application_file_name: Option<String>,
    },
}

impl BlueprintSource {
    /// Pack `path` and let the manager pick the main blueprint file.
    #[must_use]
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::Directory {
            path: path.into(),
            application_file_name: None,
        }
    }

    /// Pack the directory containing `blueprint`, using its file name as the
    /// main blueprint file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the path has no file name, or
    /// [`Error::Io`] if the current directory is needed and unreadable.
    pub fn blueprint_file(blueprint: impl AsRef<Path>) -> Result<Self> {
        let blueprint = blueprint.as_ref();
        let file_name = blueprint
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidRequest(format!(
                    "blueprint path `{}` has no file name",
                    blueprint.display()
                ))
            })?;

        let directory = match blueprint.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };

        Ok(Self::Directory {
            path: directory,
            application_file_name: Some(file_name),
        })
    }

    /// Archive given as a path or URL string, classified with
    /// [`classify_archive_location`].
    #[must_use]
    pub fn archive(location: &str) -> Self {
        Self::Archive {
            location: classify_archive_location(location),
            application_file_name: None,
        }
    }

    /// Local archive file.
    #[must_use]
    pub fn local_archive(path: impl Into<PathBuf>) -> Self {
        Self::Archive {
            location: ArchiveLocation::Local(path.into()),
            application_file_name: None,
        }
    }

    /// Archive the manager fetches from `url`.
    #[must_use]
    pub const fn remote_archive(url: Url) -> Self {
        Self::Archive {
            location: ArchiveLocation::Remote(url),
            application_file_name: None,
        }
    }

    /// Set the main blueprint file name.
    #[must_use]
    pub fn with_application_file_name(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            Self::Directory {
                application_file_name,
                ..
            }
            | Self::Archive {
                application_file_name,
                ..
            } => *application_file_name = Some(name.into()),
        }
        self
    }

    /// Main blueprint file name, if set.
    #[must_use]
    pub fn application_file_name(&self) -> Option<&str> {
        match self {
            Self::Directory {
                application_file_name,
                ..
            }
            | Self::Archive {
                application_file_name,
                ..
            } => application_file_name.as_deref(),
        }
    }
}

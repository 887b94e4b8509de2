//! Output sinks: where finished artifacts are persisted

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tempfile::NamedTempFile;

use super::artifact::{ExportArtifact, JPEG_MIME, ZIP_MIME};

/// Upper bound on "name (n).ext" attempts before giving up
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Where and how an artifact was saved
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub mime_type: String,
    pub bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("No downloads folder available")]
    NoDestination,

    #[error("Cannot create {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("Cannot write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("No free file name for {name} in {}", dir.display())]
    NameExhausted { dir: PathBuf, name: String },
}

/// Persists a finished artifact
pub trait OutputSink {
    /// Store `artifact` under `display_name`. Single attempt, no retry.
    fn persist(
        &self,
        artifact: ExportArtifact,
        display_name: &str,
        mime_type: &str,
    ) -> Result<SavedFile, SinkError>;
}

impl<T: OutputSink + ?Sized> OutputSink for &T {
    fn persist(
        &self,
        artifact: ExportArtifact,
        display_name: &str,
        mime_type: &str,
    ) -> Result<SavedFile, SinkError> {
        (**self).persist(artifact, display_name, mime_type)
    }
}

/// Writes artifacts into a downloads folder
#[derive(Clone, Debug)]
pub struct DownloadsSink {
    dir: PathBuf,
}

impl DownloadsSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The current user's downloads folder
    pub fn user_downloads() -> Result<Self, SinkError> {
        dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
            .map(Self::new)
            .ok_or(SinkError::NoDestination)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for DownloadsSink {
    fn persist(
        &self,
        mut artifact: ExportArtifact,
        display_name: &str,
        mime_type: &str,
    ) -> Result<SavedFile, SinkError> {
        if let Some(expected) = mime_for_name(display_name) {
            if expected != mime_type {
                warn!("{display_name} saved as {mime_type}, extension suggests {expected}");
            }
        }

        fs::create_dir_all(&self.dir).map_err(|source| SinkError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let write_err = |source| SinkError::Write {
            path: self.dir.join(display_name),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        let bytes = artifact.write_to(tmp.as_file_mut()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(numbered_name(display_name, attempt));
            match tmp.persist_noclobber(&path) {
                Ok(_) => {
                    info!("Saved {} ({bytes} bytes, {mime_type})", path.display());
                    return Ok(SavedFile {
                        path,
                        mime_type: mime_type.to_string(),
                        bytes,
                    });
                }
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying next name", path.display());
                    tmp = e.file;
                }
                Err(e) => {
                    return Err(SinkError::Write {
                        path,
                        source: e.error,
                    });
                }
            }
        }

        Err(SinkError::NameExhausted {
            dir: self.dir.clone(),
            name: display_name.to_string(),
        })
    }
}

/// `name.ext`, then `name (1).ext`, `name (2).ext`, ...
fn numbered_name(display_name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return display_name.to_string();
    }
    match display_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({attempt}).{ext}"),
        _ => format!("{display_name} ({attempt})"),
    }
}

fn mime_for_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some(JPEG_MIME),
        "zip" => Some(ZIP_MIME),
        _ => None,
    }
}

//! Worker request and response types

use std::path::PathBuf;

use crate::export::{ExportProgress, ExportResult};
use crate::pdf::{RasterImage, ThumbnailSet};
use crate::session::Command;

/// Request sent to the export worker
#[derive(Debug)]
pub enum WorkerRequest {
    /// Close the current document, open `path` and build its thumbnails
    Open { path: PathBuf },

    /// Close the current document
    Close,

    /// Render one page at export scale for viewing
    Preview { page: usize },

    /// Export pages (ascending) under `base_name`
    Export { pages: Vec<usize>, base_name: String },

    /// Shutdown the worker
    Shutdown,
}

/// Response from the export worker
#[derive(Debug)]
pub enum WorkerResponse {
    /// Document opened; thumbnails follow
    Loaded { path: PathBuf, page_count: usize },

    Thumbnails {
        path: PathBuf,
        thumbnails: ThumbnailSet,
    },

    /// The document opened but the thumbnail pass could not run
    ThumbnailsFailed { path: PathBuf, message: String },

    LoadFailed { path: PathBuf, message: String },

    Preview { page: usize, image: RasterImage },

    PreviewFailed { page: usize, message: String },

    /// One archive page done
    Progress(ExportProgress),

    /// Export done; `None` when there was nothing to export
    Exported(Option<ExportResult>),

    /// Document released
    Closed,
}

impl From<ExportProgress> for WorkerResponse {
    fn from(progress: ExportProgress) -> Self {
        Self::Progress(progress)
    }
}

impl WorkerResponse {
    /// The session command carrying this response, if the session cares
    #[must_use]
    pub fn into_command(self) -> Option<Command> {
        let cmd = match self {
            Self::Loaded { path, page_count } => Command::DocumentLoaded { path, page_count },
            Self::Thumbnails { path, thumbnails } => Command::ThumbnailsReady { path, thumbnails },
            Self::ThumbnailsFailed { path, message } => Command::ThumbnailsFailed { path, message },
            Self::LoadFailed { path, message } => Command::LoadFailed { path, message },
            Self::Preview { page, image } => Command::PreviewReady { page, image },
            Self::PreviewFailed { page, message } => Command::PreviewFailed { page, message },
            Self::Progress(progress) => Command::ExportProgress(progress),
            Self::Exported(result) => Command::ExportFinished(result),
            Self::Closed => return None,
        };
        Some(cmd)
    }
}

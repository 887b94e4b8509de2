//! Session state
//!
//! Everything the front end tracks about the current document lives in one
//! [`Session`]. It only changes through [`Session::apply`], which returns the
//! [`Effect`]s the caller has to carry out (start a load, start an export,
//! show a message).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::export::{ExportProgress, ExportResult};
use crate::pdf::{FALLBACK_DISPLAY_NAME, RasterImage, ThumbnailSet, display_name};
use crate::selection::SelectionSet;

pub const LOADING_MESSAGE: &str = "Processing PDF...";
pub const SAVING_IMAGE_MESSAGE: &str = "Saving image...";
pub const BUILDING_ZIP_MESSAGE: &str = "Building ZIP...";

/// The document currently shown
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub page_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackLevel {
    Info,
    Warning,
    Error,
}

/// A transient message for the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Feedback {
    pub message: String,
    pub level: FeedbackLevel,
}

impl Feedback {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: FeedbackLevel::Info,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: FeedbackLevel::Warning,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: FeedbackLevel::Error,
        }
    }
}

/// High-resolution view of a single page
#[derive(Clone, Debug)]
pub struct Preview {
    pub page: usize,
    /// `None` until the render arrives
    pub image: Option<Arc<RasterImage>>,
}

#[derive(Clone, Debug)]
pub struct Session {
    /// Display name of the current (or last attempted) document
    pub display_name: String,
    /// `None` while no document is loaded
    pub document: Option<LoadedDocument>,
    pub selection: SelectionSet,
    pub thumbnails: Arc<ThumbnailSet>,
    pub preview: Option<Preview>,
    /// Path of the load in flight; stale responses are ignored
    pending_load: Option<PathBuf>,
    /// Status of the export in flight, independent of any load
    export_status: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            display_name: FALLBACK_DISPLAY_NAME.to_string(),
            document: None,
            selection: SelectionSet::new(),
            thumbnails: Arc::default(),
            preview: None,
            pending_load: None,
            export_status: None,
        }
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.document.as_ref().map_or(0, |d| d.page_count)
    }

    /// Message for the work in flight; an export takes precedence over a load
    #[must_use]
    pub fn busy(&self) -> Option<&str> {
        self.export_status
            .as_deref()
            .or_else(|| self.pending_load.as_ref().map(|_| LOADING_MESSAGE))
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.is_loading() || self.is_exporting()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.export_status.is_some()
    }

    /// No background work outstanding, including a pending preview render
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.is_busy() && self.preview.as_ref().is_none_or(|p| p.image.is_some())
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::OpenDocument(path) => {
                self.display_name = display_name(&path);
                self.document = None;
                self.selection.select_none();
                self.thumbnails = Arc::default();
                self.preview = None;
                self.pending_load = Some(path.clone());
                vec![Effect::LoadDocument(path)]
            }

            Command::DocumentLoaded { path, page_count } => {
                if !self.is_pending(&path) {
                    debug!("Ignoring stale load of {}", path.display());
                    return vec![];
                }
                self.document = Some(LoadedDocument { path, page_count });
                vec![]
            }

            Command::ThumbnailsReady { path, thumbnails } => {
                if !self.is_pending(&path) {
                    return vec![];
                }
                self.pending_load = None;

                let failed = thumbnails.failed().len();
                self.thumbnails = Arc::new(thumbnails);
                if failed > 0 {
                    vec![Effect::Notify(Feedback::warning(format!(
                        "{failed} page(s) could not be previewed"
                    )))]
                } else {
                    vec![]
                }
            }

            Command::ThumbnailsFailed { path, message } => {
                if !self.is_pending(&path) {
                    return vec![];
                }
                // Document stays loaded, just without thumbnails
                self.pending_load = None;
                self.thumbnails = Arc::default();
                vec![Effect::Notify(Feedback::error(message))]
            }

            Command::LoadFailed { path, message } => {
                if !self.is_pending(&path) {
                    return vec![];
                }
                self.pending_load = None;
                self.document = None;
                self.display_name = FALLBACK_DISPLAY_NAME.to_string();
                vec![Effect::Notify(Feedback::error(message))]
            }

            Command::CloseDocument => {
                let had_document = self.document.is_some() || self.pending_load.is_some();
                self.document = None;
                self.pending_load = None;
                self.display_name = FALLBACK_DISPLAY_NAME.to_string();
                self.selection.select_none();
                self.thumbnails = Arc::default();
                self.preview = None;
                if had_document {
                    vec![Effect::ReleaseDocument]
                } else {
                    vec![]
                }
            }

            Command::TogglePage(page) => {
                if self.check_page(page) {
                    self.selection.toggle(page);
                }
                vec![]
            }

            Command::SelectPages(pages) => {
                for page in pages {
                    if self.check_page(page) {
                        self.selection.select(page);
                    }
                }
                vec![]
            }

            Command::SelectAll => {
                self.selection.select_all(self.page_count());
                vec![]
            }

            Command::SelectNone => {
                self.selection.select_none();
                vec![]
            }

            Command::ToggleAll => {
                self.selection.toggle_all(self.page_count());
                vec![]
            }

            Command::Export { base_name } => {
                if self.selection.is_empty() || self.document.is_none() || self.is_busy() {
                    return vec![];
                }
                let message = if self.selection.len() == 1 {
                    SAVING_IMAGE_MESSAGE
                } else {
                    BUILDING_ZIP_MESSAGE
                };
                self.export_status = Some(message.to_string());
                vec![Effect::StartExport {
                    pages: self.selection.sorted(),
                    base_name: base_name.unwrap_or_else(|| self.display_name.clone()),
                }]
            }

            Command::ExportProgress(progress) => {
                if self.is_exporting() {
                    self.export_status = Some(format!("Processing {progress}"));
                }
                vec![]
            }

            Command::ExportFinished(result) => {
                self.export_status = None;
                match result {
                    Some(ExportResult::Success { message, .. }) => {
                        vec![Effect::Notify(Feedback::info(message))]
                    }
                    Some(ExportResult::Failure { message }) => {
                        vec![Effect::Notify(Feedback::error(format!("Error: {message}")))]
                    }
                    None => vec![],
                }
            }

            Command::ShowPreview(page) => {
                if !self.check_page(page) {
                    return vec![];
                }
                self.preview = Some(Preview { page, image: None });
                vec![Effect::RenderPreview(page)]
            }

            Command::PreviewReady { page, image } => {
                match &mut self.preview {
                    Some(preview) if preview.page == page => {
                        preview.image = Some(Arc::new(image));
                    }
                    _ => debug!("Dropping preview of page {page}, no longer shown"),
                }
                vec![]
            }

            Command::PreviewFailed { page, message } => {
                if self.preview.as_ref().is_some_and(|p| p.page == page) {
                    self.preview = None;
                    vec![Effect::Notify(Feedback::error(message))]
                } else {
                    vec![]
                }
            }

            Command::ClosePreview => {
                self.preview = None;
                vec![]
            }
        }
    }

    fn is_pending(&self, path: &Path) -> bool {
        self.pending_load.as_deref() == Some(path)
    }

    fn check_page(&self, page: usize) -> bool {
        let valid = page < self.page_count();
        debug_assert!(
            valid || self.document.is_none(),
            "page {page} out of range for {} pages",
            self.page_count()
        );
        if !valid {
            warn!("Ignoring page {page}: out of range");
        }
        valid
    }
}

/// Commands that modify session state
#[derive(Clone, Debug)]
pub enum Command {
    /// Start loading a new document, replacing the current one
    OpenDocument(PathBuf),
    /// The document opened; thumbnails follow
    DocumentLoaded { path: PathBuf, page_count: usize },
    ThumbnailsReady {
        path: PathBuf,
        thumbnails: ThumbnailSet,
    },
    ThumbnailsFailed { path: PathBuf, message: String },
    LoadFailed { path: PathBuf, message: String },
    CloseDocument,
    TogglePage(usize),
    SelectPages(Vec<usize>),
    SelectAll,
    SelectNone,
    /// Select everything, or nothing if everything is selected
    ToggleAll,
    /// Export the selection; `None` names outputs after the document
    Export { base_name: Option<String> },
    ExportProgress(ExportProgress),
    ExportFinished(Option<ExportResult>),
    ShowPreview(usize),
    PreviewReady { page: usize, image: RasterImage },
    PreviewFailed { page: usize, message: String },
    ClosePreview,
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Close the current document and open this one
    LoadDocument(PathBuf),
    /// Close the current document
    ReleaseDocument,
    StartExport { pages: Vec<usize>, base_name: String },
    RenderPreview(usize),
    Notify(Feedback),
}

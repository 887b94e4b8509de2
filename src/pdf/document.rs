//! Document handle abstraction
//!
//! A [`PagedDocument`] is an exclusively owned renderer over a page-addressable
//! file. Pages are opened one at a time: [`PagedDocument::open_page`] borrows
//! the document mutably, so a second page cannot be opened until the first
//! handle has been dropped.

use std::path::{Path, PathBuf};

use image::RgbImage;

use super::types::{PageSize, PixelSize};

/// Errors raised by document handles
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Cannot open {}: {detail}", path.display())]
    Open { path: PathBuf, detail: String },

    #[error("Page {index} out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },

    #[error("Document is closed")]
    Closed,

    #[error("Failed to render page {page}: {detail}")]
    Render { page: usize, detail: String },

    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),
}

impl DocumentError {
    pub fn open(path: &Path, detail: impl Into<String>) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }

    pub fn render(page: usize, detail: impl Into<String>) -> Self {
        Self::Render {
            page,
            detail: detail.into(),
        }
    }

    /// Whether the error concerns one page only, leaving the document usable
    #[must_use]
    pub fn is_page_local(&self) -> bool {
        match self {
            Self::Render { .. } => true,
            #[cfg(feature = "pdf")]
            Self::Pdf(_) => true,
            _ => false,
        }
    }
}

/// An open document
pub trait PagedDocument {
    type Page<'a>: DocumentPage
    where
        Self: 'a;

    /// Number of pages; fails once the document is closed
    fn page_count(&self) -> Result<usize, DocumentError>;

    /// Open page `index`. The returned handle is released on drop.
    fn open_page(&mut self, index: usize) -> Result<Self::Page<'_>, DocumentError>;

    /// Release the underlying renderer. Later calls fail with
    /// [`DocumentError::Closed`]; closing twice is a no-op.
    fn close(&mut self);

    /// Whether [`PagedDocument::close`] has been called
    fn is_closed(&self) -> bool;
}

/// A single open page
pub trait DocumentPage {
    /// Page index (0-based)
    fn index(&self) -> usize;

    /// Page size in points
    fn size(&self) -> Result<PageSize, DocumentError>;

    /// Draw the page stretched to exactly `target` pixels on a white
    /// background.
    fn rasterize(&self, target: PixelSize) -> Result<RgbImage, DocumentError>;
}

/// Opens documents from paths.
///
/// The background worker owns a loader instead of a document so it can
/// construct documents on its own thread.
pub trait DocumentLoader: Send + 'static {
    type Document: PagedDocument;

    fn open(&self, path: &Path) -> Result<Self::Document, DocumentError>;
}

/// Guard the common "index in range" precondition
pub fn check_index(index: usize, page_count: usize) -> Result<(), DocumentError> {
    if index < page_count {
        Ok(())
    } else {
        Err(DocumentError::PageOutOfRange { index, page_count })
    }
}

/// Human readable name for a document path: the file name with a trailing
/// `.pdf` removed (any case). Falls back to [`FALLBACK_DISPLAY_NAME`].
#[must_use]
pub fn display_name(path: &Path) -> String {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return FALLBACK_DISPLAY_NAME.to_string();
    };

    let stem = match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".pdf") => {
            &name[..cut]
        }
        _ => name,
    };

    let stem = stem.trim();
    if stem.is_empty() {
        FALLBACK_DISPLAY_NAME.to_string()
    } else {
        stem.to_string()
    }
}

/// Display name used when none can be derived from the source
pub const FALLBACK_DISPLAY_NAME: &str = "Document";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_strips_pdf_extension_any_case() {
        assert_eq!(display_name(Path::new("/tmp/Report.pdf")), "Report");
        assert_eq!(display_name(Path::new("Report.PDF")), "Report");
        assert_eq!(display_name(Path::new("scan.Pdf")), "scan");
    }

    #[test]
    fn display_name_keeps_other_extensions() {
        assert_eq!(display_name(Path::new("notes.txt")), "notes.txt");
        assert_eq!(display_name(Path::new("archive.pdf.bak")), "archive.pdf.bak");
    }

    #[test]
    fn display_name_falls_back() {
        assert_eq!(display_name(Path::new("/")), FALLBACK_DISPLAY_NAME);
        assert_eq!(display_name(Path::new(".pdf")), FALLBACK_DISPLAY_NAME);
    }

    #[test]
    fn check_index_bounds() {
        assert!(check_index(0, 1).is_ok());
        assert!(matches!(
            check_index(1, 1),
            Err(DocumentError::PageOutOfRange {
                index: 1,
                page_count: 1
            })
        ));
        assert!(check_index(0, 0).is_err());
    }
}

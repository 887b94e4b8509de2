//! PDF rendering infrastructure

mod document;
#[cfg(feature = "pdf")]
mod mupdf_document;
mod raster;
mod thumbnails;
mod types;

pub use document::{
    DocumentError, DocumentLoader, DocumentPage, FALLBACK_DISPLAY_NAME, PagedDocument,
    check_index, display_name,
};
#[cfg(feature = "pdf")]
pub use mupdf_document::{MupdfDocument, MupdfLoader, MupdfPage};
pub use raster::{
    DEFAULT_EXPORT_SCALE, DEFAULT_THUMBNAIL_DIVISOR, DEFAULT_THUMBNAIL_MIN_PX, RasterSpec,
    RenderMode, render_page,
};
pub use thumbnails::{ThumbnailSet, build_all};
pub use types::*;

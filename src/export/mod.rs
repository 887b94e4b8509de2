pub mod artifact;
pub mod filename;
pub mod pipeline;
pub mod sink;

pub use artifact::{
    ArchiveBuilder, ArtifactKind, DEFAULT_JPEG_QUALITY, ExportArtifact, JPEG_MIME, ZIP_MIME,
    encode_jpeg,
};
pub use filename::{archive_name, page_image_name, sanitize_filename, thumbnail_name};
pub use pipeline::{
    ExportError, ExportOptions, ExportPipeline, ExportProgress, ExportResult, IMAGE_SAVED_MESSAGE,
    ProgressSink, ZIP_SAVED_MESSAGE,
};
pub use sink::{DownloadsSink, OutputSink, SavedFile, SinkError};

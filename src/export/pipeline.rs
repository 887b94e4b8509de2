//! Page export pipeline
//!
//! Turns a page selection into a persisted artifact: one JPEG when a single
//! page is selected, otherwise a ZIP with one JPEG per page. The artifact is
//! built completely before the sink sees it; any failure while building
//! means the sink is never called.

use log::{debug, error, info};

use super::artifact::{ArchiveBuilder, DEFAULT_JPEG_QUALITY, ExportArtifact, encode_jpeg};
use super::filename::{archive_name, page_image_name, sanitize_filename};
use super::sink::{OutputSink, SavedFile, SinkError};
use crate::pdf::{DocumentError, PagedDocument, RasterImage, RenderMode, render_page};
use crate::selection::SelectionSet;

pub const IMAGE_SAVED_MESSAGE: &str = "Image saved to Downloads";
pub const ZIP_SAVED_MESSAGE: &str = "ZIP saved to Downloads";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("ZIP archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Temporary file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Tunables for export renders
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportOptions {
    pub scale: f32,
    pub jpeg_quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: crate::pdf::DEFAULT_EXPORT_SCALE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Per-page progress of an archive export
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportProgress {
    pub current: usize,
    pub total: usize,
}

impl std::fmt::Display for ExportProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.current, self.total)
    }
}

/// Receives progress updates while the pipeline keeps working
pub trait ProgressSink {
    fn report(&self, progress: ExportProgress);
}

impl ProgressSink for () {
    fn report(&self, _progress: ExportProgress) {}
}

impl<T: From<ExportProgress>> ProgressSink for flume::Sender<T> {
    fn report(&self, progress: ExportProgress) {
        // A dropped receiver only means nobody is watching
        let _ = self.send(progress.into());
    }
}

/// Outcome of one export, as shown to the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportResult {
    Success { message: String, saved: SavedFile },
    Failure { message: String },
}

impl ExportResult {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Success { message, .. } | Self::Failure { message } => message,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

pub struct ExportPipeline<S, P = ()> {
    sink: S,
    options: ExportOptions,
    progress: P,
}

impl<S: OutputSink> ExportPipeline<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            options: ExportOptions::default(),
            progress: (),
        }
    }
}

impl<S: OutputSink, P: ProgressSink> ExportPipeline<S, P> {
    #[must_use]
    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_progress<Q: ProgressSink>(self, progress: Q) -> ExportPipeline<S, Q> {
        ExportPipeline {
            sink: self.sink,
            options: self.options,
            progress,
        }
    }

    #[must_use]
    pub fn options(&self) -> ExportOptions {
        self.options
    }

    /// Export `selection` from `doc`, naming outputs after `base_name`.
    ///
    /// Returns `None` for an empty selection: nothing is rendered and the
    /// sink is not called.
    pub fn export<D: PagedDocument>(
        &self,
        doc: &mut D,
        selection: &SelectionSet,
        base_name: &str,
    ) -> Option<ExportResult> {
        if selection.is_empty() {
            debug!("Export requested with empty selection, ignoring");
            return None;
        }

        let pages = selection.sorted();
        let result = match self.run(doc, &pages, base_name) {
            Ok((saved, message)) => ExportResult::Success {
                message: message.to_string(),
                saved,
            },
            Err(e) => {
                error!("Export of {} page(s) failed: {e}", pages.len());
                ExportResult::Failure {
                    message: e.to_string(),
                }
            }
        };
        Some(result)
    }

    fn run<D: PagedDocument>(
        &self,
        doc: &mut D,
        pages: &[usize],
        base_name: &str,
    ) -> Result<(SavedFile, &'static str), ExportError> {
        let artifact = self.build_artifact(doc, pages, base_name)?;
        let message = match artifact.kind() {
            super::ArtifactKind::Image => IMAGE_SAVED_MESSAGE,
            super::ArtifactKind::Archive => ZIP_SAVED_MESSAGE,
        };

        let display_name = artifact.file_name().to_string();
        let mime_type = artifact.mime_type();
        let saved = self.sink.persist(artifact, &display_name, mime_type)?;
        Ok((saved, message))
    }

    /// Render and package `pages` (ascending, non-empty) without persisting
    pub fn build_artifact<D: PagedDocument>(
        &self,
        doc: &mut D,
        pages: &[usize],
        base_name: &str,
    ) -> Result<ExportArtifact, ExportError> {
        let base_name = sanitize_filename(base_name);

        if let [page] = pages {
            info!("Exporting page {} as single image", page + 1);
            let image = self.render(doc, *page)?;
            let data = encode_jpeg(&image, self.options.jpeg_quality)?;
            return Ok(ExportArtifact::Image {
                file_name: page_image_name(&base_name, *page),
                data,
            });
        }

        info!("Exporting {} pages as archive", pages.len());
        let total = pages.len();
        let mut archive = ArchiveBuilder::new(archive_name(&base_name))?;

        for (idx, &page) in pages.iter().enumerate() {
            let image = self.render(doc, page)?;
            let data = encode_jpeg(&image, self.options.jpeg_quality)?;
            drop(image);
            archive.add_entry(&page_image_name(&base_name, page), &data)?;

            self.progress.report(ExportProgress {
                current: idx + 1,
                total,
            });
        }

        Ok(archive.finish()?)
    }

    fn render<D: PagedDocument>(&self, doc: &mut D, page: usize) -> Result<RasterImage, DocumentError> {
        let handle = doc.open_page(page)?;
        render_page(&handle, RenderMode::Full {
            scale: self.options.scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PageSize;
    use crate::test_utils::{RecordingSink, SyntheticDocument};

    fn doc(pages: usize) -> SyntheticDocument {
        SyntheticDocument::uniform(pages, PageSize::new(60.0, 80.0))
    }

    #[test]
    fn progress_display_format() {
        let progress = ExportProgress {
            current: 2,
            total: 5,
        };
        assert_eq!(progress.to_string(), "2/5");
    }

    #[test]
    fn empty_selection_is_a_no_op() {
        let sink = RecordingSink::default();
        let pipeline = ExportPipeline::new(&sink);
        let mut document = doc(3);

        assert!(pipeline.export(&mut document, &SelectionSet::new(), "Doc").is_none());
        assert_eq!(sink.call_count(), 0);
        assert!(document.opened_pages().is_empty());
    }

    #[test]
    fn single_page_produces_image() {
        let sink = RecordingSink::default();
        let pipeline = ExportPipeline::new(&sink);
        let selection: SelectionSet = [2].into_iter().collect();

        let result = pipeline.export(&mut doc(3), &selection, "Doc").unwrap();

        assert!(result.is_success());
        assert_eq!(result.message(), IMAGE_SAVED_MESSAGE);
        let calls = sink.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].display_name, "Doc-pag3.jpg");
        assert_eq!(calls[0].mime_type, "image/jpeg");
    }

    #[test]
    fn export_renders_at_export_scale() {
        let pipeline = ExportPipeline::new(RecordingSink::default());
        let mut document = doc(1);

        let artifact = pipeline.build_artifact(&mut document, &[0], "Doc").unwrap();
        let ExportArtifact::Image { data, .. } = artifact else {
            panic!("expected single image");
        };
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 160));
    }

    #[test]
    fn archive_reports_progress_after_each_page() {
        let (tx, rx) = flume::unbounded::<ExportProgress>();
        let sink = RecordingSink::default();
        let pipeline = ExportPipeline::new(&sink).with_progress(tx);
        let selection: SelectionSet = [0, 2, 4].into_iter().collect();

        let result = pipeline.export(&mut doc(5), &selection, "Doc").unwrap();
        assert_eq!(result.message(), ZIP_SAVED_MESSAGE);

        let reported: Vec<String> = rx.try_iter().map(|p| p.to_string()).collect();
        assert_eq!(reported, vec!["1/3", "2/3", "3/3"]);
    }

    #[test]
    fn render_failure_never_reaches_sink() {
        let sink = RecordingSink::default();
        let pipeline = ExportPipeline::new(&sink);
        let selection: SelectionSet = [0, 1, 2].into_iter().collect();
        let mut document = doc(3).failing_on(&[1]);

        let result = pipeline.export(&mut document, &selection, "Doc").unwrap();

        assert!(!result.is_success());
        assert!(result.message().contains("page 1"));
        assert_eq!(sink.call_count(), 0);
    }

    #[test]
    fn sink_failure_message_is_surfaced() {
        let sink = RecordingSink::failing("disk full");
        let pipeline = ExportPipeline::new(&sink);
        let selection: SelectionSet = [0].into_iter().collect();

        let result = pipeline.export(&mut doc(1), &selection, "Doc").unwrap();
        assert_eq!(
            result,
            ExportResult::Failure {
                message: "Cannot write Doc-pag1.jpg: disk full".to_string()
            }
        );
    }

    #[test]
    fn out_of_range_page_fails() {
        let sink = RecordingSink::default();
        let pipeline = ExportPipeline::new(&sink);
        let selection: SelectionSet = [7].into_iter().collect();

        let result = pipeline.export(&mut doc(2), &selection, "Doc").unwrap();
        assert!(result.message().contains("out of range"));
        assert_eq!(sink.call_count(), 0);
    }

    #[test]
    fn base_name_is_sanitized() {
        let sink = RecordingSink::default();
        let pipeline = ExportPipeline::new(&sink);
        let selection: SelectionSet = [0].into_iter().collect();

        pipeline.export(&mut doc(1), &selection, "a/b").unwrap();
        assert_eq!(sink.calls()[0].display_name, "a_b-pag1.jpg");
    }
}

//! In-memory stand-ins for the PDF engine and the downloads folder.
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration tests under `tests/`.

use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use image::{Rgb, RgbImage};

use crate::export::{ExportArtifact, OutputSink, SavedFile, SinkError};
use crate::pdf::{
    DocumentError, DocumentLoader, DocumentPage, PageSize, PagedDocument, PixelSize, check_index,
    white_canvas,
};

#[derive(Debug, Default)]
struct Journal {
    opened: Vec<usize>,
    open_now: usize,
    peak_open: usize,
    closes: usize,
}

/// A document with fixed page sizes and deterministic page content.
///
/// Clones share one journal, so a test can keep a clone and inspect what a
/// worker thread did with its copy.
#[derive(Clone, Debug)]
pub struct SyntheticDocument {
    sizes: Vec<PageSize>,
    failing: BTreeSet<usize>,
    closed: bool,
    journal: Arc<Mutex<Journal>>,
}

impl SyntheticDocument {
    pub fn with_sizes(sizes: Vec<PageSize>) -> Self {
        Self {
            sizes,
            failing: BTreeSet::new(),
            closed: false,
            journal: Arc::default(),
        }
    }

    pub fn uniform(page_count: usize, size: PageSize) -> Self {
        Self::with_sizes(vec![size; page_count])
    }

    /// Make rendering of the given pages fail
    #[must_use]
    pub fn failing_on(mut self, pages: &[usize]) -> Self {
        self.failing.extend(pages.iter().copied());
        self
    }

    /// Every page opened so far, in order
    pub fn opened_pages(&self) -> Vec<usize> {
        self.journal().opened.clone()
    }

    /// Largest number of simultaneously open pages observed
    pub fn peak_open_pages(&self) -> usize {
        self.journal().peak_open
    }

    /// How many instances sharing this journal have been closed
    pub fn close_count(&self) -> usize {
        self.journal().closes
    }

    fn journal(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PagedDocument for SyntheticDocument {
    type Page<'a> = SyntheticPage<'a>;

    fn page_count(&self) -> Result<usize, DocumentError> {
        if self.closed {
            return Err(DocumentError::Closed);
        }
        Ok(self.sizes.len())
    }

    fn open_page(&mut self, index: usize) -> Result<SyntheticPage<'_>, DocumentError> {
        if self.closed {
            return Err(DocumentError::Closed);
        }
        check_index(index, self.sizes.len())?;

        {
            let mut journal = self.journal();
            journal.opened.push(index);
            journal.open_now += 1;
            journal.peak_open = journal.peak_open.max(journal.open_now);
        }

        Ok(SyntheticPage {
            index,
            size: self.sizes[index],
            fail: self.failing.contains(&index),
            journal: self.journal.as_ref(),
        })
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.journal().closes += 1;
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

pub struct SyntheticPage<'a> {
    index: usize,
    size: PageSize,
    fail: bool,
    journal: &'a Mutex<Journal>,
}

impl DocumentPage for SyntheticPage<'_> {
    fn index(&self) -> usize {
        self.index
    }

    fn size(&self) -> Result<PageSize, DocumentError> {
        Ok(self.size)
    }

    fn rasterize(&self, target: PixelSize) -> Result<RgbImage, DocumentError> {
        if self.fail {
            return Err(DocumentError::render(self.index, "synthetic failure"));
        }

        // A coloured band whose height and colour depend on the page index
        let mut canvas = white_canvas(target);
        let band = (target.height * ((self.index as u32 % 8) + 1) / 10).max(1);
        let shade = Rgb([(self.index * 37 % 256) as u8, 40, 90]);
        for y in 0..band.min(target.height) {
            for x in 0..target.width {
                canvas.put_pixel(x, y, shade);
            }
        }
        Ok(canvas)
    }
}

impl Drop for SyntheticPage<'_> {
    fn drop(&mut self) {
        let mut journal = self.journal.lock().unwrap_or_else(PoisonError::into_inner);
        journal.open_now = journal.open_now.saturating_sub(1);
    }
}

/// Serves [`SyntheticDocument`]s by path; any other path fails to open
#[derive(Clone, Debug, Default)]
pub struct SyntheticLoader {
    documents: HashMap<PathBuf, SyntheticDocument>,
}

impl SyntheticLoader {
    #[must_use]
    pub fn with_document(mut self, path: impl Into<PathBuf>, doc: SyntheticDocument) -> Self {
        self.documents.insert(path.into(), doc);
        self
    }
}

impl DocumentLoader for SyntheticLoader {
    type Document = SyntheticDocument;

    fn open(&self, path: &Path) -> Result<SyntheticDocument, DocumentError> {
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| DocumentError::open(path, "not a PDF document"))
    }
}

/// One `persist` call seen by a [`RecordingSink`]
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub display_name: String,
    pub mime_type: String,
    pub entries: Vec<String>,
    pub bytes: Vec<u8>,
}

/// Sink that keeps artifacts in memory
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    failure: Option<String>,
}

impl RecordingSink {
    /// A sink whose every write fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            calls: Arc::default(),
            failure: Some(message.into()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl OutputSink for RecordingSink {
    fn persist(
        &self,
        mut artifact: ExportArtifact,
        display_name: &str,
        mime_type: &str,
    ) -> Result<SavedFile, SinkError> {
        let entries = artifact.entries().into_iter().map(str::to_string).collect();
        let bytes = artifact.to_bytes().map_err(|source| SinkError::Write {
            path: PathBuf::from(display_name),
            source,
        })?;
        let len = bytes.len() as u64;

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                display_name: display_name.to_string(),
                mime_type: mime_type.to_string(),
                entries,
                bytes,
            });

        if let Some(message) = &self.failure {
            return Err(SinkError::Write {
                path: PathBuf::from(display_name),
                source: io::Error::other(message.clone()),
            });
        }

        Ok(SavedFile {
            path: PathBuf::from(display_name),
            mime_type: mime_type.to_string(),
            bytes: len,
        })
    }
}

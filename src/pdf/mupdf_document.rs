//! MuPDF backed document handle

use std::path::Path;

use image::RgbImage;
use log::debug;
use mupdf::{Colorspace, Document, Matrix, Page, Pixmap};

use super::document::{DocumentError, DocumentLoader, DocumentPage, PagedDocument, check_index};
use super::types::{PageSize, PixelSize, white_canvas};

/// A PDF opened through MuPDF
pub struct MupdfDocument {
    doc: Option<Document>,
    page_count: usize,
}

impl MupdfDocument {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        if !path.is_file() {
            return Err(DocumentError::open(path, "not a readable file"));
        }

        let doc = Document::open(path.to_string_lossy().as_ref())
            .map_err(|e| DocumentError::open(path, e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| DocumentError::open(path, e.to_string()))?;
        let page_count = usize::try_from(page_count)
            .map_err(|_| DocumentError::open(path, format!("invalid page count {page_count}")))?;

        debug!("Opened {} ({page_count} pages)", path.display());

        Ok(Self {
            doc: Some(doc),
            page_count,
        })
    }

    fn doc(&self) -> Result<&Document, DocumentError> {
        self.doc.as_ref().ok_or(DocumentError::Closed)
    }
}

impl PagedDocument for MupdfDocument {
    type Page<'a> = MupdfPage<'a>;

    fn page_count(&self) -> Result<usize, DocumentError> {
        self.doc()?;
        Ok(self.page_count)
    }

    fn open_page(&mut self, index: usize) -> Result<MupdfPage<'_>, DocumentError> {
        check_index(index, self.page_count)?;
        let doc = self.doc()?;
        let page = doc.load_page(index as i32)?;
        Ok(MupdfPage {
            page,
            index,
            _doc: std::marker::PhantomData,
        })
    }

    fn close(&mut self) {
        if self.doc.take().is_some() {
            debug!("Closed document");
        }
    }

    fn is_closed(&self) -> bool {
        self.doc.is_none()
    }
}

impl Drop for MupdfDocument {
    fn drop(&mut self) {
        self.close();
    }
}

/// An open MuPDF page, tied to the lifetime of its document borrow
pub struct MupdfPage<'a> {
    page: Page,
    index: usize,
    _doc: std::marker::PhantomData<&'a mut MupdfDocument>,
}

impl DocumentPage for MupdfPage<'_> {
    fn index(&self) -> usize {
        self.index
    }

    fn size(&self) -> Result<PageSize, DocumentError> {
        let bounds = self.page.bounds()?;
        Ok(PageSize::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
    }

    fn rasterize(&self, target: PixelSize) -> Result<RgbImage, DocumentError> {
        let size = self.size()?;
        if size.width <= 0.0 || size.height <= 0.0 {
            return Err(DocumentError::render(self.index, "page has empty bounds"));
        }

        let transform = Matrix::new_scale(
            target.width as f32 / size.width,
            target.height as f32 / size.height,
        );

        // Without alpha MuPDF clears the pixmap to white before drawing
        let rgb = Colorspace::device_rgb();
        let pixmap = self.page.to_pixmap(&transform, &rgb, false, false)?;
        let drawn = pixmap_to_rgb(&pixmap, self.index)?;

        if drawn.dimensions() == target.as_tuple() {
            return Ok(drawn);
        }

        // MuPDF rounds the device box outward, so the pixmap can be a pixel
        // off; paste onto an exact white canvas.
        let mut canvas = white_canvas(target);
        image::imageops::replace(&mut canvas, &drawn, 0, 0);
        Ok(canvas)
    }
}

/// Opens PDFs from disk with MuPDF
#[derive(Clone, Copy, Debug, Default)]
pub struct MupdfLoader;

impl DocumentLoader for MupdfLoader {
    type Document = MupdfDocument;

    fn open(&self, path: &Path) -> Result<MupdfDocument, DocumentError> {
        MupdfDocument::open(path)
    }
}

fn pixmap_to_rgb(pixmap: &Pixmap, page: usize) -> Result<RgbImage, DocumentError> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(DocumentError::render(
            page,
            format!("Unsupported pixmap format: {n} channels"),
        ));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err(DocumentError::render(page, "Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    RgbImage::from_raw(width as u32, height as u32, out)
        .ok_or_else(|| DocumentError::render(page, "Pixmap dimensions do not match buffer"))
}

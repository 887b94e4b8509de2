//! Thumbnail pass over a whole document

use std::collections::BTreeMap;

use log::{debug, warn};

use super::document::{DocumentError, PagedDocument};
use super::raster::{RenderMode, render_page};
use super::types::RasterImage;

/// Thumbnails for every page of one document.
///
/// Built in a single pass and installed as a whole; never merged with the
/// thumbnails of a previous document.
#[derive(Clone, Debug, Default)]
pub struct ThumbnailSet {
    images: BTreeMap<usize, RasterImage>,
    failed: Vec<(usize, String)>,
}

impl ThumbnailSet {
    #[must_use]
    pub fn get(&self, page: usize) -> Option<&RasterImage> {
        self.images.get(&page)
    }

    /// Thumbnails in ascending page order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &RasterImage)> {
        self.images.iter().map(|(page, image)| (*page, image))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Pages whose thumbnail could not be rendered, with the reason
    #[must_use]
    pub fn failed(&self) -> &[(usize, String)] {
        &self.failed
    }
}

/// Render a thumbnail for every page, in ascending order.
///
/// A page that fails to render is skipped and recorded in
/// [`ThumbnailSet::failed`]. Errors that are not specific to one page (the
/// document was closed, an index went out of range) abort the pass.
pub fn build_all<D: PagedDocument>(
    doc: &mut D,
    mode: RenderMode,
) -> Result<ThumbnailSet, DocumentError> {
    let page_count = doc.page_count()?;
    let mut set = ThumbnailSet::default();

    for index in 0..page_count {
        // One page open at a time: the handle is dropped at the end of the block
        let rendered = {
            let page = doc.open_page(index)?;
            render_page(&page, mode)
        };

        match rendered {
            Ok(image) => {
                set.images.insert(index, image);
            }
            Err(e) if e.is_page_local() => {
                warn!("Thumbnail for page {index} failed: {e}");
                set.failed.push((index, e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }

    debug!(
        "Built {} thumbnails ({} failed)",
        set.images.len(),
        set.failed.len()
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PageSize;
    use crate::test_utils::SyntheticDocument;

    #[test]
    fn renders_every_page_in_order() {
        let mut doc = SyntheticDocument::uniform(4, PageSize::new(600.0, 900.0));
        let set = build_all(&mut doc, RenderMode::thumbnail()).unwrap();

        assert_eq!(set.len(), 4);
        assert!(set.failed().is_empty());
        let pages: Vec<usize> = set.iter().map(|(p, _)| p).collect();
        assert_eq!(pages, vec![0, 1, 2, 3]);
        assert_eq!(doc.opened_pages(), vec![0, 1, 2, 3]);
        assert_eq!(set.get(2).unwrap().size().as_tuple(), (200, 300));
    }

    #[test]
    fn skips_pages_that_fail() {
        let mut doc =
            SyntheticDocument::uniform(3, PageSize::new(300.0, 300.0)).failing_on(&[1]);
        let set = build_all(&mut doc, RenderMode::thumbnail()).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.get(1).is_none());
        assert_eq!(set.failed().len(), 1);
        assert_eq!(set.failed()[0].0, 1);
    }

    #[test]
    fn closed_document_aborts() {
        let mut doc = SyntheticDocument::uniform(2, PageSize::new(300.0, 300.0));
        crate::pdf::PagedDocument::close(&mut doc);
        assert!(matches!(
            build_all(&mut doc, RenderMode::thumbnail()),
            Err(DocumentError::Closed)
        ));
    }

    #[test]
    fn empty_document_yields_empty_set() {
        let mut doc = SyntheticDocument::uniform(0, PageSize::new(300.0, 300.0));
        let set = build_all(&mut doc, RenderMode::thumbnail()).unwrap();
        assert!(set.is_empty());
    }
}

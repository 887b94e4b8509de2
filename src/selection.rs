//! Page selection

use std::collections::BTreeSet;

/// The set of pages chosen for export.
///
/// Stored ordered so consumers always see ascending page indices, whatever
/// order the pages were picked in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionSet {
    pages: BTreeSet<usize>,
}

impl SelectionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the selection state of `page`. Returns true if the page is
    /// selected afterwards.
    pub fn toggle(&mut self, page: usize) -> bool {
        if self.pages.remove(&page) {
            false
        } else {
            self.pages.insert(page);
            true
        }
    }

    pub fn select(&mut self, page: usize) {
        self.pages.insert(page);
    }

    pub fn deselect(&mut self, page: usize) {
        self.pages.remove(&page);
    }

    /// Select every page of a `page_count` page document
    pub fn select_all(&mut self, page_count: usize) {
        self.pages = (0..page_count).collect();
    }

    pub fn select_none(&mut self) {
        self.pages.clear();
    }

    /// Select everything, or nothing if everything is already selected
    pub fn toggle_all(&mut self, page_count: usize) {
        if self.is_all_selected(page_count) {
            self.select_none();
        } else {
            self.select_all(page_count);
        }
    }

    #[must_use]
    pub fn is_all_selected(&self, page_count: usize) -> bool {
        self.pages.len() == page_count
    }

    #[must_use]
    pub fn contains(&self, page: usize) -> bool {
        self.pages.contains(&page)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Selected pages in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.pages.iter().copied()
    }

    #[must_use]
    pub fn sorted(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

impl FromIterator<usize> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

impl Extend<usize> for SelectionSet {
    fn extend<I: IntoIterator<Item = usize>>(&mut self, iter: I) {
        self.pages.extend(iter);
    }
}

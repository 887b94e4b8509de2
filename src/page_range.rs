//! Parsing of 1-based page lists such as `1,3-5`

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageRangeError {
    #[error("Empty page list")]
    Empty,

    #[error("Invalid page number '{0}'")]
    Invalid(String),

    #[error("Page numbers start at 1")]
    Zero,

    #[error("Range {start}-{end} is reversed")]
    Reversed { start: usize, end: usize },

    #[error("Page {page} is beyond the last page ({page_count})")]
    BeyondEnd { page: usize, page_count: usize },

    #[error("Document has no pages")]
    NoPages,

    #[error("Nothing selected: pass --pages or --all")]
    NothingSelected,
}

/// Resolve the export selection from an optional page list and an "every
/// page" flag. Never returns an empty selection.
pub fn select_pages(
    pages: Option<&str>,
    all: bool,
    page_count: usize,
) -> Result<Vec<usize>, PageRangeError> {
    match (pages, all) {
        (_, true) => parse_page_list("all", page_count),
        (Some(spec), false) => parse_page_list(spec, page_count),
        (None, false) => Err(PageRangeError::NothingSelected),
    }
}

/// Parse `spec` into ascending 0-based page indices.
///
/// Accepts comma separated page numbers and inclusive ranges, or `all`.
/// Whitespace around items is ignored and duplicates collapse.
pub fn parse_page_list(spec: &str, page_count: usize) -> Result<Vec<usize>, PageRangeError> {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("all") {
        if page_count == 0 {
            return Err(PageRangeError::NoPages);
        }
        return Ok((0..page_count).collect());
    }

    let mut pages = BTreeSet::new();
    for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once('-') {
            Some((start, end)) => {
                let start = parse_page(start, page_count)?;
                let end = parse_page(end, page_count)?;
                if start > end {
                    return Err(PageRangeError::Reversed { start, end });
                }
                pages.extend(start - 1..end);
            }
            None => {
                pages.insert(parse_page(item, page_count)? - 1);
            }
        }
    }

    if pages.is_empty() {
        return Err(PageRangeError::Empty);
    }
    Ok(pages.into_iter().collect())
}

fn parse_page(text: &str, page_count: usize) -> Result<usize, PageRangeError> {
    let text = text.trim();
    let page: usize = text
        .parse()
        .map_err(|_| PageRangeError::Invalid(text.to_string()))?;
    if page == 0 {
        return Err(PageRangeError::Zero);
    }
    if page > page_count {
        return Err(PageRangeError::BeyondEnd { page, page_count });
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pages_and_ranges() {
        assert_eq!(parse_page_list("1,3-5", 5).unwrap(), vec![0, 2, 3, 4]);
    }

    #[test]
    fn output_is_sorted_and_deduplicated() {
        assert_eq!(parse_page_list(" 4, 2 ,2-3 ", 5).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn all_selects_every_page() {
        assert_eq!(parse_page_list("ALL", 3).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn every_page_of_an_empty_document_is_an_error() {
        assert_eq!(select_pages(None, true, 0), Err(PageRangeError::NoPages));
        assert_eq!(parse_page_list("all", 0), Err(PageRangeError::NoPages));
        assert_eq!(
            select_pages(Some("1"), false, 0),
            Err(PageRangeError::BeyondEnd {
                page: 1,
                page_count: 0
            })
        );
    }

    #[test]
    fn selection_needs_pages_or_all() {
        assert_eq!(
            select_pages(None, false, 4),
            Err(PageRangeError::NothingSelected)
        );
        assert_eq!(select_pages(None, true, 3).unwrap(), vec![0, 1, 2]);
        assert_eq!(select_pages(Some("2-3"), false, 3).unwrap(), vec![1, 2]);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse_page_list("", 3), Err(PageRangeError::Empty));
        assert_eq!(parse_page_list("0", 3), Err(PageRangeError::Zero));
        assert_eq!(
            parse_page_list("4", 3),
            Err(PageRangeError::BeyondEnd {
                page: 4,
                page_count: 3
            })
        );
        assert_eq!(
            parse_page_list("3-1", 3),
            Err(PageRangeError::Reversed { start: 3, end: 1 })
        );
        assert_eq!(
            parse_page_list("x", 3),
            Err(PageRangeError::Invalid("x".into()))
        );
    }
}

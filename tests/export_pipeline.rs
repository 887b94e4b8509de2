use std::io::{Cursor, Read};

use pdf_pages::export::{ExportPipeline, IMAGE_SAVED_MESSAGE, JPEG_MIME, ZIP_MIME, ZIP_SAVED_MESSAGE};
use pdf_pages::pdf::{PageSize, PagedDocument, RenderMode, build_all};
use pdf_pages::selection::SelectionSet;
use pdf_pages::test_utils::{RecordingSink, SyntheticDocument};

fn five_pages() -> SyntheticDocument {
    SyntheticDocument::uniform(5, PageSize::new(100.0, 150.0))
}

fn select(pages: &[usize]) -> SelectionSet {
    pages.iter().copied().collect()
}

fn read_zip(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (entry.name().to_string(), data)
        })
        .collect()
}

/// A single selected page is saved as one JPEG named after the base name
#[test]
fn test_single_page_export_writes_one_jpeg() {
    let sink = RecordingSink::default();
    let pipeline = ExportPipeline::new(&sink);

    let result = pipeline
        .export(&mut five_pages(), &select(&[0]), "Doc")
        .expect("non-empty selection produces a result");

    assert!(result.is_success());
    assert_eq!(result.message(), IMAGE_SAVED_MESSAGE);

    let calls = sink.calls();
    assert_eq!(calls.len(), 1, "sink should be called exactly once");
    assert_eq!(calls[0].display_name, "Doc-pag1.jpg");
    assert_eq!(calls[0].mime_type, JPEG_MIME);

    let decoded = image::load_from_memory(&calls[0].bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (200, 300));
}

/// Multiple pages become a ZIP whose entries follow ascending page order,
/// regardless of the order they were picked in
#[test]
fn test_multi_page_export_writes_ordered_zip() {
    let sink = RecordingSink::default();
    let pipeline = ExportPipeline::new(&sink);
    let mut selection = SelectionSet::new();
    selection.toggle(3);
    selection.toggle(1);

    let result = pipeline.export(&mut five_pages(), &selection, "Doc").unwrap();
    assert_eq!(result.message(), ZIP_SAVED_MESSAGE);

    let calls = sink.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].display_name, "Doc-Imagens.zip");
    assert_eq!(calls[0].mime_type, ZIP_MIME);
    assert_eq!(calls[0].entries, vec!["Doc-pag2.jpg", "Doc-pag4.jpg"]);

    let entries = read_zip(&calls[0].bytes);
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["Doc-pag2.jpg", "Doc-pag4.jpg"]);
    for (name, data) in &entries {
        let decoded = image::load_from_memory(data)
            .unwrap_or_else(|e| panic!("{name} is not a valid JPEG: {e}"));
        assert_eq!((decoded.width(), decoded.height()), (200, 300));
    }
}

/// Exporting the same selection twice yields identical artifacts
#[test]
fn test_export_is_deterministic() {
    let sink = RecordingSink::default();
    let pipeline = ExportPipeline::new(&sink);
    let selection = select(&[0, 2, 4]);
    let mut doc = five_pages();

    pipeline.export(&mut doc, &selection, "Doc").unwrap();
    pipeline.export(&mut doc, &selection, "Doc").unwrap();

    let calls = sink.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].entries, calls[1].entries);
    assert_eq!(calls[0].bytes, calls[1].bytes, "archives should be byte-identical");
}

/// An empty selection does nothing at all
#[test]
fn test_empty_selection_never_calls_sink() {
    let sink = RecordingSink::default();
    let pipeline = ExportPipeline::new(&sink);
    let mut doc = five_pages();

    assert!(pipeline.export(&mut doc, &SelectionSet::new(), "Doc").is_none());
    assert_eq!(sink.call_count(), 0);
    assert!(doc.opened_pages().is_empty(), "no page should be rendered");
}

/// Every page the document reports can be rendered, one handle at a time
#[test]
fn test_page_count_matches_renderable_pages() {
    let sink = RecordingSink::default();
    let pipeline = ExportPipeline::new(&sink);
    let mut doc = five_pages();
    let page_count = doc.page_count().unwrap();

    let mut all = SelectionSet::new();
    all.select_all(page_count);
    let result = pipeline.export(&mut doc, &all, "Doc").unwrap();

    assert!(result.is_success(), "{}", result.message());
    assert_eq!(sink.calls()[0].entries.len(), page_count);
    assert_eq!(doc.opened_pages(), vec![0, 1, 2, 3, 4]);
    assert_eq!(doc.peak_open_pages(), 1, "pages must be released one by one");
}

/// Thumbnails are never larger than the export render of the same page
#[test]
fn test_thumbnails_not_larger_than_exports() {
    let sizes = vec![
        PageSize::new(595.0, 842.0),
        PageSize::new(842.0, 595.0),
        PageSize::new(400.0, 400.0),
    ];
    let mut doc = SyntheticDocument::with_sizes(sizes.clone());

    let thumbnails = build_all(&mut doc, RenderMode::thumbnail()).unwrap();
    assert_eq!(thumbnails.len(), sizes.len());

    for (page, thumb) in thumbnails.iter() {
        let export_width = (sizes[page].width * 2.0).round() as u32;
        let export_height = (sizes[page].height * 2.0).round() as u32;
        assert!(thumb.width() <= export_width, "page {page} thumbnail too wide");
        assert!(thumb.height() <= export_height, "page {page} thumbnail too tall");
    }
}

/// Selecting everything and then nothing restores the starting selection
#[test]
fn test_select_all_then_none_round_trip() {
    let mut selection = SelectionSet::new();
    let before = selection.clone();

    selection.select_all(5);
    assert_eq!(selection.sorted(), vec![0, 1, 2, 3, 4]);
    selection.select_none();

    assert_eq!(selection, before);
}

/// A failing page aborts the whole export and the sink never sees it
#[test]
fn test_render_failure_aborts_export() {
    let sink = RecordingSink::default();
    let pipeline = ExportPipeline::new(&sink);
    let mut doc = five_pages().failing_on(&[2]);

    let result = pipeline.export(&mut doc, &select(&[1, 2, 3]), "Doc").unwrap();

    assert!(!result.is_success());
    assert_eq!(sink.call_count(), 0);
    assert_eq!(doc.opened_pages(), vec![1, 2], "export stops at the failing page");
}

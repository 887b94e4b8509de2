//! Export worker - runs in a separate thread
//!
//! The worker owns the open document. Requests are handled one at a time,
//! so rendering never runs concurrently on the same document.

use std::path::Path;

use flume::{Receiver, Sender};
use log::{debug, error, info};

use super::request::{WorkerRequest, WorkerResponse};
use crate::export::{ExportPipeline, OutputSink};
use crate::pdf::{DocumentLoader, PagedDocument, RenderMode, build_all, render_page};
use crate::selection::SelectionSet;

/// Fixed parameters of one worker
#[derive(Clone, Copy, Debug)]
pub struct WorkerConfig {
    pub thumbnail_mode: RenderMode,
    pub preview_mode: RenderMode,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thumbnail_mode: RenderMode::thumbnail(),
            preview_mode: RenderMode::export(),
        }
    }
}

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn export_worker<L, S>(
    loader: L,
    pipeline: ExportPipeline<S, Sender<WorkerResponse>>,
    config: WorkerConfig,
    requests: Receiver<WorkerRequest>,
    responses: Sender<WorkerResponse>,
) where
    L: DocumentLoader,
    S: OutputSink,
{
    let mut current: Option<L::Document> = None;

    for request in requests {
        match request {
            WorkerRequest::Open { path } => {
                release(&mut current);
                current = handle_open(&loader, &path, config.thumbnail_mode, &responses);
            }

            WorkerRequest::Close => {
                release(&mut current);
                let _ = responses.send(WorkerResponse::Closed);
            }

            WorkerRequest::Preview { page } => {
                let response = match current.as_mut() {
                    Some(doc) => match doc
                        .open_page(page)
                        .and_then(|handle| render_page(&handle, config.preview_mode))
                    {
                        Ok(image) => WorkerResponse::Preview { page, image },
                        Err(e) => WorkerResponse::PreviewFailed {
                            page,
                            message: e.to_string(),
                        },
                    },
                    None => WorkerResponse::PreviewFailed {
                        page,
                        message: NO_DOCUMENT.to_string(),
                    },
                };
                let _ = responses.send(response);
            }

            WorkerRequest::Export { pages, base_name } => {
                let result = match current.as_mut() {
                    Some(doc) => {
                        let selection: SelectionSet = pages.into_iter().collect();
                        pipeline.export(doc, &selection, &base_name)
                    }
                    None => Some(crate::export::ExportResult::Failure {
                        message: NO_DOCUMENT.to_string(),
                    }),
                };
                let _ = responses.send(WorkerResponse::Exported(result));
            }

            WorkerRequest::Shutdown => break,
        }
    }

    release(&mut current);
    debug!("Export worker stopped");
}

const NO_DOCUMENT: &str = "No document loaded";

fn release<D: PagedDocument>(current: &mut Option<D>) {
    if let Some(mut doc) = current.take() {
        if !doc.is_closed() {
            doc.close();
            debug!("Released previous document");
        }
    }
}

fn handle_open<L: DocumentLoader>(
    loader: &L,
    path: &Path,
    thumbnail_mode: RenderMode,
    responses: &Sender<WorkerResponse>,
) -> Option<L::Document> {
    let mut doc = match loader.open(path) {
        Ok(doc) => doc,
        Err(e) => {
            error!("Failed to open {}: {e}", path.display());
            let _ = responses.send(WorkerResponse::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
            return None;
        }
    };

    let page_count = match doc.page_count() {
        Ok(count) => count,
        Err(e) => {
            let _ = responses.send(WorkerResponse::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
            doc.close();
            return None;
        }
    };

    info!("Loaded {} ({page_count} pages)", path.display());
    let _ = responses.send(WorkerResponse::Loaded {
        path: path.to_path_buf(),
        page_count,
    });

    let response = match build_all(&mut doc, thumbnail_mode) {
        Ok(thumbnails) => WorkerResponse::Thumbnails {
            path: path.to_path_buf(),
            thumbnails,
        },
        Err(e) => {
            error!("Thumbnail pass for {} failed: {e}", path.display());
            WorkerResponse::ThumbnailsFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        }
    };
    let _ = responses.send(response);

    Some(doc)
}

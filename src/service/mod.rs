//! Export service - owns the worker thread and the session state
//!
//! Front ends talk to [`ExportService`] with session [`Command`]s. Effects that
//! need the document become [`WorkerRequest`]s; worker responses are fed back
//! into the session as commands again.

mod request;
mod worker;

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{error, info, warn};

pub use request::{WorkerRequest, WorkerResponse};
pub use worker::{WorkerConfig, export_worker};

use crate::export::{ExportOptions, ExportPipeline, OutputSink};
use crate::pdf::DocumentLoader;
use crate::session::{Command, Effect, Feedback, FeedbackLevel, Session};

pub struct ExportService {
    session: Session,
    request_tx: Sender<WorkerRequest>,
    response_rx: Receiver<WorkerResponse>,
    feedback: Vec<Feedback>,
    worker: Option<JoinHandle<()>>,
}

impl ExportService {
    /// Start a worker thread that opens documents with `loader` and hands
    /// finished exports to `sink`
    pub fn spawn<L, S>(loader: L, sink: S, options: ExportOptions, config: WorkerConfig) -> Self
    where
        L: DocumentLoader,
        S: OutputSink + Send + 'static,
    {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let worker = std::thread::Builder::new()
            .name("export-worker".to_string())
            .spawn(move || {
                let pipeline = ExportPipeline::new(sink)
                    .with_options(options)
                    .with_progress(response_tx.clone());
                export_worker(loader, pipeline, config, request_rx, response_tx);
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                // Requests will fail to send; the session reports it
                error!("Failed to spawn export worker: {e}");
                None
            }
        };

        Self {
            session: Session::new(),
            request_tx,
            response_rx,
            feedback: Vec::new(),
            worker,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Apply a command to the session and dispatch its effects
    pub fn apply_command(&mut self, cmd: Command) {
        let effects = self.session.apply(cmd);
        self.execute_effects(effects);
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            let request = match effect {
                Effect::LoadDocument(path) => WorkerRequest::Open { path },
                Effect::ReleaseDocument => WorkerRequest::Close,
                Effect::StartExport { pages, base_name } => {
                    WorkerRequest::Export { pages, base_name }
                }
                Effect::RenderPreview(page) => WorkerRequest::Preview { page },
                Effect::Notify(feedback) => {
                    match feedback.level {
                        FeedbackLevel::Info => info!("{}", feedback.message),
                        FeedbackLevel::Warning => warn!("{}", feedback.message),
                        FeedbackLevel::Error => error!("{}", feedback.message),
                    }
                    self.feedback.push(feedback);
                    continue;
                }
            };

            if self.request_tx.send(request).is_err() {
                error!("Export worker is gone, request dropped");
                self.feedback
                    .push(Feedback::error("Background worker stopped"));
            }
        }
    }

    /// Drain finished worker responses into the session without blocking
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(response) = self.response_rx.try_recv() {
            self.handle_response(response);
            handled += 1;
        }
        handled
    }

    /// Block until the session has no background work left.
    ///
    /// Returns `false` if `timeout` elapsed first or the worker died.
    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.session.is_idle() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) => self.handle_response(response),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => {
                    error!("Export worker disconnected");
                    return false;
                }
            }
        }
        true
    }

    fn handle_response(&mut self, response: WorkerResponse) {
        if let Some(cmd) = response.into_command() {
            self.apply_command(cmd);
        }
    }

    /// False once the worker thread has exited
    #[must_use]
    pub fn is_worker_alive(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Messages produced since the last call
    pub fn take_feedback(&mut self) -> Vec<Feedback> {
        std::mem::take(&mut self.feedback)
    }

    /// Stop the worker and wait for it to release the document
    pub fn shutdown(&mut self) {
        let _ = self.request_tx.send(WorkerRequest::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Export worker panicked");
            }
        }
    }
}

impl Drop for ExportService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::pdf::{FALLBACK_DISPLAY_NAME, PageSize};
    use crate::test_utils::{RecordingSink, SyntheticDocument, SyntheticLoader};

    const WAIT: Duration = Duration::from_secs(10);

    fn service_with(doc: SyntheticDocument, sink: RecordingSink) -> ExportService {
        let loader = SyntheticLoader::default().with_document("/docs/Doc.pdf", doc);
        ExportService::spawn(loader, sink, ExportOptions::default(), WorkerConfig::default())
    }

    #[test]
    fn open_loads_page_count_and_thumbnails() {
        let doc = SyntheticDocument::uniform(4, PageSize::new(90.0, 120.0));
        let mut service = service_with(doc, RecordingSink::default());

        service.apply_command(Command::OpenDocument(PathBuf::from("/docs/Doc.pdf")));
        assert!(service.wait_until_idle(WAIT));

        let session = service.session();
        assert_eq!(session.page_count(), 4);
        assert_eq!(session.thumbnails.len(), 4);
        assert_eq!(session.display_name, "Doc");
    }

    #[test]
    fn unknown_file_reports_error() {
        let doc = SyntheticDocument::uniform(1, PageSize::new(90.0, 120.0));
        let mut service = service_with(doc, RecordingSink::default());

        service.apply_command(Command::OpenDocument(PathBuf::from("/docs/notes.txt")));
        assert!(service.wait_until_idle(WAIT));

        assert!(service.session().document.is_none());
        assert_eq!(service.session().display_name, FALLBACK_DISPLAY_NAME);
        let feedback = service.take_feedback();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].level, FeedbackLevel::Error);
    }

    #[test]
    fn export_goes_through_sink() {
        let doc = SyntheticDocument::uniform(3, PageSize::new(90.0, 120.0));
        let sink = RecordingSink::default();
        let mut service = service_with(doc, sink.clone());

        service.apply_command(Command::OpenDocument(PathBuf::from("/docs/Doc.pdf")));
        assert!(service.wait_until_idle(WAIT));
        service.apply_command(Command::SelectAll);
        service.apply_command(Command::Export { base_name: None });
        assert!(service.wait_until_idle(WAIT));

        let calls = sink.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].display_name, "Doc-Imagens.zip");
        assert_eq!(
            service.take_feedback(),
            vec![Feedback::info(crate::export::ZIP_SAVED_MESSAGE)]
        );
    }

    #[test]
    fn preview_renders_requested_page() {
        let doc = SyntheticDocument::uniform(2, PageSize::new(90.0, 120.0));
        let mut service = service_with(doc, RecordingSink::default());

        service.apply_command(Command::OpenDocument(PathBuf::from("/docs/Doc.pdf")));
        assert!(service.wait_until_idle(WAIT));
        service.apply_command(Command::ShowPreview(1));
        assert!(service.wait_until_idle(WAIT));

        let preview = service.session().preview.clone().unwrap();
        let image = preview.image.unwrap();
        assert_eq!(image.page, 1);
        assert_eq!(image.size().as_tuple(), (180, 240));
    }

    #[test]
    fn drop_closes_document() {
        let doc = SyntheticDocument::uniform(2, PageSize::new(90.0, 120.0));
        let view = doc.clone();
        let mut service = service_with(doc, RecordingSink::default());

        service.apply_command(Command::OpenDocument(PathBuf::from("/docs/Doc.pdf")));
        assert!(service.wait_until_idle(WAIT));
        drop(service);

        assert_eq!(view.close_count(), 1);
    }
}

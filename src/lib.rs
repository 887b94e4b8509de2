// Export modules for use in tests and the binary
pub mod export;
pub mod page_range;
pub mod panic_handler;
pub mod pdf;
pub mod selection;
pub mod service;
pub mod session;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export the main entry points
pub use export::{DownloadsSink, ExportOptions, ExportPipeline, ExportResult, OutputSink};
pub use selection::SelectionSet;
pub use service::ExportService;
pub use session::{Command, Feedback, Session};
pub use settings::Settings;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{error, info};
use simplelog::{Config, LevelFilter, WriteLogger};

use pdf_pages::export::{ExportArtifact, encode_jpeg, thumbnail_name};
use pdf_pages::page_range::select_pages;
use pdf_pages::panic_handler::initialize_panic_handler;
use pdf_pages::pdf::{MupdfDocument, PagedDocument, display_name};
use pdf_pages::session::FeedbackLevel;
use pdf_pages::{Command, DownloadsSink, ExportService, OutputSink, Settings};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(name = "pdf-pages")]
#[command(about = "Pick pages from a PDF and export them as JPEG images")]
#[command(version)]
struct Args {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log file (defaults to the user cache directory)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Show display name and page count
    Info { pdf: PathBuf },

    /// Export pages as a JPEG (one page) or a ZIP of JPEGs (several)
    Export {
        pdf: PathBuf,

        /// 1-based pages, e.g. "1,3-5"
        #[arg(long, conflicts_with = "all")]
        pages: Option<String>,

        /// Export every page
        #[arg(long)]
        all: bool,

        /// Destination folder (defaults to Downloads)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Base name for output files (defaults to the PDF's name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Write a thumbnail JPEG for every page
    Thumbnails {
        pdf: PathBuf,

        #[arg(long)]
        output_dir: PathBuf,
    },

    /// Render one page at export resolution
    Preview {
        pdf: PathBuf,

        /// 1-based page number
        #[arg(long)]
        page: usize,

        /// Image file to write; format follows the extension
        #[arg(long)]
        output: PathBuf,
    },

    /// Show the settings file location, or write one with default values
    Config {
        /// Write default settings to the settings file
        #[arg(long)]
        init: bool,

        /// Replace an existing settings file when used with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref(), &args.log_level)?;
    initialize_panic_handler();

    info!("Starting pdf-pages");
    let settings = Settings::load(args.config.as_deref());

    let res = match args.command {
        Cmd::Info { pdf } => run_info(&pdf),
        Cmd::Export {
            pdf,
            pages,
            all,
            output_dir,
            name,
        } => run_export(&settings, &pdf, pages.as_deref(), all, output_dir, name),
        Cmd::Thumbnails { pdf, output_dir } => run_thumbnails(&settings, &pdf, &output_dir),
        Cmd::Preview { pdf, page, output } => run_preview(&settings, &pdf, page, &output),
        Cmd::Config { init, force } => run_config(&settings, args.config, init, force),
    };

    if let Err(err) = &res {
        error!("Application error: {err:?}");
    }
    info!("Shutting down pdf-pages");
    res
}

fn init_logging(log_file: Option<&Path>, level: &str) -> Result<()> {
    let level = LevelFilter::from_str(level)
        .with_context(|| format!("Unknown log level '{level}'"))?;

    let path = match log_file {
        Some(path) => path.to_path_buf(),
        None => {
            let dir = dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("pdf-pages");
            fs::create_dir_all(&dir)
                .with_context(|| format!("Cannot create log directory {}", dir.display()))?;
            dir.join("pdf-pages.log")
        }
    };

    WriteLogger::init(
        level,
        Config::default(),
        File::create(&path).with_context(|| format!("Cannot create {}", path.display()))?,
    )?;
    Ok(())
}

fn run_info(pdf: &Path) -> Result<()> {
    let doc = MupdfDocument::open(pdf)?;
    println!("Name:  {}", display_name(pdf));
    println!("Pages: {}", doc.page_count()?);
    Ok(())
}

fn spawn_service(settings: &Settings, sink: DownloadsSink) -> ExportService {
    ExportService::spawn(
        pdf_pages::pdf::MupdfLoader,
        sink,
        settings.export_options(),
        settings.worker_config(),
    )
}

fn open_document(service: &mut ExportService, pdf: &Path) -> Result<()> {
    service.apply_command(Command::OpenDocument(pdf.to_path_buf()));
    wait(service)?;
    if service.session().document.is_none() {
        bail!("Could not open {}", pdf.display());
    }
    Ok(())
}

/// Drive the service until idle, echoing busy messages and feedback.
///
/// Returns true if any error was reported on the way.
fn wait(service: &mut ExportService) -> Result<bool> {
    let mut last_busy: Option<String> = None;
    let mut had_error = false;
    loop {
        let idle = service.wait_until_idle(POLL_INTERVAL);
        had_error |= print_feedback(service);
        if idle {
            return Ok(had_error);
        }
        if !service.is_worker_alive() {
            bail!("Background worker stopped unexpectedly");
        }
        let busy = service.session().busy().map(str::to_string);
        if busy.is_some() && busy != last_busy {
            if let Some(message) = &busy {
                eprintln!("{message}");
            }
            last_busy = busy;
        }
    }
}

fn print_feedback(service: &mut ExportService) -> bool {
    let mut had_error = false;
    for feedback in service.take_feedback() {
        match feedback.level {
            FeedbackLevel::Info => println!("{}", feedback.message),
            FeedbackLevel::Warning => eprintln!("warning: {}", feedback.message),
            FeedbackLevel::Error => {
                eprintln!("error: {}", feedback.message);
                had_error = true;
            }
        }
    }
    had_error
}

fn run_export(
    settings: &Settings,
    pdf: &Path,
    pages: Option<&str>,
    all: bool,
    output_dir: Option<PathBuf>,
    name: Option<String>,
) -> Result<()> {
    let sink = match output_dir.or_else(|| settings.output_dir.clone()) {
        Some(dir) => DownloadsSink::new(dir),
        None => DownloadsSink::user_downloads()?,
    };
    info!("Exporting to {}", sink.dir().display());

    let mut service = spawn_service(settings, sink);
    open_document(&mut service, pdf)?;

    let page_count = service.session().page_count();
    let selected = select_pages(pages, all, page_count)?;

    service.apply_command(Command::SelectPages(selected));
    service.apply_command(Command::Export { base_name: name });
    if wait(&mut service)? {
        bail!("Export failed");
    }
    Ok(())
}

fn run_thumbnails(settings: &Settings, pdf: &Path, output_dir: &Path) -> Result<()> {
    let mut service = spawn_service(settings, DownloadsSink::new(output_dir));
    open_document(&mut service, pdf)?;

    let session = service.session();
    let sink = DownloadsSink::new(output_dir);
    for (page, image) in session.thumbnails.iter() {
        let artifact = ExportArtifact::Image {
            file_name: thumbnail_name(&session.display_name, page),
            data: encode_jpeg(image, settings.jpeg_quality)?,
        };
        let display = artifact.file_name().to_string();
        let mime = artifact.mime_type();
        let saved = sink.persist(artifact, &display, mime)?;
        println!("{}", saved.path.display());
    }
    Ok(())
}

fn run_config(settings: &Settings, path: Option<PathBuf>, init: bool, force: bool) -> Result<()> {
    let Some(path) = path.or_else(Settings::config_path) else {
        bail!("Could not determine config directory; pass --config");
    };

    if !init {
        println!("{}", path.display());
        println!("{settings:#?}");
        return Ok(());
    }

    if path.exists() && !force {
        bail!("{} already exists (use --force to replace it)", path.display());
    }
    Settings::default()
        .save_to(&path)
        .with_context(|| format!("Cannot write {}", path.display()))?;
    info!("Wrote default settings to {}", path.display());
    println!("{}", path.display());
    Ok(())
}

fn run_preview(settings: &Settings, pdf: &Path, page: usize, output: &Path) -> Result<()> {
    let mut service = spawn_service(settings, DownloadsSink::new(std::env::temp_dir()));
    open_document(&mut service, pdf)?;

    let page_count = service.session().page_count();
    if page == 0 || page > page_count {
        bail!("Page {page} out of range (document has {page_count} pages)");
    }

    service.apply_command(Command::ShowPreview(page - 1));
    wait(&mut service)?;

    let Some(image) = service
        .session()
        .preview
        .as_ref()
        .and_then(|p| p.image.clone())
    else {
        bail!("Page {page} could not be rendered");
    };
    image
        .pixels
        .save(output)
        .with_context(|| format!("Cannot write {}", output.display()))?;
    println!("{}", output.display());
    Ok(())
}

//! Export artifacts: a single JPEG or a ZIP of JPEGs

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use zip::ZipWriter;
use zip::write::FileOptions;

use crate::pdf::RasterImage;

pub const JPEG_MIME: &str = "image/jpeg";
pub const ZIP_MIME: &str = "application/zip";

/// Default JPEG quality for exported pages
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Which output mode produced an artifact
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Archive,
}

impl ArtifactKind {
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Image => JPEG_MIME,
            Self::Archive => ZIP_MIME,
        }
    }
}

/// A finished export, ready to be handed to an output sink exactly once
#[derive(Debug)]
pub enum ExportArtifact {
    /// One encoded JPEG held in memory
    Image { file_name: String, data: Vec<u8> },
    /// A complete ZIP spooled to an anonymous temporary file. The file is
    /// removed by the OS when the artifact is dropped.
    Archive {
        file_name: String,
        entries: Vec<String>,
        file: File,
    },
}

impl ExportArtifact {
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Image { .. } => ArtifactKind::Image,
            Self::Archive { .. } => ArtifactKind::Archive,
        }
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Image { file_name, .. } | Self::Archive { file_name, .. } => file_name,
        }
    }

    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        self.kind().mime_type()
    }

    /// Names of the images in the artifact, in order
    #[must_use]
    pub fn entries(&self) -> Vec<&str> {
        match self {
            Self::Image { file_name, .. } => vec![file_name.as_str()],
            Self::Archive { entries, .. } => entries.iter().map(String::as_str).collect(),
        }
    }

    /// Copy the artifact bytes into `out`
    pub fn write_to<W: Write>(&mut self, out: &mut W) -> io::Result<u64> {
        match self {
            Self::Image { data, .. } => {
                out.write_all(data)?;
                Ok(data.len() as u64)
            }
            Self::Archive { file, .. } => {
                file.seek(SeekFrom::Start(0))?;
                io::copy(file, out)
            }
        }
    }

    pub fn to_bytes(&mut self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        match self {
            Self::Image { data, .. } => bytes.extend_from_slice(data),
            Self::Archive { file, .. } => {
                file.seek(SeekFrom::Start(0))?;
                file.read_to_end(&mut bytes)?;
            }
        }
        Ok(bytes)
    }
}

/// Encode a rendered page as baseline JPEG
pub fn encode_jpeg(image: &RasterImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder.encode(
        image.pixels.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

/// Incrementally writes JPEG entries into a spooled ZIP file
pub struct ArchiveBuilder {
    file_name: String,
    writer: ZipWriter<File>,
    entries: Vec<String>,
}

impl ArchiveBuilder {
    pub fn new(file_name: impl Into<String>) -> io::Result<Self> {
        let file = tempfile::tempfile()?;
        Ok(Self {
            file_name: file_name.into(),
            writer: ZipWriter::new(file),
            entries: Vec::new(),
        })
    }

    /// Append one entry. JPEG data is already compressed, so entries are
    /// stored as-is.
    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> zip::result::ZipResult<()> {
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        self.writer.start_file(name, options)?;
        self.writer.write_all(data)?;
        self.entries.push(name.to_string());
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the central directory and hand over the finished archive
    pub fn finish(mut self) -> zip::result::ZipResult<ExportArtifact> {
        let file = self.writer.finish()?;
        Ok(ExportArtifact::Archive {
            file_name: self.file_name,
            entries: self.entries,
            file,
        })
    }
}

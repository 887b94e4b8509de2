use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::export::{DEFAULT_JPEG_QUALITY, ExportOptions};
use crate::pdf::{
    DEFAULT_EXPORT_SCALE, DEFAULT_THUMBNAIL_DIVISOR, DEFAULT_THUMBNAIL_MIN_PX, RenderMode,
};
use crate::service::WorkerConfig;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pdf-pages";

const MAX_EXPORT_SCALE: f32 = 8.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Pixels per PDF point for exported pages
    #[serde(default = "default_export_scale")]
    pub export_scale: f32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Thumbnails render at `1 / thumbnail_divisor` of the page's native size
    #[serde(default = "default_thumbnail_divisor")]
    pub thumbnail_divisor: f32,

    #[serde(default = "default_thumbnail_min_px")]
    pub thumbnail_min_px: u32,

    /// Where exports are saved; the user's Downloads folder when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_export_scale() -> f32 {
    DEFAULT_EXPORT_SCALE
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_thumbnail_divisor() -> f32 {
    DEFAULT_THUMBNAIL_DIVISOR
}

fn default_thumbnail_min_px() -> u32 {
    DEFAULT_THUMBNAIL_MIN_PX
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            export_scale: default_export_scale(),
            jpeg_quality: default_jpeg_quality(),
            thumbnail_divisor: default_thumbnail_divisor(),
            thumbnail_min_px: default_thumbnail_min_px(),
            output_dir: None,
        }
    }
}

impl Settings {
    /// Default location, `<config dir>/pdf-pages/config.yaml`
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// Never fails: a missing file yields defaults, an unreadable one is
    /// logged and also yields defaults.
    #[must_use]
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::config_path() {
                Some(path) => path,
                None => {
                    warn!("Could not determine config directory, using default settings");
                    return Self::default();
                }
            },
        };

        if !path.exists() {
            info!("Settings file not found at {path:?}, using defaults");
            return Self::default();
        }
        Self::load_from(&path)
    }

    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
                Ok(mut settings) => {
                    debug!("Loaded settings from {path:?}");
                    if settings.version > CURRENT_VERSION {
                        warn!(
                            "Settings file {path:?} is version {}, newer than {CURRENT_VERSION}; unknown keys are ignored",
                            settings.version
                        );
                    }
                    settings.sanitize();
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings file {path:?}: {e}, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read settings file {path:?}: {e}");
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, generate_settings_yaml(self))?;
        debug!("Saved settings to {path:?}");
        Ok(())
    }

    /// Replace out-of-range values with defaults
    pub fn sanitize(&mut self) {
        if !(self.export_scale.is_finite()
            && self.export_scale > 0.0
            && self.export_scale <= MAX_EXPORT_SCALE)
        {
            warn!(
                "export_scale {} out of range, using {DEFAULT_EXPORT_SCALE}",
                self.export_scale
            );
            self.export_scale = DEFAULT_EXPORT_SCALE;
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            warn!(
                "jpeg_quality {} out of range, using {DEFAULT_JPEG_QUALITY}",
                self.jpeg_quality
            );
            self.jpeg_quality = DEFAULT_JPEG_QUALITY;
        }
        if !(self.thumbnail_divisor.is_finite() && self.thumbnail_divisor >= 1.0) {
            warn!(
                "thumbnail_divisor {} out of range, using {DEFAULT_THUMBNAIL_DIVISOR}",
                self.thumbnail_divisor
            );
            self.thumbnail_divisor = DEFAULT_THUMBNAIL_DIVISOR;
        }
    }

    #[must_use]
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            scale: self.export_scale,
            jpeg_quality: self.jpeg_quality,
        }
    }

    #[must_use]
    pub fn thumbnail_mode(&self) -> RenderMode {
        RenderMode::Thumbnail {
            scale: 1.0 / self.thumbnail_divisor,
            min_px: self.thumbnail_min_px,
        }
    }

    #[must_use]
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            thumbnail_mode: self.thumbnail_mode(),
            preview_mode: RenderMode::Full {
                scale: self.export_scale,
            },
        }
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::from(SETTINGS_HEADER);

    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str(&format!("export_scale: {}\n", settings.export_scale));
    content.push_str(&format!("jpeg_quality: {}\n", settings.jpeg_quality));
    content.push_str(&format!(
        "thumbnail_divisor: {}\n",
        settings.thumbnail_divisor
    ));
    content.push_str(&format!(
        "thumbnail_min_px: {}\n",
        settings.thumbnail_min_px
    ));
    match &settings.output_dir {
        Some(dir) => content.push_str(&format!("output_dir: {:?}\n", dir.to_string_lossy())),
        None => content.push_str("# output_dir: \"/path/to/exports\"\n"),
    }

    content
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# pdf-pages settings
# ============================================================================
# export_scale       pixels per PDF point for exported JPEGs (2.0 = 144 DPI)
# jpeg_quality       1-100
# thumbnail_divisor  thumbnails render at 1 / thumbnail_divisor of page size
# thumbnail_min_px   smallest thumbnail side in pixels
# output_dir         defaults to the Downloads folder

"#;

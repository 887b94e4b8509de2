//! Page rasterizer
//!
//! One function, two scales: small thumbnails for the page grid and
//! high-resolution renders for preview and export.

use log::trace;

use super::document::{DocumentError, DocumentPage};
use super::types::{PageSize, PixelSize, RasterImage};

/// Default export magnification (2x the page's native 72 dpi size)
pub const DEFAULT_EXPORT_SCALE: f32 = 2.0;
/// Default thumbnail size as a fraction of the page's native size
pub const DEFAULT_THUMBNAIL_DIVISOR: f32 = 3.0;
/// Thumbnails are never narrower or shorter than this
pub const DEFAULT_THUMBNAIL_MIN_PX: u32 = 100;

/// How a page should be rasterized
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenderMode {
    /// Downscaled render with each dimension floor-clamped to `min_px`
    Thumbnail { scale: f32, min_px: u32 },
    /// Unclamped render used for preview and export
    Full { scale: f32 },
}

impl RenderMode {
    #[must_use]
    pub fn thumbnail() -> Self {
        Self::Thumbnail {
            scale: 1.0 / DEFAULT_THUMBNAIL_DIVISOR,
            min_px: DEFAULT_THUMBNAIL_MIN_PX,
        }
    }

    #[must_use]
    pub fn export() -> Self {
        Self::Full {
            scale: DEFAULT_EXPORT_SCALE,
        }
    }

    #[must_use]
    pub fn scale(self) -> f32 {
        match self {
            Self::Thumbnail { scale, .. } | Self::Full { scale } => scale,
        }
    }
}

/// Pre-computed output dimensions for a page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterSpec {
    pub output: PixelSize,
}

impl RasterSpec {
    #[must_use]
    pub fn compute(page: PageSize, mode: RenderMode) -> Self {
        let scale = sanitize_scale(mode.scale());
        let mut width = scaled_dimension(page.width, scale);
        let mut height = scaled_dimension(page.height, scale);

        if let RenderMode::Thumbnail { min_px, .. } = mode {
            width = width.max(min_px);
            height = height.max(min_px);
        }

        Self {
            output: PixelSize::new(width, height),
        }
    }
}

fn sanitize_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        DEFAULT_EXPORT_SCALE
    }
}

fn scaled_dimension(points: f32, scale: f32) -> u32 {
    let px = (points.max(0.0) * scale).round();
    if px >= u32::MAX as f32 {
        u32::MAX
    } else {
        (px as u32).max(1)
    }
}

/// Render one open page
pub fn render_page<P: DocumentPage>(page: &P, mode: RenderMode) -> Result<RasterImage, DocumentError> {
    let spec = RasterSpec::compute(page.size()?, mode);
    let pixels = page.rasterize(spec.output)?;

    trace!(
        "Rendered page {} at {:?} -> {}x{}",
        page.index(),
        mode,
        pixels.width(),
        pixels.height()
    );

    Ok(RasterImage {
        page: page.index(),
        scale: mode.scale(),
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const A4: PageSize = PageSize::new(595.0, 842.0);

    #[test]
    fn export_doubles_native_size() {
        let spec = RasterSpec::compute(A4, RenderMode::export());
        assert_eq!(spec.output, PixelSize::new(1190, 1684));
    }

    #[test]
    fn thumbnail_is_a_third_rounded() {
        let spec = RasterSpec::compute(A4, RenderMode::thumbnail());
        // 595/3 = 198.33, 842/3 = 280.67
        assert_eq!(spec.output, PixelSize::new(198, 281));
    }

    #[test]
    fn thumbnail_clamps_each_dimension_independently() {
        let strip = PageSize::new(900.0, 120.0);
        let spec = RasterSpec::compute(strip, RenderMode::thumbnail());
        assert_eq!(spec.output, PixelSize::new(300, 100));
    }

    #[test]
    fn full_render_is_not_clamped() {
        let tiny = PageSize::new(20.0, 10.0);
        let spec = RasterSpec::compute(tiny, RenderMode::Full { scale: 2.0 });
        assert_eq!(spec.output, PixelSize::new(40, 20));
    }

    #[test]
    fn degenerate_sizes_stay_at_least_one_pixel() {
        let empty = PageSize::new(0.0, 0.3);
        let spec = RasterSpec::compute(empty, RenderMode::Full { scale: 1.0 });
        assert_eq!(spec.output, PixelSize::new(1, 1));
    }

    #[test]
    fn invalid_scale_falls_back_to_export_scale() {
        let spec = RasterSpec::compute(A4, RenderMode::Full { scale: -1.0 });
        assert_eq!(spec.output, PixelSize::new(1190, 1684));
        let spec = RasterSpec::compute(A4, RenderMode::Full { scale: f32::NAN });
        assert_eq!(spec.output, PixelSize::new(1190, 1684));
    }

    #[test]
    fn thumbnail_not_larger_than_export_for_regular_pages() {
        for size in [A4, PageSize::new(612.0, 792.0), PageSize::new(842.0, 595.0)] {
            let thumb = RasterSpec::compute(size, RenderMode::thumbnail()).output;
            let full = RasterSpec::compute(size, RenderMode::export()).output;
            assert!(thumb.width <= full.width);
            assert!(thumb.height <= full.height);
        }
    }
}

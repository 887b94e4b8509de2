//! Core types for page rasterization

use image::{Rgb, RgbImage};

/// Page dimensions in PDF points (1/72 inch)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Pixel dimensions of a rasterized page
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub const fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Rendered page pixels.
///
/// Always RGB with 8 bits per channel. Pages are drawn on an opaque white
/// background so transparent regions of the source come out white.
#[derive(Clone)]
pub struct RasterImage {
    /// Page number (0-indexed)
    pub page: usize,
    /// Scale factor requested for the render
    pub scale: f32,
    /// Pixel buffer
    pub pixels: RgbImage,
}

impl RasterImage {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[must_use]
    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width(), self.height())
    }
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("page", &self.page)
            .field("scale", &self.scale)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

/// A white canvas of the given size
#[must_use]
pub fn white_canvas(size: PixelSize) -> RgbImage {
    RgbImage::from_pixel(size.width, size.height, Rgb([0xFF, 0xFF, 0xFF]))
}

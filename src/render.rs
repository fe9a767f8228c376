//! Rasterization of encoded matrices into bitmaps.

use image::{ImageBuffer, Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::encoder::{BitMatrix, CharacterSet, EncodeHints, Encoder, ErrorCorrection, MAX_DIMENSION};
use crate::error::{EncodeError, RenderError};
use crate::overlay::{add_logo, DEFAULT_LOGO_RATIO};

/// An RGBA bitmap, the output of rendering and the input for logos.
pub type Bitmap = RgbaImage;

/// Opaque black as `0xAARRGGBB`.
pub const BLACK: u32 = 0xFF00_0000;
/// Opaque white as `0xAARRGGBB`.
pub const WHITE: u32 = 0xFFFF_FFFF;

/// A validated request to render `content` into a `size` x `size` square.
///
/// Error correction is always [`ErrorCorrection::High`] and the quiet zone is
/// always [`EncodeRequest::MARGIN`] module wide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    content: String,
    size: u32,
}

impl EncodeRequest {
    pub const ERROR_CORRECTION: ErrorCorrection = ErrorCorrection::High;
    pub const MARGIN: u32 = 1;
    pub const MAX_SIZE: u32 = MAX_DIMENSION;

    pub fn new(content: impl Into<String>, size: u32) -> Result<Self, EncodeError> {
        let content = content.into();
        if content.is_empty() {
            return Err(EncodeError::EmptyContent);
        }
        if size == 0 || size > Self::MAX_SIZE {
            return Err(EncodeError::InvalidSize {
                size,
                max: Self::MAX_SIZE,
            });
        }
        Ok(Self { content, size })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn hints(&self) -> EncodeHints {
        EncodeHints {
            character_set: CharacterSet::Utf8,
            error_correction: Self::ERROR_CORRECTION,
            margin: Self::MARGIN,
        }
    }
}

/// Row-major `size * size` ARGB pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    size: u32,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    /// Copies the top-left `size` x `size` cells of `matrix`, black where set and white elsewhere.
    ///
    /// The matrix must be exactly `size` cells square: a smaller one cannot fill
    /// the buffer and a larger one would be cropped.
    pub fn rasterize(matrix: &BitMatrix, size: u32) -> Result<Self, EncodeError> {
        if matrix.width() > size || matrix.height() > size {
            return Err(EncodeError::SizeTooSmall {
                required: matrix.width().max(matrix.height()),
                requested: size,
            });
        }
        if matrix.width() < size || matrix.height() < size {
            return Err(EncodeError::MatrixTooSmall {
                size,
                actual_width: matrix.width(),
                actual_height: matrix.height(),
            });
        }

        let mut pixels = vec![WHITE; size as usize * size as usize];
        for y in 0..size {
            for x in 0..size {
                if matrix.get(x, y) {
                    pixels[y as usize * size as usize + x as usize] = BLACK;
                }
            }
        }
        Ok(Self { size, pixels })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Converts the buffer into a bitmap of the same dimensions.
    pub fn into_bitmap(self) -> Bitmap {
        let size = self.size;
        let mut img: Bitmap = ImageBuffer::new(size, size);
        for (pixel, argb) in img.pixels_mut().zip(self.pixels) {
            *pixel = argb_to_rgba(argb);
        }
        img
    }
}

fn argb_to_rgba(argb: u32) -> Rgba<u8> {
    let [a, r, g, b] = argb.to_be_bytes();
    Rgba([r, g, b, a])
}

/// Renders QR codes through an [`Encoder`].
#[derive(Debug, Clone)]
pub struct QrRenderer<E> {
    encoder: E,
    logo_ratio: f32,
}

impl<E: Encoder> QrRenderer<E> {
    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            logo_ratio: DEFAULT_LOGO_RATIO,
        }
    }

    /// Sets the share of the code's width a logo is scaled to.
    ///
    /// Values above 0.3 may hide more of the symbol than High error correction can recover.
    pub fn with_logo_ratio(mut self, ratio: f32) -> Self {
        self.logo_ratio = ratio;
        self
    }

    pub fn logo_ratio(&self) -> f32 {
        self.logo_ratio
    }

    /// Renders `content` into a `size` x `size` bitmap, with `logo` centered on it if given.
    pub fn render(&self, content: &str, size: u32, logo: Option<&Bitmap>) -> Result<Bitmap, RenderError> {
        let request = EncodeRequest::new(content, size)?;
        self.render_request(&request, logo)
    }

    pub fn render_request(&self, request: &EncodeRequest, logo: Option<&Bitmap>) -> Result<Bitmap, RenderError> {
        let size = request.size();
        let matrix = self
            .encoder
            .encode(request.content(), size, size, &request.hints())
            .inspect_err(|err| warn!(%err, "failed to encode QR code"))?;

        let bitmap = PixelBuffer::rasterize(&matrix, size)
            .inspect_err(|err| warn!(%err, "failed to rasterize QR code"))?
            .into_bitmap();
        debug!(size, "rendered QR code");

        match logo {
            Some(logo) => Ok(add_logo(Some(bitmap), Some(logo), self.logo_ratio)?),
            None => Ok(bitmap),
        }
    }
}

//! Centered logo composition.

use image::Pixel;
use tracing::{debug, warn};

use crate::error::OverlayError;
use crate::render::Bitmap;

/// Logo ratio used by [`crate::render::QrRenderer`] unless configured otherwise.
pub const DEFAULT_LOGO_RATIO: f32 = 0.2;

/// Largest ratio a logo can cover before High error correction (30%) can no longer compensate.
pub const MAX_RECOMMENDED_RATIO: f32 = 0.3;

/// Draws `logo` over the center of `src`, scaled so its width is `ratio` of the source width.
///
/// The source is drawn unscaled, then the canvas is scaled by
/// `src_width * ratio / logo_width` about the source center and the logo drawn
/// at `((src_width - logo_width) / 2, (src_height - logo_height) / 2)` in that
/// scaled space, blended source-over.
///
/// A missing or empty source is an error. A missing or empty logo returns the
/// source unchanged.
pub fn add_logo(src: Option<Bitmap>, logo: Option<&Bitmap>, ratio: f32) -> Result<Bitmap, OverlayError> {
    let src = src.ok_or(OverlayError::MissingSource)?;
    let Some(logo) = logo else {
        return Ok(src);
    };

    let (src_width, src_height) = src.dimensions();
    let (logo_width, logo_height) = logo.dimensions();
    if src_width == 0 || src_height == 0 {
        return Err(OverlayError::EmptySource {
            width: src_width,
            height: src_height,
        });
    }
    if logo_width == 0 || logo_height == 0 {
        return Ok(src);
    }

    draw_scaled(src, logo, ratio).inspect_err(|err| warn!(%err, "failed to add logo"))
}

fn draw_scaled(src: Bitmap, logo: &Bitmap, ratio: f32) -> Result<Bitmap, OverlayError> {
    if !ratio.is_finite() || ratio < 0.0 {
        return Err(OverlayError::InvalidRatio(ratio));
    }
    if ratio >= MAX_RECOMMENDED_RATIO {
        warn!(ratio, "logo may cover more of the code than error correction can recover");
    }

    let (src_width, src_height) = src.dimensions();
    let (logo_width, logo_height) = logo.dimensions();
    let scale = src_width as f32 * ratio / logo_width as f32;

    // Pivot and logo origin use integer division, as the canvas API does.
    let pivot_x = (src_width / 2) as f32;
    let pivot_y = (src_height / 2) as f32;
    let origin_x = ((i64::from(src_width) - i64::from(logo_width)) / 2) as f32;
    let origin_y = ((i64::from(src_height) - i64::from(logo_height)) / 2) as f32;

    let dest_x = pivot_x + scale * (origin_x - pivot_x);
    let dest_y = pivot_y + scale * (origin_y - pivot_y);
    let dest_width = (scale * logo_width as f32).round();
    let dest_height = (scale * logo_height as f32).round();

    if ![dest_x, dest_y, dest_width, dest_height].iter().all(|v| v.is_finite()) {
        return Err(OverlayError::Draw(format!(
            "scaled logo of {dest_width}x{dest_height} cannot be placed"
        )));
    }

    let mut canvas = src;
    if dest_width < 1.0 || dest_height < 1.0 {
        debug!(ratio, "logo scaled to nothing");
        return Ok(canvas);
    }

    // Only the part of the scaled logo that lands on the canvas is sampled.
    let left = f64::from(dest_x.round());
    let top = f64::from(dest_y.round());
    let x_start = left.max(0.0);
    let y_start = top.max(0.0);
    let x_end = (left + f64::from(dest_width)).min(f64::from(src_width));
    let y_end = (top + f64::from(dest_height)).min(f64::from(src_height));
    if x_start >= x_end || y_start >= y_end {
        debug!(ratio, "logo lies outside the code");
        return Ok(canvas);
    }

    let x_step = f64::from(logo_width) / f64::from(dest_width);
    let y_step = f64::from(logo_height) / f64::from(dest_height);
    for y in y_start as u32..y_end as u32 {
        let logo_y = (((f64::from(y) - top + 0.5) * y_step) as u32).min(logo_height - 1);
        for x in x_start as u32..x_end as u32 {
            let logo_x = (((f64::from(x) - left + 0.5) * x_step) as u32).min(logo_width - 1);
            canvas
                .get_pixel_mut(x, y)
                .blend(logo.get_pixel(logo_x, logo_y));
        }
    }
    debug!(dest_width, dest_height, "added logo");
    Ok(canvas)
}

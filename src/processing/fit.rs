//! Cover-fit of decoded photos to a frame's pixel size.

use anyhow::{Context, Result, bail};
use fast_image_resize as fir;
use image::RgbaImage;

/// Largest centred rectangle of the source with the target's aspect ratio,
/// as `(x, y, w, h)`.
pub fn cover_crop(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> (u32, u32, u32, u32) {
    let sw = src_w.max(1) as f32;
    let sh = src_h.max(1) as f32;
    let aspect = target_w.max(1) as f32 / target_h.max(1) as f32;
    let (w, h) = if sw / sh > aspect {
        ((sh * aspect).round().clamp(1.0, sw), sh)
    } else {
        (sw, (sw / aspect).round().clamp(1.0, sh))
    };
    let (w, h) = (w as u32, h as u32);
    let x = src_w.saturating_sub(w) / 2;
    let y = src_h.saturating_sub(h) / 2;
    (x, y, w, h)
}

/// Output size for a crop: the target size, but never larger than the crop.
pub fn fit_dimensions(crop_w: u32, crop_h: u32, target_w: u32, target_h: u32) -> (u32, u32) {
    if crop_w <= target_w || crop_h <= target_h {
        return (crop_w.max(1), crop_h.max(1));
    }
    (target_w.max(1), target_h.max(1))
}

/// Crops `source` to the target aspect ratio and scales it down to fit.
pub fn fit_to_frame(source: &RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage> {
    if target_w == 0 || target_h == 0 {
        bail!("frame dimensions must be positive");
    }
    let (x, y, w, h) = cover_crop(source.width(), source.height(), target_w, target_h);
    let cropped = if (x, y, w, h) == (0, 0, source.width(), source.height()) {
        source.clone()
    } else {
        image::imageops::crop_imm(source, x, y, w, h).to_image()
    };
    let (out_w, out_h) = fit_dimensions(w, h, target_w, target_h);
    resize_rgba(&cropped, out_w, out_h)
}

/// Scales `source` down, keeping its aspect ratio, until it fits inside
/// `max_w` x `max_h`.
pub fn fit_within(source: RgbaImage, max_w: u32, max_h: u32) -> Result<RgbaImage> {
    let (w, h) = source.dimensions();
    if w <= max_w && h <= max_h {
        return Ok(source);
    }
    let scale = (max_w as f32 / w as f32).min(max_h as f32 / h as f32);
    let out_w = ((w as f32 * scale).round() as u32).clamp(1, max_w.max(1));
    let out_h = ((h as f32 * scale).round() as u32).clamp(1, max_h.max(1));
    resize_rgba(&source, out_w, out_h)
}

fn resize_rgba(source: &RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage> {
    if source.width() == target_w && source.height() == target_h {
        return Ok(source.clone());
    }
    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .context("failed to create source view for frame resize")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .context("frame resize failed")?;
    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| anyhow::anyhow!("failed to construct resized RGBA image"))
}

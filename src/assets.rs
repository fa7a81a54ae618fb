//! Raster assets: the organization logo and signature images.

use std::io::Read;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, Rgba, RgbImage};
use tracing::warn;

use crate::error::{Result, WaiverError};

/// Loads a logo from an http(s) URL or a file path.
pub fn load_logo(source: &str) -> Result<DynamicImage> {
    let image_bytes = if source.starts_with("http://") || source.starts_with("https://") {
        let response = ureq::get(source)
            .call()
            .map_err(|e| WaiverError::LogoError(format!("Failed to fetch URL: {}", e)))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| WaiverError::LogoError(format!("Failed to read response: {}", e)))?;
        bytes
    } else {
        std::fs::read(source).map_err(|e| WaiverError::LogoError(format!("{}: {}", source, e)))?
    };

    image::load_from_memory(&image_bytes)
        .map_err(|e| WaiverError::LogoError(format!("Failed to decode image: {}", e)))
}

/// Images resolved before layout starts.
#[derive(Debug, Clone, Default)]
pub struct RenderAssets {
    pub logo: Option<DynamicImage>,
}

impl RenderAssets {
    /// Resolves the configured logo. An unavailable logo is logged and
    /// left out; it never fails the render.
    pub fn load(logo: Option<&str>) -> Self {
        let logo = logo.and_then(|source| match load_logo(source) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!(source, error = %e, "logo unavailable, continuing without it");
                None
            }
        });
        Self { logo }
    }
}

/// Decodes a `data:image/...;base64,` URL or bare base64 into an image.
/// `None` for anything that is not a decodable PNG/JPEG.
pub fn decode_signature(data: &str) -> Option<DynamicImage> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    let payload = match data.split_once(',') {
        Some((header, body)) if header.starts_with("data:") => body,
        _ => data,
    };
    let bytes = match STANDARD.decode(payload.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "signature is not valid base64");
            return None;
        }
    };
    match image::load_from_memory(&bytes) {
        Ok(img) => Some(img),
        Err(e) => {
            warn!(error = %e, "signature image could not be decoded");
            None
        }
    }
}

/// Flattens transparency onto white.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba_image = img.to_rgba8();
    let (width_px, height_px) = rgba_image.dimensions();

    let mut rgb_image = RgbImage::new(width_px, height_px);
    for (x, y, pixel) in rgba_image.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let bg = 255.0;
        let out_r = (r as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_g = (g as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_b = (b as f32 * alpha + bg * (1.0 - alpha)) as u8;
        rgb_image.put_pixel(x, y, image::Rgb([out_r, out_g, out_b]));
    }
    rgb_image
}

/// Largest (width, height) with the image's aspect ratio inside the box.
pub fn fit_within(img: &DynamicImage, max_width: f32, max_height: f32) -> (f32, f32) {
    let (w, h) = (img.width().max(1) as f32, img.height().max(1) as f32);
    let aspect_ratio = w / h;
    if max_width / max_height > aspect_ratio {
        (max_height * aspect_ratio, max_height)
    } else {
        (max_width, max_width / aspect_ratio)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    pub(crate) fn png_data_url(width: u32, height: u32) -> String {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([0, 0, 0, 255]),
        ));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(bytes))
    }

    #[test]
    fn decodes_data_urls_and_bare_base64() {
        let url = png_data_url(4, 2);
        let img = decode_signature(&url).unwrap();
        assert_eq!((img.width(), img.height()), (4, 2));

        let bare = url.split_once(',').unwrap().1;
        assert!(decode_signature(bare).is_some());
    }

    #[test]
    fn garbage_signatures_are_none() {
        assert!(decode_signature("").is_none());
        assert!(decode_signature("data:image/png;base64,!!!").is_none());
        assert!(decode_signature("data:image/png;base64,AAAA").is_none());
    }

    #[test]
    fn transparent_pixels_become_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        assert_eq!(flatten_onto_white(&img).get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn fit_preserves_aspect() {
        let wide = DynamicImage::ImageRgba8(RgbaImage::new(400, 100));
        assert_eq!(fit_within(&wide, 80.0, 16.0), (64.0, 16.0));
        let tall = DynamicImage::ImageRgba8(RgbaImage::new(100, 400));
        assert_eq!(fit_within(&tall, 12.0, 12.0), (3.0, 12.0));
    }

    #[test]
    fn missing_logo_file_degrades() {
        let assets = RenderAssets::load(Some("/definitely/not/here.png"));
        assert!(assets.logo.is_none());
        assert!(matches!(
            load_logo("/definitely/not/here.png"),
            Err(WaiverError::LogoError(_))
        ));
    }
}

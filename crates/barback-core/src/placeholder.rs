//! Perceptual placeholder hashes (ThumbHash).
//!
//! An image is down-sampled to at most 100px on its longest edge, re-encoded
//! at low quality to normalize sampling, and compressed into a handful of
//! low-frequency DCT coefficients per channel (luminance, two chroma axes and
//! optionally alpha). The resulting bytes are rendered as URL-safe base64.
//!
//! Identical pixel input always produces an identical token.
//!
//! See <https://evanw.github.io/thumbhash/> for the format.

use crate::config::PlaceholderConfig;
use crate::error::{BarbackError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::f64::consts::PI;
use std::io::Cursor;

/// Derive a placeholder token without touching the caller's image.
pub fn derive_placeholder(image: &DynamicImage) -> Result<String> {
    let sampled = sample(image)?;
    Ok(hash_sampled(&sampled))
}

/// Derive a placeholder token and release the source buffer as soon as the
/// sample is taken. For call sites that have no further use for the image.
pub fn derive_placeholder_consuming(image: DynamicImage) -> Result<String> {
    let sampled = sample(&image)?;
    drop(image);
    Ok(hash_sampled(&sampled))
}

fn hash_sampled(sampled: &RgbaImage) -> String {
    let hash = rgba_to_hash(
        sampled.width() as usize,
        sampled.height() as usize,
        sampled.as_raw(),
    );
    URL_SAFE_NO_PAD.encode(hash)
}

/// Down-scale and round-trip through a low quality encode.
fn sample(image: &DynamicImage) -> Result<RgbaImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(BarbackError::ImageEncoding {
            message: format!(
                "image has no pixels ({}x{})",
                image.width(),
                image.height()
            ),
        });
    }

    let edge = PlaceholderConfig::MAX_EDGE;
    let thumbnail = if image.width() > edge || image.height() > edge {
        image.thumbnail(edge, edge)
    } else {
        image.clone()
    };

    let mut buffer = Cursor::new(Vec::new());
    let encoded = if thumbnail.color().has_alpha() {
        // JPEG has no alpha channel; keep transparency through a PNG pass.
        DynamicImage::ImageRgba8(thumbnail.to_rgba8()).write_to(&mut buffer, ImageFormat::Png)
    } else {
        let encoder = JpegEncoder::new_with_quality(&mut buffer, PlaceholderConfig::SAMPLE_QUALITY);
        DynamicImage::ImageRgb8(thumbnail.to_rgb8()).write_with_encoder(encoder)
    };
    encoded.map_err(|e| BarbackError::ImageEncoding {
        message: format!("Failed to encode sample: {}", e),
    })?;

    let decoded =
        image::load_from_memory(buffer.get_ref()).map_err(|e| BarbackError::ImageEncoding {
            message: format!("Failed to decode sample: {}", e),
        })?;

    let rgba = decoded.to_rgba8();
    if rgba.width() > edge || rgba.height() > edge {
        return Err(BarbackError::ImageEncoding {
            message: format!("sample too large ({}x{})", rgba.width(), rgba.height()),
        });
    }

    Ok(rgba)
}

struct Channel {
    dc: f64,
    ac: Vec<f64>,
    scale: f64,
}

fn encode_channel(values: &[f64], width: usize, height: usize, nx: usize, ny: usize) -> Channel {
    let mut dc = 0.0;
    let mut ac = Vec::with_capacity(nx * ny / 2);
    let mut scale = 0.0_f64;
    let mut fx = vec![0.0; width];

    for cy in 0..ny {
        let mut cx = 0;
        while cx * ny < nx * (ny - cy) {
            for (x, f) in fx.iter_mut().enumerate() {
                *f = (PI / width as f64 * cx as f64 * (x as f64 + 0.5)).cos();
            }

            let mut f = 0.0;
            for y in 0..height {
                let fy = (PI / height as f64 * cy as f64 * (y as f64 + 0.5)).cos();
                let row = &values[y * width..(y + 1) * width];
                for (value, fx) in row.iter().zip(&fx) {
                    f += value * fx * fy;
                }
            }
            f /= (width * height) as f64;

            if cx > 0 || cy > 0 {
                ac.push(f);
                scale = scale.max(f.abs());
            } else {
                dc = f;
            }
            cx += 1;
        }
    }

    if scale > 0.0 {
        for value in &mut ac {
            *value = 0.5 + 0.5 / scale * *value;
        }
    }

    Channel { dc, ac, scale }
}

/// Encode an RGBA buffer (at most 100x100) into ThumbHash bytes.
pub fn rgba_to_hash(width: usize, height: usize, rgba: &[u8]) -> Vec<u8> {
    debug_assert!(width <= 100 && height <= 100);
    debug_assert_eq!(rgba.len(), width * height * 4);

    let pixel_count = width * height;

    // Average color, weighted by alpha
    let (mut avg_r, mut avg_g, mut avg_b, mut avg_a) = (0.0, 0.0, 0.0, 0.0);
    for px in rgba.chunks_exact(4) {
        let alpha = f64::from(px[3]) / 255.0;
        avg_r += alpha / 255.0 * f64::from(px[0]);
        avg_g += alpha / 255.0 * f64::from(px[1]);
        avg_b += alpha / 255.0 * f64::from(px[2]);
        avg_a += alpha;
    }
    if avg_a > 0.0 {
        avg_r /= avg_a;
        avg_g /= avg_a;
        avg_b /= avg_a;
    }

    let has_alpha = avg_a < pixel_count as f64;
    let l_limit = if has_alpha { 5.0 } else { 7.0 };
    let max_dim = width.max(height) as f64;
    let lx = ((l_limit * width as f64 / max_dim).round() as usize).max(1);
    let ly = ((l_limit * height as f64 / max_dim).round() as usize).max(1);

    // Convert to LPQA, compositing transparent pixels over the average color
    let mut l = Vec::with_capacity(pixel_count);
    let mut p = Vec::with_capacity(pixel_count);
    let mut q = Vec::with_capacity(pixel_count);
    let mut a = Vec::with_capacity(pixel_count);
    for px in rgba.chunks_exact(4) {
        let alpha = f64::from(px[3]) / 255.0;
        let r = avg_r * (1.0 - alpha) + alpha / 255.0 * f64::from(px[0]);
        let g = avg_g * (1.0 - alpha) + alpha / 255.0 * f64::from(px[1]);
        let b = avg_b * (1.0 - alpha) + alpha / 255.0 * f64::from(px[2]);
        l.push((r + g + b) / 3.0);
        p.push((r + g) / 2.0 - b);
        q.push(r - g);
        a.push(alpha);
    }

    let l_channel = encode_channel(&l, width, height, lx.max(3), ly.max(3));
    let p_channel = encode_channel(&p, width, height, 3, 3);
    let q_channel = encode_channel(&q, width, height, 3, 3);
    let a_channel = has_alpha.then(|| encode_channel(&a, width, height, 5, 5));

    let is_landscape = width > height;
    let header24: u32 = ((63.0 * l_channel.dc).round() as u32)
        | (((31.5 + 31.5 * p_channel.dc).round() as u32) << 6)
        | (((31.5 + 31.5 * q_channel.dc).round() as u32) << 12)
        | (((31.0 * l_channel.scale).round() as u32) << 18)
        | (u32::from(has_alpha) << 23);
    let header16: u16 = (if is_landscape { ly } else { lx }) as u16
        | (((63.0 * p_channel.scale).round() as u16) << 3)
        | (((63.0 * q_channel.scale).round() as u16) << 9)
        | (u16::from(is_landscape) << 15);

    let mut hash = vec![
        (header24 & 0xff) as u8,
        ((header24 >> 8) & 0xff) as u8,
        (header24 >> 16) as u8,
        (header16 & 0xff) as u8,
        (header16 >> 8) as u8,
    ];
    if let Some(alpha) = &a_channel {
        hash.push(((15.0 * alpha.dc).round() as u8) | (((15.0 * alpha.scale).round() as u8) << 4));
    }

    // AC coefficients, two 4-bit values per byte, low nibble first
    let mut ac_index = 0usize;
    let channels = [Some(&l_channel), Some(&p_channel), Some(&q_channel), a_channel.as_ref()];
    for channel in channels.into_iter().flatten() {
        for f in &channel.ac {
            let nibble = (15.0 * f).round() as u8;
            if ac_index % 2 == 0 {
                hash.push(nibble);
            } else if let Some(last) = hash.last_mut() {
                *last |= nibble << 4;
            }
            ac_index += 1;
        }
    }

    hash
}

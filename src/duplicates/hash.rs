// src/duplicates/hash.rs
// =============================================================================
// Average hash ("aHash") of an image.
//
// 1. Decode the bytes (PNG, JPEG, GIF, WebP, BMP)
// 2. Scale to exactly 8x8, ignoring aspect ratio
// 3. Gray value per pixel = (r + g + b) / 3, integer division
// 4. Bit is 1 when the gray value is above the mean of all 64, else 0
//
// Bits are written row by row as a 64-character string of '0'/'1'. Two images
// count as duplicates only when these strings are identical.
// =============================================================================

use image::imageops::FilterType;
use std::fs;
use std::path::Path;

use crate::error::Result;

const SIDE: u32 = 8;

pub fn fingerprint(bytes: &[u8]) -> Result<String> {
    let image = image::load_from_memory(bytes)?;
    let small = image.resize_exact(SIDE, SIDE, FilterType::Triangle).to_rgb8();

    let grays: Vec<u32> = small
        .pixels()
        .map(|pixel| {
            let [r, g, b] = pixel.0;
            (u32::from(r) + u32::from(g) + u32::from(b)) / 3
        })
        .collect();

    // gray > sum / 64, kept in integers
    let sum: u32 = grays.iter().sum();
    let count = grays.len() as u32;

    Ok(grays
        .iter()
        .map(|&gray| if gray * count > sum { '1' } else { '0' })
        .collect())
}

pub fn fingerprint_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    fingerprint(&bytes)
}

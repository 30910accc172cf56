//! Screenshot export of the render grids as grayscale PNG.
//!
//! Both line grids are stacked with a one-dot gap between them. With the
//! backlight on, lit dots are dark on a light panel; with it off the panel
//! is dark and lit dots show light.

use std::path::Path;

use log::debug;

use crate::controller::Controller;
use crate::render::PixelGrid;
use crate::Result;

const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

const BACKLIT_PANEL: u8 = 0xD8;
const BACKLIT_DOT: u8 = 0x20;
const UNLIT_PANEL: u8 = 0x18;
const UNLIT_DOT: u8 = 0xB0;

/// Encode 8-bit grayscale samples (row-major, `width * height` bytes).
pub fn encode_gray(width: u32, height: u32, samples: &[u8]) -> Vec<u8> {
    let mut png = Vec::with_capacity(samples.len() / 4 + 128);
    png.extend_from_slice(&SIGNATURE);

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(0); // color type: grayscale
    ihdr.extend_from_slice(&[0, 0, 0]); // compression, filter, interlace
    write_chunk(&mut png, b"IHDR", &ihdr);

    let row_len = width as usize;
    let mut raw = Vec::with_capacity((row_len + 1) * height as usize);
    for row in samples.chunks(row_len.max(1)).take(height as usize) {
        raw.push(0); // filter: None
        raw.extend_from_slice(row);
    }
    let idat = miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6);
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    png
}

/// Render both line grids to grayscale samples, each dot `scale`×`scale`.
/// Returns (width, height, samples).
pub fn rasterize(lines: &[PixelGrid; 2], scale: usize, backlight: bool) -> (u32, u32, Vec<u8>) {
    let scale = scale.max(1);
    let (panel, dot) = if backlight { (BACKLIT_PANEL, BACKLIT_DOT) } else { (UNLIT_PANEL, UNLIT_DOT) };
    let dots_wide = lines[0].width().max(lines[1].width());
    let dots_high = lines[0].height() + 1 + lines[1].height();
    let width = dots_wide * scale;
    let height = dots_high * scale;

    let mut samples = vec![panel; width * height];
    let mut top = 0;
    for grid in lines {
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                if !grid.dot(x, y) {
                    continue;
                }
                for sy in 0..scale {
                    let start = ((top + y) * scale + sy) * width + x * scale;
                    samples[start..start + scale].fill(dot);
                }
            }
        }
        top += grid.height() + 1;
    }
    (width as u32, height as u32, samples)
}

pub fn encode_grids(lines: &[PixelGrid; 2], scale: usize, backlight: bool) -> Vec<u8> {
    let (width, height, samples) = rasterize(lines, scale, backlight);
    encode_gray(width, height, &samples)
}

impl Controller {
    pub fn screenshot_png(&self, scale: usize) -> Vec<u8> {
        encode_grids(self.lines(), scale, self.backlight())
    }

    pub fn save_screenshot(&self, path: &Path, scale: usize) -> Result<()> {
        let png = self.screenshot_png(scale);
        std::fs::write(path, &png)?;
        debug!("screenshot saved to {} ({} bytes)", path.display(), png.len());
        Ok(())
    }
}

fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc32(chunk_type, data).to_be_bytes());
}

/// CRC-32 over chunk type and data, as PNG requires.
fn crc32(chunk_type: &[u8], data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &b in chunk_type.iter().chain(data) {
        crc ^= b as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::{powered, write};

    #[test]
    fn test_crc32_known_value() {
        // CRC of an empty IEND chunk
        assert_eq!(crc32(b"IEND", &[]), 0xAE42_6082);
    }

    #[test]
    fn test_png_structure() {
        let png = encode_gray(3, 2, &[0, 64, 128, 192, 255, 10]);
        assert_eq!(&png[..8], &SIGNATURE);
        assert_eq!(&png[12..16], b"IHDR");
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 3);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 2);
        assert_eq!(&png[png.len() - 12..png.len() - 8], &[0, 0, 0, 0]);
        assert_eq!(&png[png.len() - 8..png.len() - 4], b"IEND");

        // IDAT inflates back to filtered rows
        let idat_len = u32::from_be_bytes([png[33], png[34], png[35], png[36]]) as usize;
        assert_eq!(&png[37..41], b"IDAT");
        let raw = miniz_oxide::inflate::decompress_to_vec_zlib(&png[41..41 + idat_len]).unwrap();
        assert_eq!(raw, vec![0, 0, 64, 128, 0, 192, 255, 10]);
    }

    #[test]
    fn test_rasterize_layout_and_polarity() {
        let mut c = powered();
        write(&mut c, false, 0x38);
        write(&mut c, false, 0x0C);
        write(&mut c, true, 0xFF); // full block: rows 0-7 lit in 5x8 mode

        let (w, h, lit) = rasterize(c.lines(), 2, true);
        assert_eq!(w as usize, 40 * 5 * 2);
        assert_eq!(h as usize, (8 + 1 + 8) * 2);
        assert_eq!(lit[0], BACKLIT_DOT);
        assert_eq!(lit[5 * 2], BACKLIT_PANEL);
        // gap row stays panel-coloured
        assert_eq!(lit[(8 * 2) * w as usize], BACKLIT_PANEL);

        let (_, _, dark) = rasterize(c.lines(), 1, false);
        assert_eq!(dark[0], UNLIT_DOT);
        assert_eq!(dark[5], UNLIT_PANEL);
    }

    #[test]
    fn test_save_screenshot() {
        let mut c = powered();
        write(&mut c, false, 0x0F);
        let path = std::env::temp_dir().join(format!("charlcd-shot-{}.png", std::process::id()));
        c.save_screenshot(&path, 1).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(&bytes[..8], &SIGNATURE);
    }
}

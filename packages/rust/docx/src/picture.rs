//! Picture decoding for embedded images.
//!
//! `docx-rs` stores every picture as a PNG part, so other formats are
//! re-encoded before embedding.

use std::io::Cursor;

use image::{GenericImageView, ImageFormat, ImageResult};

/// EMUs per inch in OOXML drawing units.
pub const EMU_PER_INCH: f64 = 914_400.0;

/// PNG bytes ready to embed, with the intrinsic pixel size.
#[derive(Debug, Clone)]
pub struct Picture {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl Picture {
    /// Decode `bytes` in any supported format and normalize to PNG.
    pub fn decode(bytes: Vec<u8>) -> ImageResult<Self> {
        let format = image::guess_format(&bytes)?;
        let decoded = image::load_from_memory(&bytes)?;
        let (width_px, height_px) = decoded.dimensions();

        let png = if format == ImageFormat::Png {
            bytes
        } else {
            let mut out = Cursor::new(Vec::new());
            decoded.write_to(&mut out, ImageFormat::Png)?;
            out.into_inner()
        };

        Ok(Self {
            png,
            width_px,
            height_px,
        })
    }

    /// Display size in EMU for a picture `width_in` inches wide, keeping aspect ratio.
    pub fn scaled_emu(&self, width_in: f64) -> (u32, u32) {
        let width = width_in * EMU_PER_INCH;
        let height = width * f64::from(self.height_px) / f64::from(self.width_px.max(1));
        (width.round() as u32, height.round() as u32)
    }
}

#[cfg(test)]
pub(crate) fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(width, height);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_is_embedded_unchanged() {
        let bytes = encoded(40, 20, ImageFormat::Png);
        let picture = Picture::decode(bytes.clone()).unwrap();
        assert_eq!((picture.width_px, picture.height_px), (40, 20));
        assert_eq!(picture.png, bytes);
    }

    #[test]
    fn jpeg_is_reencoded_as_png() {
        let jpeg = encoded(16, 32, ImageFormat::Jpeg);
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let picture = Picture::decode(jpeg).unwrap();
        assert_eq!((picture.width_px, picture.height_px), (16, 32));
        assert_eq!(image::guess_format(&picture.png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Picture::decode(b"not an image".to_vec()).is_err());
        assert!(Picture::decode(Vec::new()).is_err());
    }

    #[test]
    fn scaling_keeps_aspect_ratio() {
        let picture = Picture::decode(encoded(400, 200, ImageFormat::Png)).unwrap();
        assert_eq!(picture.scaled_emu(2.0), (1_828_800, 914_400));
    }
}

//! Snapshot codec
//!
//! Buffers travel as `data:image/png;base64,...` strings, the portable
//! encoding shared by the cache, the remote store and the sync protocol.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbaImage};

use crate::error::{Error, Result};

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Encode a raster buffer as a PNG data URL
pub fn encode_png_data_url(img: &RgbaImage) -> Result<String> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(format!("{DATA_URL_PREFIX}{}", STANDARD.encode(&bytes)))
}

/// Decode a PNG data URL (or bare base64 PNG) back into a raster buffer
pub fn decode_data_url(value: &str) -> Result<RgbaImage> {
    let trimmed = value.trim();
    let payload = match trimmed.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => trimmed,
    };
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| Error::Decode(e.to_string()))?;
    let img = image::load_from_memory(&bytes).map_err(|e| Error::Decode(e.to_string()))?;
    Ok(img.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let mut img = RgbaImage::new(8, 8);
        img.put_pixel(3, 4, image::Rgba([255, 0, 127, 255]));

        let url = encode_png_data_url(&img).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));

        let decoded = decode_data_url(&url).unwrap();
        assert_eq!(decoded.dimensions(), (8, 8));
        assert_eq!(decoded.get_pixel(3, 4).0, [255, 0, 127, 255]);
    }

    #[test]
    fn test_decode_bare_base64() {
        let img = RgbaImage::new(2, 2);
        let url = encode_png_data_url(&img).unwrap();
        let bare = url.strip_prefix("data:image/png;base64,").unwrap();
        let decoded = decode_data_url(bare).unwrap();
        assert_eq!(decoded.dimensions(), (2, 2));
    }

    #[test]
    fn test_decode_corrupt_payload() {
        assert!(decode_data_url("data:image/png;base64,not-base64!").is_err());
        let garbage = STANDARD.encode(b"definitely not a png");
        assert!(decode_data_url(&garbage).is_err());
    }
}

//! Image payload decoding.
//!
//! Payloads arrive as raw base64 or as a data-URI
//! (`data:image/png;base64,<payload>`). Either way the result is an RGB8
//! buffer in memory; nothing here touches the filesystem.

use base64::{engine::general_purpose, Engine as _};
use image::RgbImage;
use thiserror::Error;

/// Errors raised while turning a payload string into pixels.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unsupported or corrupt image data: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode a raw-base64 or data-URI image payload into an RGB8 buffer.
///
/// A data-URI prefix is stripped up to and including the first comma
/// before base64 decoding.
pub fn decode_image(payload: &str) -> Result<RgbImage, DecodeError> {
    let encoded = match payload.split_once(',') {
        Some((_prefix, rest)) => rest,
        None => payload,
    };

    let bytes = general_purpose::STANDARD.decode(encoded.trim())?;
    let img = image::load_from_memory(&bytes)?;

    Ok(img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn png_base64(width: u32, height: u32) -> String {
        let img = RgbImage::from_pixel(width, height, Rgb([180, 40, 90]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_decode_raw_base64_round_trip() {
        let decoded = decode_image(&png_base64(12, 7)).unwrap();
        assert_eq!(decoded.width(), 12);
        assert_eq!(decoded.height(), 7);
    }

    #[test]
    fn test_decode_data_uri() {
        let payload = format!("data:image/png;base64,{}", png_base64(5, 5));
        let decoded = decode_image(&payload).unwrap();
        assert_eq!(decoded.dimensions(), (5, 5));
    }

    #[test]
    fn test_decode_preserves_pixels() {
        let decoded = decode_image(&png_base64(3, 3)).unwrap();
        assert_eq!(decoded.get_pixel(1, 1), &Rgb([180, 40, 90]));
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let err = decode_image("!!! definitely not base64 !!!").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn test_non_image_bytes_are_rejected() {
        let payload = general_purpose::STANDARD.encode(b"just some text");
        let err = decode_image(&payload).unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
    }
}

//! Source decoding with EXIF orientation lookup.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageDecoder, ImageError, ImageReader};
use tracing::warn;

use super::{DecodeError, DecodedImage, Orientation};
use crate::icc;

/// Decode source bytes (JPEG or PNG) into 8-bit sRGB pixels.
///
/// The stored pixel layout is returned as-is; no orientation is applied.
/// An embedded ICC profile is kept on the result. Pixels are not converted,
/// so a source tagged with another space is logged and rendered as sRGB.
///
/// # Errors
///
/// Returns `DecodeError::Empty` for an empty buffer,
/// `DecodeError::InvalidFormat` if the container is not recognized, and
/// `DecodeError::CorruptedFile` if decoding fails part way.
pub fn decode_source(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }

    let mut decoder = reader.into_decoder().map_err(|e| match e {
        ImageError::Unsupported(_) => DecodeError::InvalidFormat,
        other => DecodeError::CorruptedFile(other.to_string()),
    })?;
    let icc_profile = decoder.icc_profile().unwrap_or_else(|e| {
        warn!(error = %e, "Unreadable ICC profile, treating source as sRGB");
        None
    });
    let img = DynamicImage::from_decoder(decoder)
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let decoded = DecodedImage::from_rgb(img.into_rgb8()).with_icc_profile(icc_profile);
    if !decoded.is_srgb() {
        let description = decoded
            .icc_profile
            .as_deref()
            .and_then(icc::profile_description);
        warn!(
            profile = description.as_deref().unwrap_or("unnamed"),
            "Source is tagged with a non-sRGB profile; pixels are rendered as sRGB"
        );
    }
    Ok(decoded)
}

/// Read the EXIF orientation embedded in source bytes.
///
/// Returns `Orientation::Normal` if no EXIF data is found or orientation
/// cannot be determined.
pub fn read_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);

    match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from_exif)
            .unwrap_or_default(),
        Err(_) => Orientation::Normal,
    }
}

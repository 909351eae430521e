//! Source acquisition: bytes from the asset store to 8-bit sRGB pixels.
//!
//! Decoding only acquires pixels and reads the EXIF orientation tag. The
//! orientation is *not* applied here; the geometry normalizer owns every
//! change of layout so that all reorientation happens in one place.
//!
//! # Examples
//!
//! ```ignore
//! use luma_core::decode::{decode_source, read_orientation};
//!
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! let image = decode_source(&bytes).unwrap();
//! let orientation = read_orientation(&bytes);
//! println!("Decoded {}x{} image ({:?})", image.width, image.height, orientation);
//! ```

mod source;
mod types;

pub use source::{decode_source, read_orientation};
pub use types::{DecodeError, DecodedImage, Orientation};

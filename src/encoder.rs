//! # Image Encoder Module
//!
//! Abstraction over writing a colour raster to a compressed image file, with a PNG
//! implementation backed by the `image` crate.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::Path;

use image::{ColorType, ImageFormat};

use crate::error::{Error, Result};
use crate::frame::ColorImage;

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

/// Encodes colour frames to files.
///
/// Encoders are shared between persistence workers, so they must be usable from many threads.
pub trait ImageEncoder: Send + Sync {
    /// The extension (without the dot) of the files this encoder writes.
    fn extension(&self) -> &'static str;

    /// Encode `image` and write it to `path`.
    fn encode(&self, path: &Path, image: &ColorImage) -> Result<()>;
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTS
// -----------------------------------------------------------------------------------------------

/// Writes PNG files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngEncoder;

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl ImageEncoder for PngEncoder {
    fn extension(&self) -> &'static str {
        "png"
    }

    fn encode(&self, path: &Path, raster: &ColorImage) -> Result<()> {
        let kind = color_type(raster)?;

        image::save_buffer_with_format(
            path,
            &raster.packed(),
            raster.width,
            raster.height,
            kind,
            ImageFormat::Png,
        )
        .map_err(|e| Error::Encode {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Pick the 8 bit colour type matching the image's channel count.
fn color_type(image: &ColorImage) -> Result<ColorType> {
    let unsupported = || Error::UnsupportedPixelLayout {
        width: image.width,
        height: image.height,
        bytes_per_pixel: image.bytes_per_pixel,
        stride: image.stride,
        len: image.data.len(),
    };

    if !image.is_well_formed() {
        return Err(unsupported());
    }

    match image.bytes_per_pixel {
        1 => Ok(ColorType::L8),
        2 => Ok(ColorType::La8),
        3 => Ok(ColorType::Rgb8),
        4 => Ok(ColorType::Rgba8),
        _ => Err(unsupported()),
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(width: u32, height: u32) -> ColorImage {
        ColorImage {
            width,
            height,
            bytes_per_pixel: 3,
            stride: width * 3,
            data: vec![128; (width * height * 3) as usize],
        }
    }

    #[test]
    fn test_color_types() {
        assert_eq!(color_type(&rgb(4, 2)).unwrap(), ColorType::Rgb8);

        let mut img = rgb(4, 2);
        img.bytes_per_pixel = 6;
        img.stride = 24;
        img.data = vec![0; 48];
        assert!(matches!(
            color_type(&img),
            Err(Error::UnsupportedPixelLayout { bytes_per_pixel: 6, .. })
        ));
    }

    #[test]
    fn test_encode_into_missing_directory_fails() {
        let path = std::env::temp_dir()
            .join("rs_recorder_no_such_dir")
            .join("missing")
            .join("0.png");

        let err = PngEncoder.encode(&path, &rgb(4, 2)).unwrap_err();
        assert!(matches!(err, Error::Encode { .. }));
    }

    #[test]
    fn test_encode_writes_readable_png() {
        let dir = std::env::temp_dir().join(format!("rs_recorder_png_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frame.png");

        PngEncoder.encode(&path, &rgb(4, 2)).unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (4, 2));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

//! Cover downscaling backed by the `image` crate.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use blog_core::ports::{ImageError, ImageProcessor};

/// Decodes, height-caps and re-encodes raster covers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterImageProcessor;

impl RasterImageProcessor {
    pub fn new() -> Self {
        Self
    }

    fn encode(image: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, ImageError> {
        let mut buffer = Vec::new();
        match format {
            ImageFormat::Jpeg => {
                // JPEG carries no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
                rgb.write_with_encoder(encoder)
                    .map_err(|e| ImageError::Encode(e.to_string()))?;
            }
            other => {
                image
                    .write_to(&mut Cursor::new(&mut buffer), other)
                    .map_err(|e| ImageError::Encode(e.to_string()))?;
            }
        }
        Ok(buffer)
    }
}

impl ImageProcessor for RasterImageProcessor {
    fn downscale(
        &self,
        bytes: &[u8],
        extension: &str,
        max_height: u32,
        quality: u8,
    ) -> Result<Vec<u8>, ImageError> {
        let format = ImageFormat::from_extension(extension)
            .filter(|format| {
                matches!(
                    format,
                    ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif | ImageFormat::WebP
                )
            })
            .ok_or_else(|| ImageError::UnsupportedFormat(extension.to_string()))?;

        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| ImageError::Decode(e.to_string()))?;

        let scaled = if max_height > 0 && decoded.height() > max_height {
            // Width is unbounded so only the height constrains the fit
            decoded.resize(u32::MAX, max_height, FilterType::Lanczos3)
        } else {
            decoded
        };

        tracing::debug!(
            extension = %extension,
            width = scaled.width(),
            height = scaled.height(),
            "Re-encoding cover image"
        );

        Self::encode(&scaled, format, quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_tall_image_is_capped_keeping_aspect_ratio() {
        let processor = RasterImageProcessor::new();
        let result = processor.downscale(&png(200, 600), "png", 300, 75).unwrap();

        let decoded = image::load_from_memory(&result).unwrap();
        assert_eq!(decoded.height(), 300);
        assert_eq!(decoded.width(), 100);
    }

    #[test]
    fn test_short_image_keeps_size() {
        let processor = RasterImageProcessor::new();
        let result = processor.downscale(&png(40, 20), "png", 300, 75).unwrap();

        let decoded = image::load_from_memory(&result).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 20));
    }

    #[test]
    fn test_jpeg_output_uses_jpeg_format() {
        let processor = RasterImageProcessor::new();
        // A PNG payload under a .jpg name fails to decode as JPEG
        assert!(matches!(
            processor.downscale(&png(10, 10), "jpg", 300, 75),
            Err(ImageError::Decode(_))
        ));

        let rgb: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(30, 400, Rgb([10, 20, 30]));
        let mut jpeg = Vec::new();
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();

        let result = processor.downscale(&jpeg, "jpeg", 300, 75).unwrap();
        assert_eq!(image::guess_format(&result).unwrap(), ImageFormat::Jpeg);
        assert_eq!(image::load_from_memory(&result).unwrap().height(), 300);
    }

    #[test]
    fn test_unsupported_extension() {
        let processor = RasterImageProcessor::new();
        assert!(matches!(
            processor.downscale(b"%PDF", "pdf", 300, 75),
            Err(ImageError::UnsupportedFormat(_))
        ));
    }
}

//! Image processing port.

/// Re-encodes uploaded covers before they are stored.
pub trait ImageProcessor: Send + Sync {
    /// Cap the image height at `max_height` keeping its aspect ratio, then
    /// re-encode in the format implied by `extension`.
    fn downscale(
        &self,
        bytes: &[u8],
        extension: &str,
        max_height: u32,
        quality: u8,
    ) -> Result<Vec<u8>, ImageError>;
}

/// Image processing errors.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),
}

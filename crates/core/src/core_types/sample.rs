//! Request-scoped image buffer
//!
//! Uploads are decoded once at the boundary, resized to a fixed square side
//! and kept as both RGB8 pixels (for colour analysis) and a PNG encoding (for
//! hosted inference endpoints). Nothing here is ever persisted.

use crate::error::InputError;
use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};
use rustc_hash::FxHasher;
use std::fmt;
use std::hash::Hasher;
use std::io::Cursor;

/// Default square side the pipeline resizes uploads to
pub const DEFAULT_IMAGE_SIDE: u32 = 512;

/// Default upload limit (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Boundary checks applied to raw uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
    /// Square side in pixels after resizing
    pub side: u32,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            side: DEFAULT_IMAGE_SIDE,
        }
    }
}

/// Decoded RGB8 image plus its PNG encoding
#[derive(Clone)]
pub struct ImageSample {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    encoded: Vec<u8>,
}

impl ImageSample {
    /// Validate, decode and resize an uploaded file
    ///
    /// # Errors
    /// [`InputError`] for empty, oversized or undecodable uploads.
    pub fn from_upload(bytes: &[u8], limits: ImageLimits) -> Result<Self, InputError> {
        if bytes.is_empty() {
            return Err(InputError::Empty);
        }
        if bytes.len() > limits.max_upload_bytes {
            return Err(InputError::TooLarge {
                size: bytes.len(),
                limit: limits.max_upload_bytes,
            });
        }

        let format =
            image::guess_format(bytes).map_err(|e| InputError::NotAnImage(e.to_string()))?;
        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| InputError::NotAnImage(e.to_string()))?;

        let side = limits.side.max(1);
        let resized = decoded
            .resize_exact(side, side, FilterType::Triangle)
            .to_rgb8();
        Self::from_rgb_image(resized)
    }

    /// Wrap an already-decoded RGB8 buffer (row-major, 3 bytes per pixel)
    ///
    /// # Errors
    /// [`InputError::BufferMismatch`] when the buffer length disagrees with
    /// the dimensions.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, InputError> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(InputError::BufferMismatch {
                width,
                height,
                actual: pixels.len(),
            });
        }
        let actual = pixels.len();
        let img = RgbImage::from_raw(width, height, pixels).ok_or(InputError::BufferMismatch {
            width,
            height,
            actual,
        })?;
        Self::from_rgb_image(img)
    }

    /// Solid-colour image, mostly useful for tests and demos
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, InputError> {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::from_rgb(width, height, pixels)
    }

    fn from_rgb_image(img: RgbImage) -> Result<Self, InputError> {
        let mut encoded = Vec::new();
        img.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
            .map_err(|e| InputError::NotAnImage(e.to_string()))?;
        let (width, height) = img.dimensions();
        Ok(Self {
            width,
            height,
            pixels: img.into_raw(),
            encoded,
        })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total number of pixels
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Raw RGB8 bytes, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// PNG encoding sent to hosted endpoints
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// RGB triple at a linear pixel index
    pub fn pixel(&self, index: usize) -> Option<[u8; 3]> {
        let start = index * 3;
        self.pixels
            .get(start..start + 3)
            .map(|p| [p[0], p[1], p[2]])
    }

    /// Stable seed derived from the pixel content
    ///
    /// Colour sampling uses this so repeated analysis of the same image draws
    /// the same pixels.
    pub fn content_seed(&self) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write_u32(self.width);
        hasher.write_u32(self.height);
        hasher.write(&self.pixels);
        hasher.finish()
    }
}

impl fmt::Debug for ImageSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSample")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("encoded_bytes", &self.encoded.len())
            .finish_non_exhaustive()
    }
}

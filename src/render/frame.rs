use std::path::Path;

use image::{ImageBuffer, Rgb, RgbImage};

use crate::error::AssetError;

/// Represents a single output frame
///
/// A thin wrapper around an RGB image buffer. The renderer reuses one frame
/// for the whole export and the encoder reads its raw bytes.
#[derive(Clone, Debug)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        Self {
            buffer: ImageBuffer::new(width, height),
        }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self {
            buffer: ImageBuffer::from_pixel(width, height, Rgb(color)),
        }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Fill the whole frame with one color
    pub fn clear(&mut self, color: [u8; 3]) {
        for pixel in self.buffer.pixels_mut() {
            *pixel = Rgb(color);
        }
    }

    /// Overwrite this frame with the contents of `other`, reusing the allocation
    /// when the sizes match
    pub fn copy_from(&mut self, other: &Frame) {
        if self.buffer.dimensions() == other.buffer.dimensions() {
            self.buffer.copy_from_slice(other.buffer.as_raw());
        } else {
            self.buffer = other.buffer.clone();
        }
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    pub fn as_image_mut(&mut self) -> &mut RgbImage {
        &mut self.buffer
    }

    /// Packed `rgb24` bytes, row-major
    pub fn as_raw(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.buffer.save(path)
    }
}

/// A decoded scene image, ready to be resampled into frames
#[derive(Clone, Debug)]
pub struct SourceImage {
    image: RgbImage,
}

impl SourceImage {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Decode an image file. Blocking.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|_| AssetError::ImageLoad {
            path: path.display().to_string(),
        })?;
        Ok(Self::new(image.to_rgb8()))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }
}

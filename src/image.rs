use ndarray::Array3;

use crate::error::Error;

/// Interleaved 8-bit pixel buffer laid out as (row, column, channel).
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pixels: Array3<u8>,
}

impl Image {
    pub fn from_raw(width: u32, height: u32, channels: u32, data: Vec<u8>) -> Result<Self, Error> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(Error::InvalidImage(format!(
                "dimensions must be positive, got {}x{}x{}",
                width, height, channels
            )));
        }

        let pixels = Array3::from_shape_vec(
            (height as usize, width as usize, channels as usize),
            data,
        )?;

        Ok(Self { pixels })
    }

    pub fn from_array(pixels: Array3<u8>) -> Result<Self, Error> {
        if pixels.is_empty() {
            return Err(Error::InvalidImage("empty pixel array".into()));
        }

        Ok(Self { pixels })
    }

    /// Single channel image filled by `f(x, y)`.
    pub fn gray_from_fn<F: Fn(u32, u32) -> u8>(width: u32, height: u32, f: F) -> Result<Self, Error> {
        let pixels = Array3::from_shape_fn((height as usize, width as usize, 1), |(y, x, _)| {
            f(x as u32, y as u32)
        });

        Self::from_array(pixels)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.shape()[1] as u32
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.shape()[0] as u32
    }

    #[inline]
    pub fn channels(&self) -> u32 {
        self.pixels.shape()[2] as u32
    }

    #[inline]
    pub fn dims(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    #[inline]
    pub fn pixels(&self) -> &Array3<u8> {
        &self.pixels
    }

    /// Channel-averaged intensity in [0, 1]. Coordinates are clamped to the image.
    pub fn intensity(&self, x: usize, y: usize) -> f32 {
        let x = x.min(self.pixels.shape()[1] - 1);
        let y = y.min(self.pixels.shape()[0] - 1);
        let channels = self.pixels.shape()[2];

        let sum: u32 = (0..channels).map(|c| self.pixels[[y, x, c]] as u32).sum();

        sum as f32 / (channels as f32 * 255.0)
    }
}

use thiserror::Error;

/// Errors from constructing image containers out of raw buffers.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("invalid image buffer length (expected {expected} bytes, got {got})")]
    InvalidBufferLength { expected: usize, got: usize },

    #[error("image dimensions must be non-zero (width={width}, height={height})")]
    EmptyDimensions { width: usize, height: usize },

    #[error("image sizes differ ({a_width}x{a_height} vs {b_width}x{b_height})")]
    SizeMismatch {
        a_width: usize,
        a_height: usize,
        b_width: usize,
        b_height: usize,
    },
}

/// Borrowed single-channel image, row-major, `len = width * height`.
///
/// Used both for grayscale data and for binary masks, where a set pixel is
/// any non-zero value (writers use 255).
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

/// Owned single-channel image.
#[derive(Clone, Debug)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::EmptyDimensions { width, height });
        }
        let expected = width * height;
        if data.len() != expected {
            return Err(ImageError::InvalidBufferLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }
}

impl GrayImageView<'_> {
    /// Pixel value with out-of-bounds reads clamped to 0.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[y as usize * self.width + x as usize]
    }

    /// True if the pixel is inside the image and non-zero.
    #[inline]
    pub fn is_set(&self, x: i32, y: i32) -> bool {
        self.get(x, y) != 0
    }
}

/// Borrowed 3-channel image, row-major interleaved, `len = width * height * 3`.
///
/// The detection pipeline stores frames in YCrCb channel order.
#[derive(Clone, Copy, Debug)]
pub struct ColorImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

/// Owned 3-channel image in YCrCb channel order.
#[derive(Clone, Debug)]
pub struct ColorImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl ColorImage {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 3],
        }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::EmptyDimensions { width, height });
        }
        let expected = width * height * 3;
        if data.len() != expected {
            return Err(ImageError::InvalidBufferLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn view(&self) -> ColorImageView<'_> {
        ColorImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, value: [u8; 3]) {
        let idx = (y * self.width + x) * 3;
        self.data[idx..idx + 3].copy_from_slice(&value);
    }
}

impl ColorImageView<'_> {
    /// Pixel value; out-of-bounds reads return black.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> [u8; 3] {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return [0; 3];
        }
        let idx = (y as usize * self.width + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_validates_buffer_length() {
        assert!(GrayImage::from_raw(4, 4, vec![0; 16]).is_ok());
        assert!(matches!(
            GrayImage::from_raw(4, 4, vec![0; 15]),
            Err(ImageError::InvalidBufferLength {
                expected: 16,
                got: 15
            })
        ));
        assert!(matches!(
            ColorImage::from_raw(2, 2, vec![0; 11]),
            Err(ImageError::InvalidBufferLength { .. })
        ));
        assert!(matches!(
            ColorImage::from_raw(0, 2, vec![]),
            Err(ImageError::EmptyDimensions { .. })
        ));
    }

    #[test]
    fn out_of_bounds_reads_are_zero() {
        let mut im = GrayImage::zeros(3, 3);
        im.set(1, 1, 200);
        let v = im.view();
        assert_eq!(v.get(1, 1), 200);
        assert_eq!(v.get(-1, 0), 0);
        assert_eq!(v.get(3, 0), 0);
        assert!(!v.is_set(0, 5));

        let mut c = ColorImage::zeros(2, 2);
        c.set_pixel(1, 0, [10, 20, 30]);
        assert_eq!(c.view().pixel(1, 0), [10, 20, 30]);
        assert_eq!(c.view().pixel(5, 5), [0, 0, 0]);
    }
}

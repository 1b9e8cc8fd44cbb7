// ABOUTME: Packed RGBA8 frame buffer used as pass input and output.
// ABOUTME: Row-major, four bytes per pixel, dimensions fixed until reallocated.

use crt_core::Rgba8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("Frame buffer has zero size ({width}x{height})")]
    ZeroSize { width: u32, height: u32 },

    #[error("Frame buffer of {width}x{height} does not fit in memory")]
    TooLarge { width: u32, height: u32 },

    #[error("Expected {expected} bytes of RGBA data, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Buffer size mismatch: {0:?} vs {1:?}")]
    SizeMismatch((u32, u32), (u32, u32)),

    #[error("Frame buffers have not been allocated yet")]
    NotPrepared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

fn byte_len(width: u32, height: u32) -> Result<usize, BufferError> {
    if width == 0 || height == 0 {
        return Err(BufferError::ZeroSize { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(BufferError::TooLarge { width, height })
}

impl FrameBuffer {
    /// Allocate a transparent black buffer
    pub fn new(width: u32, height: u32) -> Result<Self, BufferError> {
        let len = byte_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Allocate a buffer with every pixel set to `color`
    pub fn filled(width: u32, height: u32, color: Rgba8) -> Result<Self, BufferError> {
        let mut buffer = Self::new(width, height)?;
        buffer.fill(color);
        Ok(buffer)
    }

    /// Wrap existing packed RGBA bytes
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, BufferError> {
        let expected = byte_len(width, height)?;
        if data.len() != expected {
            return Err(BufferError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn pixels(&self) -> &[Rgba8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgba8] {
        bytemuck::cast_slice_mut(&mut self.data)
    }

    /// Pixel at (x, y), None when out of bounds
    pub fn get(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels()[y as usize * self.width as usize + x as usize])
    }

    pub fn set(&mut self, x: u32, y: u32, color: Rgba8) {
        if x < self.width && y < self.height {
            let idx = y as usize * self.width as usize + x as usize;
            self.pixels_mut()[idx] = color;
        }
    }

    pub fn fill(&mut self, color: Rgba8) {
        self.pixels_mut().fill(color);
    }

    /// Overwrite contents from another buffer of the same size
    pub fn copy_from(&mut self, other: &FrameBuffer) -> Result<(), BufferError> {
        if self.size() != other.size() {
            return Err(BufferError::SizeMismatch(self.size(), other.size()));
        }
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    /// Reallocate for new dimensions. Contents are cleared when the size changes.
    /// Returns true if a reallocation happened.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<bool, BufferError> {
        if self.size() == (width, height) {
            return Ok(false);
        }
        let len = byte_len(width, height)?;
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(len, 0);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_rejected() {
        assert_eq!(
            FrameBuffer::new(0, 10),
            Err(BufferError::ZeroSize {
                width: 0,
                height: 10
            })
        );
    }

    #[test]
    fn from_rgba_checks_length() {
        let err = FrameBuffer::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            BufferError::LengthMismatch {
                expected: 16,
                actual: 15
            }
        );
        assert!(FrameBuffer::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn get_and_set_are_row_major() {
        let mut buffer = FrameBuffer::new(3, 2).unwrap();
        buffer.set(2, 1, Rgba8::rgba(10, 20, 30, 40));
        assert_eq!(buffer.get(2, 1), Some(Rgba8::rgba(10, 20, 30, 40)));
        assert_eq!(&buffer.as_bytes()[20..24], &[10, 20, 30, 40]);
        assert_eq!(buffer.get(3, 0), None);
    }

    #[test]
    fn resize_reallocates_only_on_change() {
        let mut buffer = FrameBuffer::filled(4, 4, Rgba8::WHITE).unwrap();
        assert!(!buffer.resize(4, 4).unwrap());
        assert_eq!(buffer.get(0, 0), Some(Rgba8::WHITE));

        assert!(buffer.resize(8, 2).unwrap());
        assert_eq!(buffer.size(), (8, 2));
        assert_eq!(buffer.as_bytes().len(), 64);
        assert_eq!(buffer.get(0, 0), Some(Rgba8::CLEAR));
    }

    #[test]
    fn copy_from_requires_same_size() {
        let mut a = FrameBuffer::new(2, 2).unwrap();
        let b = FrameBuffer::filled(2, 2, Rgba8::WHITE).unwrap();
        a.copy_from(&b).unwrap();
        assert_eq!(a, b);

        let c = FrameBuffer::new(3, 2).unwrap();
        assert!(a.copy_from(&c).is_err());
    }
}

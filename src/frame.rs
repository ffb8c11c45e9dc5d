//! Owned video frames.
//!
//! A `Frame` is the unit of work handed from a frame source to the detector:
//! tightly packed RGB bytes plus dimensions. Sources hand frames off one at a
//! time and keep nothing behind.

/// One RGB frame: `width * height * 3` bytes, row-major, no padding.
#[derive(Clone, Debug)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Expected byte length for the frame dimensions.
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// Raw byte length (for buffer accounting).
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_len_matches_rgb_layout() {
        assert_eq!(Frame::expected_len(640, 480), 640 * 480 * 3);
        let frame = Frame::new(vec![0u8; Frame::expected_len(4, 2)], 4, 2);
        assert_eq!(frame.byte_len(), 24);
    }
}

//! 1-bit frames and the display wire format.
//!
//! Renderers hand us bitmaps in the usual image-library layout: row-major,
//! most-significant bit first, every row padded to a whole byte. The panel
//! wants something else: each row mirrored, and the whole grid packed
//! least-significant bit first with no row padding.

use thiserror::Error;

/// Panel width in pixels
pub const DISPLAY_WIDTH: usize = 96;
/// Panel height in pixels
pub const DISPLAY_HEIGHT: usize = 38;
/// Size of one encoded frame on the wire
pub const WIRE_FRAME_LEN: usize = wire_len(DISPLAY_WIDTH, DISPLAY_HEIGHT);

/// Errors raised while turning external bytes into a [`Frame`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Expected {expected} bytes for a {width}x{height} bitmap, got {actual}")]
    LengthMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Expected {expected} pixels, got {actual}")]
    PixelCountMismatch { expected: usize, actual: usize },

    #[error("Non-binary pixel value {value:?} at index {index}")]
    NonBinary { index: usize, value: char },
}

/// Number of bytes a `width`x`height` frame occupies on the wire
pub const fn wire_len(width: usize, height: usize) -> usize {
    (width * height + 7) / 8
}

const fn row_stride(width: usize) -> usize {
    (width + 7) / 8
}

/// An immutable 1-bit-per-pixel image
///
/// Stored in the renderer representation, so `as_raw` is free and
/// re-serializing for a renderer-protocol consumer needs no conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    bits: Vec<u8>,
}

impl Frame {
    /// Parse a raw bitmap in the renderer representation
    pub fn decode(raw: &[u8], width: usize, height: usize) -> Result<Self, FormatError> {
        check_dimensions(width, height)?;

        let expected = row_stride(width) * height;
        if raw.len() != expected {
            return Err(FormatError::LengthMismatch {
                width,
                height,
                expected,
                actual: raw.len(),
            });
        }

        Ok(Self {
            width,
            height,
            bits: raw.to_vec(),
        })
    }

    /// Build a frame from pixels given in row-major order
    pub fn from_pixels<I>(width: usize, height: usize, pixels: I) -> Result<Self, FormatError>
    where
        I: IntoIterator<Item = bool>,
    {
        check_dimensions(width, height)?;

        let stride = row_stride(width);
        let mut bits = vec![0u8; stride * height];
        let mut count = 0;

        for (index, on) in pixels.into_iter().enumerate() {
            count = index + 1;
            if count > width * height {
                continue;
            }
            if on {
                let (x, y) = (index % width, index / width);
                bits[y * stride + x / 8] |= 0x80 >> (x % 8);
            }
        }

        if count != width * height {
            return Err(FormatError::PixelCountMismatch {
                expected: width * height,
                actual: count,
            });
        }

        Ok(Self {
            width,
            height,
            bits,
        })
    }

    /// Build a frame from a string of `'0'` and `'1'` characters, row-major
    pub fn from_bit_string(text: &str, width: usize, height: usize) -> Result<Self, FormatError> {
        if let Some((index, value)) = text.chars().enumerate().find(|(_, c)| *c != '0' && *c != '1') {
            return Err(FormatError::NonBinary { index, value });
        }

        Self::from_pixels(width, height, text.chars().map(|c| c == '1'))
    }

    /// Build a frame by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> bool) -> Result<Self, FormatError> {
        Self::from_pixels(
            width,
            height,
            (0..width * height).map(|i| f(i % width, i / width)),
        )
    }

    /// An all-off frame
    pub fn blank(width: usize, height: usize) -> Result<Self, FormatError> {
        Self::from_fn(width, height, |_, _| false)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the pixel at column `x`, row `y` is lit
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let byte = self.bits[y * row_stride(self.width) + x / 8];
        byte & (0x80 >> (x % 8)) != 0
    }

    /// The renderer representation of this frame
    pub fn as_raw(&self) -> &[u8] {
        &self.bits
    }

    /// Encode into the panel's wire format
    ///
    /// # Panics
    ///
    /// If the frame is not exactly `DISPLAY_WIDTH`x`DISPLAY_HEIGHT`. A frame
    /// of any other size means a renderer broke the fixed-resolution contract.
    pub fn encode(&self) -> Vec<u8> {
        assert!(
            self.width == DISPLAY_WIDTH && self.height == DISPLAY_HEIGHT,
            "frame is {}x{}, the display is {}x{}",
            self.width,
            self.height,
            DISPLAY_WIDTH,
            DISPLAY_HEIGHT
        );

        let mut wire = vec![0u8; wire_len(self.width, self.height)];
        for y in 0..self.height {
            for x in 0..self.width {
                // The panel is mounted mirrored
                if self.pixel(self.width - 1 - x, y) {
                    let index = y * self.width + x;
                    wire[index / 8] |= 1 << (index % 8);
                }
            }
        }
        wire
    }

    /// Inverse of [`Frame::encode`]
    pub fn decode_wire(wire: &[u8], width: usize, height: usize) -> Result<Self, FormatError> {
        check_dimensions(width, height)?;

        let expected = wire_len(width, height);
        if wire.len() != expected {
            return Err(FormatError::LengthMismatch {
                width,
                height,
                expected,
                actual: wire.len(),
            });
        }

        Self::from_fn(width, height, |x, y| {
            let index = y * width + (width - 1 - x);
            wire[index / 8] & (1 << (index % 8)) != 0
        })
    }
}

fn check_dimensions(width: usize, height: usize) -> Result<(), FormatError> {
    if width == 0 || height == 0 {
        return Err(FormatError::InvalidDimensions { width, height });
    }
    Ok(())
}

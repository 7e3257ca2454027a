use crate::frame::{FormatError, Frame, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use clap::ValueEnum;

/// Fixed images for checking the panel wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestPattern {
    Checkerboard,
    Border,
    /// Only the top-left pixel; shows which way the panel is mirrored
    Corner,
    Fill,
    Clear,
}

impl TestPattern {
    pub fn to_frame(self) -> Result<Frame, FormatError> {
        let lit = move |x: usize, y: usize| match self {
            TestPattern::Checkerboard => (x + y) % 2 == 0,
            TestPattern::Border => {
                x == 0 || y == 0 || x == DISPLAY_WIDTH - 1 || y == DISPLAY_HEIGHT - 1
            }
            TestPattern::Corner => x == 0 && y == 0,
            TestPattern::Fill => true,
            TestPattern::Clear => false,
        };

        Frame::from_fn(DISPLAY_WIDTH, DISPLAY_HEIGHT, lit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_count(frame: &Frame) -> usize {
        (0..DISPLAY_HEIGHT)
            .flat_map(|y| (0..DISPLAY_WIDTH).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.pixel(x, y))
            .count()
    }

    #[test]
    fn test_patterns() {
        assert_eq!(lit_count(&TestPattern::Clear.to_frame().unwrap()), 0);
        assert_eq!(lit_count(&TestPattern::Fill.to_frame().unwrap()), 96 * 38);
        assert_eq!(lit_count(&TestPattern::Checkerboard.to_frame().unwrap()), 96 * 38 / 2);
        assert_eq!(lit_count(&TestPattern::Border.to_frame().unwrap()), 2 * 96 + 2 * 36);

        let corner = TestPattern::Corner.to_frame().unwrap();
        assert!(corner.pixel(0, 0));
        assert_eq!(lit_count(&corner), 1);
    }

    #[test]
    fn test_corner_lands_in_last_wire_bit_of_first_row() {
        // The first row is mirrored, so pixel (0,0) is bit 95 of the wire frame
        let wire = TestPattern::Corner.to_frame().unwrap().encode();
        assert_eq!(wire[11], 0x80);
        assert!(wire.iter().enumerate().all(|(i, b)| i == 11 || *b == 0));
    }
}

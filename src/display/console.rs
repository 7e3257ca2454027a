// Console display transmitter
//
// Repaints the whole terminal for every frame, '#' for a lit pixel and '.'
// for a dark one.

use super::Transmitter;
use crate::frame::Frame;
use std::io::Write;
use tracing::debug;

/// Clears the screen and homes the cursor
const RESET_TERMINAL: &str = "\x1bc";

#[derive(Debug, Default)]
pub struct ConsoleTransmitter;

impl ConsoleTransmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Transmitter for ConsoleTransmitter {
    fn send(&self, frame: &Frame) {
        if let Err(e) = paint(&mut std::io::stdout().lock(), frame) {
            debug!("Dropped console frame: {}", e);
        }
    }
}

fn paint(out: &mut impl Write, frame: &Frame) -> std::io::Result<()> {
    write!(out, "{}{}", RESET_TERMINAL, render_ascii(frame))?;
    out.flush()
}

/// Render a frame the way it looks on the panel
///
/// Rows are scanned top to bottom and each mirrored row right to left, so
/// the two mirror operations cancel and the picture reads like the panel.
pub fn render_ascii(frame: &Frame) -> String {
    let width = frame.width();
    let mut text = String::with_capacity((width + 1) * frame.height());

    for y in 0..frame.height() {
        for mirrored_x in (0..width).rev() {
            let lit = frame.pixel(width - 1 - mirrored_x, y);
            text.push(if lit { '#' } else { '.' });
        }
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_ascii_matches_source_orientation() {
        let frame = Frame::from_bit_string("100011", 3, 2).unwrap();
        assert_eq!(render_ascii(&frame), "#..\n.##\n");
    }

    #[test]
    fn test_render_ascii_covers_full_rows() {
        let frame = Frame::from_fn(96, 38, |x, _| x == 95).unwrap();
        let text = render_ascii(&frame);
        let first = text.lines().next().unwrap();
        assert_eq!(first.len(), 96);
        assert!(first.ends_with('#'));
        assert_eq!(text.lines().count(), 38);
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_paint_resets_then_draws() {
        let frame = Frame::from_bit_string("10", 2, 1).unwrap();
        let mut out = Vec::new();
        paint(&mut out, &frame).unwrap();
        assert_eq!(out, b"\x1bc#.\n");
    }

    #[test]
    fn test_paint_reports_write_errors() {
        let frame = Frame::blank(2, 1).unwrap();
        let err = paint(&mut ClosedPipe, &frame).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}

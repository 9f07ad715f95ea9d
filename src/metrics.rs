// this_file: src/metrics.rs

//! Text measurement seam shared by the fitter, layout and renderer.
//!
//! Everything above the font layer talks to a [`FontBook`] rather than to a
//! concrete font file, so layout can be computed (and tested) with any
//! metrics source.

use crate::error::Result;

/// Pixel bounding box of a single unwrapped line of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

/// Vertical metrics of a font at one size, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    /// Distance from the top of the line box to the baseline
    pub ascent: f32,
    /// Distance from the baseline to the bottom of the line box (positive)
    pub descent: f32,
}

impl LineMetrics {
    /// Height of one line without extra spacing.
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// Coverage mask for one rendered line, row-major, one byte per pixel.
#[derive(Debug, Clone)]
pub struct LineMask {
    pub width: u32,
    pub height: u32,
    pub alpha: Vec<u8>,
}

impl LineMask {
    /// Blank mask of the given size.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: vec![0; (width as usize) * (height as usize)],
        }
    }
}

/// Font metrics provider keyed by family (font file name).
pub trait FontBook: Send + Sync {
    /// Ascent and descent of `family` at `size`.
    fn line_metrics(&self, family: &str, size: f32) -> Result<LineMetrics>;

    /// Sum of glyph advances of `text` at `size`.
    fn advance(&self, family: &str, text: &str, size: f32) -> Result<f32>;

    /// Rasterize one line of text into a coverage mask whose top edge is the
    /// line's ascent.
    fn rasterize_line(&self, family: &str, text: &str, size: f32) -> Result<LineMask>;

    /// Bounding box of `text` as a single line.
    fn measure(&self, family: &str, text: &str, size: f32) -> Result<TextExtent> {
        let width = self.advance(family, text, size)?;
        let height = self.line_metrics(family, size)?.height();
        Ok(TextExtent { width, height })
    }
}

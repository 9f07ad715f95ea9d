// this_file: src/section.rs

//! Positioned slide sections.

use crate::error::Result;
use crate::fit::{self, FitParams, FittedText};
use crate::metrics::FontBook;
use crate::security;
use crate::template::{Align, Anchor, Color, TextStyle};
use serde::Serialize;

/// Axis-aligned box in canvas pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Split into `n` equal rows stacked top to bottom.
    pub fn split_rows(&self, n: u32) -> Vec<Rect> {
        let n = n.max(1);
        let row_height = self.height / n;
        (0..n)
            .map(|i| Rect::new(self.x, self.y + i * row_height, self.width, row_height))
            .collect()
    }
}

/// One drawable region of a slide or lower third.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    /// Spacer with nothing to draw
    Empty { rect: Rect },
    Text(TextSection),
    Image(ImageSection),
}

impl Section {
    pub fn rect(&self) -> Rect {
        match self {
            Section::Empty { rect } => *rect,
            Section::Text(text) => text.rect,
            Section::Image(image) => image.rect,
        }
    }
}

/// Fitted, wrapped text in a box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSection {
    pub rect: Rect,
    /// Unwrapped text after case normalization
    pub source: String,
    /// Text as drawn, with line breaks
    pub text: String,
    pub font: String,
    pub size: f32,
    pub spacing: f32,
    pub color: Color,
    pub align: Align,
    pub anchor: Anchor,
    /// Whether the shrink loop produced `size`
    pub fitted: bool,
}

impl TextSection {
    /// Build a section from a raw value, fitting it unless the style opts out.
    pub fn build(
        rect: Rect,
        value: &str,
        style: &TextStyle,
        fonts: &dyn FontBook,
        params: &FitParams,
    ) -> Result<Self> {
        security::validate_text_input(value)?;
        let source = style.normalize(value);

        if !style.fit {
            return Ok(Self {
                rect,
                text: source.clone(),
                source,
                font: style.font.clone(),
                size: style.size,
                spacing: style.spacing,
                color: style.color,
                align: style.align,
                anchor: style.anchor,
                fitted: false,
            });
        }

        let fitted = fit::fit_text(
            fonts,
            &style.font,
            &source,
            rect.width as f32,
            rect.height as f32,
            style.size,
            style.spacing,
            params,
        )?;
        Ok(Self::from_fit(rect, source, style, fitted))
    }

    /// Assemble a section from an existing fit.
    pub fn from_fit(rect: Rect, source: String, style: &TextStyle, fitted: FittedText) -> Self {
        Self {
            rect,
            source,
            text: fitted.text,
            font: style.font.clone(),
            size: fitted.size,
            spacing: fitted.spacing,
            color: style.color,
            align: style.align,
            anchor: style.anchor,
            fitted: true,
        }
    }

    /// Point the text block is anchored to.
    pub fn anchor_point(&self) -> (f32, f32) {
        let mid_y = self.rect.y as f32 + self.rect.height as f32 / 2.0;
        match self.anchor {
            Anchor::Mm => (self.rect.x as f32 + self.rect.width as f32 / 2.0, mid_y),
            Anchor::Lm => (self.rect.x as f32, mid_y),
        }
    }
}

/// Picture fetched from a locator when the slide is drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSection {
    pub rect: Rect,
    pub locator: String,
    /// Fill the box and crop overflow instead of fitting inside it
    pub crop: bool,
    /// Position among the slide's image sections; names the scratch file
    pub ordinal: usize,
}

// this_file: src/render.rs

//! Slide compositing.
//!
//! A slide is drawn onto a copy of its background: sections paint in list
//! order, text as per-line coverage masks from the [`FontBook`], images via
//! the [`ImageFetcher`]. With outlines on, each section's box is stroked right
//! after the section is drawn.

use crate::error::Result;
use crate::fetch::{self, ImageFetcher};
use crate::image_ops;
use crate::layout::SlideLayout;
use crate::metrics::FontBook;
use crate::section::{ImageSection, Section, TextSection};
use crate::security;
use crate::template::{Align, Color};
use image::RgbaImage;
use log::trace;
use std::path::PathBuf;
use std::sync::Arc;

/// Stroke width of debug outlines.
pub const OUTLINE_WIDTH: u32 = 10;

/// Stroke color of debug outlines.
pub const OUTLINE_COLOR: Color = Color::RED;

/// Draws laid-out slides and lower thirds.
pub struct SlideRenderer {
    fonts: Arc<dyn FontBook>,
    fetcher: Arc<dyn ImageFetcher>,
    scratch_dir: PathBuf,
    outline: bool,
}

impl SlideRenderer {
    pub fn new(
        fonts: Arc<dyn FontBook>,
        fetcher: Arc<dyn ImageFetcher>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fonts,
            fetcher,
            scratch_dir: scratch_dir.into(),
            outline: false,
        }
    }

    /// Stroke every section's box in [`OUTLINE_COLOR`].
    pub fn with_outline(mut self, outline: bool) -> Self {
        self.outline = outline;
        self
    }

    /// Draw `layout` over `background`, scaled to the slide size if needed.
    pub fn render(
        &self,
        layout: &SlideLayout,
        background: &RgbaImage,
        slide_index: usize,
    ) -> Result<RgbaImage> {
        security::validate_dimensions(layout.width, layout.height)?;
        let mut canvas = image_ops::fit_background(background, layout.width, layout.height);
        self.render_sections(&mut canvas, &layout.sections, slide_index)?;
        Ok(canvas)
    }

    /// Paint `sections` in order onto `canvas`.
    pub fn render_sections(
        &self,
        canvas: &mut RgbaImage,
        sections: &[Section],
        slide_index: usize,
    ) -> Result<()> {
        for section in sections {
            match section {
                Section::Empty { .. } => {}
                Section::Text(text) => self.draw_text(canvas, text)?,
                Section::Image(image) => self.draw_image(canvas, image, slide_index)?,
            }
            if self.outline {
                image_ops::stroke_rect(canvas, section.rect(), OUTLINE_WIDTH, OUTLINE_COLOR);
            }
        }
        Ok(())
    }

    /// Draw a (possibly multi-line) text block at its anchor.
    ///
    /// Lines advance by the line height plus the section's spacing; the block
    /// is centered vertically on the anchor point.
    pub fn draw_text(&self, canvas: &mut RgbaImage, text: &TextSection) -> Result<()> {
        let lines: Vec<&str> = text.text.lines().collect();
        if lines.is_empty() {
            return Ok(());
        }

        let line_height = self.fonts.line_metrics(&text.font, text.size)?.height();
        let advance = line_height + text.spacing;
        let block_height = lines.len() as f32 * line_height
            + (lines.len() as f32 - 1.0) * text.spacing;
        let (ax, ay) = text.anchor_point();
        let top = ay - block_height / 2.0;

        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let mask = self.fonts.rasterize_line(&text.font, line, text.size)?;
            let x = match text.align {
                Align::Center => ax - mask.width as f32 / 2.0,
                Align::Left => ax,
            };
            let y = top + i as f32 * advance;
            trace!("line {:?} at ({:.1}, {:.1}) size {}", line, x, y, text.size);
            image_ops::blend_mask(canvas, &mask, x.round() as i64, y.round() as i64, text.color);
        }
        Ok(())
    }

    fn draw_image(
        &self,
        canvas: &mut RgbaImage,
        section: &ImageSection,
        slide_index: usize,
    ) -> Result<()> {
        let scratch = fetch::scratch_path(&self.scratch_dir, slide_index, section.ordinal);
        let picture = self.fetcher.fetch(&section.locator, &scratch)?;
        image_ops::place_image(canvas, &picture, section.rect, section.crop);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::metrics::testing::FixedFont;
    use crate::section::Rect;
    use crate::template::Anchor;
    use image::{DynamicImage, Rgba};
    use std::path::Path;

    struct SolidFetcher;

    impl ImageFetcher for SolidFetcher {
        fn fetch(&self, locator: &str, _scratch: &Path) -> Result<DynamicImage> {
            if locator == "bad" {
                return Err(Error::ResourceFetch {
                    locator: locator.into(),
                    reason: "offline".into(),
                });
            }
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                10,
                10,
                Rgba([0, 0, 255, 255]),
            )))
        }
    }

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn renderer(outline: bool) -> SlideRenderer {
        SlideRenderer::new(Arc::new(FixedFont::new()), Arc::new(SolidFetcher), "scratch")
            .with_outline(outline)
    }

    fn text(rect: Rect, body: &str, align: Align) -> Section {
        Section::Text(TextSection {
            rect,
            source: body.replace('\n', " "),
            text: body.into(),
            font: "X.ttf".into(),
            size: 10.0,
            spacing: 4.0,
            color: Color([0, 0, 0, 255]),
            align,
            anchor: Anchor::for_align(align),
            fitted: true,
        })
    }

    fn layout(sections: Vec<Section>) -> SlideLayout {
        SlideLayout {
            template: "t".into(),
            width: 100,
            height: 100,
            sections,
            lower_third: None,
        }
    }

    #[test]
    fn centered_text_is_drawn_around_the_anchor() {
        let bg = RgbaImage::from_pixel(100, 100, WHITE);
        let slide = layout(vec![text(Rect::new(0, 0, 100, 50), "Hi", Align::Center)]);
        let out = renderer(false).render(&slide, &bg, 0).unwrap();

        // 2 chars * 5px wide, 12px tall, centered on (50, 25)
        assert_eq!(*out.get_pixel(45, 19), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(54, 30), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(44, 25), WHITE);
        assert_eq!(*out.get_pixel(55, 25), WHITE);
        assert_eq!(*out.get_pixel(50, 31), WHITE);
    }

    #[test]
    fn left_aligned_lines_stack_with_spacing() {
        let bg = RgbaImage::from_pixel(100, 100, WHITE);
        let slide = layout(vec![text(Rect::new(10, 0, 80, 100), "ab\nc", Align::Left)]);
        let out = renderer(false).render(&slide, &bg, 0).unwrap();

        // Block is 12 + 4 + 12 = 28 tall, top at 36; second line starts at 52.
        assert_eq!(*out.get_pixel(10, 36), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(19, 47), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(10, 50), WHITE);
        assert_eq!(*out.get_pixel(14, 52), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(15, 52), WHITE);
        assert_eq!(*out.get_pixel(9, 40), WHITE);
    }

    #[test]
    fn images_are_fetched_and_placed() {
        let bg = RgbaImage::from_pixel(100, 100, WHITE);
        let slide = layout(vec![Section::Image(ImageSection {
            rect: Rect::new(0, 50, 100, 50),
            locator: "pic".into(),
            crop: false,
            ordinal: 0,
        })]);
        let out = renderer(false).render(&slide, &bg, 3).unwrap();
        assert_eq!(*out.get_pixel(45, 50), Rgba([0, 0, 255, 255]));
        assert_eq!(*out.get_pixel(44, 50), WHITE);
    }

    #[test]
    fn fetch_failure_fails_the_slide() {
        let bg = RgbaImage::from_pixel(100, 100, WHITE);
        let slide = layout(vec![Section::Image(ImageSection {
            rect: Rect::new(0, 0, 100, 100),
            locator: "bad".into(),
            crop: true,
            ordinal: 0,
        })]);
        let err = renderer(false).render(&slide, &bg, 0).unwrap_err();
        assert!(matches!(err, Error::ResourceFetch { .. }));
    }

    #[test]
    fn outlines_stroke_every_section() {
        let bg = RgbaImage::from_pixel(100, 100, WHITE);
        let slide = layout(vec![Section::Empty {
            rect: Rect::new(0, 0, 100, 40),
        }]);
        let out = renderer(true).render(&slide, &bg, 0).unwrap();
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(50, 35), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(50, 20), WHITE);
        assert_eq!(*out.get_pixel(50, 45), WHITE);

        let plain = renderer(false).render(&slide, &bg, 0).unwrap();
        assert_eq!(*plain.get_pixel(0, 0), WHITE);
    }

    #[test]
    fn background_is_resized_to_slide() {
        let bg = RgbaImage::from_pixel(50, 50, WHITE);
        let out = renderer(false).render(&layout(Vec::new()), &bg, 0).unwrap();
        assert_eq!(out.dimensions(), (100, 100));
    }
}

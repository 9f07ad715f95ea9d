// this_file: src/lower_third.rs

//! Lower-third overlays.
//!
//! A lower third is drawn on its own canvas (`lt1.png` or `lt2.png` from the
//! theme) and saved next to the slide it belongs to. Its text slots are
//! absolutely positioned by the position table rather than stacked.

use crate::error::{Error, Result};
use crate::fit::FitParams;
use crate::metrics::FontBook;
use crate::render::SlideRenderer;
use crate::row::FieldContext;
use crate::section::{Rect, Section, TextSection};
use crate::template::LowerThirdPositions;
use image::RgbaImage;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Positioned text slots of one lower third.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowerThird {
    /// Number of fields shown, which selects background and slot table
    pub arity: usize,
    pub sections: Vec<Section>,
}

impl LowerThird {
    /// Build the overlay for `fields`, one slot per field.
    ///
    /// Every field must have a value; a lower third with a hole in it is
    /// reported as [`Error::NoContentForSection`].
    pub fn build(
        template: &str,
        fields: &[String],
        ctx: &FieldContext<'_>,
        positions: &LowerThirdPositions,
        fonts: &dyn FontBook,
        params: &FitParams,
    ) -> Result<Self> {
        let slots = positions.slots(fields.len())?;

        let missing: Vec<String> = fields
            .iter()
            .filter(|f| !ctx.has(f))
            .map(|f| ctx.key(f))
            .collect();
        if !missing.is_empty() {
            return Err(Error::NoContentForSection {
                template: template.to_string(),
                fields: missing,
            });
        }

        let sections = fields
            .iter()
            .zip(slots)
            .map(|(field, slot)| {
                let value = ctx.get(field).unwrap_or_default();
                let rect = Rect::new(slot.x, slot.y, slot.width, slot.height);
                TextSection::build(rect, &value, &slot.style, fonts, params).map(Section::Text)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            arity: fields.len(),
            sections,
        })
    }

    /// Theme file name of the background for this arity.
    pub fn background_name(&self) -> String {
        format!("lt{}.png", self.arity)
    }

    /// Draw the overlay onto a copy of `background`.
    pub fn render(
        &self,
        renderer: &SlideRenderer,
        background: &RgbaImage,
        slide_index: usize,
    ) -> Result<RgbaImage> {
        if !(1..=2).contains(&self.arity) {
            return Err(Error::UnsupportedLowerThirdArity(self.arity));
        }
        let mut canvas = background.clone();
        renderer.render_sections(&mut canvas, &self.sections, slide_index)?;
        Ok(canvas)
    }
}

/// Sibling output path: `3.png` becomes `3_lt.png`.
pub fn output_path(slide_path: &Path) -> PathBuf {
    let stem = slide_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match slide_path.extension() {
        Some(ext) => format!("{}_lt.{}", stem, ext.to_string_lossy()),
        None => format!("{}_lt", stem),
    };
    slide_path.with_file_name(name)
}

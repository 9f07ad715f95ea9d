// this_file: src/layout.rs

//! Section layout: template descriptors to positioned sections.
//!
//! Descriptors stack top to bottom, each horizontally centered, their sizes
//! resolved from slide fractions. A text descriptor with several fields is
//! split into equal rows, one per non-empty field; the rows are fitted
//! independently and then normalized to the smallest fitted size so stacked
//! fields read at one size.

use crate::error::{Error, Result};
use crate::fit::{self, FitParams, FittedText};
use crate::lower_third::LowerThird;
use crate::metrics::FontBook;
use crate::row::FieldContext;
use crate::section::{ImageSection, Rect, Section, TextSection};
use crate::security;
use crate::template::{LowerThirdPositions, SectionDescriptor, Templates, TextStyle};
use log::debug;
use serde::Serialize;

/// Everything layout needs to know about the slide being built.
#[derive(Debug, Clone, Copy)]
pub struct SlideContext<'a> {
    pub width: u32,
    pub height: u32,
    pub title: &'a str,
    pub fields: FieldContext<'a>,
}

/// Result of expanding one template for one slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideLayout {
    pub template: String,
    pub width: u32,
    pub height: u32,
    /// Drawing order; later sections paint over earlier ones
    pub sections: Vec<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_third: Option<LowerThird>,
}

/// Independent fit of one sibling row, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct FitProposal {
    pub rect: Rect,
    pub source: String,
    pub fit: FittedText,
}

/// Re-fit every sibling at the smallest proposed size.
pub fn normalize_siblings(
    proposals: Vec<FitProposal>,
    style: &TextStyle,
    fonts: &dyn FontBook,
    params: &FitParams,
) -> Result<Vec<TextSection>> {
    let Some(shared) = proposals.iter().map(|p| p.fit.size).reduce(f32::min) else {
        return Ok(Vec::new());
    };

    proposals
        .into_iter()
        .map(|p| {
            let refit = fit::refit_at(
                fonts,
                &style.font,
                &p.source,
                p.rect.width as f32,
                shared,
                &p.fit,
                params,
            )?;
            Ok(TextSection::from_fit(p.rect, p.source, style, refit))
        })
        .collect()
}

/// Expands templates into slide layouts.
pub struct LayoutEngine<'a> {
    templates: &'a Templates,
    positions: Option<&'a LowerThirdPositions>,
    fonts: &'a dyn FontBook,
    params: FitParams,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(templates: &'a Templates, fonts: &'a dyn FontBook, params: FitParams) -> Self {
        Self {
            templates,
            positions: None,
            fonts,
            params,
        }
    }

    /// Attach the lower-third position table used by `lt` descriptors.
    pub fn with_positions(mut self, positions: &'a LowerThirdPositions) -> Self {
        self.positions = Some(positions);
        self
    }

    /// Expand `template_name` for the slide described by `ctx`.
    pub fn expand(&self, template_name: &str, ctx: &SlideContext<'_>) -> Result<SlideLayout> {
        security::validate_dimensions(ctx.width, ctx.height)?;
        let descriptors = self.templates.get(template_name)?;

        let mut layout = SlideLayout {
            template: template_name.to_string(),
            width: ctx.width,
            height: ctx.height,
            sections: Vec::with_capacity(descriptors.len()),
            lower_third: None,
        };
        let mut y_offset = 0.0f32;
        let mut images = 0usize;

        for descriptor in descriptors {
            let Some((fw, fh)) = descriptor.fractions() else {
                if let SectionDescriptor::LowerThird { fields } = descriptor {
                    if layout.lower_third.is_some() {
                        return Err(Error::config(
                            format!("template '{}'", template_name),
                            "more than one lower third",
                        ));
                    }
                    let positions = self.positions.ok_or_else(|| {
                        Error::config(
                            format!("template '{}'", template_name),
                            "lower third used but no position table loaded",
                        )
                    })?;
                    layout.lower_third = Some(LowerThird::build(
                        template_name,
                        fields,
                        &ctx.fields,
                        positions,
                        self.fonts,
                        &self.params,
                    )?);
                }
                continue;
            };

            let width = ctx.width as f32 * fw;
            let height = ctx.height as f32 * fh;
            let x = (ctx.width as f32 - width) / 2.0;
            let rect = Rect::new(x as u32, y_offset as u32, width as u32, height as u32);
            y_offset += height;

            match descriptor {
                SectionDescriptor::Empty { .. } | SectionDescriptor::LowerThird { .. } => {
                    layout.sections.push(Section::Empty { rect });
                }
                SectionDescriptor::Text { fields, style, .. } => {
                    let texts = self.text_rows(template_name, rect, fields, style, ctx)?;
                    layout.sections.extend(texts.into_iter().map(Section::Text));
                }
                SectionDescriptor::TitleText { style, .. } => {
                    if ctx.title.trim().is_empty() {
                        return Err(Error::NoContentForSection {
                            template: template_name.to_string(),
                            fields: vec!["title".to_string()],
                        });
                    }
                    let text =
                        TextSection::build(rect, ctx.title, style, self.fonts, &self.params)?;
                    layout.sections.push(Section::Text(text));
                }
                SectionDescriptor::Image { fields, crop, .. } => {
                    let locator = fields
                        .first()
                        .and_then(|f| ctx.fields.get(f))
                        .ok_or_else(|| Error::NoContentForSection {
                            template: template_name.to_string(),
                            fields: fields.iter().take(1).map(|f| ctx.fields.key(f)).collect(),
                        })?;
                    layout.sections.push(Section::Image(ImageSection {
                        rect,
                        locator,
                        crop: *crop,
                        ordinal: images,
                    }));
                    images += 1;
                }
            }
        }

        debug!(
            "Expanded '{}' into {} section(s){}",
            template_name,
            layout.sections.len(),
            if layout.lower_third.is_some() { " + lower third" } else { "" }
        );
        Ok(layout)
    }

    fn text_rows(
        &self,
        template_name: &str,
        rect: Rect,
        fields: &[String],
        style: &TextStyle,
        ctx: &SlideContext<'_>,
    ) -> Result<Vec<TextSection>> {
        let values: Vec<String> = fields.iter().filter_map(|f| ctx.fields.get(f)).collect();
        if values.is_empty() {
            return Err(Error::NoContentForSection {
                template: template_name.to_string(),
                fields: fields.iter().map(|f| ctx.fields.key(f)).collect(),
            });
        }

        let rows = rect.split_rows(values.len() as u32);
        if !style.fit {
            return rows
                .into_iter()
                .zip(values)
                .map(|(row, value)| TextSection::build(row, &value, style, self.fonts, &self.params))
                .collect();
        }

        let proposals = rows
            .into_iter()
            .zip(values)
            .map(|(row, value)| {
                security::validate_text_input(&value)?;
                let source = style.normalize(&value);
                let fit = fit::fit_text(
                    self.fonts,
                    &style.font,
                    &source,
                    row.width as f32,
                    row.height as f32,
                    style.size,
                    style.spacing,
                    &self.params,
                )?;
                Ok(FitProposal {
                    rect: row,
                    source,
                    fit,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        normalize_siblings(proposals, style, self.fonts, &self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::FixedFont;
    use crate::row::Row;
    use crate::template::UnknownSectionPolicy;
    use serde_json::Value;

    const TEMPLATES: &str = r##"{
        "points": [
            {"type": "empty", "width": 1, "height": 0.1},
            {"type": "text", "width": 0.8, "height": 0.3, "fields": ["a", "b"],
             "size": 80, "font": "X.ttf", "color": "#fff"},
            {"type": "image", "width": 0.5, "height": 0.4, "fields": ["img"]},
            {"type": "title_text", "width": 0.6, "height": 0.2, "size": 40,
             "font": "X.ttf", "color": "#fff", "align": "left", "anchor": "lm"}
        ],
        "overlay": [
            {"type": "lt", "fields": ["name"]},
            {"type": "empty", "width": 1, "height": 1}
        ]
    }"##;

    fn templates() -> Templates {
        Templates::from_json(TEMPLATES, UnknownSectionPolicy::Fail).unwrap()
    }

    fn ctx<'a>(row: &'a Row, occurrence: usize) -> SlideContext<'a> {
        SlideContext {
            width: 1000,
            height: 600,
            title: "Sermon Title",
            fields: FieldContext::new(row, occurrence),
        }
    }

    #[test]
    fn sections_stack_vertically_and_center_horizontally() {
        let templates = templates();
        let book = FixedFont::new();
        let engine = LayoutEngine::new(&templates, &book, FitParams::default());
        let row = Row::new().with("a", "Hello").with("img", "pic.png");

        let layout = engine.expand("points", &ctx(&row, 0)).unwrap();
        let rects: Vec<Rect> = layout.sections.iter().map(Section::rect).collect();
        assert_eq!(
            rects,
            vec![
                Rect::new(0, 0, 1000, 60),
                Rect::new(100, 60, 800, 180),
                Rect::new(250, 240, 500, 240),
                Rect::new(200, 480, 600, 120),
            ]
        );
        match &layout.sections[2] {
            Section::Image(image) => {
                assert_eq!(image.locator, "pic.png");
                assert_eq!(image.ordinal, 0);
                assert!(!image.crop);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &layout.sections[3] {
            Section::Text(title) => assert_eq!(title.text, "Sermon Title"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn siblings_share_the_smallest_fitted_size() {
        let templates = templates();
        let book = FixedFont::new();
        let engine = LayoutEngine::new(&templates, &book, FitParams::default());
        let row = Row::new()
            .with("a", "Hi")
            .with("b", "A considerably longer line of text that has to shrink further")
            .with("img", "pic.png");

        let layout = engine.expand("points", &ctx(&row, 0)).unwrap();
        let texts: Vec<&TextSection> = layout
            .sections
            .iter()
            .filter_map(|s| match s {
                Section::Text(t) if t.rect.width == 800 => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].rect, Rect::new(100, 60, 800, 90));
        assert_eq!(texts[1].rect, Rect::new(100, 150, 800, 90));
        assert_eq!(texts[0].size, texts[1].size);

        let alone = fit::fit_text(&book, "X.ttf", &texts[1].source, 800.0, 90.0, 80.0, 4.0, &FitParams::default())
            .unwrap();
        assert_eq!(texts[1].size, alone.size);
        assert!(texts[1].size < 70.0);
    }

    #[test]
    fn occurrence_suffix_selects_columns() {
        let templates = templates();
        let book = FixedFont::new();
        let engine = LayoutEngine::new(&templates, &book, FitParams::default());
        let row = Row::new()
            .with("a", "zero")
            .with("img", "zero.png")
            .with("a.1", "one")
            .with("img.1", "one.png");

        let layout = engine.expand("points", &ctx(&row, 1)).unwrap();
        match &layout.sections[1] {
            Section::Text(text) => assert_eq!(text.source, "one"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn all_fields_empty_is_no_content() {
        let templates = templates();
        let book = FixedFont::new();
        let engine = LayoutEngine::new(&templates, &book, FitParams::default());
        let row = Row::new().with("a", Value::Null).with("img", "pic.png");

        let err = engine.expand("points", &ctx(&row, 0)).unwrap_err();
        match err {
            Error::NoContentForSection { template, fields } => {
                assert_eq!(template, "points");
                assert_eq!(fields, vec!["a", "b"]);
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn lower_third_requires_positions() {
        let templates = templates();
        let book = FixedFont::new();
        let engine = LayoutEngine::new(&templates, &book, FitParams::default());
        let row = Row::new().with("name", "Pastor Sam");

        let err = engine.expand("overlay", &ctx(&row, 0)).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn normalize_of_nothing_is_nothing() {
        let style: TextStyle = serde_json::from_str(r##"{"size": 10, "font": "X.ttf", "color": "#000"}"##).unwrap();
        let out = normalize_siblings(Vec::new(), &style, &FixedFont::new(), &FitParams::default()).unwrap();
        assert!(out.is_empty());
    }
}

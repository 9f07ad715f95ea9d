// this_file: src/orchestrator.rs
//! Deck rendering pipeline.
//!
//! Every slide runs expand → fit → render → save on its own; nothing is
//! shared between slides except the read-only templates, fonts and
//! backgrounds. Slides run in order or on the rayon pool, and each keeps the
//! output index it was planned with. A failing slide is reported in its
//! outcome and does not stop the others.

use crate::batch::{DeckSpec, SlideOutcome, SlidePlan, TimingInfo};
use crate::config::RenderConfig;
use crate::error::{Error, Result};
use crate::fetch::{HttpFetcher, ImageFetcher};
use crate::fonts::FontLoader;
use crate::layout::{LayoutEngine, SlideContext, SlideLayout};
use crate::logging::Timer;
use crate::lower_third;
use crate::metrics::FontBook;
use crate::render::SlideRenderer;
use crate::row::FieldContext;
use crate::template::{LowerThirdPositions, Templates};
use image::{ImageFormat, RgbaImage};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// A drawn slide and its optional lower third.
pub struct RenderedSlide {
    pub slide: RgbaImage,
    pub lower_third: Option<RgbaImage>,
}

/// Renders decks against one configuration and theme.
pub struct DeckRenderer {
    config: RenderConfig,
    templates: Templates,
    positions: Option<LowerThirdPositions>,
    fonts: Arc<dyn FontBook>,
    renderer: SlideRenderer,
    background: RgbaImage,
    lower_third_backgrounds: HashMap<usize, RgbaImage>,
}

impl DeckRenderer {
    /// Load templates, theme assets and fonts named by `config`.
    pub fn from_config(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        let templates = Templates::load(&config.templates, config.unknown_sections)?;
        info!(
            "Loaded {} template(s) from {}",
            templates.len(),
            config.templates.display()
        );

        let background = load_image(&config.background_path()?)?;
        let fonts: Arc<dyn FontBook> = Arc::new(FontLoader::new(&config.font_dir));
        let fetcher: Arc<dyn ImageFetcher> = Arc::new(HttpFetcher::new(
            config.fetch_timeout(),
            config.fetch_retries,
        ));

        let mut deck = Self::new(config, templates, fonts, fetcher, background);

        let positions_path = deck.config.positions_path()?;
        if positions_path.exists() {
            deck.positions = Some(LowerThirdPositions::load(&positions_path)?);
        } else {
            debug!("No lower-third table at {}", positions_path.display());
        }
        for arity in 1..=2 {
            let path = deck.config.lower_third_background_path(arity)?;
            if path.exists() {
                let image = load_image(&path)?;
                deck.lower_third_backgrounds.insert(arity, image);
            }
        }
        Ok(deck)
    }

    /// Assemble a renderer from already loaded parts.
    pub fn new(
        config: RenderConfig,
        templates: Templates,
        fonts: Arc<dyn FontBook>,
        fetcher: Arc<dyn ImageFetcher>,
        background: RgbaImage,
    ) -> Self {
        let renderer = SlideRenderer::new(Arc::clone(&fonts), fetcher, &config.scratch_dir)
            .with_outline(config.outline_sections);
        Self {
            config,
            templates,
            positions: None,
            fonts,
            renderer,
            background,
            lower_third_backgrounds: HashMap::new(),
        }
    }

    pub fn with_positions(mut self, positions: LowerThirdPositions) -> Self {
        self.positions = Some(positions);
        self
    }

    pub fn with_lower_third_background(mut self, arity: usize, background: RgbaImage) -> Self {
        self.lower_third_backgrounds.insert(arity, background);
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Expand the template of one planned slide.
    pub fn layout_slide(&self, deck: &DeckSpec, plan: &SlidePlan, title: &str) -> Result<SlideLayout> {
        let mut engine = LayoutEngine::new(&self.templates, self.fonts.as_ref(), self.config.fit);
        if let Some(positions) = &self.positions {
            engine = engine.with_positions(positions);
        }
        let ctx = SlideContext {
            width: self.config.width,
            height: self.config.height,
            title,
            fields: FieldContext::new(&deck.row, plan.occurrence),
        };
        engine.expand(&plan.slide_type, &ctx)
    }

    /// Draw a laid-out slide and its lower third.
    pub fn render_layout(&self, layout: &SlideLayout, index: usize) -> Result<RenderedSlide> {
        let slide = self.renderer.render(layout, &self.background, index)?;
        let lower_third = match &layout.lower_third {
            Some(lt) => {
                let background = self
                    .lower_third_backgrounds
                    .get(&lt.arity)
                    .ok_or_else(|| {
                        Error::config("theme", format!("missing {}", lt.background_name()))
                    })?;
                Some(lt.render(&self.renderer, background, index)?)
            }
            None => None,
        };
        Ok(RenderedSlide { slide, lower_third })
    }

    /// Lay out and draw one planned slide.
    pub fn render_slide(&self, deck: &DeckSpec, plan: &SlidePlan, title: &str) -> Result<RenderedSlide> {
        let layout = self.layout_slide(deck, plan, title)?;
        self.render_layout(&layout, plan.index)
    }

    /// Render every slide of `deck` into the output directory.
    ///
    /// Only deck-level problems (no slide types, unwritable output
    /// directory) are returned as errors; slide failures are outcomes.
    pub fn run(&self, deck: &DeckSpec) -> Result<Vec<SlideOutcome>> {
        let start = Instant::now();
        let plans = deck.plan(
            &self.config.slide_type_field,
            self.config.title_template.as_deref(),
        )?;
        let title = deck.title(&self.config.title_field);

        std::fs::create_dir_all(&self.config.output_dir)?;
        std::fs::create_dir_all(&self.config.scratch_dir)?;
        let removed = clean_outputs(&self.config.output_dir)?;
        if removed > 0 {
            debug!("Removed {} old slide image(s)", removed);
        }

        let outcomes: Vec<SlideOutcome> = if self.config.parallel {
            plans
                .par_iter()
                .map(|plan| self.process(deck, plan, &title))
                .collect()
        } else {
            plans
                .iter()
                .map(|plan| self.process(deck, plan, &title))
                .collect()
        };

        let ok = outcomes.iter().filter(|o| o.is_success()).count();
        let elapsed = start.elapsed();
        info!(
            "Rendered {}/{} slide(s) in {:.2}s",
            ok,
            outcomes.len(),
            elapsed.as_secs_f64()
        );
        Ok(outcomes)
    }

    fn process(&self, deck: &DeckSpec, plan: &SlidePlan, title: &str) -> SlideOutcome {
        let timer = Timer::new(format!("slide {} ({})", plan.index, plan.slide_type));
        let mut timing = TimingInfo::default();

        let result = self.layout_slide(deck, plan, title).and_then(|layout| {
            timing.layout_ms = timer.elapsed_ms();
            let rendered = self.render_layout(&layout, plan.index)?;
            let output = self.output_path(plan.index);
            let lt_output = write_outputs(&output, &rendered)?;
            timing.render_ms = timer.elapsed_ms() - timing.layout_ms;
            Ok((output, lt_output))
        });
        timing.total_ms = timer.elapsed_ms();

        match result {
            Ok((output, lt_output)) => {
                info!("Slide {} ({}) -> {}", plan.index, plan.slide_type, output.display());
                SlideOutcome::success(plan, &output, lt_output.as_deref(), timing)
            }
            Err(e) => {
                warn!("Slide {} ({}) failed: {}", plan.index, plan.slide_type, e);
                SlideOutcome::error(plan, &e, timing)
            }
        }
    }

    /// `<output_dir>/<index>.png`
    pub fn output_path(&self, index: usize) -> PathBuf {
        self.config.output_dir.join(format!("{}.png", index))
    }
}

fn load_image(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path).map_err(|e| {
        Error::config(format!("theme {}", path.display()), e.to_string())
    })?;
    Ok(image.to_rgba8())
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Write a slide and its lower third, or neither.
///
/// Both images are encoded up front; if the lower third cannot be written
/// the slide file is removed again.
fn write_outputs(output: &Path, rendered: &RenderedSlide) -> Result<Option<PathBuf>> {
    let slide = encode_png(&rendered.slide)?;
    let overlay = rendered
        .lower_third
        .as_ref()
        .map(|image| Ok::<_, Error>((lower_third::output_path(output), encode_png(image)?)))
        .transpose()?;

    std::fs::write(output, slide)?;
    let Some((lt_path, lt_bytes)) = overlay else {
        return Ok(None);
    };
    if let Err(e) = std::fs::write(&lt_path, lt_bytes) {
        if let Err(cleanup) = std::fs::remove_file(output) {
            warn!("Could not remove {}: {}", output.display(), cleanup);
        }
        return Err(e.into());
    }
    Ok(Some(lt_path))
}

/// Delete `*.png` files directly inside `dir`; returns how many went.
pub fn clean_outputs(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

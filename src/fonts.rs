// this_file: src/fonts.rs

//! Font loading, caching, measurement and line rasterization.
//!
//! Font files are memory mapped once and shared through a lock-free cache.
//! Measurement uses skrifa's scaled glyph metrics; drawing extracts glyph
//! outlines with skrifa and fills them with zeno.

use crate::error::{Error, Result};
use crate::metrics::{FontBook, LineMask, LineMetrics};
use crate::security;
use dashmap::DashMap;
use memmap2::Mmap;
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::raw::{FileRef, FontRef};
use skrifa::{GlyphId, MetadataProvider};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeno::{Command, Mask};

/// Resolves font family names inside a font directory and caches the files.
pub struct FontLoader {
    font_dir: PathBuf,
    cache: DashMap<PathBuf, Arc<FontFile>>,
}

/// A memory-mapped font file.
pub struct FontFile {
    path: PathBuf,
    mmap: Mmap,
}

/// Font cache statistics for observability.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Currently cached font files.
    pub entries: usize,
}

impl FontLoader {
    /// Create a loader that resolves family names relative to `font_dir`.
    pub fn new(font_dir: impl Into<PathBuf>) -> Self {
        Self {
            font_dir: font_dir.into(),
            cache: DashMap::new(),
        }
    }

    /// Load (or fetch from cache) the font file for `family`.
    pub fn load(&self, family: &str) -> Result<Arc<FontFile>> {
        let path = security::resolve_asset(&self.font_dir, family)?;

        if let Some(file) = self.cache.get(&path) {
            return Ok(Arc::clone(file.value()));
        }

        let file = Arc::new(FontFile::open(&path)?);
        log::info!("Loaded font {}", path.display());
        self.cache.insert(path, Arc::clone(&file));
        Ok(file)
    }

    /// Drop every cached font.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Return current cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.len(),
        }
    }
}

impl FontFile {
    /// Memory-map and validate a font file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::FontNotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Io(e),
        })?;

        security::validate_font_size(file.metadata()?.len())?;

        // SAFETY: the mapping is read-only and font files are not rewritten
        // while a render is running.
        let mmap = unsafe { Mmap::map(&file)? };

        let font = Self {
            path: path.to_path_buf(),
            mmap,
        };
        font.font_ref()?;
        Ok(font)
    }

    /// Parse a font reference over the mapped bytes (first face of a collection).
    pub fn font_ref(&self) -> Result<FontRef<'_>> {
        let invalid = |reason: String| Error::InvalidFont {
            path: self.path.clone(),
            reason,
        };
        match FileRef::new(&self.mmap[..]).map_err(|e| invalid(e.to_string()))? {
            FileRef::Font(font) => Ok(font),
            FileRef::Collection(collection) => collection
                .get(0)
                .map_err(|e| invalid(format!("Failed to get font from collection: {}", e))),
        }
    }

    fn line_metrics(&self, size: f32) -> Result<LineMetrics> {
        let font = self.font_ref()?;
        let metrics = font.metrics(Size::new(size), LocationRef::default());
        Ok(LineMetrics {
            ascent: metrics.ascent,
            descent: -metrics.descent,
        })
    }

    fn glyphs(font: &FontRef<'_>, text: &str) -> Vec<GlyphId> {
        let charmap = font.charmap();
        text.chars()
            .map(|ch| charmap.map(ch).unwrap_or(GlyphId::NOTDEF))
            .collect()
    }

    fn advance(&self, text: &str, size: f32) -> Result<f32> {
        let font = self.font_ref()?;
        let metrics = font.glyph_metrics(Size::new(size), LocationRef::default());
        Ok(Self::glyphs(&font, text)
            .into_iter()
            .map(|gid| metrics.advance_width(gid).unwrap_or(0.0))
            .sum())
    }

    fn rasterize_line(&self, text: &str, size: f32) -> Result<LineMask> {
        let font = self.font_ref()?;
        let line = self.line_metrics(size)?;
        let advances = font.glyph_metrics(Size::new(size), LocationRef::default());
        let outlines = font.outline_glyphs();

        let mut commands = Vec::new();
        let mut cursor_x = 0.0f32;
        for gid in Self::glyphs(&font, text) {
            if let Some(outline) = outlines.get(gid) {
                let mut pen = ZenoPen::new(&mut commands, cursor_x, line.ascent);
                let settings = DrawSettings::unhinted(Size::new(size), LocationRef::default());
                outline.draw(settings, &mut pen).map_err(|e| Error::InvalidFont {
                    path: self.path.clone(),
                    reason: format!("Failed to draw glyph {}: {}", gid.to_u32(), e),
                })?;
            }
            cursor_x += advances.advance_width(gid).unwrap_or(0.0);
        }

        let width = cursor_x.ceil().max(1.0) as u32;
        let height = line.height().ceil().max(1.0) as u32;
        let mut mask = LineMask::empty(width, height);
        if commands.is_empty() {
            return Ok(mask);
        }

        let (coverage, placement) = Mask::new(&commands).size(width, height).render();

        let top = placement.top.max(0) as u32;
        let left = placement.left.max(0) as u32;
        let bottom = (placement.top + placement.height as i32).clamp(0, height as i32) as u32;
        let right = (placement.left + placement.width as i32).clamp(0, width as i32) as u32;
        for py in top..bottom {
            for px in left..right {
                let src_y = (py as i32 - placement.top) as u32;
                let src_x = (px as i32 - placement.left) as u32;
                let src = (src_y * placement.width + src_x) as usize;
                if let Some(&alpha) = coverage.get(src) {
                    mask.alpha[(py * width + px) as usize] = alpha;
                }
            }
        }
        Ok(mask)
    }
}

impl FontBook for FontLoader {
    fn line_metrics(&self, family: &str, size: f32) -> Result<LineMetrics> {
        self.load(family)?.line_metrics(size)
    }

    fn advance(&self, family: &str, text: &str, size: f32) -> Result<f32> {
        self.load(family)?.advance(text, size)
    }

    fn rasterize_line(&self, family: &str, text: &str, size: f32) -> Result<LineMask> {
        self.load(family)?.rasterize_line(text, size)
    }
}

/// Adapter from skrifa outlines to zeno commands, translated onto a line.
struct ZenoPen<'a> {
    commands: &'a mut Vec<Command>,
    dx: f32,
    baseline: f32,
}

impl<'a> ZenoPen<'a> {
    fn new(commands: &'a mut Vec<Command>, dx: f32, baseline: f32) -> Self {
        Self {
            commands,
            dx,
            baseline,
        }
    }

    // Font units grow upwards, pixels grow downwards.
    fn point(&self, x: f32, y: f32) -> zeno::Vector {
        [x + self.dx, self.baseline - y].into()
    }
}

impl<'a> OutlinePen for ZenoPen<'a> {
    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.point(x, y);
        self.commands.push(Command::MoveTo(p));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.point(x, y);
        self.commands.push(Command::LineTo(p));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        let c = self.point(cx0, cy0);
        let p = self.point(x, y);
        self.commands.push(Command::QuadTo(c, p));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let c0 = self.point(cx0, cy0);
        let c1 = self.point(cx1, cy1);
        let p = self.point(x, y);
        self.commands.push(Command::CurveTo(c0, c1, p));
    }

    fn close(&mut self) {
        self.commands.push(Command::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    // Tests that need a real face use a common system font and skip otherwise.
    const SYSTEM_FONT_DIR: &str = "/usr/share/fonts/truetype/dejavu";
    const SYSTEM_FONT: &str = "DejaVuSans.ttf";

    fn system_loader() -> Option<FontLoader> {
        let dir = Path::new(SYSTEM_FONT_DIR);
        if !dir.join(SYSTEM_FONT).exists() {
            eprintln!("Skipping test: {} not found", SYSTEM_FONT);
            return None;
        }
        Some(FontLoader::new(dir))
    }

    #[test]
    fn missing_family_is_font_not_found() {
        let dir = tempdir().unwrap();
        let loader = FontLoader::new(dir.path());
        let err = loader.measure("Nope.ttf", "Hello", 40.0).unwrap_err();
        assert!(matches!(err, Error::FontNotFound { .. }), "{err}");
    }

    #[test]
    fn garbage_file_is_invalid_font() {
        let dir = tempdir().unwrap();
        let mut file = File::create(dir.path().join("junk.ttf")).unwrap();
        file.write_all(b"This is not a font file").unwrap();

        let loader = FontLoader::new(dir.path());
        let err = loader.load("junk.ttf").err().unwrap();
        assert!(matches!(err, Error::InvalidFont { .. }), "{err}");
        assert_eq!(loader.stats().entries, 0);
    }

    #[test]
    fn traversal_in_family_is_rejected() {
        let dir = tempdir().unwrap();
        let loader = FontLoader::new(dir.path());
        assert!(matches!(
            loader.load("../secret.ttf"),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn system_font_measures_and_caches() {
        let Some(loader) = system_loader() else { return };

        let small = loader.measure(SYSTEM_FONT, "Hello", 20.0).unwrap();
        let large = loader.measure(SYSTEM_FONT, "Hello", 40.0).unwrap();
        assert!(small.width > 0.0 && small.height > 0.0);
        assert!((large.width / small.width - 2.0).abs() < 0.01);
        assert_eq!(loader.stats().entries, 1);

        loader.clear();
        assert_eq!(loader.stats().entries, 0);
    }

    #[test]
    fn system_font_rasterizes_ink() {
        let Some(loader) = system_loader() else { return };

        let mask = loader.rasterize_line(SYSTEM_FONT, "Ag", 48.0).unwrap();
        let extent = loader.measure(SYSTEM_FONT, "Ag", 48.0).unwrap();
        assert_eq!(mask.width, extent.width.ceil() as u32);
        assert!(mask.alpha.iter().any(|&a| a > 0));

        let blank = loader.rasterize_line(SYSTEM_FONT, "   ", 48.0).unwrap();
        assert!(blank.alpha.iter().all(|&a| a == 0));
    }
}

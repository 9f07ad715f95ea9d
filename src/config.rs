// this_file: src/config.rs

//! Render configuration (`setup.json`).
//!
//! Every field has a default, so an empty object is a valid configuration.
//! Relative paths in a loaded file are resolved against the file's directory.

use crate::error::{Error, Result};
use crate::fit::FitParams;
use crate::security;
use crate::template::UnknownSectionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Slide background inside a theme directory.
pub const BACKGROUND_FILE: &str = "bg.jpg";

/// Lower-third position table inside a theme directory.
pub const POSITIONS_FILE: &str = "lt_positioning.json";

/// Settings for one deck render.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Slide width in pixels
    pub width: u32,
    /// Slide height in pixels
    pub height: u32,
    /// Theme directory name under `theme_dir`
    pub theme: String,
    pub theme_dir: PathBuf,
    pub font_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Downloaded images land here before decoding
    pub scratch_dir: PathBuf,
    /// Template file
    pub templates: PathBuf,
    /// Stroke every section's box for layout debugging
    pub outline_sections: bool,
    /// Template of an extra title slide rendered at index 0
    pub title_template: Option<String>,
    /// Row column naming the first slide type
    pub slide_type_field: String,
    /// Row column holding the title when the deck has none
    pub title_field: String,
    pub fetch_timeout_secs: u64,
    pub fetch_retries: u32,
    pub unknown_sections: UnknownSectionPolicy,
    /// Render slides on the rayon pool
    pub parallel: bool,
    pub fit: FitParams,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            theme: "default".to_string(),
            theme_dir: PathBuf::from("themes"),
            font_dir: PathBuf::from("fonts"),
            output_dir: PathBuf::from("slides"),
            scratch_dir: PathBuf::from("tmp"),
            templates: PathBuf::from("templates.json"),
            outline_sections: false,
            title_template: None,
            slide_type_field: "slide_type".to_string(),
            title_field: "title".to_string(),
            fetch_timeout_secs: security::DEFAULT_FETCH_TIMEOUT.as_secs(),
            fetch_retries: 2,
            unknown_sections: UnknownSectionPolicy::default(),
            parallel: false,
            fit: FitParams::default(),
        }
    }
}

impl RenderConfig {
    /// Parse and validate a configuration body. Paths are left as written.
    pub fn from_json(json: &str) -> Result<Self> {
        security::validate_json_size(json)?;
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::config("setup", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file and anchor its relative paths to the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("setup {}", path.display()), e.to_string())
        })?;
        let mut config = Self::from_json(&json)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Join every relative path onto `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.theme_dir,
            &mut self.font_dir,
            &mut self.output_dir,
            &mut self.scratch_dir,
            &mut self.templates,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        security::validate_dimensions(self.width, self.height)
            .map_err(|e| Error::config("setup", e.to_string()))?;
        self.fit.validate()?;
        if self.slide_type_field.trim().is_empty() {
            return Err(Error::config("setup", "slide_type_field is empty"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(Error::config("setup", "fetch_timeout_secs must be positive"));
        }
        self.theme_path().map(|_| ())
    }

    /// Directory of the selected theme.
    pub fn theme_path(&self) -> Result<PathBuf> {
        security::resolve_asset(&self.theme_dir, &self.theme)
            .map_err(|e| Error::config("setup", e.to_string()))
    }

    pub fn background_path(&self) -> Result<PathBuf> {
        Ok(self.theme_path()?.join(BACKGROUND_FILE))
    }

    /// Background of a lower third showing `arity` fields.
    pub fn lower_third_background_path(&self, arity: usize) -> Result<PathBuf> {
        if !(1..=2).contains(&arity) {
            return Err(Error::UnsupportedLowerThirdArity(arity));
        }
        Ok(self.theme_path()?.join(format!("lt{}.png", arity)))
    }

    pub fn positions_path(&self) -> Result<PathBuf> {
        Ok(self.theme_path()?.join(POSITIONS_FILE))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

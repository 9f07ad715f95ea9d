// this_file: src/batch.rs

//! Deck input and per-slide JSONL outcomes.
//!
//! A deck is one row of content plus an optional title. The row names its
//! slides itself: the slide-type column and its `.1`, `.2`, ... repetitions
//! list the templates to render, in order.

use crate::error::{Error, Result};
use crate::row::{occurrence_suffix, Row};
use crate::security;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Deck input (top-level JSON).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeckSpec {
    /// Title shown by `title_text` sections; falls back to the row's title column
    #[serde(default)]
    pub title: Option<String>,
    /// Content row
    pub row: Row,
}

/// One slide to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlidePlan {
    /// Output index, fixed before rendering starts
    pub index: usize,
    pub slide_type: String,
    /// Which repetition of the row's columns this slide reads
    pub occurrence: usize,
}

impl DeckSpec {
    pub fn from_json(json: &str) -> Result<Self> {
        security::validate_json_size(json)?;
        serde_json::from_str(json).map_err(|e| Error::config("deck", e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Slide types listed by `field`, `field.1`, ... up to the first gap.
    pub fn slide_types(&self, field: &str) -> Result<Vec<String>> {
        let types: Vec<String> = (0..)
            .map(|i| self.row.get(&format!("{}{}", field, occurrence_suffix(i))))
            .take_while(Option::is_some)
            .flatten()
            .collect();

        if types.is_empty() {
            return Err(Error::config(
                "deck",
                format!("row has no value for slide type column '{}'", field),
            ));
        }
        Ok(types)
    }

    /// Deck title, or the row's `title_field`, or empty.
    pub fn title(&self, title_field: &str) -> String {
        self.title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.row.get(title_field))
            .unwrap_or_default()
    }

    /// Ordered slide list; an optional title slide takes index 0.
    pub fn plan(&self, slide_type_field: &str, title_template: Option<&str>) -> Result<Vec<SlidePlan>> {
        let types = self.slide_types(slide_type_field)?;
        let title = title_template.map(|t| SlidePlan {
            index: 0,
            slide_type: t.to_string(),
            occurrence: 0,
        });
        let offset = usize::from(title.is_some());

        Ok(title
            .into_iter()
            .chain(types.into_iter().enumerate().map(|(i, slide_type)| SlidePlan {
                index: i + offset,
                slide_type,
                occurrence: i,
            }))
            .collect())
    }
}

/// Result status of one slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Outcome of one slide (JSONL output line).
#[derive(Debug, Clone, Serialize)]
pub struct SlideOutcome {
    pub index: usize,
    pub slide_type: String,
    pub status: Status,
    /// Slide image (only present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Utf8PathBuf>,
    /// Lower-third image, when the template has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_third: Option<Utf8PathBuf>,
    /// Error message (only present on error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timing: TimingInfo,
}

/// Timing statistics for a slide.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimingInfo {
    /// Template expansion and fitting (milliseconds)
    pub layout_ms: f64,
    /// Drawing and encoding (milliseconds)
    pub render_ms: f64,
    pub total_ms: f64,
}

impl SlideOutcome {
    pub fn success(plan: &SlidePlan, output: &Path, lower_third: Option<&Path>, timing: TimingInfo) -> Self {
        Self {
            index: plan.index,
            slide_type: plan.slide_type.clone(),
            status: Status::Success,
            output: Some(utf8(output)),
            lower_third: lower_third.map(utf8),
            error: None,
            timing,
        }
    }

    pub fn error(plan: &SlidePlan, error: &Error, timing: TimingInfo) -> Self {
        Self {
            index: plan.index,
            slide_type: plan.slide_type.clone(),
            status: Status::Error,
            output: None,
            lower_third: None,
            error: Some(error.to_string()),
            timing,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Single JSON line.
    pub fn to_jsonl(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn utf8(path: &Path) -> Utf8PathBuf {
    Utf8PathBuf::from(path.to_string_lossy().into_owned())
}

// this_file: src/template.rs

//! Template and lower-third position tables.
//!
//! A template file maps slide-type names to ordered section descriptors whose
//! width/height are fractions of the slide. The lower-third table maps a
//! field count (`"1"`, `"2"`) to absolutely positioned text slots.

use crate::error::{Error, Result};
use crate::security;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Section type tags understood by the layout engine.
pub const SECTION_TYPES: [&str; 5] = ["empty", "text", "title_text", "image", "lt"];

/// Horizontal alignment of wrapped lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Center,
    Left,
}

/// Anchor point of the text block inside its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    /// Middle of the block on the middle of the section
    Mm,
    /// Left-middle of the block on the left-middle of the section
    Lm,
}

impl Anchor {
    /// The only anchor each alignment may be paired with.
    pub fn for_align(align: Align) -> Self {
        match align {
            Align::Center => Anchor::Mm,
            Align::Left => Anchor::Lm,
        }
    }
}

/// RGBA color parsed from `#rgb`, `#rrggbb`, `#rrggbbaa` or a basic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const RED: Color = Color([0xff, 0x00, 0x00, 0xff]);

    pub fn rgba(&self) -> [u8; 4] {
        self.0
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::config("color", format!("unrecognised color '{}'", s));
        let named = match s.to_ascii_lowercase().as_str() {
            "black" => Some([0, 0, 0, 255]),
            "white" => Some([255, 255, 255, 255]),
            "red" => Some([255, 0, 0, 255]),
            "green" => Some([0, 128, 0, 255]),
            "blue" => Some([0, 0, 255, 255]),
            "yellow" => Some([255, 255, 0, 255]),
            "gray" | "grey" => Some([128, 128, 128, 255]),
            _ => None,
        };
        if let Some(rgba) = named {
            return Ok(Color(rgba));
        }

        let hex = s.strip_prefix('#').ok_or_else(bad)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map(|v| v * 17)
                .map_err(|_| bad())
        };
        match hex.len() {
            3 => Ok(Color([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
            6 => Ok(Color([byte(0)?, byte(2)?, byte(4)?, 255])),
            8 => Ok(Color([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
            _ => Err(bad()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
        }
    }
}

fn default_spacing() -> f32 {
    4.0
}

fn default_align() -> Align {
    Align::Center
}

fn default_anchor() -> Anchor {
    Anchor::Mm
}

fn default_true() -> bool {
    true
}

/// Font styling shared by text descriptors and lower-third slots.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TextStyle {
    /// Starting font size before fitting
    pub size: f32,
    /// Upper-case the text before fitting
    #[serde(default)]
    pub force_upper: bool,
    /// Starting line spacing
    #[serde(default = "default_spacing")]
    pub spacing: f32,
    /// Font file name inside the font directory
    pub font: String,
    pub color: Color,
    #[serde(default = "default_align")]
    pub align: Align,
    #[serde(default = "default_anchor")]
    pub anchor: Anchor,
    /// Run the shrink loop; `false` draws the text as-is at `size`
    #[serde(default = "default_true")]
    pub fit: bool,
}

impl TextStyle {
    pub fn validate(&self, context: &str) -> Result<()> {
        if Anchor::for_align(self.align) != self.anchor {
            return Err(Error::config(
                context,
                format!(
                    "align {:?} requires anchor {:?}, got {:?}",
                    self.align,
                    Anchor::for_align(self.align),
                    self.anchor
                ),
            ));
        }
        if !(self.size > 0.0) {
            return Err(Error::config(
                context,
                format!("font size must be positive, got {}", self.size),
            ));
        }
        if self.spacing < 0.0 {
            return Err(Error::config(context, "spacing must not be negative"));
        }
        if self.font.is_empty() {
            return Err(Error::config(context, "font is empty"));
        }
        Ok(())
    }

    /// Apply `force_upper` to a raw field value.
    pub fn normalize(&self, value: &str) -> String {
        if self.force_upper {
            value.to_uppercase()
        } else {
            value.to_string()
        }
    }
}

/// One entry of a template's section list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SectionDescriptor {
    /// Spacer
    Empty { width: f32, height: f32 },
    /// One stacked text block per non-empty field
    Text {
        width: f32,
        height: f32,
        fields: Vec<String>,
        #[serde(flatten)]
        style: TextStyle,
    },
    /// Text block showing the slide title
    TitleText {
        width: f32,
        height: f32,
        #[serde(flatten)]
        style: TextStyle,
    },
    /// Picture loaded from the locator in the first field
    Image {
        width: f32,
        height: f32,
        fields: Vec<String>,
        #[serde(default)]
        crop: bool,
    },
    /// Lower-third overlay; takes no room on the slide
    #[serde(rename = "lt")]
    LowerThird { fields: Vec<String> },
}

impl SectionDescriptor {
    /// Fractions of the slide this descriptor occupies, if it occupies any.
    pub fn fractions(&self) -> Option<(f32, f32)> {
        match self {
            Self::Empty { width, height }
            | Self::Text { width, height, .. }
            | Self::TitleText { width, height, .. }
            | Self::Image { width, height, .. } => Some((*width, *height)),
            Self::LowerThird { .. } => None,
        }
    }

    fn validate(&self, context: &str) -> Result<()> {
        if let Some((width, height)) = self.fractions() {
            for (name, value) in [("width", width), ("height", height)] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(Error::config(
                        context,
                        format!("{} fraction {} outside 0..=1", name, value),
                    ));
                }
            }
        }
        match self {
            Self::Text { fields, style, .. } => {
                if fields.is_empty() {
                    return Err(Error::config(context, "text section lists no fields"));
                }
                style.validate(context)
            }
            Self::TitleText { style, .. } => style.validate(context),
            Self::Image { fields, .. } | Self::LowerThird { fields } if fields.is_empty() => {
                Err(Error::config(context, "section lists no fields"))
            }
            _ => Ok(()),
        }
    }
}

/// What to do with a descriptor whose `type` is not recognised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownSectionPolicy {
    /// Reject the whole template file
    #[default]
    Fail,
    /// Log a warning and drop the descriptor
    Skip,
}

/// Slide-type name to section list.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    layouts: HashMap<String, Vec<SectionDescriptor>>,
}

impl Templates {
    /// Parse a template file body.
    pub fn from_json(json: &str, policy: UnknownSectionPolicy) -> Result<Self> {
        security::validate_json_size(json)?;
        let raw: HashMap<String, Vec<serde_json::Value>> = serde_json::from_str(json)
            .map_err(|e| Error::config("templates", format!("JSON parse error: {}", e)))?;

        let mut layouts = HashMap::with_capacity(raw.len());
        for (name, entries) in raw {
            let mut sections = Vec::with_capacity(entries.len());
            for (i, entry) in entries.into_iter().enumerate() {
                let context = format!("template '{}' section {}", name, i);
                let tag = entry
                    .get("type")
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| Error::config(&context, "missing 'type'"))?;

                if !SECTION_TYPES.contains(&tag) {
                    match policy {
                        UnknownSectionPolicy::Fail => {
                            return Err(Error::config(
                                &context,
                                format!("unknown section type '{}'", tag),
                            ))
                        }
                        UnknownSectionPolicy::Skip => {
                            warn!("Skipping {}: unknown section type '{}'", context, tag);
                            continue;
                        }
                    }
                }

                let descriptor: SectionDescriptor = serde_json::from_value(entry)
                    .map_err(|e| Error::config(&context, e.to_string()))?;
                descriptor.validate(&context)?;
                sections.push(descriptor);
            }
            layouts.insert(name, sections);
        }

        Ok(Self { layouts })
    }

    /// Read and parse a template file.
    pub fn load(path: &Path, policy: UnknownSectionPolicy) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json, policy)
    }

    /// Section list for a slide type.
    pub fn get(&self, name: &str) -> Result<&[SectionDescriptor]> {
        self.layouts
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::config("templates", format!("unknown slide type '{}'", name)))
    }

    /// Names of every template, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.layouts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

/// Absolute box and style of one lower-third text slot.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LowerThirdSlot {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
    #[serde(flatten)]
    pub style: TextStyle,
}

/// Lower-third slots keyed by field count.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct LowerThirdPositions(pub HashMap<String, Vec<LowerThirdSlot>>);

impl LowerThirdPositions {
    /// Parse a position table body.
    pub fn from_json(json: &str) -> Result<Self> {
        security::validate_json_size(json)?;
        let table: Self = serde_json::from_str(json)
            .map_err(|e| Error::config("lower-third positions", e.to_string()))?;
        for (key, slots) in &table.0 {
            for (i, slot) in slots.iter().enumerate() {
                slot.style
                    .validate(&format!("lower-third positions '{}' slot {}", key, i))?;
            }
        }
        Ok(table)
    }

    /// Read and parse a position table file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Slots for a lower third showing `arity` fields.
    pub fn slots(&self, arity: usize) -> Result<&[LowerThirdSlot]> {
        if !(1..=2).contains(&arity) {
            return Err(Error::UnsupportedLowerThirdArity(arity));
        }
        let slots = self.0.get(&arity.to_string()).ok_or_else(|| {
            Error::config(
                "lower-third positions",
                format!("no entry for {} field(s)", arity),
            )
        })?;
        if slots.len() < arity {
            return Err(Error::config(
                "lower-third positions",
                format!("entry '{}' has {} slot(s)", arity, slots.len()),
            ));
        }
        Ok(&slots[..arity])
    }
}

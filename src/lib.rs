// this_file: src/lib.rs
//! Slidesmith - template-driven slide rendering with dynamic text fitting
//!
//! This library provides functionality for:
//! - Font loading, measurement and line rasterization
//! - Shrink-and-wrap fitting of text into fixed boxes
//! - Expanding JSON templates into positioned slide sections
//! - Compositing slides and lower-third overlays onto theme backgrounds
//! - Batch rendering of a deck with per-slide JSONL outcomes

pub mod batch;
pub mod config;
pub mod error;
pub mod fetch;
pub mod fit;
pub mod fonts;
pub mod image_ops;
pub mod layout;
pub mod logging;
pub mod lower_third;
pub mod metrics;
pub mod orchestrator;
pub mod render;
pub mod row;
pub mod section;
pub mod security;
pub mod template;

// Re-export commonly used types
pub use batch::{DeckSpec, SlideOutcome, SlidePlan};
pub use config::RenderConfig;
pub use error::{Error, Result};
pub use fetch::{HttpFetcher, ImageFetcher};
pub use fit::{fit_text, FitParams, FittedText};
pub use fonts::FontLoader;
pub use layout::{LayoutEngine, SlideContext, SlideLayout};
pub use lower_third::LowerThird;
pub use metrics::{FontBook, LineMask, LineMetrics, TextExtent};
pub use orchestrator::DeckRenderer;
pub use render::SlideRenderer;
pub use row::{FieldContext, Row};
pub use section::{ImageSection, Rect, Section, TextSection};
pub use template::{LowerThirdPositions, SectionDescriptor, Templates, UnknownSectionPolicy};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

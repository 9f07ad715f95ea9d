// this_file: src/security.rs
//! Input limits and path validation

use crate::error::{Error, Result};
use log::{debug, warn};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Maximum allowed size of a template, position table or deck (10MB)
pub const MAX_JSON_SIZE: usize = 10 * 1024 * 1024;

/// Maximum allowed text length for a single section
pub const MAX_TEXT_LENGTH: usize = 10_000;

/// Maximum allowed font file size (50MB)
pub const MAX_FONT_SIZE: u64 = 50 * 1024 * 1024;

/// Maximum downloaded or read image size (50MB)
pub const MAX_IMAGE_BYTES: u64 = 50 * 1024 * 1024;

/// Largest slide or lower-third canvas edge
pub const MAX_CANVAS_EDGE: u32 = 10_000;

/// Default timeout for a single image fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolve an asset name (font file, background) inside `base_dir`.
///
/// Names come from templates, so they must stay relative and must not walk
/// out of the directory.
pub fn resolve_asset(base_dir: &Path, name: &str) -> Result<PathBuf> {
    let candidate = Path::new(name);
    if name.is_empty() {
        return Err(Error::InvalidParameter("Asset name is empty".into()));
    }

    let escapes = candidate.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes || name.contains('~') {
        warn!("Rejected asset name outside {}: {}", base_dir.display(), name);
        return Err(Error::InvalidParameter(format!(
            "Asset name '{}' must be a relative path without '..' or '~'",
            name
        )));
    }

    let resolved = base_dir.join(candidate);
    debug!("Resolved asset {} -> {}", name, resolved.display());
    Ok(resolved)
}

/// Validate JSON input size
pub fn validate_json_size(json: &str) -> Result<()> {
    if json.len() > MAX_JSON_SIZE {
        return Err(Error::InvalidParameter(format!(
            "JSON input too large: {} bytes (max: {} bytes)",
            json.len(),
            MAX_JSON_SIZE
        )));
    }
    Ok(())
}

/// Validate text pulled from a row before it is fitted
pub fn validate_text_input(text: &str) -> Result<()> {
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(Error::InvalidParameter(format!(
            "Text too long: {} characters (max: {} characters)",
            text.chars().count(),
            MAX_TEXT_LENGTH
        )));
    }

    if text.chars().any(|c| c.is_control() && !c.is_whitespace()) {
        return Err(Error::InvalidParameter(
            "Text contains invalid control characters".into(),
        ));
    }

    Ok(())
}

/// Validate font file size
pub fn validate_font_size(size: u64) -> Result<()> {
    if size > MAX_FONT_SIZE {
        return Err(Error::InvalidParameter(format!(
            "Font file too large: {} bytes (max: {} bytes)",
            size, MAX_FONT_SIZE
        )));
    }
    Ok(())
}

/// Validate canvas dimensions
pub fn validate_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 || width > MAX_CANVAS_EDGE || height > MAX_CANVAS_EDGE {
        return Err(Error::InvalidParameter(format!(
            "Canvas dimensions {}x{} out of bounds (1-{})",
            width, height, MAX_CANVAS_EDGE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_asset_rejects_traversal() {
        let base = Path::new("fonts");
        assert!(resolve_asset(base, "../etc/passwd").is_err());
        assert!(resolve_asset(base, "/etc/passwd").is_err());
        assert!(resolve_asset(base, "~/font.ttf").is_err());
        assert!(resolve_asset(base, "").is_err());
    }

    #[test]
    fn resolve_asset_joins_relative_names() {
        let base = Path::new("fonts");
        let path = resolve_asset(base, "sub/Inter-Bold.ttf").unwrap();
        assert_eq!(path, PathBuf::from("fonts/sub/Inter-Bold.ttf"));
    }

    #[test]
    fn test_json_size_validation() {
        assert!(validate_json_size(r#"{"test": "data"}"#).is_ok());

        let large_json = "x".repeat(MAX_JSON_SIZE + 1);
        assert!(validate_json_size(&large_json).is_err());
    }

    #[test]
    fn test_text_validation() {
        assert!(validate_text_input("Hello,\nworld!").is_ok());

        let long_text = "x".repeat(MAX_TEXT_LENGTH + 1);
        assert!(validate_text_input(&long_text).is_err());

        assert!(validate_text_input("Hello\x00World").is_err());
    }

    #[test]
    fn test_font_size_validation() {
        assert!(validate_font_size(1024).is_ok());
        assert!(validate_font_size(MAX_FONT_SIZE + 1).is_err());
    }

    #[test]
    fn test_dimension_validation() {
        assert!(validate_dimensions(1920, 1080).is_ok());
        assert!(validate_dimensions(0, 1080).is_err());
        assert!(validate_dimensions(1920, MAX_CANVAS_EDGE + 1).is_err());
    }
}

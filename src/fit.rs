// this_file: src/fit.rs

//! Shrink-and-wrap text fitting.
//!
//! Fitting works on an average-character approximation: the unwrapped text is
//! measured once per candidate size, its width divided by the character count
//! gives a per-character width, and from that a characters-per-line budget and
//! an estimated line count. The size steps down until the estimated block is
//! strictly shorter than the box, then the text is word-wrapped to the budget.

use crate::error::{Error, Result};
use crate::metrics::FontBook;
use log::trace;
use serde::{Deserialize, Serialize};

/// Font size step used when shrinking (points).
pub const DECREMENT_STEP: f32 = 10.0;

/// Line spacing never shrinks below this.
pub const MIN_SPACING: f32 = 6.0;

/// Tunables for the shrink loop.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FitParams {
    /// Amount subtracted from the size on every shrink step
    pub decrement: f32,
    /// Floor for the proportionally scaled line spacing
    pub min_spacing: f32,
    /// Smallest size the loop may try before giving up
    pub min_size: f32,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            decrement: DECREMENT_STEP,
            min_spacing: MIN_SPACING,
            min_size: 1.0,
        }
    }
}

impl FitParams {
    /// Reject parameters that would stall the shrink loop.
    pub fn validate(&self) -> Result<()> {
        if !(self.decrement > 0.0) {
            return Err(Error::config(
                "fit",
                format!("decrement must be positive, got {}", self.decrement),
            ));
        }
        if !(self.min_size > 0.0) {
            return Err(Error::config(
                "fit",
                format!("min_size must be positive, got {}", self.min_size),
            ));
        }
        Ok(())
    }
}

/// Result of fitting one string into one box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedText {
    /// Text with line breaks inserted
    pub text: String,
    /// Final font size
    pub size: f32,
    /// Final line spacing
    pub spacing: f32,
    /// Character budget per line at the final size
    pub chars_per_line: usize,
    /// Line count the acceptance test used
    pub estimated_lines: usize,
    /// Single-line height at the final size
    pub line_height: f32,
}

impl FittedText {
    /// Height the acceptance test compared against the box.
    pub fn estimated_height(&self) -> f32 {
        self.estimated_lines as f32 * self.line_height
    }
}

/// Line budget for `text` at one size.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Estimate {
    chars_per_line: usize,
    lines: usize,
    line_height: f32,
}

fn estimate(
    book: &dyn FontBook,
    family: &str,
    text: &str,
    chars: usize,
    box_width: f32,
    size: f32,
) -> Result<Estimate> {
    let extent = book.measure(family, text, size)?;
    let avg_width = extent.width / chars as f32;

    let chars_per_line = if avg_width > 0.0 && avg_width.is_finite() {
        ((box_width / avg_width).ceil() as usize).max(1)
    } else {
        chars
    };
    let lines = chars.div_ceil(chars_per_line);

    Ok(Estimate {
        chars_per_line,
        lines,
        line_height: extent.height,
    })
}

/// Spacing after moving from `old_size` to `new_size`.
pub fn scale_spacing(spacing: f32, old_size: f32, new_size: f32, min_spacing: f32) -> f32 {
    min_spacing.max(spacing * (old_size - new_size).abs() / old_size)
}

/// Fit `text` into a `box_width` x `box_height` box.
///
/// Starts at `start_size`/`start_spacing` and shrinks by
/// [`FitParams::decrement`] until `lines * line_height < box_height`. Fails
/// with [`Error::UnfittableText`] once the next size would drop below
/// [`FitParams::min_size`].
pub fn fit_text(
    book: &dyn FontBook,
    family: &str,
    text: &str,
    box_width: f32,
    box_height: f32,
    start_size: f32,
    start_spacing: f32,
    params: &FitParams,
) -> Result<FittedText> {
    params.validate()?;

    let unfittable = |size: f32| Error::UnfittableText {
        text: text.to_string(),
        width: box_width,
        height: box_height,
        size,
    };

    if !(start_size >= params.min_size) {
        return Err(unfittable(start_size));
    }

    let chars = text.chars().count();
    if chars == 0 {
        let line_height = book.line_metrics(family, start_size)?.height();
        return Ok(FittedText {
            text: String::new(),
            size: start_size,
            spacing: start_spacing,
            chars_per_line: 0,
            estimated_lines: 0,
            line_height,
        });
    }

    let mut size = start_size;
    let mut spacing = start_spacing;
    loop {
        let est = estimate(book, family, text, chars, box_width, size)?;
        trace!(
            "fit size={} cpl={} lines={} h={} box={}x{}",
            size,
            est.chars_per_line,
            est.lines,
            est.line_height,
            box_width,
            box_height
        );

        if (est.lines as f32) * est.line_height < box_height {
            return Ok(FittedText {
                text: wrap_text(text, est.chars_per_line),
                size,
                spacing,
                chars_per_line: est.chars_per_line,
                estimated_lines: est.lines,
                line_height: est.line_height,
            });
        }

        let next = size - params.decrement;
        // A step lost to f32 rounding would never reach the floor.
        if next < params.min_size || next >= size {
            return Err(unfittable(size));
        }
        spacing = scale_spacing(spacing, size, next, params.min_spacing);
        size = next;
    }
}

/// Re-wrap `text` at exactly `size` without shrinking.
///
/// `from` is the fit being replaced; its spacing is rescaled against the new
/// size, which drops it to the spacing floor when the size is unchanged.
pub fn refit_at(
    book: &dyn FontBook,
    family: &str,
    text: &str,
    box_width: f32,
    size: f32,
    from: &FittedText,
    params: &FitParams,
) -> Result<FittedText> {
    let spacing = scale_spacing(from.spacing, from.size, size, params.min_spacing);

    let chars = text.chars().count();
    if chars == 0 {
        return Ok(FittedText {
            text: String::new(),
            size,
            spacing,
            chars_per_line: 0,
            estimated_lines: 0,
            line_height: book.line_metrics(family, size)?.height(),
        });
    }

    let est = estimate(book, family, text, chars, box_width, size)?;
    Ok(FittedText {
        text: wrap_text(text, est.chars_per_line),
        size,
        spacing,
        chars_per_line: est.chars_per_line,
        estimated_lines: est.lines,
        line_height: est.line_height,
    })
}

/// Greedy word wrap into lines of at most `width` characters.
///
/// Whitespace runs (newlines included) collapse to single spaces. Words
/// longer than `width` are split; every other word stays whole.
pub fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len > 0 && current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
            continue;
        }

        if current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if word_len <= width {
            current.push_str(word);
            current_len = word_len;
            continue;
        }

        let chars: Vec<char> = word.chars().collect();
        let mut chunks = chars.chunks(width).peekable();
        while let Some(chunk) = chunks.next() {
            let piece: String = chunk.iter().collect();
            if chunks.peek().is_some() {
                lines.push(piece);
            } else {
                current_len = chunk.len();
                current = piece;
            }
        }
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// [`wrap_lines`] joined with newlines.
pub fn wrap_text(text: &str, width: usize) -> String {
    wrap_lines(text, width).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::FixedFont;
    use approx::assert_relative_eq;

    fn fit(text: &str, w: f32, h: f32, size: f32) -> Result<FittedText> {
        fit_text(&FixedFont::new(), "X.ttf", text, w, h, size, 20.0, &FitParams::default())
    }

    #[test]
    fn short_text_keeps_start_size() {
        let fitted = fit("Hello", 800.0, 180.0, 80.0).unwrap();
        assert_eq!(fitted.size, 80.0);
        assert_eq!(fitted.spacing, 20.0);
        assert_eq!(fitted.text, "Hello");
        assert_eq!(fitted.estimated_lines, 1);
        assert!(fitted.estimated_height() < 180.0);
    }

    #[test]
    fn shrinks_until_strictly_shorter_than_box() {
        // 80pt line is 96px tall; 70pt is 84px.
        let fitted = fit("Hello", 800.0, 90.0, 80.0).unwrap();
        assert_eq!(fitted.size, 70.0);
        assert_relative_eq!(fitted.line_height, 84.0, epsilon = 1e-3);

        // Exactly equal height is not accepted.
        let fitted = fit("Hello", 800.0, 84.0, 80.0).unwrap();
        assert_eq!(fitted.size, 60.0);
    }

    #[test]
    fn long_text_wraps_and_fits() {
        let text = "For God so loved the world that he gave his one and only Son";
        let fitted = fit(text, 400.0, 300.0, 80.0).unwrap();
        assert!(fitted.estimated_height() < 300.0);
        assert!(fitted.text.lines().count() > 1);
        for line in fitted.text.lines() {
            assert!(line.chars().count() <= fitted.chars_per_line, "{line:?}");
        }
    }

    #[test]
    fn spacing_scales_with_size_change_and_respects_floor() {
        assert_relative_eq!(scale_spacing(40.0, 80.0, 70.0, 6.0), 6.0);
        assert_relative_eq!(scale_spacing(400.0, 80.0, 70.0, 6.0), 50.0);

        let fitted = fit_text(
            &FixedFont::new(),
            "X.ttf",
            "Hello",
            800.0,
            90.0,
            80.0,
            400.0,
            &FitParams::default(),
        )
        .unwrap();
        assert_eq!(fitted.size, 70.0);
        assert_relative_eq!(fitted.spacing, 50.0);
    }

    #[test]
    fn single_character_fits_without_division_by_zero() {
        let fitted = fit("A", 100.0, 100.0, 40.0).unwrap();
        assert_eq!(fitted.text, "A");
        assert_eq!(fitted.estimated_lines, 1);
        assert_eq!(fitted.chars_per_line, 5);
    }

    #[test]
    fn empty_text_is_returned_at_start_size() {
        let fitted = fit("", 100.0, 100.0, 40.0).unwrap();
        assert_eq!(fitted.text, "");
        assert_eq!(fitted.size, 40.0);
        assert_eq!(fitted.estimated_lines, 0);
    }

    #[test]
    fn tiny_box_is_unfittable_instead_of_looping() {
        let err = fit("Hello", 100.0, 5.0, 80.0).unwrap_err();
        assert!(matches!(err, Error::UnfittableText { .. }), "{err}");

        let err = fit("Hello", 100.0, 100.0, 0.0).unwrap_err();
        assert!(matches!(err, Error::UnfittableText { .. }));
    }

    #[test]
    fn zero_decrement_is_rejected() {
        let params = FitParams {
            decrement: 0.0,
            ..FitParams::default()
        };
        let err = fit_text(&FixedFont::new(), "X.ttf", "a", 1.0, 1.0, 10.0, 4.0, &params);
        assert!(matches!(err, Err(Error::Configuration { .. })));
    }

    #[test]
    fn decrement_below_float_resolution_is_unfittable() {
        let params = FitParams {
            decrement: 1e-9,
            ..FitParams::default()
        };
        let err = fit_text(&FixedFont::new(), "X.ttf", "Hello", 100.0, 5.0, 80.0, 4.0, &params)
            .unwrap_err();
        match err {
            Error::UnfittableText { size, .. } => assert_eq!(size, 80.0),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_font_propagates() {
        let err = fit_text(
            &FixedFont::new(),
            "missing.ttf",
            "Hello",
            100.0,
            100.0,
            40.0,
            4.0,
            &FitParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::FontNotFound { .. }));
    }

    #[test]
    fn refit_rescales_spacing_even_at_same_size() {
        let book = FixedFont::new();
        let params = FitParams::default();
        let base = fit_text(&book, "X.ttf", "Hello there", 800.0, 500.0, 80.0, 100.0, &params).unwrap();

        let same = refit_at(&book, "X.ttf", "Hello there", 800.0, 80.0, &base, &params).unwrap();
        assert_eq!(same.spacing, MIN_SPACING);
        assert_eq!(same.text, base.text);

        let smaller = refit_at(&book, "X.ttf", "Hello there", 800.0, 40.0, &base, &params).unwrap();
        assert_eq!(smaller.size, 40.0);
        assert_relative_eq!(smaller.spacing, 50.0);
        assert!(smaller.chars_per_line >= base.chars_per_line);
    }

    #[test]
    fn wrap_is_greedy_and_keeps_words_whole() {
        assert_eq!(
            wrap_lines("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
        assert_eq!(wrap_text("  spaced\n\tout  ", 20), "spaced out");
        assert!(wrap_lines("   ", 5).is_empty());
    }

    #[test]
    fn wrap_splits_only_overlong_words() {
        assert_eq!(
            wrap_lines("a abcdefghij b", 4),
            vec!["a", "abcd", "efgh", "ij b"]
        );
    }

    #[test]
    fn wrap_is_idempotent() {
        let samples = [
            "In the beginning was the Word, and the Word was with God",
            "a abcdefghij b cd efghijklmnop q",
            "one",
        ];
        for text in samples {
            for width in [1, 3, 7, 12, 40] {
                let once = wrap_text(text, width);
                assert_eq!(wrap_text(&once, width), once, "width {width}");
            }
        }
    }
}

// this_file: src/fetch.rs

//! Image retrieval for image sections.
//!
//! Locators are either HTTP(S) URLs, `file://` URLs or plain filesystem
//! paths. Remote bytes are written to the slide's scratch file before they
//! are decoded so a failed decode can be inspected afterwards.

use crate::error::{Error, Result};
use crate::security::{DEFAULT_FETCH_TIMEOUT, MAX_IMAGE_BYTES};
use image::DynamicImage;
use log::{debug, warn};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Loads the picture behind a locator.
pub trait ImageFetcher: Send + Sync {
    /// Fetch and decode `locator`; remote bytes are stored at `scratch`.
    fn fetch(&self, locator: &str, scratch: &Path) -> Result<DynamicImage>;
}

/// Where a locator points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Remote(String),
    Local(PathBuf),
}

impl Source {
    /// Classify a locator, rewriting Google Drive share links to their
    /// direct-download form.
    pub fn parse(locator: &str) -> Self {
        let locator = locator.trim();
        if let Some(path) = locator.strip_prefix("file://") {
            return Source::Local(PathBuf::from(path));
        }
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return Source::Remote(normalize_drive_link(locator));
        }
        Source::Local(PathBuf::from(locator))
    }
}

/// Turn `drive.google.com/file/d/<id>/view` and `open?id=<id>` links into
/// `uc?export=download&id=<id>`. Other URLs pass through unchanged.
pub fn normalize_drive_link(url: &str) -> String {
    if !url.contains("drive.google.com") {
        return url.to_string();
    }

    let id = url
        .split_once("/file/d/")
        .map(|(_, rest)| rest)
        .or_else(|| url.split_once("id=").map(|(_, rest)| rest))
        .map(|rest| {
            rest.split(|c: char| c == '/' || c == '?' || c == '&')
                .next()
                .unwrap_or_default()
        })
        .filter(|id| !id.is_empty());

    match id {
        Some(id) => format!("https://drive.google.com/uc?export=download&id={}", id),
        None => url.to_string(),
    }
}

fn decode(locator: &str, bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| Error::ResourceFetch {
        locator: locator.to_string(),
        reason: format!("cannot decode image: {}", e),
    })
}

/// Blocking HTTP fetcher with a per-request timeout and bounded retries.
pub struct HttpFetcher {
    agent: ureq::Agent,
    retries: u32,
    backoff: Duration,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT, 2)
    }
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retries: u32) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            retries,
            backoff: Duration::from_millis(500),
        }
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        let fail = |reason: String| Error::ResourceFetch {
            locator: url.to_string(),
            reason,
        };

        let mut attempt = 0;
        loop {
            match self.agent.get(url).call() {
                Ok(response) => {
                    let mut bytes = Vec::new();
                    response
                        .into_reader()
                        .take(MAX_IMAGE_BYTES + 1)
                        .read_to_end(&mut bytes)
                        .map_err(|e| fail(format!("failed to read body: {}", e)))?;
                    if bytes.len() as u64 > MAX_IMAGE_BYTES {
                        return Err(fail(format!("body exceeds {} bytes", MAX_IMAGE_BYTES)));
                    }
                    return Ok(bytes);
                }
                // Client errors will not change on retry.
                Err(ureq::Error::Status(code, _)) if code < 500 => {
                    return Err(fail(format!("HTTP {}", code)));
                }
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        "Fetch of {} failed ({}); retry {}/{}",
                        url, e, attempt, self.retries
                    );
                    std::thread::sleep(self.backoff * attempt);
                }
                Err(e) => return Err(fail(e.to_string())),
            }
        }
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, locator: &str, scratch: &Path) -> Result<DynamicImage> {
        match Source::parse(locator) {
            Source::Local(path) => {
                debug!("Reading image {}", path.display());
                let bytes = read_local(locator, &path)?;
                decode(locator, &bytes)
            }
            Source::Remote(url) => {
                debug!("Downloading image {}", url);
                let bytes = self.download(&url)?;
                if let Some(parent) = scratch.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(scratch, &bytes)?;
                decode(locator, &bytes)
            }
        }
    }
}

fn read_local(locator: &str, path: &Path) -> Result<Vec<u8>> {
    let fail = |reason: String| Error::ResourceFetch {
        locator: locator.to_string(),
        reason,
    };
    let meta = std::fs::metadata(path).map_err(|e| fail(e.to_string()))?;
    if meta.len() > MAX_IMAGE_BYTES {
        return Err(fail(format!("file exceeds {} bytes", MAX_IMAGE_BYTES)));
    }
    std::fs::read(path).map_err(|e| fail(e.to_string()))
}

/// Scratch file for the `ordinal`-th image of slide `slide_index`.
pub fn scratch_path(scratch_dir: &Path, slide_index: usize, ordinal: usize) -> PathBuf {
    scratch_dir.join(format!("{}_{}.img", slide_index, ordinal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    #[test]
    fn classifies_locators() {
        assert_eq!(
            Source::parse("file:///tmp/a.png"),
            Source::Local(PathBuf::from("/tmp/a.png"))
        );
        assert_eq!(Source::parse("pics/a.png"), Source::Local(PathBuf::from("pics/a.png")));
        assert_eq!(
            Source::parse(" https://example.com/a.png "),
            Source::Remote("https://example.com/a.png".into())
        );
    }

    #[test]
    fn drive_share_links_become_direct_downloads() {
        assert_eq!(
            normalize_drive_link("https://drive.google.com/file/d/abc123/view?usp=sharing"),
            "https://drive.google.com/uc?export=download&id=abc123"
        );
        assert_eq!(
            normalize_drive_link("https://drive.google.com/open?id=xyz&authuser=0"),
            "https://drive.google.com/uc?export=download&id=xyz"
        );
        assert_eq!(
            normalize_drive_link("https://example.com/file/d/abc/view"),
            "https://example.com/file/d/abc/view"
        );
    }

    #[test]
    fn reads_local_images_without_touching_scratch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pic.png");
        RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])).save(&path).unwrap();
        let scratch = scratch_path(dir.path(), 4, 1);

        let picture = HttpFetcher::default()
            .fetch(path.to_str().unwrap(), &scratch)
            .unwrap();
        assert_eq!((picture.width(), picture.height()), (3, 2));
        assert!(!scratch.exists());
        assert!(scratch.ends_with("4_1.img"));
    }

    #[test]
    fn missing_or_corrupt_local_files_are_fetch_errors() {
        let dir = TempDir::new().unwrap();
        let fetcher = HttpFetcher::default();
        let err = fetcher
            .fetch("does/not/exist.png", &dir.path().join("s.img"))
            .unwrap_err();
        assert!(matches!(err, Error::ResourceFetch { .. }));

        let junk = dir.path().join("junk.png");
        std::fs::write(&junk, b"not an image").unwrap();
        let err = fetcher
            .fetch(&format!("file://{}", junk.display()), &dir.path().join("s.img"))
            .unwrap_err();
        assert!(err.to_string().contains("cannot decode"), "{err}");
    }
}

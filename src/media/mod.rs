//! Media data model: assets, stream kinds, descriptors and resolutions.
//!
//! A catalog offers one or more [`StreamDescriptor`]s per [`Asset`]. The
//! pipeline never mutates descriptors; it only selects among them and hands
//! them to the fetcher.

pub mod filename;

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use filename::{artifact_filename, extension_from_mime, merged_filename, sanitize_title};

/// Matches resolution labels such as `720p`, `1080p60` or `2160p HDR`.
#[allow(clippy::expect_used)]
static RESOLUTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{2,5})p(\d{2,3})?\b").expect("resolution regex is valid")
});

/// The logical media item being acquired.
///
/// Created once at pipeline start and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    title: String,
    source_id: String,
}

impl Asset {
    /// Creates an asset from the catalog title and the caller's source identifier.
    #[must_use]
    pub fn new(title: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_id: source_id.into(),
        }
    }

    /// Display title as reported by the catalog (not filesystem safe).
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Opaque locator the asset was resolved from.
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Title sanitized for use as a directory or file stem.
    #[must_use]
    pub fn safe_title(&self) -> String {
        sanitize_title(&self.title)
    }
}

/// Whether a stream carries video or audio only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Video stream (may or may not embed an audio track).
    Video,
    /// Audio-only stream.
    Audio,
}

impl StreamKind {
    /// Human-readable label used in status lines and artifact names.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Video => "Video",
            Self::Audio => "Audio",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Vertical resolution of a video stream, parsed from labels like `"720p"`.
///
/// Ordering is by pixel height first, then frame rate (a missing frame rate
/// sorts below any explicit one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    height: u32,
    fps: Option<u32>,
}

impl Resolution {
    /// Creates a resolution from a pixel height.
    #[must_use]
    pub const fn from_height(height: u32) -> Self {
        Self { height, fps: None }
    }

    /// Parses a label such as `720p`, `1080p60` or `1440p HDR`.
    ///
    /// Returns `None` for labels that do not start with `<digits>p`.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        let captures = RESOLUTION_LABEL.captures(label)?;
        let height = captures.get(1)?.as_str().parse().ok()?;
        let fps = captures.get(2).and_then(|m| m.as_str().parse().ok());
        Some(Self { height, fps })
    }

    /// Pixel height.
    #[must_use]
    pub fn height(self) -> u32 {
        self.height
    }
}

impl PartialOrd for Resolution {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Resolution {
    fn cmp(&self, other: &Self) -> Ordering {
        self.height
            .cmp(&other.height)
            .then_with(|| self.fps.unwrap_or(0).cmp(&other.fps.unwrap_or(0)))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fps {
            Some(fps) => write!(f, "{}p{fps}", self.height),
            None => write!(f, "{}p", self.height),
        }
    }
}

/// Metadata about one downloadable stream variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Video or audio.
    pub kind: StreamKind,
    /// Resolution label (`"720p"`); video only.
    #[serde(default)]
    pub resolution: Option<String>,
    /// MIME type, e.g. `video/webm` or `audio/mp4; codecs="mp4a.40.2"`.
    pub mime_type: String,
    /// Advertised size in bytes; `0` when unknown.
    #[serde(default)]
    pub size_bytes: u64,
    /// Absolute URL the transport downloads from.
    pub url: String,
}

impl StreamDescriptor {
    /// Creates a video descriptor.
    #[must_use]
    pub fn video(
        resolution: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
        url: impl Into<String>,
    ) -> Self {
        Self {
            kind: StreamKind::Video,
            resolution: Some(resolution.into()),
            mime_type: mime_type.into(),
            size_bytes,
            url: url.into(),
        }
    }

    /// Creates an audio-only descriptor.
    #[must_use]
    pub fn audio(mime_type: impl Into<String>, size_bytes: u64, url: impl Into<String>) -> Self {
        Self {
            kind: StreamKind::Audio,
            resolution: None,
            mime_type: mime_type.into(),
            size_bytes,
            url: url.into(),
        }
    }

    /// Parsed resolution, if this is a video descriptor with a parseable label.
    #[must_use]
    pub fn parsed_resolution(&self) -> Option<Resolution> {
        self.resolution.as_deref().and_then(Resolution::parse)
    }

    /// File extension derived from the MIME subtype.
    #[must_use]
    pub fn extension(&self) -> String {
        extension_from_mime(&self.mime_type)
    }
}

//! Stream selection policy.
//!
//! Picks one video and one audio descriptor from what the catalog offers:
//!
//! 1. The highest-resolution video descriptor is the candidate.
//! 2. If the candidate is below the floor (720p by default), an exact
//!    `720p` descriptor replaces it when one exists; otherwise the candidate
//!    is kept. Selection never fails just because 720p is missing.
//! 3. The first audio-only descriptor is taken as offered.

use thiserror::Error;
use tracing::{debug, instrument};

use crate::media::{Resolution, StreamDescriptor, StreamKind};

/// Default resolution floor in pixel height.
pub const DEFAULT_RESOLUTION_FLOOR: u32 = 720;

/// Label searched for when the best candidate falls below the floor.
const PREFERRED_LABEL: &str = "720p";

/// Errors from stream selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The catalog offered no video descriptor.
    #[error("no video stream available")]
    NoVideoAvailable,

    /// The catalog offered no audio-only descriptor.
    #[error("no audio stream available")]
    NoAudioAvailable,
}

/// The chosen video/audio pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedStreams {
    /// Chosen video descriptor.
    pub video: StreamDescriptor,
    /// Chosen audio descriptor.
    pub audio: StreamDescriptor,
}

/// Selection policy with a configurable resolution floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSelector {
    floor: Resolution,
}

impl Default for StreamSelector {
    fn default() -> Self {
        Self::with_floor(DEFAULT_RESOLUTION_FLOOR)
    }
}

impl StreamSelector {
    /// Creates a selector whose floor is the given pixel height.
    #[must_use]
    pub fn with_floor(height: u32) -> Self {
        Self {
            floor: Resolution::from_height(height),
        }
    }

    /// Returns the configured floor height.
    #[must_use]
    pub fn floor(&self) -> u32 {
        self.floor.height()
    }

    /// Chooses the video and audio descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NoVideoAvailable`] when no video descriptor is
    /// offered, then [`SelectionError::NoAudioAvailable`] when no audio-only
    /// descriptor is offered. No partial result is returned.
    #[instrument(skip(self, descriptors), fields(offered = descriptors.len(), floor = self.floor.height()))]
    pub fn select(
        &self,
        descriptors: &[StreamDescriptor],
    ) -> Result<SelectedStreams, SelectionError> {
        let video = self
            .select_video(descriptors)
            .ok_or(SelectionError::NoVideoAvailable)?;
        let audio = descriptors
            .iter()
            .find(|d| d.kind == StreamKind::Audio)
            .ok_or(SelectionError::NoAudioAvailable)?;

        debug!(
            video_resolution = video.resolution.as_deref().unwrap_or("unknown"),
            video_mime = %video.mime_type,
            audio_mime = %audio.mime_type,
            "streams selected"
        );

        Ok(SelectedStreams {
            video: video.clone(),
            audio: audio.clone(),
        })
    }

    fn select_video<'a>(&self, descriptors: &'a [StreamDescriptor]) -> Option<&'a StreamDescriptor> {
        let mut videos = descriptors.iter().filter(|d| d.kind == StreamKind::Video);
        let first = videos.next()?;

        // Strictly-greater keeps the first offered among equals.
        let candidate = videos.fold(first, |best, d| {
            if d.parsed_resolution() > best.parsed_resolution() {
                d
            } else {
                best
            }
        });

        let below_floor = candidate
            .parsed_resolution()
            .is_none_or(|res| res < self.floor);
        if !below_floor {
            return Some(candidate);
        }

        let preferred = descriptors.iter().find(|d| {
            d.kind == StreamKind::Video && d.resolution.as_deref() == Some(PREFERRED_LABEL)
        });
        match preferred {
            Some(exact) => {
                debug!("highest resolution below floor, using exact 720p stream");
                Some(exact)
            }
            None => {
                debug!("highest resolution below floor and no 720p stream, keeping best");
                Some(candidate)
            }
        }
    }
}

/// Selects streams with the default 720p floor.
///
/// # Errors
///
/// See [`StreamSelector::select`].
pub fn select_streams(
    descriptors: &[StreamDescriptor],
) -> Result<SelectedStreams, SelectionError> {
    StreamSelector::default().select(descriptors)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn video(label: &str) -> StreamDescriptor {
        StreamDescriptor::video(label, "video/mp4", 1000, format!("https://cdn/{label}"))
    }

    fn audio(mime: &str) -> StreamDescriptor {
        StreamDescriptor::audio(mime, 100, format!("https://cdn/{mime}"))
    }

    #[test]
    fn test_select_highest_resolution_video() {
        let offered = vec![video("480p"), video("1080p"), video("720p"), audio("audio/mp4")];
        let selected = select_streams(&offered).unwrap();
        assert_eq!(selected.video.resolution.as_deref(), Some("1080p"));
    }

    #[test]
    fn test_select_unparseable_labels_rank_below_parseable() {
        let offered = vec![video("360p"), video("garbage"), audio("audio/webm")];
        let selected = select_streams(&offered).unwrap();
        assert_eq!(selected.video.resolution.as_deref(), Some("360p"));
    }

    #[test]
    fn test_select_below_floor_without_720p_keeps_best() {
        let offered = vec![video("240p"), video("480p"), audio("audio/mp4")];
        let selected = select_streams(&offered).unwrap();
        assert_eq!(selected.video.resolution.as_deref(), Some("480p"));
    }

    #[test]
    fn test_select_custom_floor_falls_back_to_720p() {
        let offered = vec![video("480p"), video("720p"), audio("audio/mp4")];
        let selected = StreamSelector::with_floor(1080).select(&offered).unwrap();
        assert_eq!(selected.video.resolution.as_deref(), Some("720p"));
    }

    #[test]
    fn test_select_unparseable_only_uses_720p_label_if_present() {
        let offered = vec![video("hd"), video("720p"), audio("audio/mp4")];
        let selected = select_streams(&offered).unwrap();
        assert_eq!(selected.video.resolution.as_deref(), Some("720p"));
    }

    #[test]
    fn test_select_ties_keep_first_offered() {
        let mut first = video("720p");
        first.url = "https://cdn/first".to_string();
        let mut second = video("720p");
        second.url = "https://cdn/second".to_string();
        let selected = select_streams(&[first, second, audio("audio/mp4")]).unwrap();
        assert_eq!(selected.video.url, "https://cdn/first");
    }

    #[test]
    fn test_select_first_audio_without_quality_comparison() {
        let offered = vec![
            video("720p"),
            StreamDescriptor::audio("audio/webm", 10, "https://cdn/low"),
            StreamDescriptor::audio("audio/mp4", 10_000, "https://cdn/high"),
        ];
        let selected = select_streams(&offered).unwrap();
        assert_eq!(selected.audio.url, "https://cdn/low");
    }

    #[test]
    fn test_select_no_audio_fails() {
        let offered = vec![video("720p"), video("1080p")];
        assert_eq!(
            select_streams(&offered),
            Err(SelectionError::NoAudioAvailable)
        );
    }

    #[test]
    fn test_select_no_video_fails() {
        let offered = vec![audio("audio/mp4")];
        assert_eq!(
            select_streams(&offered),
            Err(SelectionError::NoVideoAvailable)
        );
    }

    #[test]
    fn test_select_empty_reports_video_first() {
        assert_eq!(select_streams(&[]), Err(SelectionError::NoVideoAvailable));
    }

    #[test]
    fn test_select_meets_floor_whenever_possible() {
        let labels = ["144p", "240p", "360p", "480p", "720p", "1080p", "1440p", "2160p"];
        // Every contiguous window containing a >=720p label must yield >=720p.
        for start in 0..labels.len() {
            for end in start + 1..=labels.len() {
                let mut offered: Vec<_> = labels[start..end].iter().map(|l| video(l)).collect();
                offered.push(audio("audio/mp4"));
                let any_hd = labels[start..end]
                    .iter()
                    .any(|l| Resolution::parse(l).unwrap().height() >= 720);
                let chosen = select_streams(&offered).unwrap().video;
                if any_hd {
                    assert!(
                        chosen.parsed_resolution().unwrap().height() >= 720,
                        "window {:?} chose {:?}",
                        &labels[start..end],
                        chosen.resolution
                    );
                }
            }
        }
    }

    #[test]
    fn test_selection_error_display() {
        assert_eq!(
            SelectionError::NoAudioAvailable.to_string(),
            "no audio stream available"
        );
    }
}

//! Integration tests for the merge stage and its cleanup rules.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use avfetch_core::download::{FetchJob, FetchState};
use avfetch_core::media::StreamDescriptor;
use avfetch_core::merge::{MergeError, MergeRequest, MergeStage, Muxer};
use tempfile::TempDir;

/// Concatenates both inputs into the output, or fails after writing a
/// partial output.
struct FakeMuxer {
    fail: bool,
    calls: AtomicU32,
}

impl FakeMuxer {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Muxer for FakeMuxer {
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MergeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            tokio::fs::write(output, b"half").await.unwrap();
            return Err(MergeError::muxer(1, "Invalid data found when processing input"));
        }
        let mut combined = tokio::fs::read(video).await.unwrap();
        combined.extend(tokio::fs::read(audio).await.unwrap());
        tokio::fs::write(output, combined).await.unwrap();
        Ok(())
    }
}

struct Artifacts {
    _dir: TempDir,
    video: FetchJob,
    audio: FetchJob,
    output: PathBuf,
}

fn succeeded_job(descriptor: StreamDescriptor, path: PathBuf) -> FetchJob {
    FetchJob {
        descriptor,
        destination_path: path,
        bytes_total: 5,
        bytes_downloaded: 5,
        attempt_count: 1,
        state: FetchState::Succeeded,
    }
}

fn artifacts_on_disk() -> Artifacts {
    let dir = TempDir::new().unwrap();
    let video_path = dir.path().join("Clip [Video].webm");
    let audio_path = dir.path().join("Clip [Audio].webm");
    std::fs::write(&video_path, b"VIDEO").unwrap();
    std::fs::write(&audio_path, b"AUDIO").unwrap();
    Artifacts {
        video: succeeded_job(
            StreamDescriptor::video("720p", "video/webm", 5, "https://cdn/v"),
            video_path,
        ),
        audio: succeeded_job(
            StreamDescriptor::audio("audio/webm", 5, "https://cdn/a"),
            audio_path,
        ),
        output: dir.path().join("Clip.mp4"),
        _dir: dir,
    }
}

#[tokio::test]
async fn test_merge_success_removes_intermediates() {
    let artifacts = artifacts_on_disk();
    let muxer = Arc::new(FakeMuxer::new(false));
    let stage = MergeStage::new(muxer.clone());
    let request =
        MergeRequest::from_jobs(&artifacts.video, &artifacts.audio, &artifacts.output).unwrap();

    let output = stage.merge(&request).await.unwrap();

    assert_eq!(output, artifacts.output);
    assert_eq!(std::fs::read(&output).unwrap(), b"VIDEOAUDIO");
    assert!(!artifacts.video.destination_path.exists());
    assert!(!artifacts.audio.destination_path.exists());
    assert_eq!(muxer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_merge_failure_keeps_intermediates_and_removes_output() {
    let artifacts = artifacts_on_disk();
    let stage = MergeStage::new(Arc::new(FakeMuxer::new(true)));
    let request =
        MergeRequest::from_jobs(&artifacts.video, &artifacts.audio, &artifacts.output).unwrap();

    let err = stage.merge(&request).await.unwrap_err();

    assert!(matches!(err, MergeError::Muxer { code: 1, .. }));
    assert!(err.to_string().contains("Invalid data found"));
    assert!(artifacts.video.destination_path.exists());
    assert!(artifacts.audio.destination_path.exists());
    assert!(!artifacts.output.exists());
}

#[tokio::test]
async fn test_merge_missing_input_never_invokes_muxer() {
    let artifacts = artifacts_on_disk();
    std::fs::remove_file(&artifacts.audio.destination_path).unwrap();
    let muxer = Arc::new(FakeMuxer::new(false));
    let stage = MergeStage::new(muxer.clone());
    let request =
        MergeRequest::from_jobs(&artifacts.video, &artifacts.audio, &artifacts.output).unwrap();

    let err = stage.merge(&request).await.unwrap_err();

    assert!(matches!(err, MergeError::MissingInput { .. }));
    assert_eq!(muxer.calls.load(Ordering::SeqCst), 0);
    assert!(artifacts.video.destination_path.exists());
}

#[test]
fn test_merge_request_rejects_failed_job() {
    let mut artifacts = artifacts_on_disk();
    artifacts.audio.state = FetchState::Failed;

    let err =
        MergeRequest::from_jobs(&artifacts.video, &artifacts.audio, &artifacts.output).unwrap_err();
    assert!(matches!(
        err,
        MergeError::InputNotReady {
            state: FetchState::Failed,
            ..
        }
    ));
}

#[test]
fn test_merge_request_rejects_swapped_jobs() {
    let artifacts = artifacts_on_disk();
    let err =
        MergeRequest::from_jobs(&artifacts.audio, &artifacts.video, &artifacts.output).unwrap_err();
    assert!(matches!(err, MergeError::InputNotReady { .. }));
}

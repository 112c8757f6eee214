//! Pipeline controller: the session state machine.
//!
//! Sequences the long-running remote operations (upload, transcription,
//! preview, final render), enforces single-flight semantics, runs the
//! progress estimator for operations without real progress, and owns the
//! ephemeral media handles. Front-ends dispatch intents and render the
//! observable state snapshot; nothing else mutates session state.

mod errors;
mod state;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::config::{Settings, UploadSettings};
use crate::models::{
    is_srt_path, ArtifactKind, RenderArtifact, StyleSpec, SubtitleOrigin, SubtitleSource,
    VideoAsset, VideoFormat,
};
use crate::progress::{EstimatorHandle, EstimatorProfile, ProgressCell, ProgressEstimator};
use crate::resources::{MediaHandleKind, ResourceManager};
use crate::transport::{ProgressSink, Transport};

pub use errors::{PipelineError, PipelineResult};
pub use state::{ArtifactFlags, ErrorKind, LastError, PipelineState, ResumePoint, Stage};

const INTENT_START_UPLOAD: &str = "start_upload";
const INTENT_TRANSCRIBE: &str = "start_auto_transcribe";
const INTENT_UPLOAD_SUBTITLES: &str = "upload_subtitle_file";
const INTENT_RENDER_PREVIEW: &str = "render_preview";
const INTENT_RENDER_FINAL: &str = "render_final";
const INTENT_DOWNLOAD: &str = "download_artifact";

/// Session state behind the controller's single lock.
struct Inner {
    stage: Stage,
    last_error: Option<state::LastError>,
    artifacts: ArtifactFlags,
    asset: Option<VideoAsset>,
    source: Option<SubtitleSource>,
    records: HashMap<ArtifactKind, RenderArtifact>,
    resources: ResourceManager,
    estimator: Option<EstimatorHandle>,
    /// Bumped on every operation start and on reset; a settling operation
    /// whose epoch no longer matches was superseded and drops its result.
    epoch: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            stage: Stage::Idle,
            last_error: None,
            artifacts: ArtifactFlags::default(),
            asset: None,
            source: None,
            records: HashMap::new(),
            resources: ResourceManager::new(),
            estimator: None,
            epoch: 0,
        }
    }

    /// The stage intents are validated against. While failed, intents
    /// valid at the resume point are accepted, which is what lets the
    /// user re-invoke the same intent after a failure.
    fn effective_stage(&self) -> Stage {
        match self.stage {
            Stage::Failed { resume } => resume.as_stage(),
            stage => stage,
        }
    }
}

/// The pipeline state machine, exposed to front-ends as dispatchable
/// intents plus an observable `PipelineState` snapshot.
///
/// At most one long operation is in flight at a time; an intent that
/// requires a stage other than the current one is rejected synchronously
/// with a sequence error and no queuing.
pub struct PipelineController {
    transport: Arc<dyn Transport>,
    settings: Settings,
    progress: ProgressCell,
    inner: Mutex<Inner>,
}

impl PipelineController {
    /// Create a controller over the given transport.
    pub fn new(transport: Arc<dyn Transport>, settings: Settings) -> Self {
        Self {
            transport,
            settings,
            progress: ProgressCell::new(),
            inner: Mutex::new(Inner::new()),
        }
    }

    /// The settings this controller was built with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Consistent clone of the current pipeline state.
    pub fn snapshot(&self) -> PipelineState {
        let inner = self.inner.lock();
        PipelineState {
            stage: inner.stage,
            progress_percent: self.progress.get(),
            last_error: inner.last_error.clone(),
            artifacts: inner.artifacts,
        }
    }

    /// The uploaded asset, if any.
    pub fn video_asset(&self) -> Option<VideoAsset> {
        self.inner.lock().asset.clone()
    }

    /// The active subtitle source, if any.
    pub fn subtitle_source(&self) -> Option<SubtitleSource> {
        self.inner.lock().source.clone()
    }

    /// The recorded artifact reference of `kind`, if that render completed.
    pub fn artifact(&self, kind: ArtifactKind) -> Option<RenderArtifact> {
        self.inner.lock().records.get(&kind).cloned()
    }

    /// Path of the currently held preview clip, if one is displayed.
    pub fn preview_path(&self) -> Option<PathBuf> {
        self.inner
            .lock()
            .resources
            .path(MediaHandleKind::Preview)
            .map(Path::to_path_buf)
    }

    /// Upload a local video file. Valid only from `Idle`.
    ///
    /// The extension and size are validated locally first; a bad file is
    /// rejected without any network call. On success the pipeline holds
    /// the new asset and pauses at `Uploaded` for the user to choose
    /// between automatic transcription and a subtitle file upload.
    pub async fn start_upload(&self, file: &Path) -> PipelineResult<VideoAsset> {
        let (epoch, format, size_bytes, filename) = {
            let mut inner = self.guard(INTENT_START_UPLOAD, &[Stage::Idle])?;
            let (format, size_bytes, filename) =
                match validate_video_file(file, &self.settings.upload) {
                    Ok(v) => v,
                    Err(e) => {
                        inner.last_error = Some(LastError::from(&e));
                        return Err(e);
                    }
                };
            inner.stage = Stage::Uploading;
            inner.last_error = None;
            inner.epoch += 1;
            (inner.epoch, format, size_bytes, filename)
        };

        self.progress.reset();
        let cell = self.progress.clone();
        let sink: ProgressSink = Arc::new(move |percent| cell.set_at_least(percent as f64));

        tracing::info!(file = %file.display(), "starting upload");
        match self.transport.upload(file, sink).await {
            Ok(ack) => {
                let asset = VideoAsset {
                    id: ack.video_id,
                    filename,
                    size_bytes,
                    format,
                    duration_secs: ack.duration,
                };
                let applied = self.settle(epoch, |inner| {
                    inner.asset = Some(asset.clone());
                    inner.stage = Stage::Uploaded;
                    self.progress.force(100.0);
                });
                match applied {
                    Some(()) => {
                        tracing::info!(video_id = %asset.id, "upload complete");
                        Ok(asset)
                    }
                    None => Err(self.superseded(INTENT_START_UPLOAD)),
                }
            }
            Err(e) => {
                let error = PipelineError::from(e);
                tracing::warn!("upload failed: {error}");
                self.settle_failure(
                    epoch,
                    &error,
                    Stage::Failed {
                        resume: ResumePoint::Idle,
                    },
                );
                Err(error)
            }
        }
    }

    /// Request automatic transcription. Valid from `Uploaded` or `Ready`.
    ///
    /// The backend reports no incremental progress, so the estimator
    /// fakes one until the call settles. On success the generated source
    /// replaces any prior one and the pipeline is `Ready`.
    pub async fn start_auto_transcribe(
        &self,
        language_hint: Option<&str>,
    ) -> PipelineResult<SubtitleSource> {
        let (epoch, video_id) = {
            let mut inner = self.guard(INTENT_TRANSCRIBE, &[Stage::Uploaded, Stage::Ready])?;
            let Some(asset) = inner.asset.as_ref() else {
                debug_assert!(false, "stage {} without an asset", inner.stage);
                return Err(PipelineError::sequence(INTENT_TRANSCRIBE, inner.stage));
            };
            let video_id = asset.id.clone();
            inner.stage = Stage::TranscribingAuto;
            inner.last_error = None;
            inner.epoch += 1;
            debug_assert!(inner.estimator.is_none(), "estimator already active");
            inner.estimator = Some(ProgressEstimator::start(
                EstimatorProfile::transcribe(),
                self.progress.clone(),
            ));
            (inner.epoch, video_id)
        };

        let language = language_hint.filter(|l| !l.is_empty() && *l != "auto");
        tracing::info!(video_id, ?language, "starting transcription");

        match self.transport.transcribe(&video_id, language).await {
            Ok(response) => {
                let source = response.into_source();
                let applied = self.settle(epoch, |inner| {
                    if let Some(estimator) = inner.estimator.take() {
                        estimator.finish();
                    }
                    inner.source = Some(source.clone());
                    inner.artifacts.subtitle = true;
                    inner
                        .records
                        .insert(ArtifactKind::Srt, RenderArtifact::new(ArtifactKind::Srt, video_id.as_str()));
                    inner.stage = Stage::Ready;
                });
                match applied {
                    Some(()) => {
                        tracing::info!(segments = source.segments.len(), "transcription complete");
                        Ok(source)
                    }
                    None => Err(self.superseded(INTENT_TRANSCRIBE)),
                }
            }
            Err(e) => {
                let error = PipelineError::from(e);
                tracing::warn!("transcription failed: {error}");
                self.settle_failure(
                    epoch,
                    &error,
                    Stage::Failed {
                        resume: ResumePoint::Uploaded,
                    },
                );
                Err(error)
            }
        }
    }

    /// Upload a ready-made `.srt` file as the subtitle source. Valid from
    /// `Uploaded` or `Ready`; overwrites any prior source.
    pub async fn upload_subtitle_file(&self, file: &Path) -> PipelineResult<()> {
        let (epoch, video_id, resume) = {
            let mut inner =
                self.guard(INTENT_UPLOAD_SUBTITLES, &[Stage::Uploaded, Stage::Ready])?;
            if let Err(e) = validate_subtitle_file(file) {
                inner.last_error = Some(LastError::from(&e));
                return Err(e);
            }
            let Some(asset) = inner.asset.as_ref() else {
                debug_assert!(false, "stage {} without an asset", inner.stage);
                return Err(PipelineError::sequence(INTENT_UPLOAD_SUBTITLES, inner.stage));
            };
            let video_id = asset.id.clone();
            // Failure resumes exactly where we left off.
            let resume = match inner.effective_stage() {
                Stage::Ready => ResumePoint::Ready,
                _ => ResumePoint::Uploaded,
            };
            inner.stage = Stage::UploadingSubtitles;
            inner.last_error = None;
            inner.epoch += 1;
            (inner.epoch, video_id, resume)
        };

        self.progress.reset();
        tracing::info!(video_id, file = %file.display(), "uploading subtitle file");

        match self.transport.upload_subtitles(&video_id, file).await {
            Ok(_ack) => {
                let source = SubtitleSource {
                    origin: SubtitleOrigin::Uploaded,
                    // Timing files are opaque to the client; the service
                    // parses them.
                    segments: Vec::new(),
                    language: String::new(),
                };
                let applied = self.settle(epoch, |inner| {
                    inner.source = Some(source);
                    inner.artifacts.subtitle = true;
                    inner
                        .records
                        .insert(ArtifactKind::Srt, RenderArtifact::new(ArtifactKind::Srt, video_id.as_str()));
                    inner.stage = Stage::Ready;
                    self.progress.force(100.0);
                });
                match applied {
                    Some(()) => Ok(()),
                    None => Err(self.superseded(INTENT_UPLOAD_SUBTITLES)),
                }
            }
            Err(e) => {
                let error = PipelineError::from(e);
                tracing::warn!("subtitle upload failed: {error}");
                self.settle_failure(epoch, &error, Stage::Failed { resume });
                Err(error)
            }
        }
    }

    /// Render a styled sample clip. Valid only from `Ready`.
    ///
    /// The resulting bytes become a scoped media handle (superseding any
    /// prior preview). Failures are non-fatal: the pipeline returns to
    /// `Ready` with `last_error` set.
    pub async fn render_preview(&self, style: StyleSpec) -> PipelineResult<PathBuf> {
        let (epoch, video_id) = {
            let mut inner = self.guard(INTENT_RENDER_PREVIEW, &[Stage::Ready])?;
            let Some(asset) = inner.asset.as_ref() else {
                debug_assert!(false, "stage {} without an asset", inner.stage);
                return Err(PipelineError::sequence(INTENT_RENDER_PREVIEW, inner.stage));
            };
            let video_id = asset.id.clone();
            inner.stage = Stage::PreviewRendering;
            inner.last_error = None;
            inner.epoch += 1;
            (inner.epoch, video_id)
        };

        tracing::info!(video_id, "rendering style preview");
        match self.transport.render_preview(&video_id, &style).await {
            Ok(bytes) => {
                let applied = self.settle(epoch, |inner| {
                    inner.stage = Stage::Ready;
                    match inner.resources.acquire_preview(&bytes) {
                        Ok(path) => Ok(path),
                        Err(e) => {
                            let error = PipelineError::from(e);
                            inner.last_error = Some(LastError::from(&error));
                            Err(error)
                        }
                    }
                });
                match applied {
                    Some(result) => result,
                    None => Err(self.superseded(INTENT_RENDER_PREVIEW)),
                }
            }
            Err(e) => {
                let error = PipelineError::from(e);
                tracing::warn!("preview render failed: {error}");
                // Non-fatal: back to Ready, error recorded.
                self.settle_failure(epoch, &error, Stage::Ready);
                Err(error)
            }
        }
    }

    /// Kick off the full render. Valid only from `Ready`.
    ///
    /// On success the video artifact is recorded and the pipeline is
    /// `Complete`; on failure it returns to `Ready` with `last_error`
    /// set for the user to re-invoke.
    pub async fn render_final(&self, style: StyleSpec) -> PipelineResult<RenderArtifact> {
        let (epoch, video_id) = {
            let mut inner = self.guard(INTENT_RENDER_FINAL, &[Stage::Ready])?;
            let Some(asset) = inner.asset.as_ref() else {
                debug_assert!(false, "stage {} without an asset", inner.stage);
                return Err(PipelineError::sequence(INTENT_RENDER_FINAL, inner.stage));
            };
            let video_id = asset.id.clone();
            inner.stage = Stage::FinalRendering;
            inner.last_error = None;
            inner.epoch += 1;
            debug_assert!(inner.estimator.is_none(), "estimator already active");
            inner.estimator = Some(ProgressEstimator::start(
                EstimatorProfile::render(),
                self.progress.clone(),
            ));
            (inner.epoch, video_id)
        };

        tracing::info!(video_id, "starting final render");
        match self.transport.render_final(&video_id, &style).await {
            Ok(ack) => {
                let artifact = RenderArtifact {
                    kind: ArtifactKind::Video,
                    video_id: video_id.clone(),
                    download_path: ack.download_url,
                };
                let applied = self.settle(epoch, |inner| {
                    if let Some(estimator) = inner.estimator.take() {
                        estimator.finish();
                    }
                    inner.records.insert(ArtifactKind::Video, artifact.clone());
                    inner.artifacts.video = true;
                    inner.stage = Stage::Complete;
                });
                match applied {
                    Some(()) => {
                        tracing::info!(video_id, "final render complete");
                        Ok(artifact)
                    }
                    None => Err(self.superseded(INTENT_RENDER_FINAL)),
                }
            }
            Err(e) => {
                let error = PipelineError::from(e);
                tracing::warn!("final render failed: {error}");
                self.settle_failure(epoch, &error, Stage::Ready);
                Err(error)
            }
        }
    }

    /// Fetch a finished artifact into the configured output folder and
    /// return the written path. Valid from `Ready` or `Complete` once the
    /// matching availability flag is set.
    pub async fn download_artifact(&self, kind: ArtifactKind) -> PipelineResult<PathBuf> {
        let (video_id, stem) = {
            let inner = self.guard(INTENT_DOWNLOAD, &[Stage::Ready, Stage::Complete])?;
            let available = match kind {
                ArtifactKind::Video => inner.artifacts.video,
                ArtifactKind::Srt => inner.artifacts.subtitle,
            };
            if !available {
                let error =
                    PipelineError::validation(format!("No {kind} artifact is available yet"));
                drop(inner);
                self.record_error(&error);
                return Err(error);
            }
            let Some(asset) = inner.asset.as_ref() else {
                debug_assert!(false, "stage {} without an asset", inner.stage);
                return Err(PipelineError::sequence(INTENT_DOWNLOAD, inner.stage));
            };
            (asset.id.clone(), asset.file_stem().to_string())
        };

        let bytes = match self.transport.download(&video_id, kind).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let error = PipelineError::from(e);
                self.record_error(&error);
                return Err(error);
            }
        };

        let folder = PathBuf::from(&self.settings.paths.output_folder);
        let filename = match kind {
            ArtifactKind::Video => format!("{stem}_subtitled.mp4"),
            ArtifactKind::Srt => format!("{stem}_subtitles.srt"),
        };
        let target = folder.join(filename);

        let written = async {
            tokio::fs::create_dir_all(&folder).await?;
            tokio::fs::write(&target, &bytes).await
        }
        .await;

        if let Err(e) = written {
            let error = PipelineError::Resource {
                message: format!("Failed to write {}: {e}", target.display()),
            };
            self.record_error(&error);
            return Err(error);
        }

        tracing::info!(path = %target.display(), "artifact downloaded");
        Ok(target)
    }

    /// Release the currently displayed preview, if any (explicit user
    /// dismissal). Returns whether a handle was released.
    pub fn dismiss_preview(&self) -> PipelineResult<bool> {
        let released = self
            .inner
            .lock()
            .resources
            .release(MediaHandleKind::Preview)
            .map_err(PipelineError::from)?;
        Ok(released)
    }

    /// Discard the session: asset, source, artifacts, media handles and
    /// any in-flight operation's eventual result. Valid from any state.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        if let Some(estimator) = inner.estimator.take() {
            estimator.fail();
        }
        inner.resources.release_all();
        inner.asset = None;
        inner.source = None;
        inner.records.clear();
        inner.artifacts = ArtifactFlags::default();
        inner.last_error = None;
        inner.stage = Stage::Idle;
        inner.epoch += 1;
        drop(inner);
        self.progress.reset();
        tracing::info!("pipeline reset to idle");
    }

    /// Validate the intent against the effective stage and hand back the
    /// lock for the atomic transition to the busy stage.
    fn guard(
        &self,
        intent: &'static str,
        allowed: &[Stage],
    ) -> PipelineResult<MutexGuard<'_, Inner>> {
        let inner = self.inner.lock();
        let effective = inner.effective_stage();
        if !allowed.contains(&effective) {
            return Err(PipelineError::sequence(intent, inner.stage));
        }
        Ok(inner)
    }

    /// Apply a settlement if the operation's epoch is still current.
    ///
    /// Returns `None` when the session was reset while the call was in
    /// flight; the late result is dropped.
    fn settle<R>(&self, epoch: u64, apply: impl FnOnce(&mut Inner) -> R) -> Option<R> {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            tracing::debug!("operation settled after reset; result dropped");
            return None;
        }
        Some(apply(&mut inner))
    }

    fn settle_failure(&self, epoch: u64, error: &PipelineError, exit: Stage) {
        self.settle(epoch, |inner| {
            if let Some(estimator) = inner.estimator.take() {
                estimator.fail();
            }
            inner.last_error = Some(LastError::from(error));
            inner.stage = exit;
        });
    }

    fn record_error(&self, error: &PipelineError) {
        self.inner.lock().last_error = Some(LastError::from(error));
    }

    fn superseded(&self, intent: &'static str) -> PipelineError {
        PipelineError::sequence(intent, self.inner.lock().stage)
    }

    #[cfg(test)]
    fn has_active_estimator(&self) -> bool {
        self.inner.lock().estimator.is_some()
    }

    #[cfg(test)]
    fn active_media_handles(&self) -> usize {
        self.inner.lock().resources.active_handles()
    }
}

/// Check extension and size before any byte goes over the wire.
fn validate_video_file(
    path: &Path,
    limits: &UploadSettings,
) -> PipelineResult<(VideoFormat, u64, String)> {
    let Some(format) = VideoFormat::from_path(path) else {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_else(|| "(none)".to_string());
        return Err(PipelineError::validation(format!(
            "Format {ext} is not supported (accepted: .mp4, .mov, .avi)"
        )));
    };

    let metadata = std::fs::metadata(path).map_err(|e| {
        PipelineError::validation(format!("Cannot read {}: {e}", path.display()))
    })?;
    let size_bytes = metadata.len();
    if size_bytes > limits.max_size_bytes() {
        return Err(PipelineError::validation(format!(
            "File too large. Max: {}MB",
            limits.max_size_mb
        )));
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());

    Ok((format, size_bytes, filename))
}

fn validate_subtitle_file(path: &Path) -> PipelineResult<()> {
    if !is_srt_path(path) {
        return Err(PipelineError::validation(
            "Only .srt subtitle files are accepted",
        ));
    }
    std::fs::metadata(path).map_err(|e| {
        PipelineError::validation(format!("Cannot read {}: {e}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubtitleOrigin;
    use crate::transport::mock::{server_error, MockTransport};
    use crate::transport::{Operation, TransportError};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    /// A sparse 10MB file that passes upload validation cheaply.
    fn make_video(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(10 * 1024 * 1024).unwrap();
        path
    }

    fn make_srt(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, "1\n00:00:00,000 --> 00:00:01,000\nhello\n").unwrap();
        path
    }

    fn settings_with_output(dir: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.paths.output_folder = dir
            .path()
            .join("out")
            .to_string_lossy()
            .into_owned();
        settings
    }

    fn controller(transport: Arc<MockTransport>, dir: &TempDir) -> PipelineController {
        PipelineController::new(transport, settings_with_output(dir))
    }

    /// Drive a fresh controller to `Ready` via upload + transcription.
    async fn ready_controller(
        transport: Arc<MockTransport>,
        dir: &TempDir,
    ) -> PipelineController {
        let controller = controller(transport, dir);
        let video = make_video(dir, "clip.mp4");
        controller.start_upload(&video).await.unwrap();
        controller.start_auto_transcribe(Some("en")).await.unwrap();
        controller
    }

    #[tokio::test]
    async fn upload_then_transcribe_scenario() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let controller = controller(Arc::clone(&transport), &dir);

        let video = make_video(&dir, "clip.mp4");
        let asset = controller.start_upload(&video).await.unwrap();
        assert_eq!(controller.snapshot().stage, Stage::Uploaded);
        assert_eq!(asset.format, VideoFormat::Mp4);
        assert_eq!(asset.size_bytes, 10 * 1024 * 1024);
        assert_eq!(controller.snapshot().progress_percent, 100.0);

        let source = controller.start_auto_transcribe(Some("en")).await.unwrap();
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Ready);
        assert_eq!(source.origin, SubtitleOrigin::Generated);
        assert_eq!(source.segments.len(), 3);
        assert_eq!(snapshot.progress_percent, 100.0);
        assert!(snapshot.artifacts.subtitle);
        assert!(!snapshot.artifacts.video);
        assert!(!controller.has_active_estimator(), "estimator leaked");

        assert_eq!(transport.calls(), vec!["upload", "transcribe"]);
    }

    #[tokio::test]
    async fn invalid_extension_is_rejected_without_network() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let controller = controller(Arc::clone(&transport), &dir);

        let path = dir.path().join("clip.mkv");
        std::fs::write(&path, b"x").unwrap();

        let err = controller.start_upload(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation { .. }));
        assert_eq!(controller.snapshot().stage, Stage::Idle);
        assert!(transport.calls().is_empty(), "validation must not dispatch");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_locally() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let mut settings = settings_with_output(&dir);
        settings.upload.max_size_mb = 5;
        let controller =
            PipelineController::new(Arc::clone(&transport) as Arc<dyn Transport>, settings);

        let video = make_video(&dir, "big.mp4");
        let err = controller.start_upload(&video).await.unwrap_err();
        assert!(err.to_string().contains("File too large"));
        assert!(transport.calls().is_empty());

        let last = controller.snapshot().last_error.unwrap();
        assert_eq!(last.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn sequence_error_leaves_state_unchanged() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let controller = controller(Arc::clone(&transport), &dir);

        let before = controller.snapshot();
        let err = controller
            .render_final(StyleSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Sequence { .. }));
        assert_eq!(controller.snapshot(), before);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn second_concurrent_render_is_rejected() {
        let dir = tempdir().unwrap();
        let transport =
            Arc::new(MockTransport::new().with_delay(Duration::from_millis(50)));
        let controller = ready_controller(Arc::clone(&transport), &dir).await;

        let (first, second) = tokio::join!(
            controller.render_final(StyleSpec::default()),
            controller.render_final(StyleSpec::default())
        );

        first.unwrap();
        let err = second.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Sequence {
                intent: "render_final",
                ..
            }
        ));
        assert_eq!(controller.snapshot().stage, Stage::Complete);

        let renders = transport
            .calls()
            .into_iter()
            .filter(|c| *c == "render_final")
            .count();
        assert_eq!(renders, 1, "rejected intent must not dispatch");
    }

    #[tokio::test]
    async fn subtitle_file_with_wrong_extension_is_rejected() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let controller = controller(Arc::clone(&transport), &dir);

        let video = make_video(&dir, "clip.mp4");
        controller.start_upload(&video).await.unwrap();

        let txt = dir.path().join("subs.txt");
        std::fs::write(&txt, "not subtitles").unwrap();

        let err = controller.upload_subtitle_file(&txt).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation { .. }));
        assert_eq!(controller.snapshot().stage, Stage::Uploaded);
        assert!(!transport.calls().contains(&"upload_subtitles"));
    }

    #[tokio::test]
    async fn uploaded_subtitles_make_the_pipeline_ready() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let controller = controller(Arc::clone(&transport), &dir);

        let video = make_video(&dir, "clip.mp4");
        controller.start_upload(&video).await.unwrap();
        let srt = make_srt(&dir, "subs.srt");
        controller.upload_subtitle_file(&srt).await.unwrap();

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Ready);
        assert!(snapshot.artifacts.subtitle);
        let source = controller.subtitle_source().unwrap();
        assert_eq!(source.origin, SubtitleOrigin::Uploaded);
    }

    #[tokio::test]
    async fn replacing_the_source_is_last_write_wins() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let controller = ready_controller(Arc::clone(&transport), &dir).await;
        assert_eq!(
            controller.subtitle_source().unwrap().origin,
            SubtitleOrigin::Generated
        );

        let srt = make_srt(&dir, "manual.srt");
        controller.upload_subtitle_file(&srt).await.unwrap();
        assert_eq!(
            controller.subtitle_source().unwrap().origin,
            SubtitleOrigin::Uploaded
        );
        assert_eq!(controller.snapshot().stage, Stage::Ready);
    }

    #[tokio::test]
    async fn upload_failure_resumes_from_idle() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(
            MockTransport::new()
                .with_upload(Err(server_error(Operation::Upload, "disk full"))),
        );
        let controller = controller(Arc::clone(&transport), &dir);

        let video = make_video(&dir, "clip.mp4");
        let err = controller.start_upload(&video).await.unwrap_err();
        assert_eq!(err.to_string(), "disk full");

        let snapshot = controller.snapshot();
        assert_eq!(
            snapshot.stage,
            Stage::Failed {
                resume: ResumePoint::Idle
            }
        );
        assert_eq!(snapshot.last_error.unwrap().kind, ErrorKind::Server);

        // The same intent can be re-invoked from the resume point.
        controller.start_upload(&video).await.unwrap();
        assert_eq!(controller.snapshot().stage, Stage::Uploaded);
    }

    #[tokio::test]
    async fn transcription_failure_resumes_from_uploaded() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new().with_transcribe(Err(
            TransportError::Timeout {
                operation: Operation::Transcribe,
            },
        )));
        let controller = controller(Arc::clone(&transport), &dir);

        let video = make_video(&dir, "clip.mp4");
        controller.start_upload(&video).await.unwrap();
        let err = controller.start_auto_transcribe(None).await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { .. }));

        let snapshot = controller.snapshot();
        assert_eq!(
            snapshot.stage,
            Stage::Failed {
                resume: ResumePoint::Uploaded
            }
        );
        assert!(!controller.has_active_estimator(), "estimator leaked");
        // Frozen, not reset: the UI shows where progress stalled.
        assert!(snapshot.progress_percent < 100.0);

        // The subtitle-upload alternative is accepted from the resume point.
        let srt = make_srt(&dir, "subs.srt");
        controller.upload_subtitle_file(&srt).await.unwrap();
        assert_eq!(controller.snapshot().stage, Stage::Ready);
    }

    #[tokio::test]
    async fn preview_timeout_is_non_fatal() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new().with_render_preview(Err(
            TransportError::Timeout {
                operation: Operation::RenderPreview,
            },
        )));
        let controller = ready_controller(Arc::clone(&transport), &dir).await;

        let err = controller
            .render_preview(StyleSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { .. }));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Ready, "preview failure must not be fatal");
        assert_eq!(snapshot.last_error.unwrap().kind, ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn preview_acquires_and_supersedes_media_handles() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let controller = ready_controller(Arc::clone(&transport), &dir).await;

        let first = controller
            .render_preview(StyleSpec::default())
            .await
            .unwrap();
        assert!(first.exists());
        assert_eq!(controller.preview_path(), Some(first.clone()));

        let second = controller
            .render_preview(StyleSpec::default())
            .await
            .unwrap();
        assert!(!first.exists(), "superseded preview leaked");
        assert!(second.exists());
        assert_eq!(controller.active_media_handles(), 1);

        assert!(controller.dismiss_preview().unwrap());
        assert!(!second.exists());
        assert!(!controller.dismiss_preview().unwrap(), "double dismissal");
    }

    #[tokio::test]
    async fn final_render_records_the_video_artifact() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let controller = ready_controller(Arc::clone(&transport), &dir).await;

        let artifact = controller.render_final(StyleSpec::default()).await.unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Video);
        assert_eq!(artifact.download_path, "/api/download/video/vid-1");

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Complete);
        assert!(snapshot.artifacts.video);
        assert_eq!(snapshot.progress_percent, 100.0);
        assert!(!controller.has_active_estimator(), "estimator leaked");
    }

    #[tokio::test]
    async fn final_render_failure_returns_to_ready() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(
            MockTransport::new()
                .with_render_final(Err(server_error(Operation::RenderFinal, "ffmpeg error"))),
        );
        let controller = ready_controller(Arc::clone(&transport), &dir).await;

        let err = controller
            .render_final(StyleSpec::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "ffmpeg error");

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Ready);
        assert_eq!(snapshot.last_error.unwrap().kind, ErrorKind::Server);
        assert!(!snapshot.artifacts.video);
    }

    #[tokio::test]
    async fn download_writes_artifacts_into_the_output_folder() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let controller = ready_controller(Arc::clone(&transport), &dir).await;

        // The subtitle artifact is available from Ready.
        let srt_path = controller.download_artifact(ArtifactKind::Srt).await.unwrap();
        assert!(srt_path.ends_with("clip_subtitles.srt"));
        assert_eq!(std::fs::read(&srt_path).unwrap(), b"srt-artifact-bytes");

        // The video artifact requires a completed render.
        let err = controller
            .download_artifact(ArtifactKind::Video)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation { .. }));

        controller.render_final(StyleSpec::default()).await.unwrap();
        let video_path = controller
            .download_artifact(ArtifactKind::Video)
            .await
            .unwrap();
        assert!(video_path.ends_with("clip_subtitled.mp4"));
        assert!(video_path.exists());
    }

    #[tokio::test]
    async fn reset_returns_to_a_clean_idle() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let controller = ready_controller(Arc::clone(&transport), &dir).await;

        let preview = controller
            .render_preview(StyleSpec::default())
            .await
            .unwrap();
        controller.render_final(StyleSpec::default()).await.unwrap();

        controller.reset();

        let snapshot = controller.snapshot();
        assert_eq!(snapshot, PipelineState::default());
        assert!(controller.video_asset().is_none());
        assert!(controller.subtitle_source().is_none());
        assert!(controller.artifact(ArtifactKind::Video).is_none());
        assert!(controller.artifact(ArtifactKind::Srt).is_none());
        assert!(!preview.exists(), "reset leaked the preview handle");
        assert_eq!(controller.active_media_handles(), 0);

        // A fresh session starts from Idle.
        let video = make_video(&dir, "next.mp4");
        controller.start_upload(&video).await.unwrap();
        assert_eq!(controller.snapshot().stage, Stage::Uploaded);
    }

    #[tokio::test]
    async fn reset_during_an_in_flight_render_drops_the_late_result() {
        let dir = tempdir().unwrap();
        let transport =
            Arc::new(MockTransport::new().with_delay(Duration::from_millis(50)));
        let controller = ready_controller(Arc::clone(&transport), &dir).await;

        let (render, _) = tokio::join!(controller.render_final(StyleSpec::default()), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.reset();
        });

        assert!(render.is_err(), "superseded render must not report success");
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Idle);
        assert!(!snapshot.artifacts.video);
        assert!(controller.artifact(ArtifactKind::Video).is_none());
    }

    #[tokio::test]
    async fn subtitle_upload_failure_resumes_where_it_started() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new().with_upload_subtitles(Err(
            server_error(Operation::UploadSubtitles, "Invalid SRT format"),
        )));
        let controller = ready_controller(Arc::clone(&transport), &dir).await;

        let srt = make_srt(&dir, "bad.srt");
        let err = controller.upload_subtitle_file(&srt).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid SRT format");

        assert_eq!(
            controller.snapshot().stage,
            Stage::Failed {
                resume: ResumePoint::Ready
            }
        );
        // Last write wins only on success: the generated source survives.
        assert_eq!(
            controller.subtitle_source().unwrap().origin,
            SubtitleOrigin::Generated
        );
    }

    #[tokio::test]
    async fn download_failure_is_recorded_without_a_transition() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new().with_download(Err(
            TransportError::Network {
                operation: Operation::Download,
                message: "connection refused".to_string(),
            },
        )));
        let controller = ready_controller(Arc::clone(&transport), &dir).await;

        let err = controller
            .download_artifact(ArtifactKind::Srt)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Network { .. }));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Ready);
        assert_eq!(snapshot.last_error.unwrap().kind, ErrorKind::Network);
    }

    #[tokio::test]
    async fn transcribe_from_complete_is_a_sequence_error() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let controller = ready_controller(Arc::clone(&transport), &dir).await;
        controller.render_final(StyleSpec::default()).await.unwrap();

        let err = controller.start_auto_transcribe(None).await.unwrap_err();
        assert!(matches!(err, PipelineError::Sequence { .. }));
        assert_eq!(controller.snapshot().stage, Stage::Complete);
    }
}

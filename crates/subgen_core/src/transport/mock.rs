//! Programmable in-memory transport for controller tests.
//!
//! Defaults to success payloads so a test only configures the calls it
//! cares about. Every invocation is recorded for call-order assertions.

use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;

use super::wire::{
    FinalRenderAck, HealthStatus, SubtitleUploadAck, TranscribeResponse, UploadAck, WireSegment,
};
use super::{ProgressSink, Transport, TransportError, TransportResult};
use crate::models::{ArtifactKind, StyleSpec};

/// Build the default three-segment transcription payload.
pub(crate) fn sample_transcription() -> TranscribeResponse {
    let segment = |text: &str, start: f64, end: f64| WireSegment {
        text: text.to_string(),
        start: Some(start),
        end: Some(end),
        timestamp: Some((start, end)),
    };
    TranscribeResponse {
        video_id: "vid-1".to_string(),
        transcription: "one two three".to_string(),
        segments: vec![
            segment("one", 0.0, 1.5),
            segment("two", 1.5, 3.0),
            segment("three", 3.0, 4.5),
        ],
        language: "en".to_string(),
        srt_file: "vid-1.srt".to_string(),
    }
}

fn sample_upload_ack() -> UploadAck {
    UploadAck {
        video_id: "vid-1".to_string(),
        filename: "clip.mp4".to_string(),
        size_mb: 10.0,
        format: ".mp4".to_string(),
        duration: 60.0,
    }
}

fn sample_subtitle_ack() -> SubtitleUploadAck {
    SubtitleUploadAck {
        message: "updated".to_string(),
        video_id: "vid-1".to_string(),
    }
}

fn sample_final_ack() -> FinalRenderAck {
    FinalRenderAck {
        video_id: "vid-1".to_string(),
        output_file: "vid-1_subtitled.mp4".to_string(),
        download_url: "/api/download/video/vid-1".to_string(),
        message: "rendered".to_string(),
    }
}

/// Transport double with per-operation scripted results.
#[derive(Default)]
pub(crate) struct MockTransport {
    delay: Option<Duration>,
    upload: Mutex<Option<TransportResult<UploadAck>>>,
    transcribe: Mutex<Option<TransportResult<TranscribeResponse>>>,
    upload_subtitles: Mutex<Option<TransportResult<SubtitleUploadAck>>>,
    render_preview: Mutex<Option<TransportResult<Vec<u8>>>>,
    render_final: Mutex<Option<TransportResult<FinalRenderAck>>>,
    download: Mutex<Option<TransportResult<Vec<u8>>>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add artificial latency to every call (for in-flight overlap tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_upload(self, result: TransportResult<UploadAck>) -> Self {
        *self.upload.lock() = Some(result);
        self
    }

    pub fn with_transcribe(self, result: TransportResult<TranscribeResponse>) -> Self {
        *self.transcribe.lock() = Some(result);
        self
    }

    pub fn with_upload_subtitles(self, result: TransportResult<SubtitleUploadAck>) -> Self {
        *self.upload_subtitles.lock() = Some(result);
        self
    }

    pub fn with_render_preview(self, result: TransportResult<Vec<u8>>) -> Self {
        *self.render_preview.lock() = Some(result);
        self
    }

    pub fn with_render_final(self, result: TransportResult<FinalRenderAck>) -> Self {
        *self.render_final.lock() = Some(result);
        self
    }

    pub fn with_download(self, result: TransportResult<Vec<u8>>) -> Self {
        *self.download.lock() = Some(result);
        self
    }

    /// The operations invoked so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    async fn enter(&self, op: &'static str) {
        self.calls.lock().push(op);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn upload(&self, _file: &Path, progress: ProgressSink) -> TransportResult<UploadAck> {
        self.enter("upload").await;
        progress(50);
        progress(100);
        self.upload.lock().take().unwrap_or_else(|| Ok(sample_upload_ack()))
    }

    async fn transcribe(
        &self,
        _video_id: &str,
        _language: Option<&str>,
    ) -> TransportResult<TranscribeResponse> {
        self.enter("transcribe").await;
        self.transcribe
            .lock()
            .take()
            .unwrap_or_else(|| Ok(sample_transcription()))
    }

    async fn upload_subtitles(
        &self,
        _video_id: &str,
        _file: &Path,
    ) -> TransportResult<SubtitleUploadAck> {
        self.enter("upload_subtitles").await;
        self.upload_subtitles
            .lock()
            .take()
            .unwrap_or_else(|| Ok(sample_subtitle_ack()))
    }

    async fn render_preview(
        &self,
        _video_id: &str,
        _style: &StyleSpec,
    ) -> TransportResult<Vec<u8>> {
        self.enter("render_preview").await;
        self.render_preview
            .lock()
            .take()
            .unwrap_or_else(|| Ok(b"preview-clip".to_vec()))
    }

    async fn render_final(
        &self,
        _video_id: &str,
        _style: &StyleSpec,
    ) -> TransportResult<FinalRenderAck> {
        self.enter("render_final").await;
        self.render_final
            .lock()
            .take()
            .unwrap_or_else(|| Ok(sample_final_ack()))
    }

    async fn download(&self, _video_id: &str, kind: ArtifactKind) -> TransportResult<Vec<u8>> {
        self.enter("download").await;
        self.download
            .lock()
            .take()
            .unwrap_or_else(|| Ok(format!("{kind}-artifact-bytes").into_bytes()))
    }

    async fn health(&self) -> TransportResult<HealthStatus> {
        self.enter("health").await;
        Ok(HealthStatus {
            status: "healthy".to_string(),
            timestamp: String::new(),
            services: Default::default(),
        })
    }
}

/// Convenience constructor for server failures in tests.
pub(crate) fn server_error(operation: super::Operation, detail: &str) -> TransportError {
    TransportError::Server {
        operation,
        status: 500,
        detail: Some(detail.to_string()),
    }
}

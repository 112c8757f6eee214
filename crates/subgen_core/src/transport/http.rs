//! HTTP implementation of the transport over reqwest.

use std::path::Path;

use reqwest::multipart;
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;

use super::wire::{
    FinalRenderAck, HealthStatus, SubtitleUploadAck, TranscribeResponse, UploadAck,
};
use super::{Operation, ProgressSink, Transport, TransportError, TransportResult};
use crate::config::{Settings, TimeoutSettings};
use crate::models::{ArtifactKind, StyleSpec, VideoFormat};

/// Chunk size for the counted upload stream.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Timeout for the health probe; reachability should answer fast.
const HEALTH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Transport implementation talking HTTP to the subtitle service.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeouts: TimeoutSettings,
}

impl HttpTransport {
    /// Build a transport from settings.
    pub fn new(settings: &Settings) -> TransportResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: settings.server.base_url.trim_end_matches('/').to_string(),
            timeouts: settings.timeouts.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn upload(&self, file: &Path, progress: ProgressSink) -> TransportResult<UploadAck> {
        let op = Operation::Upload;
        let bytes = tokio::fs::read(file).await.map_err(|e| TransportError::File {
            path: file.to_path_buf(),
            source: e,
        })?;

        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let mime = VideoFormat::from_path(file)
            .map(|f| f.mime())
            .unwrap_or("application/octet-stream");

        let total = bytes.len().max(1) as u64;
        let length = bytes.len() as u64;
        let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK_BYTES).map(|c| c.to_vec()).collect();

        let mut sent: u64 = 0;
        let sink = progress.clone();
        let counted = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            sink(((sent as f64 / total as f64) * 100.0) as u8);
            Ok::<Vec<u8>, std::io::Error>(chunk)
        }));

        let part = multipart::Part::stream_with_length(Body::wrap_stream(counted), length)
            .file_name(filename)
            .mime_str(mime)
            .map_err(|e| classify(op, e))?;
        let form = multipart::Form::new().part("file", part);

        tracing::debug!(size_bytes = length, "uploading video");
        let response = self
            .client
            .post(self.url("/api/upload"))
            .multipart(form)
            .timeout(self.timeouts.upload())
            .send()
            .await
            .map_err(|e| classify(op, e))?;

        read_json(op, response).await
    }

    async fn transcribe(
        &self,
        video_id: &str,
        language: Option<&str>,
    ) -> TransportResult<TranscribeResponse> {
        let op = Operation::Transcribe;
        let mut request = self
            .client
            .post(self.url(&format!("/api/transcribe/{video_id}")))
            .timeout(self.timeouts.transcribe());

        if let Some(language) = language.filter(|l| !l.is_empty()) {
            request = request.query(&[("language", language)]);
        }

        tracing::debug!(video_id, ?language, "requesting transcription");
        let response = request.send().await.map_err(|e| classify(op, e))?;
        read_json(op, response).await
    }

    async fn upload_subtitles(
        &self,
        video_id: &str,
        file: &Path,
    ) -> TransportResult<SubtitleUploadAck> {
        let op = Operation::UploadSubtitles;
        let bytes = tokio::fs::read(file).await.map_err(|e| TransportError::File {
            path: file.to_path_buf(),
            source: e,
        })?;
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "subtitles.srt".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str("application/x-subrip")
            .map_err(|e| classify(op, e))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(&format!("/api/upload-srt/{video_id}")))
            .multipart(form)
            .timeout(self.timeouts.subtitle_upload())
            .send()
            .await
            .map_err(|e| classify(op, e))?;

        read_json(op, response).await
    }

    async fn render_preview(&self, video_id: &str, style: &StyleSpec) -> TransportResult<Vec<u8>> {
        let op = Operation::RenderPreview;
        let response = self
            .client
            .post(self.url(&format!("/api/render-preview/{video_id}")))
            .json(&serde_json::json!({ "subtitle_styles": style }))
            .timeout(self.timeouts.preview())
            .send()
            .await
            .map_err(|e| classify(op, e))?;

        read_bytes(op, response).await
    }

    async fn render_final(
        &self,
        video_id: &str,
        style: &StyleSpec,
    ) -> TransportResult<FinalRenderAck> {
        let op = Operation::RenderFinal;
        let response = self
            .client
            .post(self.url(&format!("/api/render-final/{video_id}")))
            .json(&serde_json::json!({ "subtitle_styles": style }))
            .timeout(self.timeouts.render())
            .send()
            .await
            .map_err(|e| classify(op, e))?;

        read_json(op, response).await
    }

    async fn download(&self, video_id: &str, kind: ArtifactKind) -> TransportResult<Vec<u8>> {
        let op = Operation::Download;
        let response = self
            .client
            .get(self.url(&format!("/api/download/{}/{video_id}", kind.as_str())))
            .timeout(self.timeouts.download())
            .send()
            .await
            .map_err(|e| classify(op, e))?;

        read_bytes(op, response).await
    }

    async fn health(&self) -> TransportResult<HealthStatus> {
        let op = Operation::Health;
        let response = self
            .client
            .get(self.url("/api/health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| classify(op, e))?;

        read_json(op, response).await
    }
}

/// Map a reqwest error to the typed failure, splitting timeouts out from
/// generic network trouble.
fn classify(operation: Operation, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout { operation }
    } else {
        TransportError::Network {
            operation,
            message: error.to_string(),
        }
    }
}

/// Pull the FastAPI-style `{"detail": "..."}` text out of a failure body.
fn extract_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("detail")?.as_str().map(String::from)
}

async fn read_json<T: DeserializeOwned>(op: Operation, response: Response) -> TransportResult<T> {
    let status = response.status();
    let body = response.bytes().await.map_err(|e| classify(op, e))?;

    if !status.is_success() {
        return Err(TransportError::Server {
            operation: op,
            status: status.as_u16(),
            detail: extract_detail(&body),
        });
    }

    serde_json::from_slice(&body).map_err(|e| TransportError::Network {
        operation: op,
        message: format!("invalid response body: {e}"),
    })
}

async fn read_bytes(op: Operation, response: Response) -> TransportResult<Vec<u8>> {
    let status = response.status();
    let body = response.bytes().await.map_err(|e| classify(op, e))?;

    if !status.is_success() {
        return Err(TransportError::Server {
            operation: op,
            status: status.as_u16(),
            detail: extract_detail(&body),
        });
    }

    Ok(body.to_vec())
}

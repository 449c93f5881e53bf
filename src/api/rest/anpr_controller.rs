use crate::api::rest::{ApiResult, AppState};
use crate::capture::CaptureEvent;
use crate::error::Error;
use crate::ingest::{FormBody, IngestOutcome, UploadPart, UploadRequest};
use crate::storage::Capture;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, Method};
use axum::response::Json;
use chrono::Local;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

pub const PROCESSED_MESSAGE: &str = "Request procesado";

/// Body returned to the camera for every upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub message: String,
    pub placa: String,
    #[serde(rename = "absTime")]
    pub abs_time: String,
    pub lane: String,
}

impl From<&CaptureEvent> for UploadResponse {
    fn from(event: &CaptureEvent) -> Self {
        Self {
            message: PROCESSED_MESSAGE.to_string(),
            placa: event.plate.clone(),
            abs_time: event.abs_time.clone(),
            lane: event.lane.clone(),
        }
    }
}

/// Receive an ANPR upload from a camera.
///
/// Always answers 200; faults only show up in the audit log.
pub async fn upload_capture(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<UploadResponse> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let body = match multipart {
        Ok(multipart) => read_form(multipart).await,
        Err(rejection) if is_multipart(content_type.as_deref()) => {
            FormBody::Unreadable(Error::Multipart(rejection.to_string()))
        }
        Err(_) => FormBody::NotMultipart,
    };

    let request = UploadRequest {
        method: method.to_string(),
        content_type,
        body,
    };

    let ingestor = state.ingestor.clone();
    let outcome = match tokio::task::spawn_blocking(move || ingestor.ingest(request)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Ingestion task failed: {}", e);
            IngestOutcome {
                event: CaptureEvent::defaults_at(Local::now()),
                written: Vec::new(),
                fault: Some(Error::Internal(e.to_string())),
            }
        }
    };

    match &outcome.fault {
        Some(fault) => warn!(
            "Upload for plate {} processed with fault: {}",
            outcome.event.plate, fault
        ),
        None => info!(
            "Upload for plate {} processed, {} classified image(s) written",
            outcome.event.plate,
            outcome.written.len()
        ),
    }

    Json(UploadResponse::from(&outcome.event))
}

/// List stored captures, newest first
pub async fn list_captures(State(state): State<AppState>) -> ApiResult<Json<Vec<Capture>>> {
    let indexer = state.indexer.clone();
    let captures = tokio::task::spawn_blocking(move || indexer.list())
        .await
        .map_err(|e| Error::Internal(e.to_string()))??;

    Ok(Json(captures))
}

fn is_multipart(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Drain every part of the form into memory
async fn read_form(mut multipart: Multipart) -> FormBody {
    let mut parts = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return FormBody::Multipart(parts),
            Err(e) => return FormBody::Unreadable(Error::Multipart(e.to_string())),
        };

        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        match field.bytes().await {
            Ok(data) => parts.push(UploadPart {
                field_name,
                file_name,
                content_type,
                data,
            }),
            Err(e) => return FormBody::Unreadable(Error::Multipart(e.to_string())),
        }
    }
}

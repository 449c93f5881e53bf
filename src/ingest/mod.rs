//! Upload ingestion pipeline.
//!
//! Takes the parts of one camera upload, keeps a raw copy of every file part,
//! reads plate/time/lane from the metadata part and files the pictures into
//! their lane folders. The pipeline never fails as a whole: whatever was resolved
//! before a fault is returned together with that fault.

use crate::audit::{AuditLog, AuditScope};
use crate::capture::naming::check_path_segment;
use crate::capture::{
    format_abs_time, format_date_folder, is_valid_abs_time, resolve_paths, CaptureEvent,
};
use crate::error::{Error, Result};
use crate::storage::{ImageKind, ImageWriter, StorageLayout};
use crate::utils::parse_anpr_metadata_file;
use bytes::Bytes;
use chrono::{DateTime, Local};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

pub const METADATA_FIELD: &str = "metadata";
pub const LICENSE_PLATE_PICTURE_FIELD: &str = "licensePlatePicture";
pub const DETECTION_PICTURE_FIELD: &str = "detectionPicture";

/// What a multipart part is used for, decided by its field name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartRole {
    Metadata,
    LicensePlatePicture,
    DetectionPicture,
    Other,
}

impl PartRole {
    pub fn from_field_name(name: &str) -> Self {
        match name {
            METADATA_FIELD => PartRole::Metadata,
            LICENSE_PLATE_PICTURE_FIELD => PartRole::LicensePlatePicture,
            DETECTION_PICTURE_FIELD => PartRole::DetectionPicture,
            _ => PartRole::Other,
        }
    }
}

/// One part of a multipart upload
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub field_name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadPart {
    pub fn role(&self) -> PartRole {
        PartRole::from_field_name(&self.field_name)
    }

    /// File parts get a raw copy. Recognized fields count as files even without a file name.
    fn is_file(&self) -> bool {
        self.file_name.is_some() || self.role() != PartRole::Other
    }
}

/// Body of an upload as seen by the ingestor
#[derive(Debug)]
pub enum FormBody {
    Multipart(Vec<UploadPart>),
    NotMultipart,
    /// The transport failed while reading the form
    Unreadable(Error),
}

#[derive(Debug)]
pub struct UploadRequest {
    pub method: String,
    pub content_type: Option<String>,
    pub body: FormBody,
}

/// Result of one ingestion: the resolved event, the classified files written,
/// and the fault that stopped processing, if any
#[derive(Debug)]
pub struct IngestOutcome {
    pub event: CaptureEvent,
    pub written: Vec<PathBuf>,
    pub fault: Option<Error>,
}

impl IngestOutcome {
    pub fn is_complete(&self) -> bool {
        self.fault.is_none()
    }
}

/// Raw copies picked out for further processing
#[derive(Debug, Default)]
struct ClassifiedParts {
    metadata: Option<PathBuf>,
    license_plate_picture: Option<PathBuf>,
    detection_picture: Option<PathBuf>,
}

/// Upload ingestion service
#[derive(Clone)]
pub struct Ingestor {
    layout: StorageLayout,
    writer: ImageWriter,
    audit: Arc<dyn AuditLog>,
}

impl Ingestor {
    pub fn new(layout: StorageLayout, writer: ImageWriter, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            layout,
            writer,
            audit,
        }
    }

    pub fn ingest(&self, request: UploadRequest) -> IngestOutcome {
        self.ingest_at(request, Local::now())
    }

    /// Ingest with an explicit wall-clock time for defaults and date folders
    pub fn ingest_at(&self, request: UploadRequest, now: DateTime<Local>) -> IngestOutcome {
        let audit = AuditScope::new(self.audit.clone());
        let mut event = CaptureEvent::defaults_at(now);
        let mut written = Vec::new();

        let fault = self
            .process(&audit, request, now, &mut event, &mut written)
            .err();

        if let Some(e) = &fault {
            audit.record(format!("Error: {:?}", e));
        }

        IngestOutcome {
            event,
            written,
            fault,
        }
    }

    fn process(
        &self,
        audit: &AuditScope,
        request: UploadRequest,
        now: DateTime<Local>,
        event: &mut CaptureEvent,
        written: &mut Vec<PathBuf>,
    ) -> Result<()> {
        audit.record("========= NEW REQUEST =========");
        audit.record(format!("Method: {}", request.method));
        audit.record(format!(
            "Content-Type: {}",
            request.content_type.as_deref().unwrap_or("")
        ));

        let date = format_date_folder(now);
        self.layout.ensure_request_dirs(&date)?;

        let parts = match request.body {
            FormBody::Multipart(parts) => parts,
            FormBody::NotMultipart => {
                audit.record("Warning: request is not multipart/form-data");
                return Ok(());
            }
            FormBody::Unreadable(e) => return Err(e),
        };

        for part in parts.iter().filter(|p| !p.is_file()) {
            audit.record(format!(
                "Field: {} = {}",
                part.field_name,
                String::from_utf8_lossy(&part.data)
            ));
        }

        let classified = self.save_raw_parts(audit, &parts)?;

        if let Some(metadata_path) = &classified.metadata {
            let metadata = parse_anpr_metadata_file(metadata_path)?;
            event.apply_metadata(metadata);
        }

        if !is_valid_abs_time(&event.abs_time) {
            let replacement = format_abs_time(now);
            audit.record(format!(
                "Warning: absTime {:?} is not a 17 digit timestamp, using {}",
                event.abs_time, replacement
            ));
            event.abs_time = replacement;
        }

        audit.record(format!(
            "Plate: {}, absTime: {}, lane: {}",
            event.plate, event.abs_time, event.lane
        ));

        if !event.is_recognized() {
            audit.record("Plate not recognized, no classified images written");
            return Ok(());
        }

        check_path_segment("plate", &event.plate)?;
        check_path_segment("lane", &event.lane)?;

        let paths = resolve_paths(self.layout.root(), event, &date);

        if let Some(source) = &classified.license_plate_picture {
            let destination = paths.cropped_path();
            self.writer
                .write(source, &destination, &event.plate, ImageKind::Cropped)?;
            audit.record(format!("Cropped plate image saved to {}", destination.display()));
            written.push(destination);
        }

        if let Some(source) = &classified.detection_picture {
            let destination = paths.general_path();
            self.writer
                .write(source, &destination, &event.plate, ImageKind::General)?;
            audit.record(format!("General image saved to {}", destination.display()));
            written.push(destination);
        }

        Ok(())
    }

    /// Write every file part byte for byte under `raw/`, last write wins
    fn save_raw_parts(&self, audit: &AuditScope, parts: &[UploadPart]) -> Result<ClassifiedParts> {
        let mut classified = ClassifiedParts::default();

        for part in parts.iter().filter(|p| p.is_file()) {
            let upload_name = part.file_name.as_deref().unwrap_or(&part.field_name);
            let mut line = format!(
                "File: {} - {} ({} bytes)",
                part.field_name,
                upload_name,
                part.data.len()
            );
            if let Some(content_type) = &part.content_type {
                line.push_str(&format!(" {}", content_type));
            }
            audit.record(line);

            let raw_path = self
                .layout
                .raw_path(upload_name)
                .or_else(|| self.layout.raw_path(&part.field_name))
                .ok_or_else(|| Error::InvalidSegment {
                    field: "file name",
                    value: upload_name.to_string(),
                })?;

            fs::write(&raw_path, &part.data)?;
            audit.record(format!("Saved to {}", raw_path.display()));

            match part.role() {
                PartRole::Metadata => classified.metadata = Some(raw_path),
                PartRole::LicensePlatePicture => classified.license_plate_picture = Some(raw_path),
                PartRole::DetectionPicture => classified.detection_picture = Some(raw_path),
                PartRole::Other => {}
            }
        }

        Ok(classified)
    }
}

use super::CaptureEvent;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

pub const CAPTURE_EXTENSION: &str = "jpg";

/// Where the classified copies of an event go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub file_name: String,
    /// `Camara{lane}/{date}`, cropped plate images
    pub cropped_dir: PathBuf,
    /// `Camara{lane}X/{date}`, full scene images
    pub general_dir: PathBuf,
}

impl ResolvedPaths {
    pub fn cropped_path(&self) -> PathBuf {
        self.cropped_dir.join(&self.file_name)
    }

    pub fn general_path(&self) -> PathBuf {
        self.general_dir.join(&self.file_name)
    }
}

/// `{absTime}_{plate}_{lane}.jpg`
pub fn capture_file_name(event: &CaptureEvent) -> String {
    format!(
        "{}_{}_{}.{}",
        event.abs_time, event.plate, event.lane, CAPTURE_EXTENSION
    )
}

pub fn cropped_dir_name(lane: &str) -> String {
    format!("Camara{}", lane)
}

pub fn general_dir_name(lane: &str) -> String {
    format!("Camara{}X", lane)
}

/// Resolve the classified file name and lane folders for an event.
///
/// `date` is the ingestion day, not the day encoded in `absTime`.
pub fn resolve_paths(root: &Path, event: &CaptureEvent, date: &str) -> ResolvedPaths {
    ResolvedPaths {
        file_name: capture_file_name(event),
        cropped_dir: root.join(cropped_dir_name(&event.lane)).join(date),
        general_dir: root.join(general_dir_name(&event.lane)).join(date),
    }
}

/// Reject values that would escape their folder once used as a path segment
pub fn check_path_segment(field: &'static str, value: &str) -> Result<()> {
    let unsafe_segment = value.is_empty()
        || value.contains('/')
        || value.contains('\\')
        || value.contains("..")
        || value.contains('\0');

    if unsafe_segment {
        return Err(Error::InvalidSegment {
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}

/// Parse a capture file stem (`{absTime}_{plate}_{lane}[_...]`) back into an event.
///
/// Returns `None` when fewer than three segments are present; extra segments are ignored.
pub fn parse_capture_file_name(stem: &str) -> Option<CaptureEvent> {
    let mut parts = stem.split('_');
    let abs_time = parts.next()?;
    let plate = parts.next()?;
    let lane = parts.next()?;

    Some(CaptureEvent {
        abs_time: abs_time.to_string(),
        plate: plate.to_string(),
        lane: lane.to_string(),
    })
}

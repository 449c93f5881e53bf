pub mod naming;

use crate::utils::AnprMetadata;
use chrono::{DateTime, Local};
use serde::Serialize;

pub use naming::{capture_file_name, parse_capture_file_name, resolve_paths, ResolvedPaths};

/// Plate placeholder used when the camera did not report a plate
pub const UNKNOWN_PLATE: &str = "DESCONOCIDA";

/// Lane used when the camera did not report one
pub const DEFAULT_LANE: &str = "0";

/// `yyyyMMddHHmmssfff`, always 17 digits
pub const ABS_TIME_FORMAT: &str = "%Y%m%d%H%M%S%3f";

pub const ABS_TIME_LEN: usize = 17;

/// Day bucket used for lane folders (`yyyyMMdd`)
pub const DATE_FOLDER_FORMAT: &str = "%Y%m%d";

/// A single plate read, identified only by the values encoded in its file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureEvent {
    pub abs_time: String,
    pub plate: String,
    pub lane: String,
}

impl CaptureEvent {
    /// Event with every field at its default, stamped with `now`
    pub fn defaults_at(now: DateTime<Local>) -> Self {
        Self {
            abs_time: format_abs_time(now),
            plate: UNKNOWN_PLATE.to_string(),
            lane: DEFAULT_LANE.to_string(),
        }
    }

    /// Overwrite fields with whatever the metadata document carried
    pub fn apply_metadata(&mut self, metadata: AnprMetadata) {
        if let Some(plate) = metadata.plate {
            self.plate = plate;
        }
        if let Some(abs_time) = metadata.abs_time {
            self.abs_time = abs_time;
        }
        if let Some(lane) = metadata.lane {
            self.lane = lane;
        }
    }

    /// Whether a plate was actually recognized
    pub fn is_recognized(&self) -> bool {
        self.plate != UNKNOWN_PLATE
    }
}

pub fn format_abs_time(now: DateTime<Local>) -> String {
    now.format(ABS_TIME_FORMAT).to_string()
}

pub fn format_date_folder(now: DateTime<Local>) -> String {
    now.format(DATE_FOLDER_FORMAT).to_string()
}

/// Fixed width is what makes string ordering equal time ordering
pub fn is_valid_abs_time(value: &str) -> bool {
    value.len() == ABS_TIME_LEN && value.bytes().all(|b| b.is_ascii_digit())
}

use super::layout::{LOG_DIR, RAW_DIR};
use crate::capture::naming::{parse_capture_file_name, CAPTURE_EXTENSION};
use crate::error::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Listing entry for a classified capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    #[serde(rename = "AbsTime")]
    pub abs_time: String,
    #[serde(rename = "Placa")]
    pub plate: String,
    #[serde(rename = "Lane")]
    pub lane: String,
    #[serde(rename = "ImageUrl")]
    pub image_url: String,
}

/// Rebuilds the capture list from the classified file names under the storage root
#[derive(Debug, Clone)]
pub struct CaptureIndexer {
    root: PathBuf,
    mount_prefix: String,
}

impl CaptureIndexer {
    pub fn new(root: impl Into<PathBuf>, mount_prefix: &str) -> Self {
        Self {
            root: root.into(),
            mount_prefix: mount_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// All captures, newest `AbsTime` first. A missing root yields an empty list.
    pub fn list(&self) -> Result<Vec<Capture>> {
        if !self.root.is_dir() {
            debug!("Storage root {} does not exist", self.root.display());
            return Ok(Vec::new());
        }

        let mut captures = Vec::new();
        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| !is_uploads_area(entry, &self.root));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry while indexing captures: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !has_capture_extension(entry.path()) {
                continue;
            }

            if let Some(capture) = self.to_capture(entry.path()) {
                captures.push(capture);
            }
        }

        // Plain string order equals time order for 17-digit stamps
        captures.sort_by(|a, b| b.abs_time.cmp(&a.abs_time));
        Ok(captures)
    }

    fn to_capture(&self, path: &Path) -> Option<Capture> {
        let stem = path.file_stem()?.to_str()?;
        let event = parse_capture_file_name(stem)?;

        let relative = path.strip_prefix(&self.root).ok()?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        Some(Capture {
            abs_time: event.abs_time,
            plate: event.plate,
            lane: event.lane,
            image_url: format!("{}/{}", self.mount_prefix, relative),
        })
    }
}

/// `raw/` and `logs/` hold uploads and audit files, never classified captures
fn is_uploads_area(entry: &DirEntry, root: &Path) -> bool {
    entry.depth() == 1
        && entry.file_type().is_dir()
        && entry
            .path()
            .strip_prefix(root)
            .map(|p| p == Path::new(RAW_DIR) || p == Path::new(LOG_DIR))
            .unwrap_or(false)
}

fn has_capture_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case(CAPTURE_EXTENSION))
}

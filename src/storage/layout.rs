use crate::capture::naming::{cropped_dir_name, general_dir_name};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const RAW_DIR: &str = "raw";
pub const LOG_DIR: &str = "logs";

/// Directory layout under the storage root
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
    lane_count: u32,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>, lane_count: u32) -> Self {
        Self {
            root: root.into(),
            lane_count,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join(RAW_DIR)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join(LOG_DIR)
    }

    /// Location of the raw copy of an upload.
    ///
    /// Only the last component of the client supplied name is kept.
    pub fn raw_path(&self, upload_name: &str) -> Option<PathBuf> {
        let name = upload_name
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")?;
        Some(self.raw_dir().join(name))
    }

    /// Create `raw/`, `logs/` and every lane folder pair for `date`.
    ///
    /// Runs on every request whatever lane the event belongs to. `create_dir_all`
    /// tolerates folders that already exist or are created concurrently.
    pub fn ensure_request_dirs(&self, date: &str) -> io::Result<()> {
        fs::create_dir_all(self.raw_dir())?;
        fs::create_dir_all(self.log_dir())?;

        for lane in 1..=self.lane_count {
            let lane = lane.to_string();
            fs::create_dir_all(self.root.join(cropped_dir_name(&lane)).join(date))?;
            fs::create_dir_all(self.root.join(general_dir_name(&lane)).join(date))?;
        }

        Ok(())
    }
}

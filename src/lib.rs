pub mod api;
pub mod audit;
pub mod capture;
pub mod config;
pub mod error;
pub mod ingest;
pub mod storage;
pub mod utils;

// Re-export main components for easier use
pub use capture::CaptureEvent;
pub use error::Error;
pub use ingest::{IngestOutcome, Ingestor};
pub use storage::{Capture, CaptureIndexer};

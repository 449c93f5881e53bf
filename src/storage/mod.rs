pub mod image_writer;
pub mod indexer;
pub mod layout;

pub use image_writer::{ImageKind, ImageWriter, NoOverlay, PlateOverlay, TextOverlay};
pub use indexer::{Capture, CaptureIndexer};
pub use layout::StorageLayout;

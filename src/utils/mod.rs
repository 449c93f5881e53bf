pub mod metadataparser;

pub use metadataparser::{parse_anpr_metadata, parse_anpr_metadata_file, AnprMetadata};

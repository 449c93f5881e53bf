use crate::error::{Error, Result};
use std::io::{BufReader, Read};
use std::path::Path;
use xml::reader::{EventReader, XmlEvent};

/// Namespace of the ISAPI event notification documents sent by the cameras
pub const ISAPI_NAMESPACE: &str = "http://www.isapi.org/ver20/XMLSchema";

const PLATE_ELEMENT: &str = "licensePlate";
const ABS_TIME_ELEMENT: &str = "absTime";
const LANE_ELEMENT: &str = "line";

/// Values found in an ANPR metadata document. `None` means the element was absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnprMetadata {
    pub plate: Option<String>,
    pub abs_time: Option<String>,
    pub lane: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Plate,
    AbsTime,
    Lane,
}

impl Field {
    fn from_local_name(name: &str) -> Option<Self> {
        match name {
            PLATE_ELEMENT => Some(Field::Plate),
            ABS_TIME_ELEMENT => Some(Field::AbsTime),
            LANE_ELEMENT => Some(Field::Lane),
            _ => None,
        }
    }
}

/// Element currently collecting text
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

impl AnprMetadata {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Plate => &mut self.plate,
            Field::AbsTime => &mut self.abs_time,
            Field::Lane => &mut self.lane,
        }
    }
}

/// Parse an ANPR metadata document.
///
/// The first element (document order) named `licensePlate`, `absTime` and `line`
/// in the ISAPI namespace wins; its value is the concatenated text of the element,
/// trimmed. The whole document must be well formed, otherwise nothing is returned.
pub fn parse_anpr_metadata<R: Read>(reader: R) -> Result<AnprMetadata> {
    let parser = EventReader::new(BufReader::new(reader));
    let mut metadata = AnprMetadata::default();
    let mut captures: Vec<Capture> = Vec::new();
    let mut depth = 0usize;

    for event in parser {
        let event = event.map_err(|e| Error::Metadata(format!("Malformed XML: {}", e)))?;

        match event {
            XmlEvent::StartElement { name, .. } => {
                depth += 1;

                if name.namespace.as_deref() != Some(ISAPI_NAMESPACE) {
                    continue;
                }

                if let Some(field) = Field::from_local_name(&name.local_name) {
                    let taken = metadata.slot(field).is_some()
                        || captures.iter().any(|c| c.field == field);
                    if !taken {
                        captures.push(Capture {
                            field,
                            depth,
                            text: String::new(),
                        });
                    }
                }
            }
            XmlEvent::Characters(text) | XmlEvent::CData(text) | XmlEvent::Whitespace(text) => {
                for capture in captures.iter_mut() {
                    capture.text.push_str(&text);
                }
            }
            XmlEvent::EndElement { .. } => {
                while let Some(capture) = captures.last() {
                    if capture.depth != depth {
                        break;
                    }
                    if let Some(capture) = captures.pop() {
                        *metadata.slot(capture.field) = Some(capture.text.trim().to_string());
                    }
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    Ok(metadata)
}

/// Parse an ANPR metadata document stored on disk
pub fn parse_anpr_metadata_file(path: &Path) -> Result<AnprMetadata> {
    let file = std::fs::File::open(path)?;
    parse_anpr_metadata(file)
}

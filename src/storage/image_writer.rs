use crate::error::{Error, Result};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use log::debug;
use rusttype::{Font, Scale};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Which classified copy is being produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Cropped plate picture, stored under `Camara{lane}`
    Cropped,
    /// Full detection scene, stored under `Camara{lane}X`
    General,
}

impl ImageKind {
    /// Text height in pixels and offset of the plate stamp
    fn stamp_geometry(self) -> (f32, i32) {
        match self {
            ImageKind::Cropped => (20.0, 5),
            ImageKind::General => (30.0, 10),
        }
    }
}

/// Optional drawing step applied before the classified image is encoded
pub trait PlateOverlay: Send + Sync {
    fn apply(&self, image: &mut RgbImage, plate: &str, kind: ImageKind);
}

/// Leaves the picture untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverlay;

impl PlateOverlay for NoOverlay {
    fn apply(&self, _image: &mut RgbImage, _plate: &str, _kind: ImageKind) {}
}

/// Stamps the plate text in red at the top-left corner
pub struct TextOverlay {
    font: Font<'static>,
}

impl TextOverlay {
    pub fn new(font: Font<'static>) -> Self {
        Self { font }
    }

    /// Load a TrueType font from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| Error::Config(format!("Invalid overlay font: {}", path.display())))?;
        Ok(Self::new(font))
    }
}

impl PlateOverlay for TextOverlay {
    fn apply(&self, image: &mut RgbImage, plate: &str, kind: ImageKind) {
        let (height, offset) = kind.stamp_geometry();
        draw_text_mut(
            image,
            Rgb([255, 0, 0]),
            offset,
            offset,
            Scale::uniform(height),
            &self.font,
            plate,
        );
    }
}

/// Decodes raw uploads and writes classified JPEG copies
#[derive(Clone)]
pub struct ImageWriter {
    overlay: Arc<dyn PlateOverlay>,
}

impl Default for ImageWriter {
    fn default() -> Self {
        Self::new(Arc::new(NoOverlay))
    }
}

impl ImageWriter {
    pub fn new(overlay: Arc<dyn PlateOverlay>) -> Self {
        Self { overlay }
    }

    /// Decode `source` (format sniffed from content) and write it as JPEG to `destination`
    pub fn write(&self, source: &Path, destination: &Path, plate: &str, kind: ImageKind) -> Result<()> {
        let decoded = image::io::Reader::open(source)?
            .with_guessed_format()?
            .decode()?;

        let mut rgb = decoded.to_rgb8();
        self.overlay.apply(&mut rgb, plate, kind);

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        rgb.save_with_format(destination, ImageFormat::Jpeg)?;

        debug!(
            "Wrote {:?} image {}x{} to {}",
            kind,
            rgb.width(),
            rgb.height(),
            destination.display()
        );
        Ok(())
    }
}

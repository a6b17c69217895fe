use std::path::Path;
use std::sync::Arc;

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use rustybuzz::ttf_parser;

use crate::error::KartografError;

/// Binary data of a font face.
#[derive(Clone)]
pub struct FontData {
    data: Arc<Vec<u8>>,
    index: u32,
}

impl std::fmt::Debug for FontData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontData")
            .field("size", &self.data.len())
            .field("index", &self.index)
            .finish()
    }
}

impl FontData {
    /// Creates font data from the contents of a font file. `index` selects the face in a font
    /// collection.
    pub fn new(data: Vec<u8>, index: u32) -> Result<Self, KartografError> {
        ttf_parser::Face::parse(&data, index)
            .map_err(|err| KartografError::Font(format!("failed to parse font: {err}")))?;
        Ok(Self {
            data: Arc::new(data),
            index,
        })
    }

    /// Loads the first face of a font file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KartografError> {
        Self::new(std::fs::read(path)?, 0)
    }

    /// Finds a sans-serif font installed in the system.
    pub fn system_sans_serif() -> Option<Self> {
        let mut db = Database::new();
        db.load_system_fonts();

        let families = [Family::SansSerif];
        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };

        let id = db.query(&query)?;
        let (data, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
        match Self::new(data, index) {
            Ok(font) => Some(font),
            Err(err) => {
                log::warn!("System font cannot be used: {err}");
                None
            }
        }
    }

    pub(crate) fn face(&self) -> Option<rustybuzz::Face<'_>> {
        rustybuzz::Face::from_slice(&self.data, self.index)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn invalid_font_data() {
        assert_matches!(
            FontData::new(b"definitely not a font".to_vec(), 0),
            Err(KartografError::Font(_))
        );
    }

    #[test]
    fn missing_font_file() {
        assert_matches!(
            FontData::load("/nonexistent/font.ttf"),
            Err(KartografError::Io(_))
        );
    }
}

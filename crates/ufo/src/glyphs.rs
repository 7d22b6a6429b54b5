//! Glyph names of UFO sources.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use dssketch::{GlyphUniverse, GlyphUniverseProvider, SourceFile, Unavailable};
use log::{debug, warn};

use crate::error::{Error, Result};

const DEFAULT_LAYER: &str = "public.default";
const DEFAULT_GLYPHS_DIR: &str = "glyphs";

/// The glyph directory of the default layer.
fn default_layer_dir(ufo: &Path) -> Result<PathBuf> {
    let file = ufo.join("layercontents.plist");
    if !file.is_file() {
        return Ok(ufo.join(DEFAULT_GLYPHS_DIR));
    }
    let layers: Vec<(String, String)> =
        plist::from_file(&file).map_err(|source| Error::Plist { path: file.clone(), source })?;
    let dir = layers
        .iter()
        .find(|(name, _)| name == DEFAULT_LAYER)
        .or_else(|| layers.first())
        .map_or(DEFAULT_GLYPHS_DIR, |(_, dir)| dir.as_str());
    Ok(ufo.join(dir))
}

/// Every glyph name in the default layer of `ufo`.
pub fn glyph_names(ufo: &Path) -> Result<Vec<String>> {
    if !ufo.is_dir() {
        return Err(Error::NotAUfo(ufo.to_path_buf()));
    }
    let contents = default_layer_dir(ufo)?.join("contents.plist");
    if !contents.is_file() {
        return Err(Error::MissingFile(contents));
    }
    let glyphs: BTreeMap<String, String> =
        plist::from_file(&contents).map_err(|source| Error::Plist { path: contents.clone(), source })?;
    if glyphs.is_empty() {
        warn!("{} is empty", contents.display());
    }
    Ok(glyphs.into_keys().collect())
}

/// Reads the glyph universe from the UFO masters a document points at.
///
/// Source filenames are resolved against `base_dir`, the directory of the
/// document being converted.
#[derive(Debug, Clone)]
pub struct UfoGlyphUniverse {
    base_dir: PathBuf,
}

impl UfoGlyphUniverse {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }
}

impl GlyphUniverseProvider for UfoGlyphUniverse {
    fn all_glyphs(&self, sources: &[SourceFile]) -> std::result::Result<GlyphUniverse, Unavailable> {
        if sources.is_empty() {
            return Err(Unavailable::new("document has no sources"));
        }
        let mut universe = GlyphUniverse::new();
        for source in sources {
            let path = self.base_dir.join(&source.filename);
            let names = glyph_names(&path).map_err(|e| Unavailable::new(e.to_string()))?;
            debug!("{}: {} glyphs", path.display(), names.len());
            universe.extend(names.into_iter().map(Into::into));
        }
        Ok(universe)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write_plist(path: &Path, body: &str) {
        let text = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<plist version=\"1.0\">\n{body}\n</plist>\n"
        );
        fs::write(path, text).unwrap();
    }

    #[test]
    fn honours_layercontents() {
        let dir = tempfile::tempdir().unwrap();
        let ufo = dir.path().join("Test.ufo");
        fs::create_dir_all(ufo.join("glyphs.public.default")).unwrap();
        write_plist(
            &ufo.join("layercontents.plist"),
            "<array><array><string>public.default</string><string>glyphs.public.default</string></array></array>",
        );
        write_plist(
            &ufo.join("glyphs.public.default/contents.plist"),
            "<dict><key>A</key><string>A_.glif</string></dict>",
        );
        assert_eq!(glyph_names(&ufo).unwrap(), vec!["A".to_string()]);
    }

    #[test]
    fn missing_ufo_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(glyph_names(&dir.path().join("Nope.ufo")), Err(Error::NotAUfo(_))));
    }
}

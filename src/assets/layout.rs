use std::path::{Path, PathBuf};

use crate::foundation::error::{TimelapseError, TimelapseResult};

/// Texture identifier used for the tiled canvas background.
pub const DEFAULT_BACKGROUND: &str = "white_concrete";

/// Maps texture identifiers to files under an asset directory.
///
/// `red_concrete` resolves to `<root>/red_concrete.<extension>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetLayout {
    /// Directory holding texture files.
    pub root: PathBuf,
    /// File extension appended to identifiers (without the dot).
    pub extension: String,
    /// Identifier of the background tile texture.
    pub background: String,
}

impl Default for AssetLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            extension: "png".to_string(),
            background: DEFAULT_BACKGROUND.to_string(),
        }
    }
}

impl AssetLayout {
    /// Layout rooted at `root` with default extension and background.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Resolve a texture identifier to a file path.
    pub fn texture_path(&self, id: &str) -> TimelapseResult<PathBuf> {
        let norm = normalize_texture_id(id)?;
        let file = if self.extension.is_empty() {
            norm
        } else {
            format!("{norm}.{}", self.extension)
        };
        Ok(self.root.join(Path::new(&file)))
    }

    /// Resolve the background tile path.
    pub fn background_path(&self) -> TimelapseResult<PathBuf> {
        self.texture_path(&self.background)
    }
}

/// Normalize and validate a texture identifier.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute
/// identifiers or parent traversals (`..`), so identifiers coming from event data cannot escape
/// the asset directory.
pub fn normalize_texture_id(id: &str) -> TimelapseResult<String> {
    let s = id.trim().replace('\\', "/");
    if s.starts_with('/') {
        return Err(TimelapseError::asset(format!(
            "texture id '{id}' must be relative"
        )));
    }
    if s.is_empty() {
        return Err(TimelapseError::asset("texture id must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(TimelapseError::asset(format!(
                "texture id '{id}' must not contain '..'"
            )));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(TimelapseError::asset(format!(
            "texture id '{id}' must contain a file name"
        )));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/layout.rs"]
mod tests;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use fnv::FnvHasher;

/// Lookup key of a cached texture.
///
/// Keys are namespaced strings: `IMAGE:<path>`, `FONT:<name>`,
/// `PIPELINE:<name>` and the video feed forms (`TESTPIPE`, `FILE:<path>`,
/// `TCP:<host>:<port>`, `UDP:<port>`, `CUSTOM:<description>`).
///
/// The 64-bit FNV hash is computed once at construction, so map lookups
/// never rehash the string.
#[derive(Clone)]
pub struct TextureKey {
    hash: u64,
    text: Arc<str>,
}

impl TextureKey {
    pub fn new(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self {
            hash: hash_text(&text),
            text: Arc::from(text),
        }
    }

    /// Key of a static image loaded from `path`.
    pub fn image(path: &Path) -> Self {
        Self::new(format!("IMAGE:{}", path.display()))
    }

    /// Key of a glyph atlas built from the font `name`.
    pub fn font(name: &str) -> Self {
        Self::new(format!("FONT:{name}"))
    }

    /// Key of a named custom pipeline.
    pub fn pipeline(name: &str) -> Self {
        Self::new(format!("PIPELINE:{name}"))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Namespace prefix (`"IMAGE"`, `"FONT"`, ...), or the whole key when it
    /// carries none (`"TESTPIPE"`).
    pub fn kind(&self) -> &str {
        match self.text.split_once(':') {
            Some((kind, _)) => kind,
            None => &self.text,
        }
    }
}

fn hash_text(text: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(text.as_bytes());
    hasher.finish()
}

impl PartialEq for TextureKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.text == other.text
    }
}

impl Eq for TextureKey {}

impl Hash for TextureKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for TextureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextureKey").field(&self.as_str()).finish()
    }
}

impl fmt::Display for TextureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for TextureKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings_share_hash() {
        let a = TextureKey::new("IMAGE:x.png");
        let b = TextureKey::from("IMAGE:x.png");
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());
    }

    #[test]
    fn hash_is_fnv_of_the_key_text() {
        let mut hasher = FnvHasher::default();
        hasher.write(b"FONT:arial");
        assert_eq!(TextureKey::font("arial").hash_value(), hasher.finish());
        // FNV-1a offset basis.
        assert_eq!(TextureKey::new("").hash_value(), 0xcbf2_9ce4_8422_2325);
    }

    #[test]
    fn namespaces_do_not_collide() {
        let img = TextureKey::image(Path::new("arial"));
        let font = TextureKey::font("arial");
        assert_ne!(img, font);
        assert_eq!(img.as_str(), "IMAGE:arial");
        assert_eq!(font.as_str(), "FONT:arial");
    }

    #[test]
    fn kind_is_prefix_before_colon() {
        assert_eq!(TextureKey::pipeline("cam").kind(), "PIPELINE");
        assert_eq!(TextureKey::new("TCP:host:5000").kind(), "TCP");
        assert_eq!(TextureKey::new("TESTPIPE").kind(), "TESTPIPE");
    }

    #[test]
    fn empty_key_is_detected() {
        assert!(TextureKey::new("").is_empty());
        assert!(!TextureKey::new("FONT:x").is_empty());
    }
}

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use crate::foundation::error::{TimelapseError, TimelapseResult};

/// Decoded texture in straight-alpha RGBA8.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    image: image::RgbaImage,
}

impl Texture {
    /// Wrap an already decoded image.
    pub fn from_image(image: image::RgbaImage) -> Self {
        Self { image }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the pixel data.
    pub fn image(&self) -> &image::RgbaImage {
        &self.image
    }
}

/// Decode encoded image bytes (any format `image` understands) into a [`Texture`].
pub fn decode_texture(bytes: &[u8]) -> TimelapseResult<Texture> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| TimelapseError::asset(format!("decode image: {e}")))?;
    Ok(Texture::from_image(dyn_img.to_rgba8()))
}

/// Cache counters, mostly useful in logs and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureStoreStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Decodes performed (including duplicate decodes that lost an insertion race).
    pub loads: u64,
    /// Textures currently cached.
    pub cached: usize,
}

/// Shared, thread-safe cache of decoded textures keyed by file path.
///
/// Each path is decoded at most once while it stays cached. There is no single-flight guard:
/// two threads missing on the same path at the same time may both decode it, but only the
/// first insertion is kept and both callers receive that shared entry. With a capacity set, the
/// least recently used texture is evicted when the cache is full; without one the cache only
/// grows.
pub struct TextureStore {
    cache: Mutex<LruCache<PathBuf, Arc<Texture>>>,
    hits: AtomicU64,
    loads: AtomicU64,
}

impl Default for TextureStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for TextureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureStore")
            .field("stats", &self.stats())
            .finish()
    }
}

impl TextureStore {
    /// Create a store, optionally bounded to `capacity` textures.
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        let cache = match capacity {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            cache: Mutex::new(cache),
            hits: AtomicU64::new(0),
            loads: AtomicU64::new(0),
        }
    }

    /// Return the texture at `path`, decoding and caching it on first use.
    pub fn get(&self, path: &Path) -> TimelapseResult<Arc<Texture>> {
        if let Some(tex) = self.cache.lock().get(path) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(tex));
        }

        // Decode without holding the lock so unrelated paths can load in parallel.
        let bytes = std::fs::read(path).map_err(|e| {
            TimelapseError::asset(format!("read texture '{}': {e}", path.display()))
        })?;
        let decoded = decode_texture(&bytes).map_err(|e| match e {
            TimelapseError::Asset(msg) => {
                TimelapseError::asset(format!("texture '{}': {msg}", path.display()))
            }
            other => other,
        })?;
        self.loads.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(path = %path.display(), "loaded texture");

        let mut cache = self.cache.lock();
        if let Some(existing) = cache.get(path) {
            return Ok(Arc::clone(existing));
        }
        let tex = Arc::new(decoded);
        cache.put(path.to_path_buf(), Arc::clone(&tex));
        Ok(tex)
    }

    /// Return `true` when `path` is currently cached.
    pub fn contains(&self, path: &Path) -> bool {
        self.cache.lock().contains(path)
    }

    /// Number of cached textures.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Return `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> TextureStoreStats {
        TextureStoreStats {
            hits: self.hits.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            cached: self.len(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/texture.rs"]
mod tests;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::TextureError;

/// What the renderer needs to know about a loaded background texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    pub source: String,
    pub width: f32,
    pub height: f32,
}

impl TextureInfo {
    pub fn new(source: impl Into<String>, width: f32, height: f32) -> Self {
        Self { source: source.into(), width, height }
    }
}

/// Asynchronous source of textures, injected by the host.
pub trait TextureLoader: Send + Sync {
    fn load<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<TextureInfo, TextureError>>;
}

/// Loads textures from image files below a root directory.
#[derive(Debug, Clone)]
pub struct ImageFileLoader {
    root: PathBuf,
}

impl ImageFileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TextureLoader for ImageFileLoader {
    fn load<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<TextureInfo, TextureError>> {
        Box::pin(async move {
            if source.is_empty() {
                return Err(TextureError::EmptySource);
            }
            let path = self.root.join(source);
            if !path.is_file() {
                return Err(TextureError::NotFound(path.display().to_string()));
            }
            let (width, height) = image::image_dimensions(&path).map_err(|error| TextureError::Decode {
                source_path: path.display().to_string(),
                error,
            })?;
            log::debug!("Loaded texture {}: {}x{}", source, width, height);
            Ok(TextureInfo::new(source, width as f32, height as f32))
        })
    }
}

/// Textures already loaded, shared between all drawing nodes.
///
/// `refresh` is synchronous and may only look textures up here; loading
/// happens in the async `draw`.
#[derive(Debug, Clone, Default)]
pub struct TextureCache {
    textures: Arc<RwLock<HashMap<String, TextureInfo>>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &str) -> Option<TextureInfo> {
        self.textures.read().get(source).cloned()
    }

    pub fn insert(&self, texture: TextureInfo) {
        self.textures.write().insert(texture.source.clone(), texture);
    }

    pub fn len(&self) -> usize {
        self.textures.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look `source` up, loading and caching it on a miss.
    pub async fn load(&self, loader: &dyn TextureLoader, source: &str) -> Result<TextureInfo, TextureError> {
        if let Some(texture) = self.get(source) {
            return Ok(texture);
        }
        let texture = loader.load(source).await?;
        self.insert(texture.clone());
        Ok(texture)
    }
}

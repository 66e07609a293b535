use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions, TextureWrapMode};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::TextureError;

/// GPU textures for drawing backgrounds, uploaded on first use.
///
/// Sources that failed to load are remembered so they are not retried every frame.
pub struct EguiTextures {
    root: PathBuf,
    handles: HashMap<String, Option<TextureHandle>>,
}

impl EguiTextures {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), handles: HashMap::new() }
    }

    /// Gets or uploads the texture for `source`
    pub fn get(&mut self, ctx: &Context, source: &str) -> Option<TextureId> {
        if let Some(handle) = self.handles.get(source) {
            return handle.as_ref().map(TextureHandle::id);
        }

        let handle = match load_color_image(&self.root.join(source)) {
            Ok(image) => {
                let options = TextureOptions { wrap_mode: TextureWrapMode::Repeat, ..TextureOptions::LINEAR };
                Some(ctx.load_texture(source, image, options))
            }
            Err(err) => {
                log::warn!("Cannot upload drawing texture: {err}");
                None
            }
        };
        let id = handle.as_ref().map(TextureHandle::id);
        self.handles.insert(source.to_owned(), handle);
        id
    }
}

fn load_color_image(path: &Path) -> Result<ColorImage, TextureError> {
    if !path.is_file() {
        return Err(TextureError::NotFound(path.display().to_string()));
    }
    let image = image::open(path)
        .map_err(|error| TextureError::Decode { source_path: path.display().to_string(), error })?
        .to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, image.as_flat_samples().as_slice()))
}

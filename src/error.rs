use thiserror::Error;

use crate::shape::ShapeId;

/// Errors that can occur while loading a background texture
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Texture source is empty")]
    EmptySource,
    #[error("Texture not found: {0}")]
    NotFound(String),
    #[error("Failed to decode texture {source_path}: {error}")]
    Decode {
        source_path: String,
        #[source]
        error: image::ImageError,
    },
}

/// Errors reported by a drawing store
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("No drawing with id {0}")]
    UnknownDrawing(ShapeId),
    #[error("Drawing has not been persisted yet")]
    NotPersisted,
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Nothing to redo")]
    NothingToRedo,
}

/// Errors that can occur while loading or saving drawing defaults
#[derive(Error, Debug)]
pub enum DefaultsError {
    #[error("Invalid defaults: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read defaults: {0}")]
    Io(#[from] std::io::Error),
}

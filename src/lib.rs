#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod capture;
pub mod command;
pub mod error;
pub mod geometry;
pub mod host;
pub mod input;
pub mod layer;
pub mod painter;
pub mod renderer;
pub mod scene;
pub mod shape;
pub mod texture;

pub use app::DrawingApp;
pub use capture::{CaptureConfig, CaptureOutcome, DrawCapture};
pub use command::{Command, CommandHistory};
pub use host::{DrawingStore, Grid, NoGrid, SquareGrid, TextSheet};
pub use input::{ActiveTool, InputEvent, PointerEvent};
pub use layer::{DrawingsLayer, LayerHost};
pub use renderer::{DrawingNode, RenderContext, RenderTree};
pub use scene::Scene;
pub use shape::{DrawingDefaults, DrawingId, FillType, ShapeId, ShapeKind, ShapeModel, ShapePatch};
pub use texture::{TextureCache, TextureInfo, TextureLoader};

mod history;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::scene::DrawingList;
use crate::shape::{ShapeId, ShapeModel, ShapePatch};

pub use history::CommandHistory;

/// Result type for command operations
pub type CommandResult = Result<(), StoreError>;

/// Changes to the scene's drawings that can be undone/redone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Add a persisted drawing
    CreateDrawing { shape: ShapeModel },
    /// Change some fields of a drawing
    UpdateDrawing {
        id: ShapeId,
        /// Previous values of the fields in `after`
        before: ShapePatch,
        after: ShapePatch,
    },
    /// Remove a drawing, keeping it around for undo
    DeleteDrawing { shape: ShapeModel },
    /// Remove every drawing at once
    ClearDrawings { shapes: Vec<ShapeModel> },
}

impl Command {
    pub fn execute(&self, drawings: &mut DrawingList) -> CommandResult {
        match self {
            Command::CreateDrawing { shape } => {
                drawings.insert(shape.clone());
                Ok(())
            }
            Command::UpdateDrawing { id, after, .. } => {
                let shape = drawings.get_mut(*id).ok_or(StoreError::UnknownDrawing(*id))?;
                after.apply_to(shape);
                Ok(())
            }
            Command::DeleteDrawing { shape } => {
                let id = shape.id.shape_id().ok_or(StoreError::NotPersisted)?;
                drawings.remove(id)?;
                Ok(())
            }
            Command::ClearDrawings { .. } => {
                drawings.clear();
                Ok(())
            }
        }
    }

    /// Revert the effect of a previous `execute`
    pub fn undo(&self, drawings: &mut DrawingList) -> CommandResult {
        match self {
            Command::CreateDrawing { shape } => {
                let id = shape.id.shape_id().ok_or(StoreError::NotPersisted)?;
                drawings.remove(id)?;
                Ok(())
            }
            Command::UpdateDrawing { id, before, .. } => {
                let shape = drawings.get_mut(*id).ok_or(StoreError::UnknownDrawing(*id))?;
                before.apply_to(shape);
                Ok(())
            }
            Command::DeleteDrawing { shape } => {
                drawings.insert(shape.clone());
                Ok(())
            }
            Command::ClearDrawings { shapes } => {
                for shape in shapes {
                    drawings.insert(shape.clone());
                }
                Ok(())
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateDrawing { .. } => "Create drawing",
            Command::UpdateDrawing { .. } => "Update drawing",
            Command::DeleteDrawing { .. } => "Delete drawing",
            Command::ClearDrawings { .. } => "Clear drawings",
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandHistory};
use crate::error::StoreError;
use crate::host::DrawingStore;
use crate::shape::{DrawingId, ShapeId, ShapeModel, ShapePatch};

/// Persisted drawings of a scene, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawingList {
    drawings: Vec<ShapeModel>,
}

impl DrawingList {
    pub fn insert(&mut self, shape: ShapeModel) {
        self.drawings.push(shape);
    }

    pub fn remove(&mut self, id: ShapeId) -> Result<ShapeModel, StoreError> {
        let index = self
            .drawings
            .iter()
            .position(|d| d.id.shape_id() == Some(id))
            .ok_or(StoreError::UnknownDrawing(id))?;
        Ok(self.drawings.remove(index))
    }

    pub fn get(&self, id: ShapeId) -> Option<&ShapeModel> {
        self.drawings.iter().find(|d| d.id.shape_id() == Some(id))
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut ShapeModel> {
        self.drawings.iter_mut().find(|d| d.id.shape_id() == Some(id))
    }

    pub fn clear(&mut self) {
        self.drawings.clear();
    }

    pub fn len(&self) -> usize {
        self.drawings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShapeModel> {
        self.drawings.iter()
    }

    pub fn max_z(&self) -> i32 {
        self.drawings.iter().map(|d| d.z).max().unwrap_or(0)
    }
}

/// In-memory drawing store with undo/redo.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Scene {
    drawings: DrawingList,
    #[serde(skip)]
    history: CommandHistory,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drawings(&self) -> &DrawingList {
        &self.drawings
    }

    /// Drawings sorted back to front.
    pub fn sorted(&self) -> Vec<&ShapeModel> {
        let mut sorted: Vec<&ShapeModel> = self.drawings.iter().collect();
        sorted.sort_by_key(|d| d.z);
        sorted
    }

    pub fn undo(&mut self) -> Result<(), StoreError> {
        self.history.undo(&mut self.drawings)
    }

    pub fn redo(&mut self) -> Result<(), StoreError> {
        self.history.redo(&mut self.drawings)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Delete every drawing as a single undoable step.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        if self.drawings.is_empty() {
            return Ok(());
        }
        let shapes = self.drawings.iter().cloned().collect();
        log::info!("Deleting all {} drawings", self.drawings.len());
        self.history.execute(Command::ClearDrawings { shapes }, &mut self.drawings)
    }
}

impl DrawingStore for Scene {
    fn create(&mut self, mut shape: ShapeModel) -> Result<ShapeId, StoreError> {
        let id = ShapeId::new();
        shape.id = DrawingId::Assigned(id);
        shape.sanitize();
        if shape.z == 0 {
            shape.z = self.drawings.max_z() + 1;
        }
        log::info!("Created {} drawing {}", shape.kind.name(), id);
        self.history.execute(Command::CreateDrawing { shape }, &mut self.drawings)?;
        Ok(id)
    }

    fn update(&mut self, id: ShapeId, patch: ShapePatch) -> Result<(), StoreError> {
        let shape = self.drawings.get(id).ok_or(StoreError::UnknownDrawing(id))?;
        let after = patch.changes_against(shape);
        if after.is_empty() {
            return Ok(());
        }
        let before = after.inverse_against(shape);
        self.history.execute(Command::UpdateDrawing { id, before, after }, &mut self.drawings)
    }

    fn delete(&mut self, id: ShapeId) -> Result<(), StoreError> {
        let shape = self.drawings.get(id).ok_or(StoreError::UnknownDrawing(id))?.clone();
        log::info!("Deleted {} drawing {}", shape.kind.name(), id);
        self.history.execute(Command::DeleteDrawing { shape }, &mut self.drawings)
    }

    fn get(&self, id: ShapeId) -> Option<&ShapeModel> {
        self.drawings.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeKind;

    #[test]
    fn test_create_assigns_increasing_z() {
        let mut scene = Scene::new();
        let first = scene.create(ShapeModel::new(ShapeKind::Rectangle)).unwrap();
        let second = scene.create(ShapeModel::new(ShapeKind::Ellipse)).unwrap();
        assert_eq!(scene.get(first).unwrap().z, 1);
        assert_eq!(scene.get(second).unwrap().z, 2);
    }

    #[test]
    fn test_create_rounds_geometry() {
        let mut scene = Scene::new();
        let mut shape = ShapeModel::new(ShapeKind::Rectangle);
        shape.x = 10.4;
        shape.width = 20.6;
        let id = scene.create(shape).unwrap();
        let stored = scene.get(id).unwrap();
        assert_eq!((stored.x, stored.width), (10.0, 21.0));
    }

    #[test]
    fn test_unknown_drawing() {
        let mut scene = Scene::new();
        let id = ShapeId::new();
        assert_eq!(scene.delete(id), Err(StoreError::UnknownDrawing(id)));
    }
}

//! Capabilities the host application injects into the drawing core.

use egui::Pos2;

use crate::error::StoreError;
use crate::shape::{ShapeId, ShapeModel, ShapePatch};

/// The canvas grid: snapping and distance tolerances.
pub trait Grid {
    fn snap(&self, point: Pos2) -> Pos2;

    /// Distance under which a click counts as hitting an existing vertex
    fn precision(&self) -> f32;

    /// Side length of one grid square
    fn size(&self) -> f32;
}

/// Square grid snapping to the nearest grid intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquareGrid {
    pub size: f32,
    pub precision: f32,
}

impl SquareGrid {
    pub fn new(size: f32) -> Self {
        // Tolerance follows the square size, with a floor for tiny grids
        Self { size, precision: (size / 10.0).max(4.0) }
    }
}

impl Default for SquareGrid {
    fn default() -> Self {
        Self::new(50.0)
    }
}

impl Grid for SquareGrid {
    fn snap(&self, point: Pos2) -> Pos2 {
        if self.size <= 0.0 {
            return point;
        }
        Pos2::new(
            (point.x / self.size).round() * self.size,
            (point.y / self.size).round() * self.size,
        )
    }

    fn precision(&self) -> f32 {
        self.precision
    }

    fn size(&self) -> f32 {
        self.size
    }
}

/// Grid for gridless scenes: nothing snaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGrid;

impl Grid for NoGrid {
    fn snap(&self, point: Pos2) -> Pos2 {
        point
    }

    fn precision(&self) -> f32 {
        4.0
    }

    fn size(&self) -> f32 {
        1.0
    }
}

/// Persistence collaborator for finished drawings.
pub trait DrawingStore {
    /// Persist a new drawing and return the id the store assigned to it.
    fn create(&mut self, shape: ShapeModel) -> Result<ShapeId, StoreError>;

    fn update(&mut self, id: ShapeId, patch: ShapePatch) -> Result<(), StoreError>;

    fn delete(&mut self, id: ShapeId) -> Result<(), StoreError>;

    fn get(&self, id: ShapeId) -> Option<&ShapeModel>;
}

/// Configuration sheet where the user types the content of a text drawing.
pub trait TextSheet {
    fn render(&mut self, shape: ShapeModel);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_grid_snaps_to_intersections() {
        let grid = SquareGrid::new(50.0);
        assert_eq!(grid.snap(Pos2::new(24.0, 26.0)), Pos2::new(0.0, 50.0));
        assert_eq!(grid.snap(Pos2::new(-30.0, 110.0)), Pos2::new(-50.0, 100.0));
    }

    #[test]
    fn test_precision_floor() {
        assert_eq!(SquareGrid::new(10.0).precision(), 4.0);
        assert_eq!(SquareGrid::new(100.0).precision(), 10.0);
    }
}

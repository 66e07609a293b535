//! Pointer-driven creation of new drawings.
//!
//! [`DrawCapture`] turns a stream of [`InputEvent`]s into a preview shape and,
//! eventually, a committed or cancelled one:
//!
//! ```text
//! Idle --down--> Armed --move--> Dragging --up--> Committed | Cancelled
//! ```
//!
//! Polygons loop `Armed -> Dragging -> click -> Armed` once per vertex until the
//! user closes the shape, double-clicks its last vertex or releases slowly.

use egui::{PointerButton, Pos2, Vec2};
use serde::{Deserialize, Serialize};

use crate::geometry;
use crate::host::Grid;
use crate::input::{ActiveTool, InputEvent, PointerEvent};
use crate::shape::{DrawingDefaults, ShapeKind, ShapeModel};

/// Timing knobs of the capture protocol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Minimum time between two appended freehand points
    pub freehand_sample_rate_ms: f64,
    /// A polygon click shorter than this places a vertex and keeps drawing
    pub fast_click_ms: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { freehand_sample_rate_ms: 100.0, fast_click_ms: 250.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Armed,
    Dragging,
}

/// What an event did to the capture session.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// The event was not for us
    Ignored,
    /// The preview shape changed
    Updated,
    /// The shape is finished and ready to persist
    Committed(ShapeModel),
    /// A text drawing is placed and needs its content entered
    AwaitingText(ShapeModel),
    Cancelled,
}

#[derive(Debug)]
struct Session {
    shape: ShapeModel,
    state: CaptureState,
    /// Time of the pointer press that started the current click
    gesture_start: f64,
    /// Time the last freehand point was appended
    last_sample: f64,
    /// Whether the last polygon point follows the pointer
    has_live: bool,
}

impl Session {
    /// Polygon vertices placed so far, origin included, live point excluded
    fn placed(&self) -> usize {
        self.shape.points.len() - usize::from(self.has_live)
    }

    fn set_live(&mut self, point: Pos2) {
        if self.has_live {
            self.shape.points.pop();
        }
        self.shape.points.push(point);
        self.has_live = true;
    }

    fn drop_live(&mut self) {
        if self.has_live {
            self.shape.points.pop();
            self.has_live = false;
        }
    }
}

/// Capture session for the drawing being created.
#[derive(Debug)]
pub struct DrawCapture {
    config: CaptureConfig,
    defaults: DrawingDefaults,
    session: Option<Session>,
}

impl DrawCapture {
    pub fn new(config: CaptureConfig, defaults: DrawingDefaults) -> Self {
        Self { config, defaults, session: None }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn defaults(&self) -> &DrawingDefaults {
        &self.defaults
    }

    pub fn defaults_mut(&mut self) -> &mut DrawingDefaults {
        &mut self.defaults
    }

    pub fn state(&self) -> CaptureState {
        self.session.as_ref().map_or(CaptureState::Idle, |s| s.state)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The shape being drawn
    pub fn preview(&self) -> Option<&ShapeModel> {
        self.session.as_ref().map(|s| &s.shape)
    }

    /// Mutable preview, for the renderer to write measured extents back
    pub fn preview_mut(&mut self) -> Option<&mut ShapeModel> {
        self.session.as_mut().map(|s| &mut s.shape)
    }

    /// Abandon the current drawing, if any.
    pub fn cancel(&mut self) -> CaptureOutcome {
        match self.session.take() {
            Some(session) => {
                log::info!("Cancelled {} drawing", session.shape.kind.name());
                CaptureOutcome::Cancelled
            }
            None => CaptureOutcome::Ignored,
        }
    }

    pub fn handle(&mut self, event: &InputEvent, tool: ActiveTool, grid: &dyn Grid) -> CaptureOutcome {
        match event {
            InputEvent::PointerDown { pointer, button: PointerButton::Primary } => {
                self.pointer_down(pointer, tool, grid)
            }
            InputEvent::PointerDown { pointer, button: PointerButton::Secondary } => self.right_down(pointer),
            InputEvent::PointerMove { pointer } => self.pointer_move(pointer, grid),
            InputEvent::PointerUp { pointer, button: PointerButton::Primary } => self.pointer_up(pointer, grid),
            _ => CaptureOutcome::Ignored,
        }
    }

    fn pointer_down(&mut self, pointer: &PointerEvent, tool: ActiveTool, grid: &dyn Grid) -> CaptureOutcome {
        if let Some(session) = self.session.as_mut() {
            // Only a polygon keeps its session across clicks
            if session.shape.kind != ShapeKind::Polygon {
                return CaptureOutcome::Ignored;
            }
            session.gesture_start = pointer.time;
            return CaptureOutcome::Updated;
        }

        let Some(kind) = tool.shape_kind() else {
            return CaptureOutcome::Ignored;
        };
        let snaps = matches!(kind, ShapeKind::Rectangle | ShapeKind::Ellipse | ShapeKind::Polygon);
        let origin = if snaps && !pointer.modifiers.shift {
            grid.snap(pointer.position)
        } else {
            pointer.position
        }
        .round();

        let mut shape = self.defaults.starting_data(kind);
        shape.x = origin.x;
        shape.y = origin.y;
        if kind.is_polygonal() {
            shape.points.push(origin);
        }
        let state = if kind == ShapeKind::Text {
            CaptureState::Dragging
        } else {
            CaptureState::Armed
        };
        log::debug!("Started {} drawing at {:?}", kind.name(), origin);
        self.session = Some(Session {
            shape,
            state,
            gesture_start: pointer.time,
            last_sample: pointer.time,
            has_live: false,
        });
        CaptureOutcome::Updated
    }

    fn pointer_move(&mut self, pointer: &PointerEvent, grid: &dyn Grid) -> CaptureOutcome {
        let sample_rate = self.config.freehand_sample_rate_ms;
        let Some(session) = self.session.as_mut() else {
            return CaptureOutcome::Ignored;
        };
        let point = pointer.position.round();
        let kind = session.shape.kind;

        match kind {
            ShapeKind::Text => return CaptureOutcome::Ignored,
            ShapeKind::Rectangle | ShapeKind::Ellipse => {
                let extents = drag_extents(&session.shape, pointer.position, grid, false);
                session.shape.width = extents.x.round();
                session.shape.height = extents.y.round();
            }
            ShapeKind::Freehand => {
                let first_move = session.state == CaptureState::Armed;
                let points = &mut session.shape.points;
                let elapsed_ms = (pointer.time - session.last_sample) * 1000.0;
                let throttled = elapsed_ms < sample_rate || points.last() == Some(&point);
                if !first_move && points.len() > 1 && throttled {
                    if let Some(last) = points.last_mut() {
                        *last = point;
                    }
                } else {
                    points.push(point);
                    session.last_sample = pointer.time;
                }
            }
            ShapeKind::Polygon => session.set_live(point),
        }
        session.state = CaptureState::Dragging;
        CaptureOutcome::Updated
    }

    fn pointer_up(&mut self, pointer: &PointerEvent, grid: &dyn Grid) -> CaptureOutcome {
        let fast_click_ms = self.config.fast_click_ms;
        let Some(session) = self.session.as_mut() else {
            return CaptureOutcome::Ignored;
        };
        let kind = session.shape.kind;

        match kind {
            ShapeKind::Text => self.finish(),
            ShapeKind::Rectangle | ShapeKind::Ellipse => {
                if session.shape.width != 0.0 && session.shape.height != 0.0 {
                    self.finish()
                } else {
                    self.cancel()
                }
            }
            ShapeKind::Freehand => self.finish(),
            ShapeKind::Polygon => {
                if !session.has_live && session.placed() <= 1 {
                    return self.cancel();
                }

                let point = pointer.position.round();
                let precision = grid.precision();
                let origin = session.shape.points[0];
                let placed = session.placed();
                let last_placed = session.shape.points[placed - 1];

                if placed >= 3 && point.distance(origin) <= precision {
                    session.set_live(origin);
                    return self.finish();
                }
                if point.distance(last_placed) <= precision {
                    session.drop_live();
                    return self.finish();
                }

                let elapsed_ms = (pointer.time - session.gesture_start) * 1000.0;
                if elapsed_ms < fast_click_ms || pointer.modifiers.ctrl {
                    // The live point becomes a vertex and a new one follows the pointer
                    session.has_live = false;
                    session.state = CaptureState::Armed;
                    log::debug!("Placed polygon vertex {}", session.shape.points.len());
                    CaptureOutcome::Updated
                } else {
                    self.finish()
                }
            }
        }
    }

    fn right_down(&mut self, pointer: &PointerEvent) -> CaptureOutcome {
        let Some(session) = self.session.as_mut() else {
            return CaptureOutcome::Ignored;
        };
        if session.shape.kind != ShapeKind::Polygon {
            return self.cancel();
        }

        session.drop_live();
        if session.shape.points.len() <= 1 {
            return self.cancel();
        }
        session.shape.points.pop();
        session.set_live(pointer.position.round());
        CaptureOutcome::Updated
    }

    /// End the session with the preview as the finished shape.
    fn finish(&mut self) -> CaptureOutcome {
        let Some(session) = self.session.take() else {
            return CaptureOutcome::Ignored;
        };
        let mut shape = session.shape;

        if shape.kind.is_polygonal() {
            if shape.points.len() < 2 {
                log::info!("Discarded {} drawing with a single point", shape.kind.name());
                return CaptureOutcome::Cancelled;
            }
            shape.normalize_points();
        }

        log::info!("Committed {} drawing at ({}, {})", shape.kind.name(), shape.x, shape.y);
        if shape.kind == ShapeKind::Text {
            CaptureOutcome::AwaitingText(shape)
        } else {
            CaptureOutcome::Committed(shape)
        }
    }
}

/// Extents that put the far corner of `model` at `dest`.
///
/// `dest` is measured in the shape's unrotated frame, and an axis that would
/// collapse to zero keeps one grid square in its current direction.
pub fn drag_extents(model: &ShapeModel, dest: Pos2, grid: &dyn Grid, snap: bool) -> Vec2 {
    let mut dest = geometry::rotate_around_point(dest, model.center(), -model.rotation_radians());
    if snap {
        dest = grid.snap(dest);
    }
    let mut dx = dest.x - model.x;
    let mut dy = dest.y - model.y;
    if dx == 0.0 {
        dx = grid.size() * geometry::sign(model.width);
    }
    if dy == 0.0 {
        dy = grid.size() * geometry::sign(model.height);
    }
    Vec2::new(dx, dy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NoGrid;

    fn down(x: f32, y: f32, time: f64) -> InputEvent {
        InputEvent::PointerDown { pointer: PointerEvent::new(Pos2::new(x, y), time), button: PointerButton::Primary }
    }

    fn moved(x: f32, y: f32, time: f64) -> InputEvent {
        InputEvent::PointerMove { pointer: PointerEvent::new(Pos2::new(x, y), time) }
    }

    fn up(x: f32, y: f32, time: f64) -> InputEvent {
        InputEvent::PointerUp { pointer: PointerEvent::new(Pos2::new(x, y), time), button: PointerButton::Primary }
    }

    fn capture() -> DrawCapture {
        DrawCapture::new(CaptureConfig::default(), DrawingDefaults::default())
    }

    #[test]
    fn test_select_tool_ignores_events() {
        let mut capture = capture();
        let outcome = capture.handle(&down(0.0, 0.0, 0.0), ActiveTool::Select, &NoGrid);
        assert_eq!(outcome, CaptureOutcome::Ignored);
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn test_rectangle_drag_commits() {
        let mut capture = capture();
        capture.handle(&down(10.0, 10.0, 0.0), ActiveTool::Rectangle, &NoGrid);
        assert_eq!(capture.state(), CaptureState::Armed);
        capture.handle(&moved(60.0, 40.0, 0.1), ActiveTool::Rectangle, &NoGrid);
        assert_eq!(capture.state(), CaptureState::Dragging);

        let CaptureOutcome::Committed(shape) = capture.handle(&up(60.0, 40.0, 0.2), ActiveTool::Rectangle, &NoGrid)
        else {
            panic!("rectangle should commit");
        };
        assert_eq!((shape.x, shape.y, shape.width, shape.height), (10.0, 10.0, 50.0, 30.0));
        assert!(!capture.is_active());
    }

    #[test]
    fn test_rectangle_without_extent_cancels() {
        let mut capture = capture();
        capture.handle(&down(10.0, 10.0, 0.0), ActiveTool::Ellipse, &NoGrid);
        capture.handle(&moved(10.0, 40.0, 0.1), ActiveTool::Ellipse, &NoGrid);
        let outcome = capture.handle(&up(10.0, 40.0, 0.2), ActiveTool::Ellipse, &NoGrid);
        assert_eq!(outcome, CaptureOutcome::Cancelled);
    }

    #[test]
    fn test_drag_extents_against_rotation() {
        let mut model = ShapeModel::new(ShapeKind::Rectangle);
        model.width = 20.0;
        model.height = 20.0;
        model.rotation = 180.0;
        // Half a turn maps the far corner onto the origin corner
        let extents = drag_extents(&model, Pos2::new(0.0, 0.0), &NoGrid, false);
        assert!((extents - Vec2::new(20.0, 20.0)).length() < 1e-3);
    }

    #[test]
    fn test_drag_extents_zero_keeps_direction() {
        let mut model = ShapeModel::new(ShapeKind::Rectangle);
        model.width = -30.0;
        model.height = 0.0;
        let extents = drag_extents(&model, Pos2::ZERO, &crate::host::SquareGrid::new(50.0), false);
        assert_eq!(extents, Vec2::new(-50.0, 0.0));
    }
}

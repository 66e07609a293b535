use egui::{Color32, Pos2};
use std::collections::{HashMap, HashSet};

use crate::capture::{CaptureConfig, CaptureOutcome, DrawCapture, drag_extents};
use crate::error::StoreError;
use crate::geometry;
use crate::host::{DrawingStore, Grid, TextSheet};
use crate::input::{ActiveTool, InputEvent};
use crate::renderer::{DrawingNode, RenderContext};
use crate::shape::{DrawingDefaults, DrawingId, ShapeId, ShapeModel, ShapePatch};
use crate::texture::TextureLoader;

/// Host collaborators the layer talks to while handling input.
pub struct LayerHost<'a> {
    pub store: &'a mut dyn DrawingStore,
    pub sheet: &'a mut dyn TextSheet,
    pub grid: &'a dyn Grid,
}

/// Owns the capture session and the render nodes of all drawings.
#[derive(Debug)]
pub struct DrawingsLayer {
    capture: DrawCapture,
    preview: DrawingNode,
    nodes: HashMap<ShapeId, DrawingNode>,
    controlled: Option<ShapeId>,
}

impl Default for DrawingsLayer {
    fn default() -> Self {
        Self::new(CaptureConfig::default(), DrawingDefaults::default())
    }
}

impl DrawingsLayer {
    pub fn new(config: CaptureConfig, defaults: DrawingDefaults) -> Self {
        Self {
            capture: DrawCapture::new(config, defaults),
            preview: DrawingNode::new(),
            nodes: HashMap::new(),
            controlled: None,
        }
    }

    pub fn capture(&self) -> &DrawCapture {
        &self.capture
    }

    pub fn defaults(&self) -> &DrawingDefaults {
        self.capture.defaults()
    }

    /// The drawing being created and its render node
    pub fn preview(&self) -> Option<(&ShapeModel, &DrawingNode)> {
        self.capture.preview().map(|shape| (shape, &self.preview))
    }

    pub fn node(&self, id: ShapeId) -> Option<&DrawingNode> {
        self.nodes.get(&id)
    }

    pub fn controlled(&self) -> Option<ShapeId> {
        self.controlled
    }

    pub fn set_controlled(&mut self, id: Option<ShapeId>) {
        self.controlled = id;
    }

    /// Feed one pointer event to the capture session and act on the outcome.
    pub fn handle_event(
        &mut self,
        event: &InputEvent,
        tool: ActiveTool,
        host: &mut LayerHost<'_>,
        ctx: &RenderContext<'_>,
    ) -> CaptureOutcome {
        let outcome = self.capture.handle(event, tool, host.grid);
        match &outcome {
            CaptureOutcome::Ignored => {}
            CaptureOutcome::Updated => self.refresh_preview(ctx),
            CaptureOutcome::Committed(shape) => {
                self.preview = DrawingNode::new();
                match host.store.create(shape.clone()) {
                    Ok(id) => log::debug!("Stored new drawing {id}"),
                    Err(err) => log::warn!("Failed to store new drawing: {err}"),
                }
            }
            CaptureOutcome::AwaitingText(shape) => {
                self.preview = DrawingNode::new();
                host.sheet.render(shape.clone());
            }
            CaptureOutcome::Cancelled => self.preview = DrawingNode::new(),
        }
        outcome
    }

    /// Drop the drawing in progress when the user switches to another tool.
    pub fn tool_changed(&mut self, tool: ActiveTool) {
        let drawing_kind = self.capture.preview().map(|shape| shape.kind);
        if drawing_kind.is_some() && drawing_kind != tool.shape_kind() {
            self.cancel();
        }
    }

    pub fn cancel(&mut self) {
        self.capture.cancel();
        self.preview = DrawingNode::new();
    }

    fn refresh_preview(&mut self, ctx: &RenderContext<'_>) {
        if let Some(shape) = self.capture.preview_mut() {
            self.preview.set_controlled(true);
            self.preview.refresh(shape, ctx);
        }
    }

    /// Persist a text drawing once its content was entered in the sheet.
    ///
    /// The box is measured from the entered content, since the placement click
    /// measured an empty text. Text without content is discarded.
    pub fn confirm_text(
        &mut self,
        mut shape: ShapeModel,
        store: &mut dyn DrawingStore,
        ctx: &RenderContext<'_>,
    ) -> Result<Option<ShapeId>, StoreError> {
        if shape.text.trim().is_empty() {
            log::info!("Discarded text drawing without content");
            return Ok(None);
        }
        shape.id = DrawingId::Preview;
        DrawingNode::new().refresh(&mut shape, ctx);
        store.create(shape).map(Some)
    }

    /// Apply `patch` to a persisted drawing.
    ///
    /// World-space points in the patch are normalized first; the store is not
    /// touched when nothing would change. Returns whether anything changed.
    pub fn update(
        &mut self,
        store: &mut dyn DrawingStore,
        id: ShapeId,
        mut patch: ShapePatch,
    ) -> Result<bool, StoreError> {
        let current = store.get(id).ok_or(StoreError::UnknownDrawing(id))?;
        patch.normalize_points(current.kind);
        let changes = patch.changes_against(current);
        if changes.is_empty() {
            log::debug!("Update of drawing {id} changes nothing");
            return Ok(false);
        }
        store.update(id, changes)?;
        Ok(true)
    }

    pub fn delete(&mut self, store: &mut dyn DrawingStore, id: ShapeId) -> Result<(), StoreError> {
        store.delete(id)?;
        self.nodes.remove(&id);
        if self.controlled == Some(id) {
            self.controlled = None;
        }
        Ok(())
    }

    /// Remember the style of `shape` for the next drawing of its kind.
    pub fn update_starting_data(&mut self, shape: &ShapeModel) {
        self.capture.defaults_mut().update_starting_data(shape);
    }

    /// Tint the starting data of every kind with the acting user's color.
    pub fn set_user_color(&mut self, color: Color32) {
        let tinted = self.capture.defaults().clone().with_user_color(color);
        *self.capture.defaults_mut() = tinted;
    }

    /// Drag the far corner of a drawing to `dest`.
    pub fn resize(
        &mut self,
        store: &mut dyn DrawingStore,
        grid: &dyn Grid,
        id: ShapeId,
        dest: Pos2,
        snap: bool,
    ) -> Result<bool, StoreError> {
        let current = store.get(id).ok_or(StoreError::UnknownDrawing(id))?;
        let extents = drag_extents(current, dest, grid, snap);
        let patch = ShapePatch {
            width: Some(extents.x.round()),
            height: Some(extents.y.round()),
            ..Default::default()
        };
        self.update(store, id, patch)
    }

    /// Point the rotation handle of a drawing at `pointer`.
    pub fn rotate(&mut self, store: &mut dyn DrawingStore, id: ShapeId, pointer: Pos2) -> Result<bool, StoreError> {
        let current = store.get(id).ok_or(StoreError::UnknownDrawing(id))?;
        let rotation = geometry::rotation_from_handle(current.center(), pointer, geometry::sign(current.height));
        let patch = ShapePatch { rotation: Some(rotation), ..Default::default() };
        self.update(store, id, patch)
    }

    /// Refresh the nodes of all persisted drawings and forget removed ones.
    pub fn sync<'s>(&mut self, drawings: impl IntoIterator<Item = &'s ShapeModel>, ctx: &RenderContext<'_>) {
        let mut seen = HashSet::new();
        for shape in drawings {
            let Some(id) = shape.id.shape_id() else {
                continue;
            };
            let node = self.nodes.entry(id).or_default();
            node.set_controlled(self.controlled == Some(id));
            let mut model = shape.clone();
            node.refresh(&mut model, ctx);
            seen.insert(id);
        }
        self.nodes.retain(|id, _| seen.contains(id));
    }

    /// Fully redraw one persisted drawing, loading its texture if needed.
    pub async fn draw(&mut self, shape: &ShapeModel, loader: &dyn TextureLoader, ctx: &RenderContext<'_>) {
        let Some(id) = shape.id.shape_id() else {
            return;
        };
        let controlled = self.controlled == Some(id);
        let node = self.nodes.entry(id).or_default();
        node.set_controlled(controlled);
        let mut model = shape.clone();
        node.draw(&mut model, loader, ctx).await;
    }

    /// Render nodes paired with their drawings, back to front.
    pub fn nodes_for<'s>(
        &self,
        drawings: impl IntoIterator<Item = &'s ShapeModel>,
    ) -> Vec<(&'s ShapeModel, &DrawingNode)> {
        drawings
            .into_iter()
            .filter_map(|shape| {
                let id = shape.id.shape_id()?;
                self.nodes.get(&id).map(|node| (shape, node))
            })
            .collect()
    }
}

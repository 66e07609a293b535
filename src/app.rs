use egui::{Color32, Key, Pos2, Sense};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::capture::{CaptureConfig, CaptureOutcome, drag_extents};
use crate::geometry;
use crate::host::{DrawingStore, SquareGrid, TextSheet};
use crate::input::{ActiveTool, InputEvent, InputHandler};
use crate::layer::{DrawingsLayer, LayerHost};
use crate::painter::{CanvasPainter, EguiTextMetrics, EguiTextures, HANDLE_RADIUS, ROTATION_ARM};
use crate::renderer::{DrawingNode, NodeTransform, RenderContext};
use crate::scene::Scene;
use crate::shape::{DrawingDefaults, DrawingId, FillType, ShapeId, ShapeModel, ShapePatch};
use crate::texture::{ImageFileLoader, TextureCache};

/// Text drawing waiting for its content.
#[derive(Debug, Default)]
pub struct TextSheetWindow {
    pending: Option<ShapeModel>,
}

impl TextSheet for TextSheetWindow {
    fn render(&mut self, shape: ShapeModel) {
        self.pending = Some(shape);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragKind {
    Move,
    Resize,
    Rotate,
}

/// A persisted drawing being moved, resized or rotated with the select tool.
#[derive(Debug)]
struct HandleDrag {
    id: ShapeId,
    kind: DragKind,
    /// Detached copy shown while dragging
    shape: ShapeModel,
    node: DrawingNode,
    grab: Pos2,
    start: Pos2,
}

const DEFAULT_USER_COLOR: Color32 = Color32::from_rgb(0x1E, 0x88, 0xE5);

/// We derive Deserialize/Serialize so we can persist app state on shutdown.
#[derive(Serialize, Deserialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct DrawingApp {
    tool: ActiveTool,
    scene: Scene,
    defaults: DrawingDefaults,
    capture_config: CaptureConfig,
    /// Color new drawings are tinted with
    user_color: Color32,
    grid_size: f32,
    show_hidden: bool,
    texture_root: PathBuf,

    #[serde(skip)]
    layer: DrawingsLayer,
    #[serde(skip)]
    input: InputHandler,
    #[serde(skip)]
    textures: TextureCache,
    #[serde(skip)]
    gpu_textures: Option<EguiTextures>,
    #[serde(skip)]
    sheet: TextSheetWindow,
    #[serde(skip)]
    drag: Option<HandleDrag>,
    #[serde(skip)]
    label_buffer: String,
    /// Set when drawings changed and their textures may need loading
    #[serde(skip)]
    textures_dirty: bool,
}

impl Default for DrawingApp {
    fn default() -> Self {
        Self {
            tool: ActiveTool::default(),
            scene: Scene::default(),
            defaults: DrawingDefaults::default().with_user_color(DEFAULT_USER_COLOR),
            capture_config: CaptureConfig::default(),
            user_color: DEFAULT_USER_COLOR,
            grid_size: 50.0,
            show_hidden: true,
            texture_root: PathBuf::from("assets"),
            layer: DrawingsLayer::default(),
            input: InputHandler::new(),
            textures: TextureCache::new(),
            gpu_textures: None,
            sheet: TextSheetWindow::default(),
            drag: None,
            label_buffer: String::new(),
            textures_dirty: true,
        }
    }
}

impl DrawingApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut app: Self = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        app.layer = DrawingsLayer::new(app.capture_config, app.defaults.clone());
        app.gpu_textures = Some(EguiTextures::new(app.texture_root.clone()));
        log::info!("Loaded scene with {} drawings", app.scene.drawings().len());
        app
    }

    fn grid(&self) -> SquareGrid {
        SquareGrid::new(self.grid_size)
    }

    fn set_tool(&mut self, tool: ActiveTool) {
        if tool != self.tool {
            log::info!("Tool selected: {:?}", tool);
            self.tool = tool;
            self.layer.tool_changed(tool);
            self.drag = None;
        }
    }

    fn undo(&mut self) {
        match self.scene.undo() {
            Ok(()) => self.textures_dirty = true,
            Err(err) => log::debug!("{err}"),
        }
    }

    fn redo(&mut self) {
        match self.scene.redo() {
            Ok(()) => self.textures_dirty = true,
            Err(err) => log::debug!("{err}"),
        }
    }

    fn apply_patch(&mut self, id: ShapeId, patch: ShapePatch) {
        match self.layer.update(&mut self.scene, id, patch) {
            Ok(changed) => self.textures_dirty |= changed,
            Err(err) => log::warn!("Failed to update drawing {id}: {err}"),
        }
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &RenderContext<'_>) {
        if self.tool == ActiveTool::Select {
            self.handle_select(event, ctx);
            return;
        }

        let grid = self.grid();
        let mut host = LayerHost { store: &mut self.scene, sheet: &mut self.sheet, grid: &grid };
        let outcome = self.layer.handle_event(event, self.tool, &mut host, ctx);
        if let CaptureOutcome::Committed(_) = outcome {
            self.textures_dirty = true;
        }
    }

    /// Pick a handle of the controlled drawing at `pos`
    fn handle_at(&self, pos: Pos2) -> Option<(ShapeId, DragKind)> {
        let id = self.layer.controlled()?;
        let tree = self.layer.node(id)?.tree()?;
        if !tree.frame.handles_visible {
            return None;
        }
        let transform = &tree.transform;
        let grab = HANDLE_RADIUS + 2.0;
        if transform.apply(tree.frame.scale_handle).distance(pos) <= grab {
            return Some((id, DragKind::Resize));
        }
        let arm = egui::vec2(0.0, -ROTATION_ARM * tree.frame.rotation_handle_scale.y);
        if transform.apply(tree.frame.rotation_handle + arm).distance(pos) <= grab {
            return Some((id, DragKind::Rotate));
        }
        None
    }

    /// Topmost drawing under `pos`
    fn drawing_at(&self, pos: Pos2) -> Option<&ShapeModel> {
        self.scene.sorted().into_iter().rev().find(|shape| {
            let local = NodeTransform::for_shape(shape).invert(pos);
            let rect = egui::Rect::from_two_pos(Pos2::ZERO, Pos2::new(shape.width, shape.height));
            rect.expand(2.0).contains(local)
        })
    }

    fn handle_select(&mut self, event: &InputEvent, ctx: &RenderContext<'_>) {
        let pointer = event.pointer();
        let pos = pointer.position;
        match event {
            InputEvent::PointerDown { button: egui::PointerButton::Primary, .. } => {
                let target = self.handle_at(pos).or_else(|| {
                    self.drawing_at(pos)
                        .and_then(|shape| shape.id.shape_id())
                        .map(|id| (id, DragKind::Move))
                });
                let Some((id, kind)) = target else {
                    self.layer.set_controlled(None);
                    return;
                };
                self.layer.set_controlled(Some(id));
                if let Some(stored) = self.scene.get(id) {
                    self.label_buffer = stored.text.clone();
                    if kind == DragKind::Move && stored.locked {
                        return;
                    }
                    let mut shape = stored.clone();
                    shape.id = DrawingId::Moving;
                    self.drag = Some(HandleDrag {
                        id,
                        kind,
                        start: Pos2::new(shape.x, shape.y),
                        shape,
                        node: DrawingNode::new(),
                        grab: pos,
                    });
                }
            }
            InputEvent::PointerMove { .. } => {
                let grid = self.grid();
                let Some(drag) = self.drag.as_mut() else {
                    return;
                };
                match drag.kind {
                    DragKind::Move => {
                        let delta = pos - drag.grab;
                        drag.shape.x = (drag.start.x + delta.x).round();
                        drag.shape.y = (drag.start.y + delta.y).round();
                    }
                    DragKind::Resize => {
                        let extents = drag_extents(&drag.shape, pos, &grid, !pointer.modifiers.shift);
                        drag.shape.width = extents.x.round();
                        drag.shape.height = extents.y.round();
                    }
                    DragKind::Rotate => {
                        let sign = geometry::sign(drag.shape.height);
                        drag.shape.rotation = geometry::rotation_from_handle(drag.shape.center(), pos, sign);
                    }
                }
                drag.node.refresh(&mut drag.shape, ctx);
            }
            InputEvent::PointerUp { button: egui::PointerButton::Primary, .. } => {
                let Some(drag) = self.drag.take() else {
                    return;
                };
                if drag.grab == pos {
                    return;
                }
                let grid = self.grid();
                let result = match drag.kind {
                    DragKind::Move => {
                        let patch = ShapePatch { x: Some(drag.shape.x), y: Some(drag.shape.y), ..Default::default() };
                        self.layer.update(&mut self.scene, drag.id, patch)
                    }
                    DragKind::Resize => {
                        self.layer
                            .resize(&mut self.scene, &grid, drag.id, pos, !pointer.modifiers.shift)
                    }
                    DragKind::Rotate => self.layer.rotate(&mut self.scene, drag.id, pos),
                };
                if let Err(err) = result {
                    log::warn!("Failed to transform drawing {}: {err}", drag.id);
                }
            }
            _ => {}
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let (undo, redo, delete, escape) = ctx.input(|i| {
            (
                i.modifiers.command && i.key_pressed(Key::Z) && !i.modifiers.shift,
                i.modifiers.command && (i.key_pressed(Key::Y) || (i.modifiers.shift && i.key_pressed(Key::Z))),
                i.key_pressed(Key::Delete),
                i.key_pressed(Key::Escape),
            )
        });
        if ctx.wants_keyboard_input() {
            return;
        }
        if undo {
            self.undo();
        }
        if redo {
            self.redo();
        }
        if escape {
            self.layer.cancel();
            self.drag = None;
        }
        if delete {
            if let Some(id) = self.layer.controlled() {
                if let Err(err) = self.layer.delete(&mut self.scene, id) {
                    log::warn!("Failed to delete drawing {id}: {err}");
                }
            }
        }
    }

    /// Load textures of drawings that changed since the last frame
    fn load_textures(&mut self, ctx: &RenderContext<'_>) {
        if !std::mem::take(&mut self.textures_dirty) {
            return;
        }
        let loader = ImageFileLoader::new(self.texture_root.clone());
        for shape in self.scene.drawings().iter() {
            let missing = shape.uses_texture()
                && shape.texture.as_deref().is_some_and(|source| self.textures.get(source).is_none());
            if missing {
                futures::executor::block_on(self.layer.draw(shape, &loader, ctx));
            }
        }
    }

    fn tools_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("tools_panel")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Drawing Tools");

                for tool in ActiveTool::ALL {
                    if ui.selectable_label(self.tool == tool, tool.label()).clicked() {
                        self.set_tool(tool);
                    }
                }
                ui.separator();

                ui.horizontal(|ui| {
                    if ui.add_enabled(self.scene.can_undo(), egui::Button::new("Undo")).clicked() {
                        self.undo();
                    }
                    if ui.add_enabled(self.scene.can_redo(), egui::Button::new("Redo")).clicked() {
                        self.redo();
                    }
                    if ui.button("Clear all").clicked() {
                        self.layer.set_controlled(None);
                        if let Err(err) = self.scene.clear() {
                            log::warn!("Failed to clear drawings: {err}");
                        }
                    }
                });
                ui.horizontal(|ui| {
                    ui.label("User color");
                    if ui.color_edit_button_srgba(&mut self.user_color).changed() {
                        self.layer.set_user_color(self.user_color);
                        self.defaults = self.layer.defaults().clone();
                    }
                });
                ui.checkbox(&mut self.show_hidden, "Show hidden drawings");
                ui.add(egui::Slider::new(&mut self.grid_size, 10.0..=200.0).text("Grid size"));
                ui.separator();

                if let Some(kind) = self.tool.shape_kind() {
                    ui.heading(format!("{} defaults", kind.name()));
                    let mut data = self.layer.defaults().starting_data(kind);
                    if shape_style_editor(ui, &mut data) {
                        self.layer.update_starting_data(&data);
                        self.defaults = self.layer.defaults().clone();
                    }
                } else if let Some(id) = self.layer.controlled() {
                    self.controlled_editor(ui, id);
                }
            });
    }

    fn controlled_editor(&mut self, ui: &mut egui::Ui, id: ShapeId) {
        let Some(mut data) = self.scene.get(id).cloned() else {
            return;
        };
        ui.heading(format!("{} drawing", data.kind.name()));
        let mut changed = shape_style_editor(ui, &mut data);
        changed |= ui.checkbox(&mut data.hidden, "Hidden").changed();
        changed |= ui.checkbox(&mut data.locked, "Locked").changed();
        ui.horizontal(|ui| {
            changed |= ui.checkbox(&mut data.mirror_x, "Mirror X").changed();
            changed |= ui.checkbox(&mut data.mirror_y, "Mirror Y").changed();
        });
        ui.label("Label");
        let label = ui.text_edit_multiline(&mut self.label_buffer);
        if label.lost_focus() && self.label_buffer != data.text {
            data.text = self.label_buffer.clone();
            changed = true;
        }
        if changed {
            let mut patch = ShapePatch::from_model(&data);
            // Geometry is edited on the canvas, not here
            patch.points = None;
            self.apply_patch(id, patch);
        }
        ui.horizontal(|ui| {
            if ui.button("Use as default").clicked() {
                self.layer.update_starting_data(&data);
                self.defaults = self.layer.defaults().clone();
            }
            if ui.button("Delete").clicked() {
                if let Err(err) = self.layer.delete(&mut self.scene, id) {
                    log::warn!("Failed to delete drawing {id}: {err}");
                }
            }
        });
    }

    fn text_sheet_window(&mut self, ctx: &egui::Context) {
        let Some(mut shape) = self.sheet.pending.take() else {
            return;
        };
        let mut keep_open = true;
        let mut confirmed = false;
        egui::Window::new("Text drawing")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.text_edit_multiline(&mut shape.text);
                ui.add(egui::Slider::new(&mut shape.font_size, 8.0..=128.0).text("Font size"));
                ui.horizontal(|ui| {
                    ui.label("Text color");
                    ui.color_edit_button_srgba(&mut shape.text_color);
                });
                ui.horizontal(|ui| {
                    confirmed = ui.button("Create").clicked();
                    if ui.button("Cancel").clicked() {
                        keep_open = false;
                    }
                });
            });

        if confirmed {
            let metrics = EguiTextMetrics::new(ctx);
            let render_ctx = RenderContext::new(&metrics, &self.textures);
            match self.layer.confirm_text(shape, &mut self.scene, &render_ctx) {
                Ok(Some(id)) => log::debug!("Stored text drawing {id}"),
                Ok(None) => {}
                Err(err) => log::warn!("Failed to store text drawing: {err}"),
            }
        } else if keep_open {
            self.sheet.pending = Some(shape);
        }
    }

    fn central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
            let rect = response.rect;
            self.input.set_canvas_rect(rect);

            let metrics = EguiTextMetrics::new(ctx);
            let textures = self.textures.clone();
            let render_ctx = RenderContext::new(&metrics, &textures).with_show_hidden(self.show_hidden);

            // Text sheet input must not draw on the canvas
            if self.sheet.pending.is_none() {
                for event in self.input.process_input(ctx) {
                    self.handle_event(&event, &render_ctx);
                }
            }
            self.load_textures(&render_ctx);
            self.layer.sync(self.scene.sorted(), &render_ctx);

            let canvas = CanvasPainter::new(&painter, rect.min);
            let Some(gpu_textures) = self.gpu_textures.as_mut() else {
                return;
            };
            let dragged = self.drag.as_ref().map(|drag| drag.id);
            for (shape, node) in self.layer.nodes_for(self.scene.sorted()) {
                if dragged.is_some() && shape.id.shape_id() == dragged {
                    continue;
                }
                if let Some(tree) = node.tree() {
                    canvas.paint(tree, gpu_textures);
                }
            }
            if let Some(tree) = self.drag.as_ref().and_then(|drag| drag.node.tree()) {
                canvas.paint(tree, gpu_textures);
            }
            if let Some(tree) = self.layer.preview().and_then(|(_, node)| node.tree()) {
                canvas.paint(tree, gpu_textures);
            }
        });
    }
}

/// Widgets for the style fields of a drawing; returns whether anything changed
fn shape_style_editor(ui: &mut egui::Ui, data: &mut ShapeModel) -> bool {
    let mut changed = false;
    changed |= ui
        .add(egui::Slider::new(&mut data.stroke_width, 0.0..=32.0).text("Stroke width"))
        .changed();
    ui.horizontal(|ui| {
        ui.label("Stroke");
        changed |= ui.color_edit_button_srgba(&mut data.stroke_color).changed();
        changed |= ui.add(egui::Slider::new(&mut data.stroke_alpha, 0.0..=1.0)).changed();
    });
    egui::ComboBox::from_label("Fill")
        .selected_text(data.fill_type.label())
        .show_ui(ui, |ui| {
            for code in 0..=5 {
                let fill_type = FillType::from_code(code);
                changed |= ui
                    .selectable_value(&mut data.fill_type, fill_type, fill_type.label())
                    .changed();
            }
        });
    if data.uses_fill() {
        ui.horizontal(|ui| {
            ui.label("Fill");
            changed |= ui.color_edit_button_srgba(&mut data.fill_color).changed();
            changed |= ui.add(egui::Slider::new(&mut data.fill_alpha, 0.0..=1.0)).changed();
        });
    }
    if !matches!(data.fill_type, FillType::None | FillType::Solid) {
        let mut texture = data.texture.clone().unwrap_or_default();
        ui.horizontal(|ui| {
            ui.label("Texture");
            if ui.text_edit_singleline(&mut texture).lost_focus() {
                data.texture = (!texture.is_empty()).then_some(texture);
                changed = true;
            }
        });
        changed |= ui
            .add(egui::Slider::new(&mut data.texture_alpha, 0.0..=1.0).text("Texture alpha"))
            .changed();
    }
    if data.kind.is_polygonal() {
        changed |= ui
            .add(egui::Slider::new(&mut data.bezier_factor, 0.0..=1.0).text("Smoothing"))
            .changed();
    }
    changed
}

impl eframe::App for DrawingApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.defaults = self.layer.defaults().clone();
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_shortcuts(ctx);
        self.tools_panel(ctx);
        self.text_sheet_window(ctx);
        self.central_panel(ctx);
    }
}

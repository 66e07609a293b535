use drawing_tools::capture::{CaptureConfig, CaptureOutcome};
use drawing_tools::error::StoreError;
use drawing_tools::host::{DrawingStore, NoGrid, SquareGrid, TextSheet};
use drawing_tools::input::{ActiveTool, InputEvent, PointerEvent};
use drawing_tools::layer::{DrawingsLayer, LayerHost};
use drawing_tools::renderer::{ApproximateTextMetrics, RenderContext};
use drawing_tools::scene::Scene;
use drawing_tools::shape::{DrawingDefaults, ShapeKind, ShapeModel, ShapePatch};
use drawing_tools::texture::TextureCache;
use egui::{PointerButton, Pos2};

#[derive(Default)]
struct RecordingSheet {
    rendered: Vec<ShapeModel>,
}

impl TextSheet for RecordingSheet {
    fn render(&mut self, shape: ShapeModel) {
        self.rendered.push(shape);
    }
}

fn rectangle(x: f32, y: f32, width: f32, height: f32) -> ShapeModel {
    let mut shape = ShapeModel::new(ShapeKind::Rectangle);
    shape.x = x;
    shape.y = y;
    shape.width = width;
    shape.height = height;
    shape
}

fn layer() -> DrawingsLayer {
    DrawingsLayer::new(CaptureConfig::default(), DrawingDefaults::default())
}

#[test]
fn test_create_update_undo_redo() {
    let mut scene = Scene::new();
    let id = scene.create(rectangle(0.0, 0.0, 10.0, 10.0)).unwrap();
    assert!(scene.can_undo());

    let patch = ShapePatch { x: Some(25.0), ..Default::default() };
    scene.update(id, patch).unwrap();
    assert_eq!(scene.get(id).unwrap().x, 25.0);

    scene.undo().unwrap();
    assert_eq!(scene.get(id).unwrap().x, 0.0);
    assert!(scene.can_redo());

    scene.redo().unwrap();
    assert_eq!(scene.get(id).unwrap().x, 25.0);

    // Undoing the creation removes the drawing entirely
    scene.undo().unwrap();
    scene.undo().unwrap();
    assert!(scene.get(id).is_none());
    assert_eq!(scene.undo(), Err(StoreError::NothingToUndo));
}

#[test]
fn test_new_command_clears_redo() {
    let mut scene = Scene::new();
    let id = scene.create(rectangle(0.0, 0.0, 10.0, 10.0)).unwrap();
    scene.update(id, ShapePatch { y: Some(5.0), ..Default::default() }).unwrap();
    scene.undo().unwrap();
    assert!(scene.can_redo());

    scene.update(id, ShapePatch { width: Some(30.0), ..Default::default() }).unwrap();
    assert!(!scene.can_redo());
    assert_eq!(scene.redo(), Err(StoreError::NothingToRedo));
}

#[test]
fn test_delete_and_clear_are_undoable() {
    let mut scene = Scene::new();
    let first = scene.create(rectangle(0.0, 0.0, 10.0, 10.0)).unwrap();
    let second = scene.create(rectangle(20.0, 0.0, 10.0, 10.0)).unwrap();

    scene.delete(first).unwrap();
    assert_eq!(scene.drawings().len(), 1);
    scene.undo().unwrap();
    assert!(scene.get(first).is_some());

    scene.clear().unwrap();
    assert!(scene.drawings().is_empty());
    scene.undo().unwrap();
    assert!(scene.get(first).is_some());
    assert!(scene.get(second).is_some());
}

#[test]
fn test_sorted_back_to_front() {
    let mut scene = Scene::new();
    let mut top = rectangle(0.0, 0.0, 10.0, 10.0);
    top.z = 10;
    let top = scene.create(top).unwrap();
    let bottom = scene.create(rectangle(0.0, 0.0, 10.0, 10.0)).unwrap();
    // Explicit z is kept; the next drawing goes above the highest one
    assert_eq!(scene.get(bottom).unwrap().z, 11);

    let order: Vec<_> = scene.sorted().iter().filter_map(|s| s.id.shape_id()).collect();
    assert_eq!(order, vec![top, bottom]);
}

#[test]
fn test_scene_persists_drawings_not_history() {
    let mut scene = Scene::new();
    let id = scene.create(rectangle(5.0, 5.0, 10.0, 10.0)).unwrap();

    let json = serde_json::to_string(&scene).unwrap();
    let restored: Scene = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.get(id), scene.get(id));
    assert!(!restored.can_undo());
}

#[test]
fn test_layer_update_skips_unchanged_fields() {
    let mut scene = Scene::new();
    let mut layer = layer();
    let id = scene.create(rectangle(0.0, 0.0, 10.0, 10.0)).unwrap();

    let moved = ShapePatch { x: Some(4.0), width: Some(10.0), ..Default::default() };
    assert_eq!(layer.update(&mut scene, id, moved), Ok(true));

    // Nothing new: no history entry, so undo reverts the move
    let same = ShapePatch { x: Some(4.0), width: Some(10.0), ..Default::default() };
    assert_eq!(layer.update(&mut scene, id, same), Ok(false));
    scene.undo().unwrap();
    assert_eq!(scene.get(id).unwrap().x, 0.0);
    assert_eq!(scene.get(id).unwrap().width, 10.0);
}

#[test]
fn test_layer_update_normalizes_polygon_points() {
    let mut scene = Scene::new();
    let mut layer = layer();
    let mut polygon = ShapeModel::new(ShapeKind::Polygon);
    polygon.points = vec![Pos2::ZERO, Pos2::new(10.0, 10.0)];
    polygon.width = 10.0;
    polygon.height = 10.0;
    let id = scene.create(polygon).unwrap();

    // World-space points, as a host editing vertices would send them
    let patch = ShapePatch {
        points: Some(vec![Pos2::new(100.0, 100.0), Pos2::new(80.0, 130.0)]),
        ..Default::default()
    };
    layer.update(&mut scene, id, patch).unwrap();
    let stored = scene.get(id).unwrap();
    assert_eq!(stored.points, vec![Pos2::ZERO, Pos2::new(-20.0, 30.0)]);
    assert_eq!((stored.x, stored.y, stored.width, stored.height), (80.0, 100.0, 20.0, 30.0));
}

#[test]
fn test_unknown_drawing_update_fails() {
    let mut scene = Scene::new();
    let mut layer = layer();
    let id = scene.create(rectangle(0.0, 0.0, 10.0, 10.0)).unwrap();
    layer.delete(&mut scene, id).unwrap();
    let patch = ShapePatch { x: Some(1.0), ..Default::default() };
    assert_eq!(layer.update(&mut scene, id, patch), Err(StoreError::UnknownDrawing(id)));
}

#[test]
fn test_resize_and_rotate() {
    let mut scene = Scene::new();
    let mut layer = layer();
    let id = scene.create(rectangle(0.0, 0.0, 50.0, 50.0)).unwrap();

    let grid = SquareGrid::new(50.0);
    layer.resize(&mut scene, &grid, id, Pos2::new(140.0, 90.0), true).unwrap();
    let stored = scene.get(id).unwrap();
    assert_eq!((stored.width, stored.height), (150.0, 100.0));

    // Pointer straight right of the center points the handle at 90 degrees
    let center = stored.center();
    layer.rotate(&mut scene, id, center + egui::vec2(100.0, 0.0)).unwrap();
    assert_eq!(scene.get(id).unwrap().rotation, 90.0);
}

#[test]
fn test_confirm_text_discards_empty_content() {
    let mut scene = Scene::new();
    let mut layer = layer();
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let mut text = ShapeModel::new(ShapeKind::Text);
    text.text = "   ".to_owned();
    assert_eq!(layer.confirm_text(text.clone(), &mut scene, &ctx), Ok(None));
    assert!(scene.drawings().is_empty());

    text.text = "Here be dragons".to_owned();
    let id = layer.confirm_text(text, &mut scene, &ctx).unwrap().unwrap();
    assert_eq!(scene.get(id).unwrap().text, "Here be dragons");
}

#[test]
fn test_confirmed_text_renders_at_natural_size() {
    let mut scene = Scene::new();
    let mut sheet = RecordingSheet::default();
    let mut layer = layer();
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let down = InputEvent::PointerDown { pointer: PointerEvent::new(Pos2::new(40.0, 60.0), 0.0), button: PointerButton::Primary };
    let up = InputEvent::PointerUp { pointer: PointerEvent::new(Pos2::new(40.0, 60.0), 0.1), button: PointerButton::Primary };
    for event in [down, up] {
        let mut host = LayerHost { store: &mut scene, sheet: &mut sheet, grid: &NoGrid };
        layer.handle_event(&event, ActiveTool::Text, &mut host, &ctx);
    }

    // Placed before any content was typed, so the box is still empty
    let mut shape = sheet.rendered.pop().unwrap();
    assert_eq!((shape.width, shape.height), (0.0, 0.0));
    shape.text = "Here be dragons".to_owned();

    let id = layer.confirm_text(shape, &mut scene, &ctx).unwrap().unwrap();
    let stored = scene.get(id).unwrap();
    assert!(stored.width > 0.0 && stored.height > 0.0);
    assert_eq!((stored.x, stored.y), (40.0, 60.0));

    layer.sync(scene.sorted(), &ctx);
    let text = layer.node(id).and_then(|node| node.tree()).and_then(|tree| tree.text()).unwrap();
    assert!(text.measured.x > 0.0 && text.measured.y > 0.0);
    assert!((text.scaled_size() - text.measured).length() < 0.5);
}

#[test]
fn test_layer_commits_captured_drawings() {
    let mut scene = Scene::new();
    let mut sheet = RecordingSheet::default();
    let mut layer = layer();
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let events = [
        InputEvent::PointerDown { pointer: PointerEvent::new(Pos2::new(10.0, 10.0), 0.0), button: PointerButton::Primary },
        InputEvent::PointerMove { pointer: PointerEvent::new(Pos2::new(60.0, 40.0), 0.1) },
        InputEvent::PointerUp { pointer: PointerEvent::new(Pos2::new(60.0, 40.0), 0.2), button: PointerButton::Primary },
    ];
    for (i, event) in events.iter().enumerate() {
        let mut host = LayerHost { store: &mut scene, sheet: &mut sheet, grid: &NoGrid };
        let outcome = layer.handle_event(event, ActiveTool::Ellipse, &mut host, &ctx);
        if i == 1 {
            // The preview follows the pointer while dragging
            let (preview, node) = layer.preview().unwrap();
            assert_eq!((preview.width, preview.height), (50.0, 30.0));
            assert!(node.is_constructed());
        }
        if i == 2 {
            assert!(matches!(outcome, CaptureOutcome::Committed(_)));
        }
    }
    assert!(layer.preview().is_none());
    let stored: Vec<_> = scene.drawings().iter().collect();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, ShapeKind::Ellipse);
    assert!(sheet.rendered.is_empty());

    // Persisted drawings get their own nodes
    layer.sync(scene.sorted(), &ctx);
    let id = stored[0].id.shape_id().unwrap();
    assert!(layer.node(id).is_some_and(|node| node.is_constructed()));
}

#[test]
fn test_layer_hands_text_to_sheet() {
    let mut scene = Scene::new();
    let mut sheet = RecordingSheet::default();
    let mut layer = layer();
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let down = InputEvent::PointerDown { pointer: PointerEvent::new(Pos2::new(5.0, 5.0), 0.0), button: PointerButton::Primary };
    let up = InputEvent::PointerUp { pointer: PointerEvent::new(Pos2::new(5.0, 5.0), 0.1), button: PointerButton::Primary };
    for event in [down, up] {
        let mut host = LayerHost { store: &mut scene, sheet: &mut sheet, grid: &NoGrid };
        layer.handle_event(&event, ActiveTool::Text, &mut host, &ctx);
    }
    assert!(scene.drawings().is_empty());
    assert_eq!(sheet.rendered.len(), 1);
    assert_eq!(sheet.rendered[0].kind, ShapeKind::Text);
}

#[test]
fn test_tool_change_cancels_other_kind() {
    let mut scene = Scene::new();
    let mut sheet = RecordingSheet::default();
    let mut layer = layer();
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let down = InputEvent::PointerDown { pointer: PointerEvent::new(Pos2::ZERO, 0.0), button: PointerButton::Primary };
    let mut host = LayerHost { store: &mut scene, sheet: &mut sheet, grid: &NoGrid };
    layer.handle_event(&down, ActiveTool::Polygon, &mut host, &ctx);
    assert!(layer.capture().is_active());

    layer.tool_changed(ActiveTool::Polygon);
    assert!(layer.capture().is_active());
    layer.tool_changed(ActiveTool::Select);
    assert!(!layer.capture().is_active());
}

#[test]
fn test_user_color_tints_new_drawings() {
    let mut scene = Scene::new();
    let mut sheet = RecordingSheet::default();
    let mut layer = layer();
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let red = egui::Color32::from_rgb(200, 30, 30);
    layer.set_user_color(red);
    assert_eq!(layer.defaults().get(ShapeKind::Text).fill_color, red);
    assert_ne!(layer.defaults().get(ShapeKind::Text).stroke_color, red);

    let events = [
        InputEvent::PointerDown { pointer: PointerEvent::new(Pos2::new(0.0, 0.0), 0.0), button: PointerButton::Primary },
        InputEvent::PointerMove { pointer: PointerEvent::new(Pos2::new(30.0, 30.0), 0.1) },
        InputEvent::PointerUp { pointer: PointerEvent::new(Pos2::new(30.0, 30.0), 0.2), button: PointerButton::Primary },
    ];
    for event in &events {
        let mut host = LayerHost { store: &mut scene, sheet: &mut sheet, grid: &NoGrid };
        layer.handle_event(event, ActiveTool::Rectangle, &mut host, &ctx);
    }
    let stored = scene.drawings().iter().next().unwrap();
    assert_eq!(stored.stroke_color, red);
    assert_eq!(stored.fill_color, red);
}

use drawing_tools::error::TextureError;
use drawing_tools::renderer::{
    ApproximateTextMetrics, DrawingNode, Mask, PathCommand, RenderContext, RenderTree, ShapeBody,
};
use drawing_tools::shape::{ALPHA_FLOOR, DrawingId, FillType, ShapeId, ShapeKind, ShapeModel};
use drawing_tools::texture::{TextureCache, TextureInfo, TextureLoader};
use egui::{Pos2, Vec2};
use futures::executor::block_on;
use futures::future::BoxFuture;

/// Loader that serves every source at a fixed size, or fails for all of them.
struct FixedLoader {
    size: Option<Vec2>,
}

impl TextureLoader for FixedLoader {
    fn load<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<TextureInfo, TextureError>> {
        Box::pin(async move {
            match self.size {
                Some(size) => Ok(TextureInfo::new(source, size.x, size.y)),
                None => Err(TextureError::NotFound(source.to_owned())),
            }
        })
    }
}

fn assigned(kind: ShapeKind) -> ShapeModel {
    let mut model = ShapeModel::new(kind);
    model.id = DrawingId::Assigned(ShapeId::new());
    model
}

fn curves(tree: &RenderTree) -> Vec<PathCommand> {
    tree.path()
        .unwrap()
        .path
        .commands
        .iter()
        .copied()
        .filter(|c| matches!(c, PathCommand::QuadraticTo { .. } | PathCommand::CubicTo { .. }))
        .collect()
}

#[test]
fn test_closed_polygon_wraps_with_cubic_ends() {
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let mut model = assigned(ShapeKind::Polygon);
    model.bezier_factor = 0.5;
    model.points = vec![
        Pos2::ZERO,
        Pos2::new(100.0, 0.0),
        Pos2::new(100.0, 100.0),
        Pos2::new(0.0, 100.0),
        Pos2::ZERO,
    ];
    model.width = 100.0;
    model.height = 100.0;

    let mut node = DrawingNode::new();
    node.refresh(&mut model, &ctx);
    let curves = curves(node.tree().unwrap());
    assert_eq!(curves.len(), 4);
    assert!(matches!(curves.first(), Some(PathCommand::CubicTo { .. })));
    assert!(matches!(curves.last(), Some(PathCommand::CubicTo { to, .. }) if *to == Pos2::ZERO));
}

#[test]
fn test_open_polygon_has_quadratic_ends() {
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let mut model = assigned(ShapeKind::Freehand);
    model.bezier_factor = 0.5;
    model.points = vec![Pos2::ZERO, Pos2::new(50.0, 20.0), Pos2::new(100.0, 0.0), Pos2::new(150.0, 30.0)];
    model.width = 150.0;
    model.height = 30.0;

    let mut node = DrawingNode::new();
    node.refresh(&mut model, &ctx);
    let curves = curves(node.tree().unwrap());
    assert!(matches!(curves.first(), Some(PathCommand::QuadraticTo { .. })));
    assert!(matches!(curves.last(), Some(PathCommand::QuadraticTo { .. })));
}

#[test]
fn test_preview_polygon_moves_origin_to_bounds() {
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    // World-space points while drawing; the path grows up and to the left
    let mut model = ShapeModel::new(ShapeKind::Polygon);
    model.points = vec![Pos2::new(50.0, 50.0), Pos2::new(20.0, 80.0), Pos2::new(80.0, 10.0)];
    model.x = 50.0;
    model.y = 50.0;

    let mut node = DrawingNode::new();
    node.refresh(&mut model, &ctx);
    assert_eq!((model.x, model.y, model.width, model.height), (20.0, 10.0, 60.0, 70.0));

    let path = node.tree().unwrap().path().unwrap();
    assert_eq!(path.offset, Vec2::new(30.0, 40.0));
    assert_eq!(path.scale, Vec2::splat(1.0));
}

#[test]
fn test_persisted_polygon_stretches_to_extents() {
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let mut model = assigned(ShapeKind::Polygon);
    model.points = vec![Pos2::ZERO, Pos2::new(10.0, 0.0), Pos2::new(10.0, 10.0)];
    model.width = 20.0;
    model.height = 40.0;

    let mut node = DrawingNode::new();
    node.refresh(&mut model, &ctx);
    let path = node.tree().unwrap().path().unwrap();
    assert_eq!(path.scale, Vec2::new(2.0, 4.0));
    assert_eq!((model.width, model.height), (20.0, 40.0));
}

#[test]
fn test_zero_alpha_is_floored() {
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let mut model = assigned(ShapeKind::Rectangle);
    model.width = 40.0;
    model.height = 40.0;
    model.fill_type = FillType::Solid;
    model.stroke_alpha = 0.0;
    model.fill_alpha = 0.0;

    let mut node = DrawingNode::new();
    node.refresh(&mut model, &ctx);
    let path = &node.tree().unwrap().path().unwrap().path;
    assert_eq!(path.line.alpha, ALPHA_FLOOR);
    assert_eq!(path.fill.unwrap().alpha, ALPHA_FLOOR);
}

#[test]
fn test_text_preview_adopts_measured_size() {
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let mut model = ShapeModel::new(ShapeKind::Text);
    model.text = "abcd".to_owned();
    model.font_size = 25.0;
    model.stroke_width = 5.0;

    let mut node = DrawingNode::new();
    node.refresh(&mut model, &ctx);
    assert!((model.width - 65.0).abs() < 1e-3);
    assert!((model.height - 35.0).abs() < 1e-3);

    model.id = DrawingId::Assigned(ShapeId::new());
    model.width *= 2.0;
    node.refresh(&mut model, &ctx);
    let ShapeBody::Text(text) = &node.tree().unwrap().body else {
        panic!("text drawing should render a text body");
    };
    assert!((text.scale - Vec2::new(2.0, 1.0)).length() < 1e-3);
}

#[test]
fn test_failed_texture_draws_without_background() {
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let mut model = assigned(ShapeKind::Ellipse);
    model.width = 60.0;
    model.height = 60.0;
    model.fill_type = FillType::Stretch;
    model.texture = Some("floor.png".to_owned());

    let mut node = DrawingNode::new();
    block_on(node.draw(&mut model, &FixedLoader { size: None }, &ctx));
    let tree = node.tree().unwrap();
    assert!(tree.background.is_none());
    assert!(tree.path().is_some());
    assert!(textures.is_empty());
}

#[test]
fn test_tiled_texture_scales_to_requested_tile_size() {
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let mut model = assigned(ShapeKind::Rectangle);
    model.width = 200.0;
    model.height = 100.0;
    model.fill_type = FillType::Pattern;
    model.texture = Some("stone.png".to_owned());
    model.texture_width = 64.0;
    model.texture_height = 16.0;

    let mut node = DrawingNode::new();
    block_on(node.draw(&mut model, &FixedLoader { size: Some(Vec2::splat(32.0)) }, &ctx));
    let background = node.tree().unwrap().background.clone().unwrap();
    assert!(background.tiled);
    assert_eq!(background.tile_scale, Some(Vec2::new(2.0, 0.5)));
    assert_eq!(background.size, Vec2::new(200.0, 100.0));
    assert!(matches!(background.mask, Mask::Path(_)));
    assert_eq!(textures.get("stone.png"), Some(TextureInfo::new("stone.png", 32.0, 32.0)));
}

#[test]
fn test_stretched_texture_with_negative_extents() {
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    textures.insert(TextureInfo::new("map.png", 100.0, 100.0));
    let ctx = RenderContext::new(&metrics, &textures);

    let mut model = assigned(ShapeKind::Rectangle);
    model.width = -80.0;
    model.height = 40.0;
    model.fill_type = FillType::Stretch;
    model.texture = Some("map.png".to_owned());

    let mut node = DrawingNode::new();
    node.refresh(&mut model, &ctx);
    let background = node.tree().unwrap().background.clone().unwrap();
    assert_eq!(background.min, Pos2::new(-80.0, 0.0));
    assert_eq!(background.size, Vec2::new(80.0, 40.0));
    assert_eq!(background.tile_scale, None);
}

#[test]
fn test_refresh_before_draw_builds_a_tree() {
    let metrics = ApproximateTextMetrics::default();
    let textures = TextureCache::new();
    let ctx = RenderContext::new(&metrics, &textures);

    let mut model = assigned(ShapeKind::Rectangle);
    model.width = 10.0;
    model.height = 10.0;

    let mut node = DrawingNode::new();
    assert!(!node.is_constructed());
    node.refresh(&mut model, &ctx);
    assert!(node.is_constructed());

    node.invalidate();
    node.refresh(&mut model, &ctx);
    assert!(node.is_constructed());
}

#[test]
fn test_mirrored_rotated_drawing_round_trips_points() {
    let mut model = assigned(ShapeKind::Rectangle);
    model.x = 10.0;
    model.y = 20.0;
    model.width = 40.0;
    model.height = 20.0;
    model.rotation = 90.0;
    model.mirror_y = true;

    let transform = drawing_tools::renderer::NodeTransform::for_shape(&model);
    let local = Pos2::new(5.0, 3.0);
    let world = transform.apply(local);
    assert!((transform.invert(world) - local).length() < 1e-3);
    // The center stays put under mirroring and rotation
    assert!((transform.apply(Pos2::new(20.0, 10.0)) - model.center()).length() < 1e-3);
}

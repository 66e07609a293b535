//! Turns a [`ShapeModel`] into a backend-neutral render tree.
//!
//! A [`DrawingNode`] owns the tree of one drawing. `draw` (re)builds it from
//! scratch and may load textures; `refresh` is cheap, synchronous and runs on
//! every model change while the user is drawing.

use egui::{Pos2, Vec2};

mod path;
mod text;

pub use path::{CAP_RADIUS, FillStyle, LineStyle, PathCommand, ShapePath, spline_path};
pub use text::{ApproximateTextMetrics, LABEL_STROKE, TextMetrics, TextNode, TextStyle, label_stroke_thickness};

use crate::geometry::{self, Bounds};
use crate::shape::{DrawingId, ShapeKind, ShapeModel};
use crate::texture::{TextureCache, TextureInfo, TextureLoader};

/// Alpha of a hidden drawing as seen by the users allowed to see it.
pub const HIDDEN_ALPHA: f32 = 0.5;

/// Placement of a drawing's local space in the world.
///
/// Local coordinates run from `(0, 0)` to `(width, height)`. Mirroring flips
/// around the local center before the rotation is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub position: Pos2,
    pub pivot: Vec2,
    /// Radians
    pub rotation: f32,
    pub scale: Vec2,
}

impl NodeTransform {
    pub fn for_shape(model: &ShapeModel) -> Self {
        let pivot = Vec2::new(model.width / 2.0, model.height / 2.0);
        Self {
            position: Pos2::new(model.x, model.y) + pivot,
            pivot,
            rotation: model.rotation_radians(),
            scale: Vec2::new(
                if model.mirror_x { -1.0 } else { 1.0 },
                if model.mirror_y { -1.0 } else { 1.0 },
            ),
        }
    }

    /// Map a point from local space to world space.
    pub fn apply(&self, local: Pos2) -> Pos2 {
        let pivot = self.pivot.to_pos2();
        let mirrored = pivot + (local - pivot) * self.scale;
        geometry::rotate_around_point(mirrored, pivot, self.rotation) + (self.position - pivot)
    }

    /// Map a world point back into local space.
    pub fn invert(&self, world: Pos2) -> Pos2 {
        let pivot = self.pivot.to_pos2();
        let unrotated = geometry::rotate_around_point(world - (self.position - pivot), pivot, -self.rotation);
        pivot + (unrotated - pivot) * self.scale
    }
}

/// A path placed inside a drawing's local space.
#[derive(Debug, Clone, PartialEq)]
pub struct PathNode {
    pub path: ShapePath,
    pub offset: Vec2,
    pub scale: Vec2,
}

impl PathNode {
    fn unscaled(path: ShapePath) -> Self {
        Self { path, offset: Vec2::ZERO, scale: Vec2::splat(1.0) }
    }

    /// Map a point of the path into the drawing's local space.
    pub fn to_local(&self, point: Pos2) -> Pos2 {
        Pos2::new(
            self.offset.x + point.x * self.scale.x,
            self.offset.y + point.y * self.scale.y,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeBody {
    Path(PathNode),
    Text(TextNode),
}

/// Silhouette that restricts a background texture to the shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Mask {
    Path(PathNode),
    Text(TextNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundLayer {
    pub texture: TextureInfo,
    pub alpha: f32,
    pub tiled: bool,
    pub min: Pos2,
    pub size: Vec2,
    /// Scale of one tile relative to the texture's natural size
    pub tile_scale: Option<Vec2>,
    pub mask: Mask,
}

/// Selection frame with its scale and rotation handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub size: Vec2,
    pub visible: bool,
    pub handles_visible: bool,
    pub scale_handle: Pos2,
    pub rotation_handle: Pos2,
    pub rotation_handle_scale: Vec2,
}

impl Frame {
    pub fn hidden() -> Self {
        Self {
            size: Vec2::ZERO,
            visible: false,
            handles_visible: false,
            scale_handle: Pos2::ZERO,
            rotation_handle: Pos2::ZERO,
            rotation_handle_scale: Vec2::splat(1.0),
        }
    }
}

/// Everything needed to draw one drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    pub transform: NodeTransform,
    pub alpha: f32,
    pub visible: bool,
    pub background: Option<BackgroundLayer>,
    pub body: ShapeBody,
    pub label: Option<TextNode>,
    pub frame: Frame,
}

impl RenderTree {
    pub fn path(&self) -> Option<&PathNode> {
        match &self.body {
            ShapeBody::Path(node) => Some(node),
            ShapeBody::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&TextNode> {
        match &self.body {
            ShapeBody::Text(node) => Some(node),
            ShapeBody::Path(_) => None,
        }
    }
}

/// Per-frame inputs to [`DrawingNode::refresh`].
pub struct RenderContext<'a> {
    pub metrics: &'a dyn TextMetrics,
    pub textures: &'a TextureCache,
    /// Whether the viewer may see hidden drawings
    pub show_hidden: bool,
}

impl<'a> RenderContext<'a> {
    pub fn new(metrics: &'a dyn TextMetrics, textures: &'a TextureCache) -> Self {
        Self { metrics, textures, show_hidden: false }
    }

    pub fn with_show_hidden(mut self, show_hidden: bool) -> Self {
        self.show_hidden = show_hidden;
        self
    }
}

/// Render state of one drawing.
#[derive(Debug, Default)]
pub struct DrawingNode {
    tree: Option<RenderTree>,
    texture: Option<TextureInfo>,
    controlled: bool,
}

impl DrawingNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> Option<&RenderTree> {
        self.tree.as_ref()
    }

    pub fn is_constructed(&self) -> bool {
        self.tree.is_some()
    }

    pub fn controlled(&self) -> bool {
        self.controlled
    }

    pub fn set_controlled(&mut self, controlled: bool) {
        self.controlled = controlled;
    }

    /// Drop the tree; the next `refresh` rebuilds it.
    pub fn invalidate(&mut self) {
        self.tree = None;
    }

    /// Rebuild the node from scratch, loading the background texture if needed.
    ///
    /// A texture that fails to load is logged and the drawing renders without
    /// a background.
    pub async fn draw(&mut self, model: &mut ShapeModel, loader: &dyn TextureLoader, ctx: &RenderContext<'_>) {
        self.tree = None;
        let mut texture = None;
        if let Some(source) = model.texture.clone().filter(|_| model.uses_texture()) {
            match ctx.textures.load(loader, &source).await {
                Ok(loaded) => texture = Some(loaded),
                Err(err) => log::warn!("Drawing texture {source} unavailable, rendering without background: {err}"),
            }
        }
        self.construct(texture);
        self.refresh(model, ctx);
    }

    /// Recompute the render tree from the current model.
    ///
    /// Safe to call before [`DrawingNode::draw`]: a missing tree is built on
    /// the spot using only textures already in the cache. Preview drawings have
    /// their extents (and polygon origin) written back into `model`.
    pub fn refresh(&mut self, model: &mut ShapeModel, ctx: &RenderContext<'_>) {
        if self.tree.is_none() || self.texture_changed(model) {
            let texture = model
                .texture
                .as_deref()
                .filter(|_| model.uses_texture())
                .and_then(|source| ctx.textures.get(source));
            self.construct(texture);
        }
        let tree = self.build(model, ctx);
        self.tree = Some(tree);
    }

    fn construct(&mut self, texture: Option<TextureInfo>) {
        self.texture = texture;
        self.tree = Some(RenderTree {
            transform: NodeTransform {
                position: Pos2::ZERO,
                pivot: Vec2::ZERO,
                rotation: 0.0,
                scale: Vec2::splat(1.0),
            },
            alpha: 1.0,
            visible: true,
            background: None,
            body: ShapeBody::Path(PathNode::unscaled(ShapePath {
                commands: Vec::new(),
                line: LineStyle { width: 0.0, color: egui::Color32::TRANSPARENT, alpha: 1.0, alignment: 1.0 },
                fill: None,
            })),
            label: None,
            frame: Frame::hidden(),
        });
    }

    fn texture_changed(&self, model: &ShapeModel) -> bool {
        let wanted = model.texture.as_deref().filter(|_| model.uses_texture());
        let loaded = self.texture.as_ref().map(|t| t.source.as_str());
        wanted != loaded
    }

    fn build(&self, model: &mut ShapeModel, ctx: &RenderContext<'_>) -> RenderTree {
        let body = match model.kind {
            ShapeKind::Rectangle => ShapeBody::Path(PathNode::unscaled(rectangle_path(model))),
            ShapeKind::Ellipse => ShapeBody::Path(PathNode::unscaled(ellipse_path(model))),
            ShapeKind::Polygon | ShapeKind::Freehand => ShapeBody::Path(polygon_node(model)),
            ShapeKind::Text => ShapeBody::Text(text_node(model, ctx.metrics)),
        };
        let label = (model.kind != ShapeKind::Text && !model.text.is_empty())
            .then(|| label_node(model, ctx.metrics));
        let background = self
            .texture
            .as_ref()
            .filter(|_| model.uses_texture())
            .map(|texture| background_layer(model, texture, &body));

        let frame_visible = self.controlled && (model.id.shape_id().is_some() || model.kind == ShapeKind::Text);
        RenderTree {
            transform: NodeTransform::for_shape(model),
            alpha: if model.hidden { HIDDEN_ALPHA } else { 1.0 },
            visible: !model.hidden || ctx.show_hidden,
            background,
            body,
            label,
            frame: Frame {
                size: Vec2::new(model.width, model.height),
                visible: frame_visible,
                handles_visible: frame_visible && !model.locked,
                scale_handle: Pos2::new(model.width, model.height),
                rotation_handle: Pos2::new(model.width / 2.0, 0.0),
                rotation_handle_scale: Vec2::new(geometry::sign(model.width), geometry::sign(model.height)),
            },
        }
    }
}

fn line_style(model: &ShapeModel) -> LineStyle {
    LineStyle {
        width: model.stroke_width,
        color: model.stroke_color,
        alpha: model.effective_stroke_alpha(),
        alignment: model.alignment(),
    }
}

fn fill_style(model: &ShapeModel) -> Option<FillStyle> {
    model
        .uses_fill()
        .then(|| FillStyle { color: model.fill_color, alpha: model.effective_fill_alpha() })
}

fn rectangle_path(model: &ShapeModel) -> ShapePath {
    let inset = model.stroke_width * model.alignment();
    ShapePath {
        commands: vec![PathCommand::Rectangle {
            min: Pos2::new(inset, inset),
            size: Vec2::new(model.width - 2.0 * inset, model.height - 2.0 * inset),
        }],
        line: line_style(model),
        fill: fill_style(model),
    }
}

fn ellipse_path(model: &ShapeModel) -> ShapePath {
    let inset = model.stroke_width * model.alignment();
    let half = Vec2::new(model.width / 2.0, model.height / 2.0);
    ShapePath {
        commands: vec![PathCommand::Ellipse {
            center: half.to_pos2(),
            radii: Vec2::new((half.x.abs() - inset).max(0.0), (half.y.abs() - inset).max(0.0)),
        }],
        line: line_style(model),
        fill: fill_style(model),
    }
}

/// Scale that stretches content of size `measured` over the model's extents.
///
/// A preview drawing takes its extents from the content instead, so the
/// content stays at natural size. A collapsed box renders at natural size too.
fn fit_scale(model: &mut ShapeModel, measured: Vec2) -> Vec2 {
    if model.id.is_preview() {
        model.width = measured.x;
        model.height = measured.y;
        return Vec2::splat(1.0);
    }
    if measured.x > 0.0 && measured.y > 0.0 && model.width != 0.0 && model.height != 0.0 {
        Vec2::new(model.width / measured.x, model.height / measured.y)
    } else {
        Vec2::splat(1.0)
    }
}

fn polygon_node(model: &mut ShapeModel) -> PathNode {
    let path = ShapePath {
        commands: spline_path(&model.points, model.bezier_factor),
        line: line_style(model),
        fill: fill_style(model),
    };
    let Some(origin) = model.points.first().copied() else {
        return PathNode::unscaled(path);
    };

    let relative: Vec<Pos2> = model.points.iter().map(|p| (*p - origin).to_pos2()).collect();
    let bounds: Bounds = geometry::bounding_box(&relative);
    let scale = fit_scale(model, bounds.size());
    if model.id.is_preview() {
        // Drawing toward negative coordinates moves the shape's origin.
        model.x = origin.x + bounds.x;
        model.y = origin.y + bounds.y;
    }
    PathNode {
        path,
        offset: Vec2::new(-bounds.x * scale.x, -bounds.y * scale.y),
        scale,
    }
}

fn text_node(model: &mut ShapeModel, metrics: &dyn TextMetrics) -> TextNode {
    let style = TextStyle {
        fill: model.text_color,
        stroke: model.stroke_color,
        stroke_thickness: model.stroke_width,
        ..TextStyle::new(model.font_family.clone(), model.font_size)
    };
    let measured = metrics.measure(&model.text, &style);
    let scale = fit_scale(model, measured);
    TextNode {
        text: model.text.clone(),
        style,
        alpha: model.text_alpha,
        measured,
        offset: Vec2::ZERO,
        scale,
    }
}

fn label_node(model: &ShapeModel, metrics: &dyn TextMetrics) -> TextNode {
    let style = TextStyle::label(model.font_family.clone(), model.font_size, model.text_color, model.width);
    let measured = metrics.measure(&model.text, &style);
    TextNode {
        text: model.text.clone(),
        style,
        alpha: model.text_alpha,
        measured,
        offset: Vec2::new(model.width / 2.0 - measured.x / 2.0, model.height / 2.0 - measured.y / 2.0),
        scale: Vec2::splat(1.0),
    }
}

fn background_layer(model: &ShapeModel, texture: &TextureInfo, body: &ShapeBody) -> BackgroundLayer {
    let tiled = model.is_tiled();
    let (min, size) = if tiled {
        (Pos2::ZERO, Vec2::new(model.width, model.height))
    } else {
        // Stretched sprites cannot have a negative size; move their origin instead.
        (
            Pos2::new(model.width.min(0.0), model.height.min(0.0)),
            Vec2::new(model.width.abs(), model.height.abs()),
        )
    };
    let tile_scale = (tiled
        && model.texture_width > 0.0
        && model.texture_height > 0.0
        && texture.width > 0.0
        && texture.height > 0.0)
        .then(|| Vec2::new(model.texture_width / texture.width, model.texture_height / texture.height));
    let mask = match body {
        ShapeBody::Path(node) => Mask::Path(PathNode {
            path: node.path.opaque(),
            offset: node.offset,
            scale: node.scale,
        }),
        ShapeBody::Text(node) => Mask::Text(node.opaque()),
    };
    BackgroundLayer {
        texture: texture.clone(),
        alpha: model.texture_alpha,
        tiled,
        min,
        size,
        tile_scale,
        mask,
    }
}

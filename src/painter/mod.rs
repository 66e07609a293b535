//! Draws render trees with egui.

use egui::epaint::{PathShape, TextShape, Vertex};
use egui::{Color32, Context, FontFamily, FontId, Mesh, Painter, Pos2, Shape, Stroke, Vec2};
use std::f32::consts::TAU;

mod textures;

pub use textures::EguiTextures;

use crate::renderer::{
    BackgroundLayer, Frame, Mask, NodeTransform, PathCommand, PathNode, RenderTree, ShapeBody, TextMetrics,
    TextNode, TextStyle,
};

/// Segments used to approximate one curve
const CURVE_SEGMENTS: usize = 16;
const ELLIPSE_SEGMENTS: usize = 48;

const FRAME_COLOR: Color32 = Color32::BLACK;
const HANDLE_FILL: Color32 = Color32::from_rgb(0xFF, 0x98, 0x29);
pub const HANDLE_RADIUS: f32 = 6.0;
/// Distance of the rotation knob from the top edge of the frame
pub const ROTATION_ARM: f32 = 20.0;

/// Measures text with egui's font system.
pub struct EguiTextMetrics {
    ctx: Context,
}

impl EguiTextMetrics {
    pub fn new(ctx: &Context) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl TextMetrics for EguiTextMetrics {
    fn measure(&self, text: &str, style: &TextStyle) -> Vec2 {
        if text.is_empty() {
            return Vec2::ZERO;
        }
        let font = FontId::new(style.font_size, font_family(&style.font_family));
        let wrap = style.word_wrap_width.filter(|w| *w > 0.0).unwrap_or(f32::INFINITY);
        self.ctx
            .fonts(|fonts| fonts.layout(text.to_owned(), font, style.fill, wrap).size())
    }
}

/// The egui family closest to a drawing's font family name.
///
/// egui only ships its built-in families, so named fonts such as "Arial" fall
/// back to the proportional one.
pub fn font_family(name: &str) -> FontFamily {
    let name = name.trim();
    if name.eq_ignore_ascii_case("monospace") || name.eq_ignore_ascii_case("mono") {
        FontFamily::Monospace
    } else {
        FontFamily::Proportional
    }
}

/// One polyline of a flattened path
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<Pos2>,
    pub closed: bool,
}

/// A path reduced to straight segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatPath {
    pub polylines: Vec<Polyline>,
    /// Centers of the round caps
    pub dots: Vec<Pos2>,
}

/// Approximate `commands` with polylines.
pub fn flatten(commands: &[PathCommand]) -> FlatPath {
    let mut flat = FlatPath::default();
    let mut current: Vec<Pos2> = Vec::new();
    let mut cursor = Pos2::ZERO;

    let finish = |current: &mut Vec<Pos2>, flat: &mut FlatPath| {
        if current.len() > 1 {
            flat.polylines.push(Polyline { points: std::mem::take(current), closed: false });
        } else {
            current.clear();
        }
    };

    for command in commands {
        match *command {
            PathCommand::MoveTo(to) => {
                finish(&mut current, &mut flat);
                current.push(to);
                cursor = to;
            }
            PathCommand::LineTo(to) => {
                if current.is_empty() {
                    current.push(cursor);
                }
                current.push(to);
                cursor = to;
            }
            PathCommand::QuadraticTo { control, to } => {
                if current.is_empty() {
                    current.push(cursor);
                }
                let from = cursor;
                for step in 1..=CURVE_SEGMENTS {
                    let t = step as f32 / CURVE_SEGMENTS as f32;
                    let u = 1.0 - t;
                    current.push(lerp3(from, control, to, u * u, 2.0 * u * t, t * t));
                }
                cursor = to;
            }
            PathCommand::CubicTo { control1, control2, to } => {
                if current.is_empty() {
                    current.push(cursor);
                }
                let from = cursor;
                for step in 1..=CURVE_SEGMENTS {
                    let t = step as f32 / CURVE_SEGMENTS as f32;
                    let u = 1.0 - t;
                    let a = lerp3(from, control1, control2, u * u * u, 3.0 * u * u * t, 3.0 * u * t * t);
                    current.push(a + to.to_vec2() * (t * t * t));
                }
                cursor = to;
            }
            PathCommand::Arc { center, radius, start_angle, end_angle } => {
                if radius < 1.0 {
                    // Near-zero arcs only exist to get a round cap from the stroke
                    flat.dots.push(center);
                    continue;
                }
                finish(&mut current, &mut flat);
                for step in 0..=CURVE_SEGMENTS {
                    let angle = start_angle + (end_angle - start_angle) * step as f32 / CURVE_SEGMENTS as f32;
                    current.push(center + Vec2::angled(angle) * radius);
                }
                cursor = current.last().copied().unwrap_or(center);
            }
            PathCommand::Rectangle { min, size } => {
                finish(&mut current, &mut flat);
                flat.polylines.push(Polyline {
                    points: vec![
                        min,
                        min + Vec2::new(size.x, 0.0),
                        min + size,
                        min + Vec2::new(0.0, size.y),
                    ],
                    closed: true,
                });
            }
            PathCommand::Ellipse { center, radii } => {
                finish(&mut current, &mut flat);
                let points = (0..ELLIPSE_SEGMENTS)
                    .map(|i| {
                        let angle = TAU * i as f32 / ELLIPSE_SEGMENTS as f32;
                        center + Vec2::new(angle.cos() * radii.x, angle.sin() * radii.y)
                    })
                    .collect();
                flat.polylines.push(Polyline { points, closed: true });
            }
        }
    }
    finish(&mut current, &mut flat);
    flat
}

fn lerp3(a: Pos2, b: Pos2, c: Pos2, wa: f32, wb: f32, wc: f32) -> Pos2 {
    Pos2::new(
        a.x * wa + b.x * wb + c.x * wc,
        a.y * wa + b.y * wb + c.y * wc,
    )
}

/// Paints render trees onto an egui canvas.
pub struct CanvasPainter<'a> {
    painter: &'a Painter,
    /// Screen position of the canvas origin
    origin: Vec2,
}

impl<'a> CanvasPainter<'a> {
    pub fn new(painter: &'a Painter, origin: Pos2) -> Self {
        Self { painter, origin: origin.to_vec2() }
    }

    fn to_screen(&self, transform: &NodeTransform, local: Pos2) -> Pos2 {
        transform.apply(local) + self.origin
    }

    pub fn paint(&self, tree: &RenderTree, textures: &mut EguiTextures) {
        if !tree.visible {
            return;
        }
        if let Some(background) = &tree.background {
            self.paint_background(tree, background, textures);
        }
        match &tree.body {
            ShapeBody::Path(node) => self.paint_path(&tree.transform, node, tree.alpha),
            ShapeBody::Text(node) => self.paint_text(&tree.transform, node, tree.alpha),
        }
        if let Some(label) = &tree.label {
            self.paint_text(&tree.transform, label, tree.alpha);
        }
        self.paint_frame(&tree.transform, &tree.frame);
    }

    fn paint_path(&self, transform: &NodeTransform, node: &PathNode, alpha: f32) {
        let flat = flatten(&node.path.commands);
        let map = |p: Pos2| self.to_screen(transform, node.to_local(p));

        if let Some(fill) = node.path.fill {
            let color = fill.color.gamma_multiply(fill.alpha * alpha);
            for polyline in flat.polylines.iter().filter(|p| p.points.len() > 2) {
                let points = polyline.points.iter().map(|p| map(*p)).collect();
                self.painter
                    .add(Shape::Path(PathShape::convex_polygon(points, color, Stroke::NONE)));
            }
        }

        let line = node.path.line;
        if line.width <= 0.0 {
            return;
        }
        let stroke = Stroke::new(line.width, line.color.gamma_multiply(line.alpha * alpha));
        for polyline in &flat.polylines {
            let points: Vec<Pos2> = polyline.points.iter().map(|p| map(*p)).collect();
            let shape = if polyline.closed {
                PathShape::closed_line(points, stroke)
            } else {
                PathShape::line(points, stroke)
            };
            self.painter.add(Shape::Path(shape));
        }
        for dot in &flat.dots {
            self.painter.circle_filled(map(*dot), line.width / 2.0, stroke.color);
        }
    }

    fn paint_text(&self, transform: &NodeTransform, node: &TextNode, alpha: f32) {
        if node.text.is_empty() {
            return;
        }
        // TextShape only scales uniformly: the font follows the vertical
        // stretch and a horizontal stretch is not applied.
        let scale = node.scale.y.abs().max(0.01);
        let font = FontId::new(node.style.font_size * scale, font_family(&node.style.font_family));
        let wrap = node.style.word_wrap_width.filter(|w| *w > 0.0).unwrap_or(f32::INFINITY);
        let color = node.style.fill.gamma_multiply(node.alpha * alpha);
        let pos = self.to_screen(transform, node.offset.to_pos2());

        if node.style.stroke_thickness > 0.0 {
            // egui has no text outline; a shadow keeps the text readable
            let shadow = node.style.stroke.gamma_multiply(node.alpha * alpha);
            let galley = self.painter.layout(node.text.clone(), font.clone(), shadow, wrap);
            let offset = Vec2::splat(node.style.stroke_thickness.min(3.0));
            self.painter
                .add(TextShape::new(pos + offset, galley, shadow).with_angle(transform.rotation));
        }
        let galley = self.painter.layout(node.text.clone(), font, color, wrap);
        self.painter.add(TextShape::new(pos, galley, color).with_angle(transform.rotation));
    }

    fn paint_background(&self, tree: &RenderTree, background: &BackgroundLayer, textures: &mut EguiTextures) {
        let Some(texture_id) = textures.get(self.painter.ctx(), &background.texture.source) else {
            return;
        };
        let transform = &tree.transform;
        let tile = if background.tiled {
            let natural = Vec2::new(background.texture.width, background.texture.height);
            background.tile_scale.map_or(natural, |scale| natural * scale)
        } else {
            background.size
        };
        if tile.x == 0.0 || tile.y == 0.0 {
            return;
        }
        let uv = |local: Pos2| ((local - background.min) / tile).to_pos2();
        let color = Color32::WHITE.gamma_multiply(background.alpha * tree.alpha);

        // Texture limited to the mask silhouette; outlines are fan-triangulated
        let outlines: Vec<Vec<Pos2>> = match &background.mask {
            Mask::Path(node) => flatten(&node.path.commands)
                .polylines
                .into_iter()
                .filter(|p| p.points.len() > 2)
                .map(|p| p.points.into_iter().map(|point| node.to_local(point)).collect())
                .collect(),
            Mask::Text(node) => {
                let min = node.offset.to_pos2();
                let size = node.scaled_size();
                vec![vec![min, min + Vec2::new(size.x, 0.0), min + size, min + Vec2::new(0.0, size.y)]]
            }
        };

        for outline in outlines {
            let mut mesh = Mesh::with_texture(texture_id);
            let count = outline.len() as f32;
            let centroid = outline.iter().fold(Vec2::ZERO, |acc, p| acc + p.to_vec2()) / count;
            let center = centroid.to_pos2();
            mesh.vertices.push(Vertex { pos: self.to_screen(transform, center), uv: uv(center), color });
            for local in &outline {
                mesh.vertices.push(Vertex { pos: self.to_screen(transform, *local), uv: uv(*local), color });
            }
            let n = outline.len() as u32;
            for i in 0..n {
                mesh.add_triangle(0, 1 + i, 1 + (i + 1) % n);
            }
            self.painter.add(Shape::mesh(mesh));
        }
    }

    fn paint_frame(&self, transform: &NodeTransform, frame: &Frame) {
        if !frame.visible {
            return;
        }
        let stroke = Stroke::new(2.0, FRAME_COLOR);
        let corners = [
            Pos2::ZERO,
            Pos2::new(frame.size.x, 0.0),
            frame.size.to_pos2(),
            Pos2::new(0.0, frame.size.y),
        ];
        let points = corners.iter().map(|c| self.to_screen(transform, *c)).collect();
        self.painter.add(Shape::Path(PathShape::closed_line(points, stroke)));

        if !frame.handles_visible {
            return;
        }
        let scale_handle = self.to_screen(transform, frame.scale_handle);
        self.painter.circle(scale_handle, HANDLE_RADIUS, HANDLE_FILL, stroke);

        let base = frame.rotation_handle;
        let knob = base + Vec2::new(0.0, -ROTATION_ARM * frame.rotation_handle_scale.y);
        let (base, knob) = (self.to_screen(transform, base), self.to_screen(transform, knob));
        self.painter.line_segment([base, knob], Stroke::new(4.0, FRAME_COLOR));
        self.painter.circle(knob, HANDLE_RADIUS, HANDLE_FILL, stroke);
    }
}

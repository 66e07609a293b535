use egui::{Color32, Pos2};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::geometry::{self, Bounds};

mod defaults;
pub use defaults::DrawingDefaults;

/// Alpha handed to the backend in place of an exact zero.
///
/// Backends that treat alpha 0 as "skip this draw" would also skip the
/// silhouette that texture masks rely on.
pub const ALPHA_FLOOR: f32 = 0.0001;

/// Stroke alignment for shapes whose outline sits outside their boundary.
pub const OUTER_ALIGNMENT: f32 = 1.0;
/// Stroke alignment for polygons and freehand strokes.
pub const CENTERED_ALIGNMENT: f32 = 0.5;

/// Identifier assigned by the store when a drawing is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(Uuid);

impl ShapeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShapeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a drawing is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrawingId {
    /// Still being drawn by the local capture session
    #[default]
    Preview,
    /// A persisted drawing being dragged around as a detached copy
    Moving,
    Assigned(ShapeId),
}

impl DrawingId {
    pub fn is_preview(&self) -> bool {
        matches!(self, Self::Preview)
    }

    pub fn shape_id(&self) -> Option<ShapeId> {
        match self {
            Self::Assigned(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Polygon,
    Freehand,
    Text,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 5] = [
        ShapeKind::Rectangle,
        ShapeKind::Ellipse,
        ShapeKind::Polygon,
        ShapeKind::Freehand,
        ShapeKind::Text,
    ];

    /// Polygon and freehand shapes are described by their point list.
    pub fn is_polygonal(&self) -> bool {
        matches!(self, Self::Polygon | Self::Freehand)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rectangle => "Rectangle",
            Self::Ellipse => "Ellipse",
            Self::Polygon => "Polygon",
            Self::Freehand => "Freehand",
            Self::Text => "Text",
        }
    }
}

/// How the interior of a shape is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillType {
    #[default]
    None,
    Solid,
    /// Texture repeated across the shape
    Pattern,
    /// Texture stretched once over the shape
    Stretch,
    /// Repeated texture, interior left unfilled
    Contour,
    /// Stretched texture, interior left unfilled
    Frame,
}

impl FillType {
    /// Decode the numeric codes used by stored scenes; unknown codes mean no fill.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Solid,
            2 => Self::Pattern,
            3 => Self::Stretch,
            4 => Self::Contour,
            5 => Self::Frame,
            _ => Self::None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Solid => 1,
            Self::Pattern => 2,
            Self::Stretch => 3,
            Self::Contour => 4,
            Self::Frame => 5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Solid => "Solid Color",
            Self::Pattern => "Tiled Pattern",
            Self::Stretch => "Stretched Texture",
            Self::Contour => "Tiled Contour",
            Self::Frame => "Stretched Contour",
        }
    }
}

/// In-memory record of one drawing's geometry and style.
///
/// `width`/`height` are signed: a negative extent means the shape grows
/// left/up from `(x, y)`. For polygon and freehand shapes the extents are
/// derived from `points` and must be recomputed whenever the points change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShapeModel {
    pub id: DrawingId,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Degrees, clockwise, around the shape's own center
    pub rotation: f32,
    pub z: i32,
    pub points: Vec<Pos2>,
    pub bezier_factor: f32,

    pub stroke_width: f32,
    pub stroke_color: Color32,
    pub stroke_alpha: f32,
    pub fill_type: FillType,
    pub fill_color: Color32,
    pub fill_alpha: f32,

    pub texture: Option<String>,
    pub texture_width: f32,
    pub texture_height: f32,
    pub texture_alpha: f32,

    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    pub text_color: Color32,
    pub text_alpha: f32,

    pub hidden: bool,
    pub locked: bool,
    pub mirror_x: bool,
    pub mirror_y: bool,
}

impl Default for ShapeModel {
    fn default() -> Self {
        Self::new(ShapeKind::Rectangle)
    }
}

impl ShapeModel {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            id: DrawingId::Preview,
            kind,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            z: 0,
            points: Vec::new(),
            bezier_factor: 0.0,
            stroke_width: 5.0,
            stroke_color: Color32::BLACK,
            stroke_alpha: 1.0,
            fill_type: FillType::None,
            fill_color: Color32::WHITE,
            fill_alpha: 1.0,
            texture: None,
            texture_width: 0.0,
            texture_height: 0.0,
            texture_alpha: 1.0,
            text: String::new(),
            font_family: "Arial".to_owned(),
            font_size: 25.0,
            text_color: Color32::WHITE,
            text_alpha: 1.0,
            hidden: false,
            locked: false,
            mirror_x: false,
            mirror_y: false,
        }
    }

    pub fn uses_fill(&self) -> bool {
        matches!(self.fill_type, FillType::Solid | FillType::Pattern | FillType::Stretch)
    }

    pub fn uses_texture(&self) -> bool {
        let textured = matches!(
            self.fill_type,
            FillType::Pattern | FillType::Stretch | FillType::Contour | FillType::Frame
        );
        textured && self.texture.as_deref().is_some_and(|t| !t.is_empty()) && self.texture_alpha > 0.0
    }

    pub fn is_tiled(&self) -> bool {
        matches!(self.fill_type, FillType::Pattern | FillType::Contour)
    }

    pub fn effective_fill_alpha(&self) -> f32 {
        floor_alpha(self.fill_alpha)
    }

    pub fn effective_stroke_alpha(&self) -> f32 {
        floor_alpha(self.stroke_alpha)
    }

    pub fn alignment(&self) -> f32 {
        if self.kind.is_polygonal() {
            CENTERED_ALIGNMENT
        } else {
            OUTER_ALIGNMENT
        }
    }

    pub fn rotation_radians(&self) -> f32 {
        self.rotation.to_radians()
    }

    /// Center of the shape in world space (the rotation pivot).
    pub fn center(&self) -> Pos2 {
        Pos2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    /// Replace the extents of a polygonal shape from its world-space points.
    ///
    /// Points become relative to the first point and `x`/`y`/`width`/`height`
    /// describe the box they occupy.
    pub fn normalize_points(&mut self) {
        if !self.kind.is_polygonal() {
            return;
        }
        let Some(first) = self.points.first().copied() else {
            return;
        };
        let normalized = geometry::normalize_points(first.x, first.y, &self.points);
        self.points = normalized.points;
        self.x = normalized.x;
        self.y = normalized.y;
        self.width = normalized.width;
        self.height = normalized.height;
    }

    /// Round positions and extents; stored drawings never carry sub-pixel coordinates.
    pub fn sanitize(&mut self) {
        for point in &mut self.points {
            *point = point.round();
        }
        self.x = self.x.round();
        self.y = self.y.round();
        self.width = self.width.round();
        self.height = self.height.round();
        self.bezier_factor = self.bezier_factor.clamp(0.0, 1.0);
    }
}

fn floor_alpha(alpha: f32) -> f32 {
    if alpha > 0.0 { alpha } else { ALPHA_FLOOR }
}

macro_rules! shape_patch {
    ($($field:ident: $ty:ty),* $(,)?) => {
        /// Partial update of a [`ShapeModel`]; `None` fields are left untouched.
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct ShapePatch {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
        }

        impl ShapePatch {
            /// Patch that would set every field to the model's current value.
            pub fn from_model(model: &ShapeModel) -> Self {
                Self { $($field: Some(model.$field.clone()),)* }
            }

            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())*
            }

            /// Keep only the fields whose value differs from `model`.
            pub fn changes_against(&self, model: &ShapeModel) -> Self {
                Self {
                    $($field: self.$field.clone().filter(|value| *value != model.$field),)*
                }
            }

            /// The model's current values for every field this patch touches.
            pub fn inverse_against(&self, model: &ShapeModel) -> Self {
                Self {
                    $($field: self.$field.as_ref().map(|_| model.$field.clone()),)*
                }
            }

            pub fn apply_to(&self, model: &mut ShapeModel) {
                $(
                    if let Some(value) = &self.$field {
                        model.$field = value.clone();
                    }
                )*
            }
        }
    };
}

shape_patch! {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    rotation: f32,
    z: i32,
    points: Vec<Pos2>,
    bezier_factor: f32,
    stroke_width: f32,
    stroke_color: Color32,
    stroke_alpha: f32,
    fill_type: FillType,
    fill_color: Color32,
    fill_alpha: f32,
    texture: Option<String>,
    texture_width: f32,
    texture_height: f32,
    texture_alpha: f32,
    text: String,
    font_family: String,
    font_size: f32,
    text_color: Color32,
    text_alpha: f32,
    hidden: bool,
    locked: bool,
    mirror_x: bool,
    mirror_y: bool,
}

impl ShapePatch {
    /// Express world-space patch points the way the model stores them.
    pub fn normalize_points(&mut self, kind: ShapeKind) {
        if !kind.is_polygonal() {
            return;
        }
        let Some(points) = self.points.as_ref() else {
            return;
        };
        let Some(first) = points.first().copied() else {
            return;
        };
        let normalized = geometry::normalize_points(first.x, first.y, points);
        self.x = Some(normalized.x.round());
        self.y = Some(normalized.y.round());
        self.width = Some(normalized.width.round());
        self.height = Some(normalized.height.round());
        self.points = Some(normalized.points.into_iter().map(|p| p.round()).collect());
    }
}

use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};

mod spline;
pub use spline::{ControlPoints, spline_control_points};

/// Axis-aligned box reported as origin plus extent.
///
/// Unlike `egui::Rect::NOTHING`, an empty input yields a zero-sized box at the
/// origin so that callers can keep doing arithmetic on it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const ZERO: Bounds = Bounds { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// Result of [`normalize_points`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPoints {
    /// Points relative to the supplied origin
    pub points: Vec<Pos2>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedPoints {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }
}

/// Rotate `point` around `axis` by `angle` radians.
///
/// A zero angle returns the input untouched, without going through the
/// trigonometry (and its rounding).
pub fn rotate_around_point(point: Pos2, axis: Pos2, angle: f32) -> Pos2 {
    if angle == 0.0 {
        return point;
    }

    // x' = x*cos(a) - y*sin(a)
    // y' = y*cos(a) + x*sin(a)
    let offset = point - axis;
    let (sin, cos) = angle.sin_cos();
    Pos2::new(
        offset.x * cos - offset.y * sin + axis.x,
        offset.y * cos + offset.x * sin + axis.y,
    )
}

/// Calculate the bounding box for a set of points
pub fn bounding_box(points: &[Pos2]) -> Bounds {
    let Some(first) = points.first() else {
        return Bounds::ZERO;
    };

    let mut min = *first;
    let mut max = *first;
    for point in &points[1..] {
        min = min.min(*point);
        max = max.max(*point);
    }

    Bounds::new(min.x, min.y, max.x - min.x, max.y - min.y)
}

/// Translate world points so they are relative to `(origin_x, origin_y)` and
/// report the world-space box they occupy.
pub fn normalize_points(origin_x: f32, origin_y: f32, points: &[Pos2]) -> NormalizedPoints {
    let origin = Vec2::new(origin_x, origin_y);
    let relative: Vec<Pos2> = points.iter().map(|p| *p - origin).collect();
    let bounds = bounding_box(&relative);

    NormalizedPoints {
        points: relative,
        x: origin_x + bounds.x,
        y: origin_y + bounds.y,
        width: bounds.width,
        height: bounds.height,
    }
}

/// Sign with `sign(0) == 0`; `f32::signum` reports 1.0 for +0.0.
pub fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Angle in whole degrees between "up" and the pointer as seen from `center`.
///
/// `height_sign` flips the reference direction for vertically mirrored shapes.
pub fn rotation_from_handle(center: Pos2, pointer: Pos2, height_sign: f32) -> f32 {
    let offset = pointer - center;
    let length = offset.length();
    if length == 0.0 {
        return 0.0;
    }
    let sign = if height_sign < 0.0 { -1.0 } else { 1.0 };
    // The cosine only gives the smallest angle, x tells which side of "up" we are on.
    let cos = (sign * -offset.y / length).clamp(-1.0, 1.0);
    let side = if offset.x < 0.0 { -1.0 } else { 1.0 };
    (cos.acos() * side * sign).to_degrees().round()
}

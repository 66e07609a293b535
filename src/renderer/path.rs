use egui::{Color32, Pos2, Vec2};
use std::f32::consts::TAU;

use crate::geometry::spline_control_points;

/// Radius of the end caps drawn at both ends of an open path.
///
/// A zero radius draws nothing on most backends; at 0.1 the stroke width alone
/// produces the visible round cap.
pub const CAP_RADIUS: f32 = 0.1;

/// One drawing instruction in the local space of a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Pos2),
    LineTo(Pos2),
    QuadraticTo { control: Pos2, to: Pos2 },
    CubicTo { control1: Pos2, control2: Pos2, to: Pos2 },
    Arc { center: Pos2, radius: f32, start_angle: f32, end_angle: f32 },
    /// Axis-aligned rectangle; `size` may be negative
    Rectangle { min: Pos2, size: Vec2 },
    Ellipse { center: Pos2, radii: Vec2 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub width: f32,
    pub color: Color32,
    pub alpha: f32,
    /// 1.0 puts the stroke outside the outline, 0.5 centers it on the outline
    pub alignment: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillStyle {
    pub color: Color32,
    pub alpha: f32,
}

/// Renderable outline of a shape: what any backend needs to draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePath {
    pub commands: Vec<PathCommand>,
    pub line: LineStyle,
    pub fill: Option<FillStyle>,
}

impl ShapePath {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Copy used as a mask: same outline, fully opaque.
    pub fn opaque(&self) -> Self {
        let mut mask = self.clone();
        mask.line.alpha = 1.0;
        mask.line.color = Color32::WHITE;
        mask.fill = Some(FillStyle { color: Color32::WHITE, alpha: 1.0 });
        mask
    }
}

/// Path through `points`, relative to the first point, smoothed by `bezier_factor`.
///
/// A path whose last point returns to the origin is a closed loop: its first
/// and last segments become cubic curves that wrap around the origin instead
/// of quadratic open ends.
pub fn spline_path(points: &[Pos2], bezier_factor: f32) -> Vec<PathCommand> {
    let Some(origin) = points.first().copied() else {
        return Vec::new();
    };
    let relative = |p: Pos2| (p - origin).to_pos2();
    let count = points.len();

    let mut commands = vec![PathCommand::MoveTo(Pos2::ZERO)];
    if count > 2 {
        let mut previous = Pos2::ZERO;
        let mut point = relative(points[1]);
        let mut next = relative(points[2]);
        let closed_loop = relative(points[count - 1]) == previous;
        let mut outgoing = point;

        // A zero factor would render as a flat curve on some backends; draw lines instead.
        if bezier_factor > 0.0 {
            let wrapped = closed_loop.then(|| {
                let before_last = relative(points[count - 2]);
                spline_control_points(bezier_factor, before_last, previous, point).outgoing
            });
            let controls = spline_control_points(bezier_factor, previous, point, next);
            commands.push(match wrapped {
                Some(control1) => PathCommand::CubicTo { control1, control2: controls.incoming, to: point },
                None => PathCommand::QuadraticTo { control: controls.incoming, to: point },
            });
            outgoing = controls.outgoing;
        } else {
            commands.push(PathCommand::LineTo(point));
        }
        previous = point;
        point = next;

        for i in 2..count {
            let is_last = i == count - 1;
            next = if is_last { relative(points[1]) } else { relative(points[i + 1]) };
            if bezier_factor > 0.0 {
                let controls = spline_control_points(bezier_factor, previous, point, next);
                if is_last && !closed_loop {
                    commands.push(PathCommand::QuadraticTo { control: outgoing, to: point });
                } else {
                    commands.push(PathCommand::CubicTo {
                        control1: outgoing,
                        control2: controls.incoming,
                        to: point,
                    });
                }
                outgoing = controls.outgoing;
            } else {
                commands.push(PathCommand::LineTo(point));
            }
            previous = point;
            point = next;
        }
    } else if count == 2 {
        commands.push(PathCommand::LineTo(relative(points[1])));
    }

    // Start each cap at angle 0 so no stray segment joins it to the path.
    commands.push(PathCommand::MoveTo(Pos2::new(CAP_RADIUS, 0.0)));
    commands.push(end_cap(Pos2::ZERO));
    if count > 1 {
        let last = relative(points[count - 1]);
        commands.push(PathCommand::MoveTo(last + Vec2::new(CAP_RADIUS, 0.0)));
        commands.push(end_cap(last));
    }
    commands
}

fn end_cap(center: Pos2) -> PathCommand {
    PathCommand::Arc { center, radius: CAP_RADIUS, start_angle: 0.0, end_angle: TAU }
}

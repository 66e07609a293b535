use egui::Pos2;

/// Bezier control points flanking one vertex of a spline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoints {
    /// Control point on the side of the previous vertex
    pub incoming: Pos2,
    /// Control point on the side of the next vertex
    pub outgoing: Pos2,
}

/// Control points for `point`, given its neighbours and a smoothing `factor` in [0, 1].
///
/// Both control points lie on a line through `point` parallel to
/// `previous -> next`, each pulled out in proportion to the length of the
/// segment on its side. Coincident neighbours collapse both onto `point`.
pub fn spline_control_points(factor: f32, previous: Pos2, point: Pos2, next: Pos2) -> ControlPoints {
    let direction = next - previous;

    let preceding = previous.distance(point);
    let following = point.distance(next);
    let total = preceding + following;
    if total == 0.0 {
        return ControlPoints { incoming: point, outgoing: point };
    }

    let incoming_distance = factor * (preceding / total);
    let outgoing_distance = factor * (following / total);

    ControlPoints {
        incoming: point - direction * incoming_distance,
        outgoing: point + direction * outgoing_distance,
    }
}

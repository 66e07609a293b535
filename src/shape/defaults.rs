use egui::Color32;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{DrawingId, FillType, ShapeKind, ShapeModel};
use crate::error::DefaultsError;

/// Starting data for every drawing kind.
///
/// Passed into the capture session at construction; the layer keeps it up to
/// date through [`DrawingDefaults::update_starting_data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingDefaults {
    pub rectangle: ShapeModel,
    pub ellipse: ShapeModel,
    pub polygon: ShapeModel,
    pub freehand: ShapeModel,
    pub text: ShapeModel,
}

impl Default for DrawingDefaults {
    fn default() -> Self {
        let mut rectangle = ShapeModel::new(ShapeKind::Rectangle);
        rectangle.stroke_width = 5.0;

        let mut ellipse = ShapeModel::new(ShapeKind::Ellipse);
        ellipse.stroke_width = 5.0;

        let mut polygon = ShapeModel::new(ShapeKind::Polygon);
        polygon.stroke_width = 3.0;
        polygon.bezier_factor = 0.0;

        let mut freehand = ShapeModel::new(ShapeKind::Freehand);
        freehand.stroke_width = 3.0;
        freehand.bezier_factor = 0.5;

        let mut text = ShapeModel::new(ShapeKind::Text);
        text.fill_type = FillType::Solid;
        text.stroke_width = 2.0;
        text.font_family = "Arial".to_owned();
        text.font_size = 25.0;

        Self { rectangle, ellipse, polygon, freehand, text }
    }
}

impl DrawingDefaults {
    /// Defaults tinted with the acting user's color.
    ///
    /// Text only takes the fill color so its outline stays readable.
    pub fn with_user_color(mut self, color: Color32) -> Self {
        for kind in ShapeKind::ALL {
            let data = self.get_mut(kind);
            data.fill_color = color;
            if kind != ShapeKind::Text {
                data.stroke_color = color;
            }
        }
        self
    }

    pub fn get(&self, kind: ShapeKind) -> &ShapeModel {
        match kind {
            ShapeKind::Rectangle => &self.rectangle,
            ShapeKind::Ellipse => &self.ellipse,
            ShapeKind::Polygon => &self.polygon,
            ShapeKind::Freehand => &self.freehand,
            ShapeKind::Text => &self.text,
        }
    }

    fn get_mut(&mut self, kind: ShapeKind) -> &mut ShapeModel {
        match kind {
            ShapeKind::Rectangle => &mut self.rectangle,
            ShapeKind::Ellipse => &mut self.ellipse,
            ShapeKind::Polygon => &mut self.polygon,
            ShapeKind::Freehand => &mut self.freehand,
            ShapeKind::Text => &mut self.text,
        }
    }

    /// A fresh preview shape seeded from the defaults of `kind`.
    pub fn starting_data(&self, kind: ShapeKind) -> ShapeModel {
        let mut data = self.get(kind).clone();
        data.kind = kind;
        data.id = DrawingId::Preview;
        data
    }

    /// Remember the style of `shape` as the new starting data for its kind.
    ///
    /// Identity, placement, geometry and content are not carried over.
    pub fn update_starting_data(&mut self, shape: &ShapeModel) {
        let mut data = shape.clone();
        data.id = DrawingId::Preview;
        data.x = 0.0;
        data.y = 0.0;
        data.width = 0.0;
        data.height = 0.0;
        data.z = 0;
        data.points.clear();
        data.text.clear();
        log::debug!("Updated starting data for {}", shape.kind.name());
        *self.get_mut(shape.kind) = data;
    }

    pub fn from_json_str(json: &str) -> Result<Self, DefaultsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String, DefaultsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DefaultsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Pos2;

    #[test]
    fn test_builtin_defaults() {
        let defaults = DrawingDefaults::default();
        assert_eq!(defaults.get(ShapeKind::Freehand).bezier_factor, 0.5);
        assert_eq!(defaults.get(ShapeKind::Polygon).stroke_width, 3.0);
        assert_eq!(defaults.get(ShapeKind::Text).fill_type, FillType::Solid);
        assert_eq!(defaults.get(ShapeKind::Rectangle).stroke_width, 5.0);
    }

    #[test]
    fn test_user_color_leaves_text_stroke() {
        let defaults = DrawingDefaults::default().with_user_color(Color32::RED);
        assert_eq!(defaults.rectangle.stroke_color, Color32::RED);
        assert_eq!(defaults.text.fill_color, Color32::RED);
        assert_eq!(defaults.text.stroke_color, Color32::BLACK);
    }

    #[test]
    fn test_update_starting_data_strips_geometry() {
        let mut defaults = DrawingDefaults::default();
        let mut shape = defaults.starting_data(ShapeKind::Polygon);
        shape.x = 40.0;
        shape.points = vec![Pos2::ZERO, Pos2::new(4.0, 4.0)];
        shape.stroke_width = 9.0;
        shape.text = "label".to_owned();

        defaults.update_starting_data(&shape);
        let next = defaults.starting_data(ShapeKind::Polygon);
        assert_eq!(next.stroke_width, 9.0);
        assert_eq!(next.x, 0.0);
        assert!(next.points.is_empty());
        assert!(next.text.is_empty());
    }

    #[test]
    fn test_json_round_trip_keeps_missing_kinds() {
        let json = r#"{ "polygon": { "type": "polygon", "strokeWidth": 7.0 } }"#;
        let defaults = DrawingDefaults::from_json_str(json).unwrap();
        assert_eq!(defaults.polygon.stroke_width, 7.0);
        assert_eq!(defaults.freehand.bezier_factor, 0.5);
    }
}

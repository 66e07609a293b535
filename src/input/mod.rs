use egui::{Context, Modifiers, PointerButton, Pos2, Rect};
use serde::{Deserialize, Serialize};

use crate::shape::ShapeKind;

/// The tool selected in the drawing controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActiveTool {
    #[default]
    Select,
    Rectangle,
    Ellipse,
    Polygon,
    Freehand,
    Text,
}

impl ActiveTool {
    pub const ALL: [ActiveTool; 6] = [
        ActiveTool::Select,
        ActiveTool::Rectangle,
        ActiveTool::Ellipse,
        ActiveTool::Polygon,
        ActiveTool::Freehand,
        ActiveTool::Text,
    ];

    /// Kind of drawing this tool creates, `None` for the select tool
    pub fn shape_kind(&self) -> Option<ShapeKind> {
        match self {
            Self::Select => None,
            Self::Rectangle => Some(ShapeKind::Rectangle),
            Self::Ellipse => Some(ShapeKind::Ellipse),
            Self::Polygon => Some(ShapeKind::Polygon),
            Self::Freehand => Some(ShapeKind::Freehand),
            Self::Text => Some(ShapeKind::Text),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Select => "⬉ Select",
            Self::Rectangle => "◻ Rectangle",
            Self::Ellipse => "◯ Ellipse",
            Self::Polygon => "⬠ Polygon",
            Self::Freehand => "✏ Freehand",
            Self::Text => "🗛 Text",
        }
    }
}

/// Pointer state shared by all pointer events
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Position in canvas coordinates
    pub position: Pos2,
    pub modifiers: Modifiers,
    /// Seconds since an arbitrary epoch, monotonic
    pub time: f64,
}

impl PointerEvent {
    pub fn new(position: Pos2, time: f64) -> Self {
        Self { position, modifiers: Modifiers::NONE, time }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Pointer events delivered to the drawing layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A button was pressed
    PointerDown { pointer: PointerEvent, button: PointerButton },
    /// The pointer moved, with or without buttons held
    PointerMove { pointer: PointerEvent },
    /// A button was released
    PointerUp { pointer: PointerEvent, button: PointerButton },
}

impl InputEvent {
    pub fn pointer(&self) -> &PointerEvent {
        match self {
            Self::PointerDown { pointer, .. } | Self::PointerMove { pointer } | Self::PointerUp { pointer, .. } => {
                pointer
            }
        }
    }
}

/// Handles converting raw egui input into canvas InputEvents
#[derive(Debug, Default)]
pub struct InputHandler {
    last_pointer_pos: Option<Pos2>,
    canvas_rect: Option<Rect>,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the screen rectangle the canvas occupies
    pub fn set_canvas_rect(&mut self, rect: Rect) {
        self.canvas_rect = Some(rect);
    }

    /// Convert a screen position to canvas coordinates
    pub fn to_canvas(&self, screen: Pos2) -> Pos2 {
        canvas_point(self.canvas_rect, screen)
    }

    fn on_canvas(&self, screen: Pos2) -> bool {
        self.canvas_rect.is_none_or(|rect| rect.contains(screen))
    }

    /// Process raw egui input and generate canvas InputEvents
    ///
    /// Presses only count when they start on the canvas; moves and releases
    /// are always reported so that a drag leaving the canvas still ends.
    pub fn process_input(&mut self, ctx: &Context) -> Vec<InputEvent> {
        let mut events = Vec::new();

        ctx.input(|input| {
            let time = input.time;
            let modifiers = input.modifiers;
            let canvas_rect = self.canvas_rect;
            let pointer_at = move |pos: Pos2| PointerEvent {
                position: canvas_point(canvas_rect, pos),
                modifiers,
                time,
            };

            if let Some(pos) = input.pointer.hover_pos() {
                if Some(pos) != self.last_pointer_pos {
                    events.push(InputEvent::PointerMove { pointer: pointer_at(pos) });
                }
                self.last_pointer_pos = Some(pos);
            } else {
                self.last_pointer_pos = None;
            }

            let Some(pos) = input.pointer.interact_pos() else {
                return;
            };
            for button in [PointerButton::Primary, PointerButton::Secondary] {
                if input.pointer.button_pressed(button) && self.on_canvas(pos) {
                    events.push(InputEvent::PointerDown { pointer: pointer_at(pos), button });
                }
                if input.pointer.button_released(button) {
                    events.push(InputEvent::PointerUp { pointer: pointer_at(pos), button });
                }
            }
        });

        events
    }
}

fn canvas_point(canvas_rect: Option<Rect>, screen: Pos2) -> Pos2 {
    match canvas_rect {
        Some(rect) => (screen - rect.min).to_pos2(),
        None => screen,
    }
}

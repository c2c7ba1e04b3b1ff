//! Input model: tools, modifier keys, mouse buttons, and the gesture state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `InputState` is the controller's current mode: idle, armed with a
//! tool, or in the middle of a gesture, carrying everything needed to compute
//! the next mutation. `Interaction` bundles the mode with the selection so the
//! whole interaction state can be snapshotted and asserted on in tests.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::element::ElementId;

/// Which toolbar tool is currently armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    /// Place a card on the next empty-canvas click.
    Card,
    /// Place a text element on the next empty-canvas click.
    Text,
    /// Connect two elements with two successive clicks.
    Connection,
    /// Drag the canvas with the primary button.
    Pan,
}

impl Tool {
    /// Whether this tool places a new element on an empty-canvas click.
    #[must_use]
    pub fn is_placement(self) -> bool {
        matches!(self, Self::Card | Self::Text)
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key.
///
/// The inner string holds the key name as reported by the browser (e.g. `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// The controller's current mode.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputState {
    /// Nothing armed and no gesture in progress.
    #[default]
    Idle,
    /// A toolbar tool is armed; waiting for the next pointer-down.
    ToolArmed(Tool),
    /// Moving an element. `anchor_offset` is the pointer's world position
    /// relative to the element origin at pointer-down.
    Dragging { id: ElementId, anchor_offset: Point },
    /// Resizing a card from its bottom-right handle.
    Resizing { id: ElementId },
    /// The host text editor is open on this element.
    EditingText { id: ElementId },
    /// Panning the canvas. `anchor` is `pointer - pan` captured at
    /// pointer-down; `resume` is the tool to re-arm afterwards (`None` = idle).
    Panning { anchor: Point, resume: Option<Tool> },
}

impl InputState {
    /// The armed tool, if the controller is waiting for input.
    #[must_use]
    pub fn armed_tool(&self) -> Option<Tool> {
        match self {
            Self::ToolArmed(tool) => Some(*tool),
            _ => None,
        }
    }

    /// Element targeted by the in-progress gesture or edit, if any.
    #[must_use]
    pub fn target(&self) -> Option<&ElementId> {
        match self {
            Self::Dragging { id, .. } | Self::Resizing { id } | Self::EditingText { id } => Some(id),
            _ => None,
        }
    }

    /// Whether a pointer gesture (drag, resize, pan) is in progress.
    #[must_use]
    pub fn is_gesture(&self) -> bool {
        matches!(self, Self::Dragging { .. } | Self::Resizing { .. } | Self::Panning { .. })
    }
}

/// Complete interaction state threaded through the controller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interaction {
    /// Current mode.
    pub state: InputState,
    /// The selected element, if any. Single selection only.
    pub selected_id: Option<ElementId>,
    /// First endpoint picked while the connection tool is armed.
    pub connect_from: Option<ElementId>,
    /// Whether the host currently holds pointer capture for a gesture.
    pub pointer_captured: bool,
}

//! Input event types relayed over the control channel's `inputEvent`
//! message (spec.md §6). Injection into the OS input stack is out of core
//! scope; this module only defines the wire-level event shapes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEvent {
    /// Pointer moved to `(x, y)` in normalised `[0.0, 1.0]` coordinates.
    MouseMove { x: f64, y: f64 },

    MouseDown { x: f64, y: f64, button: MouseButton },

    MouseUp { x: f64, y: f64, button: MouseButton },

    MouseScroll {
        x: f64,
        y: f64,
        delta_x: f64,
        delta_y: f64,
    },

    KeyDown {
        /// Platform-neutral keycode (X11 keyval space).
        keycode: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },

    KeyUp { keycode: u32 },

    GesturePinch {
        x: f64,
        y: f64,
        magnification: f64,
        phase: GesturePhase,
    },

    GestureRotation {
        x: f64,
        y: f64,
        rotation: f64,
        phase: GesturePhase,
    },

    GestureSwipe {
        delta_x: f64,
        delta_y: f64,
        phase: GesturePhase,
    },

    ScrollSmooth {
        x: f64,
        y: f64,
        delta_x: f64,
        delta_y: f64,
        phase: GesturePhase,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePhase {
    Begin,
    Changed,
    End,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

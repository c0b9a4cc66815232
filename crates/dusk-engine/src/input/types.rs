use std::fmt;

/// Keyboard key identifier.
///
/// Backends map platform keycodes into these variants where possible.
/// Keys without a variant are reported as `Key::Unknown(u32)` with a stable
/// platform code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,

    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    Shift,
    Control,
    Alt,
    Meta,

    // Letters
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    // Digits
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    // Function keys
    F1, F2, F3, F4, F5, F6,
    F7, F8, F9, F10, F11, F12,

    /// Platform-dependent key not yet represented here.
    Unknown(u32),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

/// Events drained from the platform queue once per loop pass.
///
/// Coordinates are window-local physical pixels. `clicks` carries the click
/// count when the platform reports one (1 otherwise).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The user asked the window to close.
    Quit,

    KeyDown {
        key: Key,
        /// Stable platform code when available (e.g. scancode).
        scancode: u32,
        /// True when the event is a key-repeat.
        repeat: bool,
    },

    KeyUp {
        key: Key,
        scancode: u32,
    },

    MouseDown {
        x: f32,
        y: f32,
        button: MouseButton,
        clicks: u8,
    },

    MouseUp {
        x: f32,
        y: f32,
        button: MouseButton,
        clicks: u8,
    },
}

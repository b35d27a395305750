// Keyhook Key Type
// Logical key identifiers, independent of platform key codes

use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// A logical key.
///
/// Names parse case-insensitively (`"capslock"`, `"CapsLock"`) and most keys
/// accept a few aliases (`"esc"`, `"cmd"`, `"opt"`). `Display` gives the
/// canonical name used in config files and in FFI output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum Key {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,

    #[strum(to_string = "0", serialize = "zero")]
    Num0,
    #[strum(to_string = "1", serialize = "one")]
    Num1,
    #[strum(to_string = "2", serialize = "two")]
    Num2,
    #[strum(to_string = "3", serialize = "three")]
    Num3,
    #[strum(to_string = "4", serialize = "four")]
    Num4,
    #[strum(to_string = "5", serialize = "five")]
    Num5,
    #[strum(to_string = "6", serialize = "six")]
    Num6,
    #[strum(to_string = "7", serialize = "seven")]
    Num7,
    #[strum(to_string = "8", serialize = "eight")]
    Num8,
    #[strum(to_string = "9", serialize = "nine")]
    Num9,

    Return,
    Tab,
    Space,
    #[strum(to_string = "backspace", serialize = "delete")]
    Backspace,
    #[strum(to_string = "escape", serialize = "esc")]
    Escape,
    #[strum(to_string = "capsLock", serialize = "caps")]
    CapsLock,
    #[strum(to_string = "function", serialize = "fn")]
    Function,

    // Modifier keys, one variant per physical side
    #[strum(to_string = "shift", serialize = "leftShift", serialize = "lshift")]
    LeftShift,
    #[strum(to_string = "rightShift", serialize = "rshift")]
    RightShift,
    #[strum(to_string = "control", serialize = "ctrl", serialize = "leftControl", serialize = "leftCtrl")]
    LeftCtrl,
    #[strum(to_string = "rightControl", serialize = "rightCtrl", serialize = "rctrl")]
    RightCtrl,
    #[strum(to_string = "option", serialize = "alt", serialize = "opt", serialize = "leftOption", serialize = "leftAlt")]
    LeftAlt,
    #[strum(to_string = "rightOption", serialize = "rightAlt", serialize = "ropt")]
    RightAlt,
    #[strum(to_string = "command", serialize = "cmd", serialize = "meta", serialize = "leftCommand", serialize = "leftMeta")]
    LeftMeta,
    #[strum(to_string = "rightCommand", serialize = "rightCmd", serialize = "rightMeta")]
    RightMeta,

    #[strum(to_string = "left", serialize = "leftArrow")]
    LeftArrow,
    #[strum(to_string = "right", serialize = "rightArrow")]
    RightArrow,
    #[strum(to_string = "up", serialize = "upArrow")]
    UpArrow,
    #[strum(to_string = "down", serialize = "downArrow")]
    DownArrow,
    Home,
    End,
    PageUp,
    PageDown,
    #[strum(to_string = "forwardDelete", serialize = "del")]
    ForwardDelete,
    Help,

    VolumeUp,
    VolumeDown,
    Mute,

    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    F13,
    F14,
    F15,
    F16,
    F17,
    F18,
    F19,
    F20,

    #[strum(to_string = "equals", serialize = "equal")]
    Equals,
    Minus,
    Semicolon,
    #[strum(to_string = "apostrophe", serialize = "quote")]
    Apostrophe,
    Comma,
    #[strum(to_string = "period", serialize = "dot")]
    Period,
    Slash,
    Backslash,
    #[strum(to_string = "grave", serialize = "backtick")]
    Grave,
    LeftBracket,
    RightBracket,

    KeypadDecimal,
    KeypadMultiply,
    KeypadPlus,
    KeypadClear,
    KeypadDivide,
    #[strum(to_string = "keypadEnter", serialize = "enter")]
    KeypadEnter,
    KeypadMinus,
    KeypadEquals,
    Keypad0,
    Keypad1,
    Keypad2,
    Keypad3,
    Keypad4,
    Keypad5,
    Keypad6,
    Keypad7,
    Keypad8,
    Keypad9,
}

const LETTERS: [Key; 26] = [
    Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H, Key::I,
    Key::J, Key::K, Key::L, Key::M, Key::N, Key::O, Key::P, Key::Q, Key::R,
    Key::S, Key::T, Key::U, Key::V, Key::W, Key::X, Key::Y, Key::Z,
];

const DIGITS: [Key; 10] = [
    Key::Num0, Key::Num1, Key::Num2, Key::Num3, Key::Num4,
    Key::Num5, Key::Num6, Key::Num7, Key::Num8, Key::Num9,
];

impl Key {
    /// Look up a key by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Key> {
        name.trim().parse().ok()
    }

    /// Canonical name, same as `Display`.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Returns true for the eight sided modifier keys
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Key::LeftShift
                | Key::RightShift
                | Key::LeftCtrl
                | Key::RightCtrl
                | Key::LeftAlt
                | Key::RightAlt
                | Key::LeftMeta
                | Key::RightMeta
        )
    }

    /// Key and Shift requirement that types `c` on a US layout.
    pub fn for_char(c: char) -> Option<(Key, bool)> {
        if c.is_ascii_lowercase() {
            return Some((LETTERS[(c as u8 - b'a') as usize], false));
        }
        if c.is_ascii_uppercase() {
            return Some((LETTERS[(c as u8 - b'A') as usize], true));
        }
        if c.is_ascii_digit() {
            return Some((DIGITS[(c as u8 - b'0') as usize], false));
        }
        let mapped = match c {
            ' ' => (Key::Space, false),
            '\n' => (Key::Return, false),
            '\t' => (Key::Tab, false),
            '-' => (Key::Minus, false),
            '_' => (Key::Minus, true),
            '=' => (Key::Equals, false),
            '+' => (Key::Equals, true),
            '[' => (Key::LeftBracket, false),
            '{' => (Key::LeftBracket, true),
            ']' => (Key::RightBracket, false),
            '}' => (Key::RightBracket, true),
            '\\' => (Key::Backslash, false),
            '|' => (Key::Backslash, true),
            ';' => (Key::Semicolon, false),
            ':' => (Key::Semicolon, true),
            '\'' => (Key::Apostrophe, false),
            '"' => (Key::Apostrophe, true),
            ',' => (Key::Comma, false),
            '<' => (Key::Comma, true),
            '.' => (Key::Period, false),
            '>' => (Key::Period, true),
            '/' => (Key::Slash, false),
            '?' => (Key::Slash, true),
            '`' => (Key::Grave, false),
            '~' => (Key::Grave, true),
            '!' => (Key::Num1, true),
            '@' => (Key::Num2, true),
            '#' => (Key::Num3, true),
            '$' => (Key::Num4, true),
            '%' => (Key::Num5, true),
            '^' => (Key::Num6, true),
            '&' => (Key::Num7, true),
            '*' => (Key::Num8, true),
            '(' => (Key::Num9, true),
            ')' => (Key::Num0, true),
            _ => return None,
        };
        Some(mapped)
    }
}

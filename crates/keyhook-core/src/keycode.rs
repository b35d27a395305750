// Keyhook Key Codes
// macOS virtual key code table (kVK_* values from HIToolbox Events.h)

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::Key;

/// Every logical key and its platform virtual key code.
pub const MACOS_KEY_CODES: &[(u16, Key)] = &[
    (0x00, Key::A),
    (0x0B, Key::B),
    (0x08, Key::C),
    (0x02, Key::D),
    (0x0E, Key::E),
    (0x03, Key::F),
    (0x05, Key::G),
    (0x04, Key::H),
    (0x22, Key::I),
    (0x26, Key::J),
    (0x28, Key::K),
    (0x25, Key::L),
    (0x2E, Key::M),
    (0x2D, Key::N),
    (0x1F, Key::O),
    (0x23, Key::P),
    (0x0C, Key::Q),
    (0x0F, Key::R),
    (0x01, Key::S),
    (0x11, Key::T),
    (0x20, Key::U),
    (0x09, Key::V),
    (0x0D, Key::W),
    (0x07, Key::X),
    (0x10, Key::Y),
    (0x06, Key::Z),
    (0x1D, Key::Num0),
    (0x12, Key::Num1),
    (0x13, Key::Num2),
    (0x14, Key::Num3),
    (0x15, Key::Num4),
    (0x17, Key::Num5),
    (0x16, Key::Num6),
    (0x1A, Key::Num7),
    (0x1C, Key::Num8),
    (0x19, Key::Num9),
    (0x24, Key::Return),
    (0x30, Key::Tab),
    (0x31, Key::Space),
    (0x33, Key::Backspace),
    (0x35, Key::Escape),
    (0x39, Key::CapsLock),
    (0x3F, Key::Function),
    (0x38, Key::LeftShift),
    (0x3C, Key::RightShift),
    (0x3B, Key::LeftCtrl),
    (0x3E, Key::RightCtrl),
    (0x3A, Key::LeftAlt),
    (0x3D, Key::RightAlt),
    (0x37, Key::LeftMeta),
    (0x36, Key::RightMeta),
    (0x7B, Key::LeftArrow),
    (0x7C, Key::RightArrow),
    (0x7E, Key::UpArrow),
    (0x7D, Key::DownArrow),
    (0x73, Key::Home),
    (0x77, Key::End),
    (0x74, Key::PageUp),
    (0x79, Key::PageDown),
    (0x75, Key::ForwardDelete),
    (0x72, Key::Help),
    (0x48, Key::VolumeUp),
    (0x49, Key::VolumeDown),
    (0x4A, Key::Mute),
    (0x7A, Key::F1),
    (0x78, Key::F2),
    (0x63, Key::F3),
    (0x76, Key::F4),
    (0x60, Key::F5),
    (0x61, Key::F6),
    (0x62, Key::F7),
    (0x64, Key::F8),
    (0x65, Key::F9),
    (0x6D, Key::F10),
    (0x67, Key::F11),
    (0x6F, Key::F12),
    (0x69, Key::F13),
    (0x6B, Key::F14),
    (0x71, Key::F15),
    (0x6A, Key::F16),
    (0x40, Key::F17),
    (0x4F, Key::F18),
    (0x50, Key::F19),
    (0x5A, Key::F20),
    (0x18, Key::Equals),
    (0x1B, Key::Minus),
    (0x29, Key::Semicolon),
    (0x27, Key::Apostrophe),
    (0x2B, Key::Comma),
    (0x2F, Key::Period),
    (0x2C, Key::Slash),
    (0x2A, Key::Backslash),
    (0x32, Key::Grave),
    (0x21, Key::LeftBracket),
    (0x1E, Key::RightBracket),
    (0x41, Key::KeypadDecimal),
    (0x43, Key::KeypadMultiply),
    (0x45, Key::KeypadPlus),
    (0x47, Key::KeypadClear),
    (0x4B, Key::KeypadDivide),
    (0x4C, Key::KeypadEnter),
    (0x4E, Key::KeypadMinus),
    (0x51, Key::KeypadEquals),
    (0x52, Key::Keypad0),
    (0x53, Key::Keypad1),
    (0x54, Key::Keypad2),
    (0x55, Key::Keypad3),
    (0x56, Key::Keypad4),
    (0x57, Key::Keypad5),
    (0x58, Key::Keypad6),
    (0x59, Key::Keypad7),
    (0x5B, Key::Keypad8),
    (0x5C, Key::Keypad9),
];

/// Raw codes of the eight sided modifier keys
pub const MODIFIER_KEY_CODES: [u16; 8] = [0x38, 0x3C, 0x3B, 0x3E, 0x3A, 0x3D, 0x37, 0x36];

/// Returns true if `code` is one of the sided modifier key codes
pub const fn is_modifier_code(code: u16) -> bool {
    let mut i = 0;
    while i < MODIFIER_KEY_CODES.len() {
        if MODIFIER_KEY_CODES[i] == code {
            return true;
        }
        i += 1;
    }
    false
}

fn by_code() -> &'static HashMap<u16, Key> {
    static TABLE: OnceLock<HashMap<u16, Key>> = OnceLock::new();
    TABLE.get_or_init(|| MACOS_KEY_CODES.iter().copied().collect())
}

fn by_key() -> &'static HashMap<Key, u16> {
    static TABLE: OnceLock<HashMap<Key, u16>> = OnceLock::new();
    TABLE.get_or_init(|| MACOS_KEY_CODES.iter().map(|&(code, key)| (key, code)).collect())
}

impl Key {
    /// Normalize a raw platform key code
    pub fn from_code(code: u16) -> Option<Key> {
        by_code().get(&code).copied()
    }

    /// Platform key code used when injecting this key
    pub fn code(self) -> u16 {
        // The table covers every variant, checked by test_every_key_has_a_code
        by_key().get(&self).copied().unwrap_or(u16::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_key_has_a_code() {
        for key in Key::iter() {
            let code = key.code();
            assert_ne!(code, u16::MAX, "{:?} has no key code", key);
            assert_eq!(Key::from_code(code), Some(key));
        }
    }

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<u16> = MACOS_KEY_CODES.iter().map(|(c, _)| *c).collect();
        assert_eq!(codes.len(), MACOS_KEY_CODES.len());
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(Key::from_code(0x39), Some(Key::CapsLock));
        assert_eq!(Key::from_code(0x35), Some(Key::Escape));
        assert_eq!(Key::from_code(0x3C), Some(Key::RightShift));
        assert_eq!(Key::from_code(0xFF), None);
    }

    #[test]
    fn test_is_modifier_code() {
        for code in MODIFIER_KEY_CODES {
            assert!(is_modifier_code(code));
            assert!(Key::from_code(code).is_some_and(Key::is_modifier));
        }
        assert!(!is_modifier_code(0x39)); // capsLock
        assert!(!is_modifier_code(0x00)); // a
    }
}

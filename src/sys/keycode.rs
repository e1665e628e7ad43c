//! Symbolic key and modifier names to native virtual key codes and Carbon
//! modifier masks.
//!
//! Resolution is total: a name that is not recognised resolves to
//! [`KeyCode::UNKNOWN`] (or contributes no modifier bit), so a typo leaves
//! the binding inert instead of failing.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use strum::EnumString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const UNKNOWN: KeyCode = KeyCode(0xFFFF);

    pub fn is_unknown(self) -> bool { self == Self::UNKNOWN }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:#04x}", self.0) }
}

bitflags! {
    /// Carbon `EventModifiers` bits as accepted by `RegisterEventHotKey`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierMask: u32 {
        const CMD = 1 << 8;
        const SHIFT = 1 << 9;
        const OPTION = 1 << 11;
        const CONTROL = 1 << 12;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Modifier {
    #[strum(serialize = "cmd", serialize = "command")]
    Cmd,
    #[strum(serialize = "shift")]
    Shift,
    #[strum(serialize = "alt", serialize = "option", serialize = "opt")]
    Option,
    #[strum(serialize = "ctrl", serialize = "control")]
    Control,
}

impl Modifier {
    pub fn mask(self) -> ModifierMask {
        match self {
            Modifier::Cmd => ModifierMask::CMD,
            Modifier::Shift => ModifierMask::SHIFT,
            Modifier::Option => ModifierMask::OPTION,
            Modifier::Control => ModifierMask::CONTROL,
        }
    }
}

pub fn key_code(name: &str) -> KeyCode {
    let name = name.to_ascii_lowercase();
    let code = match name.as_str() {
        "a" => 0x00,
        "s" => 0x01,
        "d" => 0x02,
        "f" => 0x03,
        "h" => 0x04,
        "g" => 0x05,
        "z" => 0x06,
        "x" => 0x07,
        "c" => 0x08,
        "v" => 0x09,
        "b" => 0x0B,
        "q" => 0x0C,
        "w" => 0x0D,
        "e" => 0x0E,
        "r" => 0x0F,
        "y" => 0x10,
        "t" => 0x11,
        "1" => 0x12,
        "2" => 0x13,
        "3" => 0x14,
        "4" => 0x15,
        "6" => 0x16,
        "5" => 0x17,
        "=" => 0x18,
        "9" => 0x19,
        "7" => 0x1A,
        "-" => 0x1B,
        "8" => 0x1C,
        "0" => 0x1D,
        "]" => 0x1E,
        "o" => 0x1F,
        "u" => 0x20,
        "[" => 0x21,
        "i" => 0x22,
        "p" => 0x23,
        "return" | "enter" => 0x24,
        "l" => 0x25,
        "j" => 0x26,
        "'" => 0x27,
        "k" => 0x28,
        ";" => 0x29,
        "\\" => 0x2A,
        "," => 0x2B,
        "/" => 0x2C,
        "n" => 0x2D,
        "m" => 0x2E,
        "." => 0x2F,
        "tab" => 0x30,
        "space" => 0x31,
        "`" => 0x32,
        "delete" | "backspace" => 0x33,
        "escape" | "esc" => 0x35,
        "f17" => 0x40,
        "f18" => 0x4F,
        "f19" => 0x50,
        "f20" => 0x5A,
        "f5" => 0x60,
        "f6" => 0x61,
        "f7" => 0x62,
        "f3" => 0x63,
        "f8" => 0x64,
        "f9" => 0x65,
        "f11" => 0x67,
        "f13" => 0x69,
        "f16" => 0x6A,
        "f14" => 0x6B,
        "f10" => 0x6D,
        "f12" => 0x6F,
        "f15" => 0x71,
        "help" => 0x72,
        "home" => 0x73,
        "pageup" => 0x74,
        "forwarddelete" => 0x75,
        "f4" => 0x76,
        "end" => 0x77,
        "f2" => 0x78,
        "pagedown" => 0x79,
        "f1" => 0x7A,
        "left" => 0x7B,
        "right" => 0x7C,
        "down" => 0x7D,
        "up" => 0x7E,
        _ => return KeyCode::UNKNOWN,
    };
    KeyCode(code)
}

/// Combined mask for `names`, plus the names that did not resolve.
pub fn modifier_mask<S: AsRef<str>>(names: &[S]) -> (ModifierMask, Vec<String>) {
    let mut mask = ModifierMask::empty();
    let mut unknown = Vec::new();
    for name in names {
        match Modifier::from_str(name.as_ref()) {
            Ok(modifier) => mask |= modifier.mask(),
            Err(_) => unknown.push(name.as_ref().to_string()),
        }
    }
    (mask, unknown)
}

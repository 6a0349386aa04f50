//! Key combination parsing.
//!
//! Combinations are written as `+`-separated tokens, modifiers first, e.g.
//! `ctrl+alt+s` or `win+shift+f9`. Parsing is case-insensitive.

use super::HotkeyError;
use std::fmt;
use std::str::FromStr;

/// Modifier keys held as part of a combination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub win: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.alt || self.shift || self.win)
    }
}

/// The non-modifier key of a combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// `a`-`z`, stored lowercase
    Letter(char),
    /// `0`-`9`
    Digit(u8),
    /// `f1`-`f24`
    Function(u8),
    Space,
    Tab,
    Enter,
    Escape,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    /// Parse a key name. Returns `None` for unsupported keys.
    pub fn parse(token: &str) -> Option<Key> {
        let lower = token.to_ascii_lowercase();
        let key = match lower.as_str() {
            "space" => Key::Space,
            "tab" => Key::Tab,
            "enter" | "return" => Key::Enter,
            "esc" | "escape" => Key::Escape,
            "backspace" => Key::Backspace,
            "delete" | "del" => Key::Delete,
            "insert" | "ins" => Key::Insert,
            "home" => Key::Home,
            "end" => Key::End,
            "pageup" | "pgup" => Key::PageUp,
            "pagedown" | "pgdn" => Key::PageDown,
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            s if s.chars().count() == 1 => {
                let ch = s.chars().next()?;
                if ch.is_ascii_lowercase() {
                    Key::Letter(ch)
                } else if ch.is_ascii_digit() {
                    Key::Digit(ch as u8 - b'0')
                } else {
                    return None;
                }
            }
            s if s.starts_with('f') && s.len() <= 3 => {
                let num: u8 = s[1..].parse().ok()?;
                if (1..=24).contains(&num) {
                    Key::Function(num)
                } else {
                    return None;
                }
            }
            _ => return None,
        };
        Some(key)
    }

    /// Key name as understood by the `global-hotkey` parser.
    pub fn code_name(&self) -> String {
        match self {
            Key::Letter(c) => format!("Key{}", c.to_ascii_uppercase()),
            Key::Digit(d) => format!("Digit{d}"),
            Key::Function(n) => format!("F{n}"),
            Key::Space => "Space".to_string(),
            Key::Tab => "Tab".to_string(),
            Key::Enter => "Enter".to_string(),
            Key::Escape => "Escape".to_string(),
            Key::Backspace => "Backspace".to_string(),
            Key::Delete => "Delete".to_string(),
            Key::Insert => "Insert".to_string(),
            Key::Home => "Home".to_string(),
            Key::End => "End".to_string(),
            Key::PageUp => "PageUp".to_string(),
            Key::PageDown => "PageDown".to_string(),
            Key::Up => "ArrowUp".to_string(),
            Key::Down => "ArrowDown".to_string(),
            Key::Left => "ArrowLeft".to_string(),
            Key::Right => "ArrowRight".to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Letter(c) => write!(f, "{c}"),
            Key::Digit(d) => write!(f, "{d}"),
            Key::Function(n) => write!(f, "f{n}"),
            Key::Space => f.write_str("space"),
            Key::Tab => f.write_str("tab"),
            Key::Enter => f.write_str("enter"),
            Key::Escape => f.write_str("esc"),
            Key::Backspace => f.write_str("backspace"),
            Key::Delete => f.write_str("delete"),
            Key::Insert => f.write_str("insert"),
            Key::Home => f.write_str("home"),
            Key::End => f.write_str("end"),
            Key::PageUp => f.write_str("pageup"),
            Key::PageDown => f.write_str("pagedown"),
            Key::Up => f.write_str("up"),
            Key::Down => f.write_str("down"),
            Key::Left => f.write_str("left"),
            Key::Right => f.write_str("right"),
        }
    }
}

/// A parsed global key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Combination {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl Combination {
    /// Combination in the syntax of the `global-hotkey` crate,
    /// e.g. `control+alt+KeyS`.
    pub fn to_code_string(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(5);
        if self.modifiers.ctrl {
            parts.push("control".to_string());
        }
        if self.modifiers.alt {
            parts.push("alt".to_string());
        }
        if self.modifiers.shift {
            parts.push("shift".to_string());
        }
        if self.modifiers.win {
            parts.push("super".to_string());
        }
        parts.push(self.key.code_name());
        parts.join("+")
    }
}

impl FromStr for Combination {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| HotkeyError::InvalidCombination {
            combination: s.to_string(),
            reason: reason.to_string(),
        };

        if s.trim().is_empty() {
            return Err(invalid("empty combination"));
        }

        let mut modifiers = Modifiers::default();
        let mut key = None;

        for token in s.split('+').map(str::trim) {
            if token.is_empty() {
                return Err(invalid("empty key name"));
            }

            let slot = match token.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => Some(&mut modifiers.ctrl),
                "alt" | "option" => Some(&mut modifiers.alt),
                "shift" => Some(&mut modifiers.shift),
                "win" | "windows" | "super" | "cmd" | "meta" => Some(&mut modifiers.win),
                _ => None,
            };

            match slot {
                Some(flag) if *flag => return Err(invalid("modifier repeated")),
                Some(flag) => *flag = true,
                None => {
                    if key.is_some() {
                        return Err(invalid("more than one key"));
                    }
                    key = Some(Key::parse(token).ok_or_else(|| invalid("unknown key"))?);
                }
            }
        }

        let key = key.ok_or_else(|| invalid("no key after modifiers"))?;
        Ok(Combination { modifiers, key })
    }
}

impl fmt::Display for Combination {
    /// Canonical lowercase form, modifiers in ctrl/alt/shift/win order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.ctrl {
            f.write_str("ctrl+")?;
        }
        if self.modifiers.alt {
            f.write_str("alt+")?;
        }
        if self.modifiers.shift {
            f.write_str("shift+")?;
        }
        if self.modifiers.win {
            f.write_str("win+")?;
        }
        write!(f, "{}", self.key)
    }
}

//! Keyboard gestures
//!
//! Gesture identifiers look like `kb:control+shift+a`. Parsing normalizes
//! case and modifier order so that equal key combinations compare equal.

use std::fmt;

/// Normalized keyboard gesture
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gesture {
    pub alt: bool,
    pub control: bool,
    pub nvda: bool,
    pub shift: bool,
    pub windows: bool,
    pub key: String,
}

impl Gesture {
    pub fn new(key: &str) -> Self {
        Self {
            alt: false,
            control: false,
            nvda: false,
            shift: false,
            windows: false,
            key: key.to_ascii_lowercase(),
        }
    }

    pub fn control(mut self) -> Self {
        self.control = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn nvda(mut self) -> Self {
        self.nvda = true;
        self
    }

    /// Parse a gesture identifier
    pub fn parse(source: &str) -> Result<Self, String> {
        let lower = source.trim().to_ascii_lowercase();
        let Some(combo) = lower.strip_prefix("kb:") else {
            return Err("only keyboard gestures (`kb:`) are supported".into());
        };
        let parts: Vec<&str> = combo.split('+').map(str::trim).collect();
        let Some((key, modifiers)) = parts.split_last() else {
            return Err("missing key".into());
        };
        if key.is_empty() {
            return Err("missing key".into());
        }

        let mut gesture = Self::new(key);
        if Self::modifier_slot(&mut gesture, key).is_some() {
            return Err(format!("`{}` is a modifier, not a key", key));
        }
        for name in modifiers {
            let slot = Self::modifier_slot(&mut gesture, name)
                .ok_or_else(|| format!("unknown modifier `{}`", name))?;
            if *slot {
                return Err(format!("modifier `{}` given twice", name));
            }
            *slot = true;
        }
        Ok(gesture)
    }

    fn modifier_slot<'a>(gesture: &'a mut Self, name: &str) -> Option<&'a mut bool> {
        Some(match name {
            "alt" => &mut gesture.alt,
            "control" | "ctrl" => &mut gesture.control,
            "nvda" => &mut gesture.nvda,
            "shift" => &mut gesture.shift,
            "windows" | "win" => &mut gesture.windows,
            _ => return None,
        })
    }

    /// Human-readable form, e.g. `Ctrl+Shift+A`
    pub fn display(&self) -> String {
        let mut parts: Vec<String> = [
            (self.nvda, "NVDA"),
            (self.control, "Ctrl"),
            (self.alt, "Alt"),
            (self.shift, "Shift"),
            (self.windows, "Windows"),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| name.to_string())
        .collect();
        let mut chars = self.key.chars();
        let key = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        parts.push(key);
        parts.join("+")
    }
}

impl fmt::Display for Gesture {
    /// Canonical identifier: modifiers in alphabetical order
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("kb:")?;
        for (set, name) in [
            (self.alt, "alt"),
            (self.control, "control"),
            (self.nvda, "nvda"),
            (self.shift, "shift"),
            (self.windows, "windows"),
        ] {
            if set {
                write!(f, "{}+", name)?;
            }
        }
        f.write_str(&self.key)
    }
}

impl std::str::FromStr for Gesture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

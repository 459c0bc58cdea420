//! Element states
//!
//! States exposed alongside the role, derived from ARIA state attributes
//! and their native HTML counterparts.

use std::fmt;

use crate::ElementData;

/// State flag of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum State {
    Busy,
    Checked,
    Collapsed,
    Disabled,
    Expanded,
    HalfChecked,
    Invalid,
    Multiline,
    Pressed,
    ReadOnly,
    Required,
    Selected,
}

impl State {
    pub const ALL: [State; 12] = [
        Self::Busy,
        Self::Checked,
        Self::Collapsed,
        Self::Disabled,
        Self::Expanded,
        Self::HalfChecked,
        Self::Invalid,
        Self::Multiline,
        Self::Pressed,
        Self::ReadOnly,
        Self::Required,
        Self::Selected,
    ];

    /// Parse a state name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        Self::ALL.into_iter().find(|state| state.as_str() == lower)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Checked => "checked",
            Self::Collapsed => "collapsed",
            Self::Disabled => "disabled",
            Self::Expanded => "expanded",
            Self::HalfChecked => "halfchecked",
            Self::Invalid => "invalid",
            Self::Multiline => "multiline",
            Self::Pressed => "pressed",
            Self::ReadOnly => "readonly",
            Self::Required => "required",
            Self::Selected => "selected",
        }
    }

    /// States of an element, sorted
    pub fn of(elem: &ElementData) -> Vec<State> {
        let aria = |name: &str| elem.get_attr(name).map(|v| v.trim().to_ascii_lowercase());
        let aria_true = |name: &str| aria(name).is_some_and(|v| v == "true");
        let native = |name: &str| elem.get_attr(name).is_some();
        let checkable = elem.tag == "input"
            && elem
                .get_attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("checkbox") || t.eq_ignore_ascii_case("radio"));

        let mut states = Vec::new();
        let mut set = |state: State, on: bool| {
            if on {
                states.push(state);
            }
        };
        set(Self::Busy, aria_true("aria-busy"));
        set(Self::Checked, aria_true("aria-checked") || (checkable && native("checked")));
        set(Self::HalfChecked, aria("aria-checked").is_some_and(|v| v == "mixed"));
        set(Self::Pressed, aria_true("aria-pressed"));
        set(Self::Selected, aria_true("aria-selected") || (elem.tag == "option" && native("selected")));
        set(
            Self::Expanded,
            aria_true("aria-expanded") || (elem.tag == "details" && native("open")),
        );
        set(Self::Collapsed, aria("aria-expanded").is_some_and(|v| v == "false"));
        set(Self::Disabled, aria_true("aria-disabled") || native("disabled"));
        set(Self::ReadOnly, aria_true("aria-readonly") || native("readonly"));
        set(Self::Required, aria_true("aria-required") || native("required"));
        set(
            Self::Invalid,
            aria("aria-invalid").is_some_and(|v| !v.is_empty() && v != "false"),
        );
        set(Self::Multiline, aria_true("aria-multiline") || elem.tag == "textarea");
        states.sort();
        states
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state() {
        assert_eq!(State::parse("Checked"), Some(State::Checked));
        assert_eq!(State::parse("readonly"), Some(State::ReadOnly));
        assert_eq!(State::parse("visible"), None);
        for state in State::ALL {
            assert_eq!(State::parse(state.as_str()), Some(state));
        }
    }

    #[test]
    fn test_aria_and_native_states() {
        let mut button = ElementData::new("button");
        button.set_attr("aria-expanded", "false");
        button.set_attr("disabled", "");
        assert_eq!(State::of(&button), vec![State::Collapsed, State::Disabled]);

        let mut checkbox = ElementData::new("input");
        checkbox.set_attr("type", "checkbox");
        checkbox.set_attr("checked", "");
        assert_eq!(State::of(&checkbox), vec![State::Checked]);

        let mut text = ElementData::new("input");
        text.set_attr("checked", "");
        text.set_attr("aria-invalid", "spelling");
        assert_eq!(State::of(&text), vec![State::Invalid]);

        assert_eq!(State::of(&ElementData::new("textarea")), vec![State::Multiline]);
    }
}

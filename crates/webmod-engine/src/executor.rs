//! Host action executors
//!
//! The engine picks a target element and an action kind; the host performs
//! it. Element operations can fail when the element went stale between
//! matching and execution.

use std::collections::VecDeque;

use webmod_dom::{NodeId, Page};

/// Failure reported by the host
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("element is no longer in the page")]
    Stale,

    #[error("action unavailable: {0}")]
    Unavailable(String),
}

/// What happened to the page after an action
#[derive(Debug, Clone, Default)]
pub enum Outcome {
    #[default]
    Unchanged,
    /// The action changed the page; here is the new snapshot
    PageMutated(Page),
}

/// Operations the host screen reader provides
pub trait ActionExecutor {
    /// Speak text without moving
    fn announce(&mut self, text: &str);

    /// Switch form-input mode on or off
    fn set_form_mode(&mut self, enabled: bool);

    /// Move the virtual cursor, speaking `announcement`
    fn move_to(&mut self, page: &Page, element: NodeId, announcement: &str) -> Result<(), ExecError>;

    /// Move and read continuously from the element
    fn say_all(&mut self, page: &Page, element: NodeId, announcement: &str) -> Result<(), ExecError>;

    /// Simulate a click
    fn click(&mut self, page: &Page, element: NodeId) -> Result<Outcome, ExecError>;

    /// Simulate moving the mouse over the element
    fn mouse_move(&mut self, page: &Page, element: NodeId) -> Result<Outcome, ExecError>;
}

/// Effect recorded by [`Recorder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Announce(String),
    FormMode(bool),
    MoveTo { element: NodeId, announcement: String },
    SayAll { element: NodeId, announcement: String },
    Click(NodeId),
    MouseMove(NodeId),
}

/// Executor that records every effect
///
/// Clicks and mouse moves can be scripted to mutate the page or fail.
#[derive(Debug, Default)]
pub struct Recorder {
    pub effects: Vec<Effect>,
    mutations: VecDeque<Page>,
    failures: VecDeque<ExecError>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next click or mouse move replaces the page with `page`
    pub fn queue_mutation(&mut self, page: Page) {
        self.mutations.push_back(page);
    }

    /// Next element operation fails with `error`
    pub fn queue_failure(&mut self, error: ExecError) {
        self.failures.push_back(error);
    }

    pub fn announcements(&self) -> Vec<&str> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Announce(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn moves(&self) -> Vec<NodeId> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::MoveTo { element, .. } => Some(*element),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    fn check(&mut self, page: &Page, element: NodeId) -> Result<(), ExecError> {
        if let Some(error) = self.failures.pop_front() {
            return Err(error);
        }
        if !page.contains(element) {
            return Err(ExecError::Stale);
        }
        Ok(())
    }

    fn outcome(&mut self) -> Outcome {
        self.mutations.pop_front().map(Outcome::PageMutated).unwrap_or_default()
    }
}

impl ActionExecutor for Recorder {
    fn announce(&mut self, text: &str) {
        self.effects.push(Effect::Announce(text.to_string()));
    }

    fn set_form_mode(&mut self, enabled: bool) {
        self.effects.push(Effect::FormMode(enabled));
    }

    fn move_to(&mut self, page: &Page, element: NodeId, announcement: &str) -> Result<(), ExecError> {
        self.check(page, element)?;
        self.effects.push(Effect::MoveTo { element, announcement: announcement.to_string() });
        Ok(())
    }

    fn say_all(&mut self, page: &Page, element: NodeId, announcement: &str) -> Result<(), ExecError> {
        self.check(page, element)?;
        self.effects.push(Effect::SayAll { element, announcement: announcement.to_string() });
        Ok(())
    }

    fn click(&mut self, page: &Page, element: NodeId) -> Result<Outcome, ExecError> {
        self.check(page, element)?;
        self.effects.push(Effect::Click(element));
        Ok(self.outcome())
    }

    fn mouse_move(&mut self, page: &Page, element: NodeId) -> Result<Outcome, ExecError> {
        self.check(page, element)?;
        self.effects.push(Effect::MouseMove(element));
        Ok(self.outcome())
    }
}

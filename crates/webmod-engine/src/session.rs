//! Module session
//!
//! State of the active web module on the current page: last match results,
//! automatic-action presence, pending double presses, cursor position,
//! current zone and page title.

use std::collections::HashSet;
use std::time::Instant;

use webmod_dom::{ElementKey, NodeId, Page};
use webmod_rules::{evaluate, page_title, Action, Gesture, LoadedModule, MatchResult, Rule};

use crate::config::Config;
use crate::dispatch::{Decision, Dispatcher};
use crate::executor::{ActionExecutor, ExecError, Outcome};
use crate::navigation::{self, Cursor, Direction, NavQuery, Stop, Zone};

/// Why a cascade stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeLimit {
    /// The same rule fired again on the same element
    Repeated,
    /// Too many page mutations
    Depth(usize),
}

/// Problems reported to the host diagnostics channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    #[error("{action} of rule {rule:?} failed: {error}")]
    ExecutionFailed { rule: String, action: Action, error: ExecError },

    #[error("automatic actions aborted at rule {rule:?} on {element}: {limit:?}")]
    CascadeAborted { rule: String, element: ElementKey, limit: CascadeLimit },
}

/// What is spoken for a rule's element
pub fn announcement(rule: &Rule, page: &Page, element: NodeId) -> String {
    let value = rule
        .custom_value
        .clone()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| page.label(element));
    match (rule.speak_name, value.is_empty()) {
        (true, true) => rule.label().to_string(),
        (true, false) => format!("{} - {}", rule.label(), value),
        (false, _) => value,
    }
}

/// Active module bound to the current page
pub struct Session {
    module: LoadedModule,
    config: Config,
    page: Option<Page>,
    results: Vec<MatchResult>,
    /// Rules whose match set was present at the last settle
    present: Vec<bool>,
    last_auto_move: Vec<Option<Instant>>,
    dispatcher: Dispatcher,
    caret: Option<NodeId>,
    zone: Option<Zone>,
    title: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Session {
    pub fn new(module: LoadedModule, config: &Config) -> Self {
        let len = module.len();
        Self {
            module,
            config: config.clone(),
            page: None,
            results: Vec::new(),
            present: vec![false; len],
            last_auto_move: vec![None; len],
            dispatcher: Dispatcher::new(config.double_press_window()),
            caret: None,
            zone: None,
            title: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn module(&self) -> &LoadedModule {
        &self.module
    }

    pub fn name(&self) -> &str {
        self.module.name()
    }

    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    /// Results of the last evaluation, module order
    pub fn results(&self) -> &[MatchResult] {
        &self.results
    }

    pub fn result(&self, rule: &str) -> Option<&MatchResult> {
        self.module.index_of(rule).and_then(|idx| self.results.get(idx))
    }

    /// Element the virtual cursor was last moved to
    pub fn caret(&self) -> Option<NodeId> {
        self.caret
    }

    /// The host moved the caret; elements outside the page clear it
    pub fn set_caret(&mut self, element: Option<NodeId>) {
        self.caret = element.filter(|&e| self.page.as_ref().is_some_and(|p| p.contains(e)));
    }

    /// Zone in-zone paging is restricted to
    pub fn zone(&self) -> Option<Zone> {
        self.zone
    }

    pub fn clear_zone(&mut self) {
        if self.zone.take().is_some() {
            tracing::debug!(module = self.module.name(), "zone restriction cleared");
        }
    }

    pub fn page_title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Earliest pending double-press deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.dispatcher.deadline()
    }

    /// New page content: re-evaluate and fire automatic actions
    pub fn page_changed(&mut self, page: Page, exec: &mut dyn ActionExecutor, now: Instant) {
        self.replace_page(page);
        self.settle(exec, now);
        self.update_title(exec);
    }

    /// Handle a gesture; `false` if no rule binds it
    pub fn shortcut(&mut self, gesture: &Gesture, exec: &mut dyn ActionExecutor, now: Instant) -> bool {
        self.poll(exec, now);
        let Some((rule, action)) = self.module.binding(gesture) else {
            return false;
        };

        if !self.results.get(rule).is_some_and(MatchResult::is_active) {
            let label = self.module.rule(rule).label();
            tracing::debug!(rule = label, gesture = %gesture, "shortcut without match");
            exec.announce(&format!("{} not found", label));
            return true;
        }

        match self.dispatcher.press(gesture, rule, action, now) {
            Decision::Run(action) => self.run_and_settle(rule, action, exec, now),
            Decision::Escalate => self.run_and_settle(rule, Action::MoveTo, exec, now),
            Decision::Armed(deadline) => {
                tracing::trace!(gesture = %gesture, ?deadline, "speak armed");
            }
        }
        true
    }

    /// Fire Speak presses whose double-press window elapsed
    pub fn poll(&mut self, exec: &mut dyn ActionExecutor, now: Instant) {
        for rule in self.dispatcher.expire(now) {
            self.execute(rule, Action::Speak, exec);
        }
    }

    /// Move to the next/previous result
    pub fn navigate(&mut self, direction: Direction, query: &NavQuery, exec: &mut dyn ActionExecutor) -> Option<Stop> {
        let cursor = Cursor { caret: self.caret, zone: self.zone };
        let found = self
            .page
            .as_ref()
            .and_then(|page| navigation::find(&self.module, page, &self.results, &cursor, direction, query));
        let (Some(stop), Some(page)) = (found, self.page.as_ref()) else {
            let message = query.not_found(direction, self.zone.as_ref());
            tracing::debug!(%message, "paging found nothing");
            exec.announce(&message);
            return None;
        };

        let rule = self.module.rule(stop.rule);
        let text = announcement(rule, page, stop.element);
        match exec.move_to(page, stop.element, &text) {
            Ok(()) => {
                self.caret = Some(stop.element);
                self.enter_zone(stop.rule, stop.element);
                Some(stop)
            }
            Err(error) => {
                self.report(stop.rule, Action::MoveTo, error);
                None
            }
        }
    }

    fn replace_page(&mut self, page: Page) {
        let caret_key = match (&self.page, self.caret) {
            (Some(old), Some(caret)) => old.key(caret),
            _ => None,
        };
        self.caret = caret_key.and_then(|key| page.find_key(key));
        self.results = evaluate(&self.module, &page);
        self.page = Some(page);

        // The zone follows its rule's first match
        self.zone = self.zone.and_then(|zone| {
            let element = *self.results.get(zone.rule)?.matches.first()?;
            Some(Zone { rule: zone.rule, element })
        });

        // A press armed for a rule that is gone would only report it missing
        let results = &self.results;
        self.dispatcher.retain_rules(|rule| results.get(rule).is_some_and(MatchResult::is_active));
    }

    /// Track the zone after the cursor moved to a rule's element: a zone
    /// rule's element becomes the zone, anything else keeps the innermost
    /// zone containing it
    fn enter_zone(&mut self, rule: usize, element: NodeId) {
        let Some(page) = &self.page else { return };
        let zone = if self.module.rule(rule).is_zone() {
            Some(Zone { rule, element })
        } else {
            self.results
                .iter()
                .filter(|r| self.module.rule(r.rule).is_zone())
                .flat_map(|r| r.matches.iter().map(|&e| Zone { rule: r.rule, element: e }))
                .filter(|z| z.contains(page, element))
                .max_by_key(|z| page.position(z.element))
        };
        if zone != self.zone {
            let name = zone.map(|z| self.module.rule(z.rule).name.as_str());
            tracing::debug!(zone = ?name, "zone changed");
        }
        self.zone = zone;
    }

    fn run_and_settle(&mut self, rule: usize, action: Action, exec: &mut dyn ActionExecutor, now: Instant) {
        if let Some(page) = self.execute(rule, action, exec) {
            self.replace_page(page);
            self.settle(exec, now);
            self.update_title(exec);
        }
    }

    /// Fire automatic actions for absent-to-present transitions, following
    /// page mutations until the page is stable or a bound is hit
    fn settle(&mut self, exec: &mut dyn ActionExecutor, now: Instant) {
        let mut fired: HashSet<(usize, ElementKey)> = HashSet::new();
        let mut depth = 0;

        loop {
            let mut transitions = Vec::new();
            for (idx, result) in self.results.iter().enumerate() {
                if !result.is_active() {
                    self.present[idx] = false;
                } else if !self.present[idx] {
                    match self.module.rule(idx).auto_action {
                        Some(action) => transitions.push((idx, action)),
                        None => self.present[idx] = true,
                    }
                }
            }

            let mut mutated = None;
            for (idx, action) in transitions {
                self.present[idx] = true;
                let Some(key) = self.primary_key(idx) else { continue };

                if !fired.insert((idx, key)) {
                    self.abort_cascade(idx, key, CascadeLimit::Repeated);
                    return;
                }
                if action.moves_cursor() {
                    let cooldown = self.config.auto_move_cooldown();
                    let recent = self.last_auto_move[idx].is_some_and(|last| now.saturating_duration_since(last) < cooldown);
                    if recent {
                        tracing::debug!(rule = %self.module.rule(idx).name, "automatic move throttled");
                        continue;
                    }
                    self.last_auto_move[idx] = Some(now);
                }

                tracing::debug!(rule = %self.module.rule(idx).name, %action, "automatic action");
                if let Some(page) = self.execute(idx, action, exec) {
                    mutated = Some((idx, key, page));
                    break;
                }
            }

            let Some((idx, key, page)) = mutated else {
                return;
            };
            depth += 1;
            self.replace_page(page);
            if depth > self.config.max_cascade_depth {
                self.abort_cascade(idx, key, CascadeLimit::Depth(depth));
                return;
            }
        }
    }

    fn primary_key(&self, rule: usize) -> Option<ElementKey> {
        let element = self.results.get(rule)?.primary?;
        self.page.as_ref()?.key(element)
    }

    fn abort_cascade(&mut self, rule: usize, element: ElementKey, limit: CascadeLimit) {
        for (idx, result) in self.results.iter().enumerate() {
            self.present[idx] = result.is_active();
        }
        let diagnostic = Diagnostic::CascadeAborted {
            rule: self.module.rule(rule).name.clone(),
            element,
            limit,
        };
        tracing::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// Run one action on a rule's primary match; returns the new page when
    /// the action mutated it
    fn execute(&mut self, rule_idx: usize, action: Action, exec: &mut dyn ActionExecutor) -> Option<Page> {
        let rule = self.module.rule(rule_idx);
        let (Some(page), Some(element)) = (
            self.page.as_ref(),
            self.results.get(rule_idx).and_then(|r| r.primary),
        ) else {
            exec.announce(&format!("{} not found", rule.label()));
            return None;
        };

        let text = announcement(rule, page, element);
        let form_mode = rule
            .form_mode
            .unwrap_or_else(|| page.element(element).is_some_and(|e| e.is_edit_field()));

        let result = match action {
            Action::Speak => {
                exec.announce(&text);
                Ok(Outcome::Unchanged)
            }
            Action::MoveTo => {
                exec.set_form_mode(form_mode);
                exec.move_to(page, element, &text).map(|()| Outcome::Unchanged)
            }
            Action::SayAll => {
                exec.set_form_mode(form_mode);
                exec.say_all(page, element, &text).map(|()| Outcome::Unchanged)
            }
            Action::Activate => {
                exec.set_form_mode(form_mode);
                exec.click(page, element)
            }
            Action::MouseMove => {
                exec.set_form_mode(form_mode);
                exec.mouse_move(page, element)
            }
        };

        match result {
            Ok(outcome) => {
                if action.moves_cursor() {
                    self.caret = Some(element);
                    self.enter_zone(rule_idx, element);
                }
                match outcome {
                    Outcome::Unchanged => None,
                    Outcome::PageMutated(page) => Some(page),
                }
            }
            Err(error) => {
                self.report(rule_idx, action, error);
                None
            }
        }
    }

    /// Report a failed action once; it is never retried
    fn report(&mut self, rule: usize, action: Action, error: ExecError) {
        let diagnostic = Diagnostic::ExecutionFailed {
            rule: self.module.rule(rule).name.clone(),
            action,
            error,
        };
        tracing::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    fn update_title(&mut self, exec: &mut dyn ActionExecutor) {
        let Some(page) = &self.page else { return };
        let title = page_title(&self.module, page, &self.results);
        if self.title.as_deref().is_some_and(|old| old != title) {
            tracing::info!(module = self.module.name(), title = %title, "page title changed");
            exec.announce(&title);
        }
        self.title = Some(title);
    }
}

//! Shortcut dispatch
//!
//! Speak gestures escalate on double press:
//!
//! ```text
//! Idle --press--> AwaitingRepeat(deadline)
//! AwaitingRepeat --same gesture before deadline--> Idle  (move and announce)
//! AwaitingRepeat --deadline reached-------------> Idle  (announce)
//! ```
//!
//! Every other action runs immediately. Time is passed in, so the state
//! machine never sleeps; the event loop turns [`Dispatcher::deadline`]
//! into a cancellable timer.

use std::time::{Duration, Instant};

use webmod_rules::{Action, Gesture};

/// What the session should do for a press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Run this action now
    Run(Action),
    /// Speak armed; announce at the deadline unless repeated
    Armed(Instant),
    /// Repeat within the window: move to the element instead
    Escalate,
}

#[derive(Debug, Clone)]
struct Pending {
    gesture: Gesture,
    rule: usize,
    deadline: Instant,
}

/// Per-gesture double-press state
#[derive(Debug)]
pub struct Dispatcher {
    window: Duration,
    pending: Vec<Pending>,
}

impl Dispatcher {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: Vec::new() }
    }

    /// Handle a press of `gesture`, bound to `action` of `rule`
    pub fn press(&mut self, gesture: &Gesture, rule: usize, action: Action, now: Instant) -> Decision {
        if action != Action::Speak {
            return Decision::Run(action);
        }

        if let Some(pos) = self
            .pending
            .iter()
            .position(|p| p.gesture == *gesture && now < p.deadline)
        {
            self.pending.remove(pos);
            tracing::debug!(gesture = %gesture, "double press, escalating to move");
            return Decision::Escalate;
        }

        self.pending.retain(|p| p.gesture != *gesture);
        let deadline = now + self.window;
        self.pending.push(Pending { gesture: gesture.clone(), rule, deadline });
        Decision::Armed(deadline)
    }

    /// Rules whose Speak window elapsed, earliest first
    pub fn expire(&mut self, now: Instant) -> Vec<usize> {
        let mut expired: Vec<Pending> = Vec::new();
        self.pending.retain(|p| {
            if p.deadline <= now {
                expired.push(p.clone());
                false
            } else {
                true
            }
        });
        expired.sort_by_key(|p| p.deadline);
        expired.into_iter().map(|p| p.rule).collect()
    }

    /// Earliest pending deadline
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.deadline).min()
    }

    /// Drop pending presses whose rule fails `keep`
    pub fn retain_rules(&mut self, keep: impl Fn(usize) -> bool) {
        let before = self.pending.len();
        self.pending.retain(|p| keep(p.rule));
        if self.pending.len() != before {
            tracing::debug!(dropped = before - self.pending.len(), "pending presses dropped");
        }
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

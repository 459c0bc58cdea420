//! webmod Engine
//!
//! Runs web modules against live pages: shortcut dispatch with double-press
//! escalation, automatic actions on rule transitions, zone-aware paging
//! between results, page-title tracking and per-site module lifecycle.
//!
//! ```text
//! host events --> EventLoop --> Engine --> Session --> ActionExecutor
//!                  (smol)     (registry)  (per page)     (host)
//! ```

mod config;
mod dispatch;
mod engine;
mod error;
mod event_loop;
mod executor;
mod navigation;
mod session;

pub use config::Config;
pub use dispatch::{Decision, Dispatcher};
pub use engine::{Engine, Event};
pub use error::{EngineError, Result};
pub use event_loop::EventLoop;
pub use executor::{ActionExecutor, Effect, ExecError, Outcome, Recorder};
pub use navigation::{find, stops, Cursor, Direction, NavQuery, Stop, Zone};
pub use session::{announcement, CascadeLimit, Diagnostic, Session};

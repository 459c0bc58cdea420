//! webmod Rules
//!
//! Web modules are named, per-site collections of rules. A rule finds page
//! elements through conjunctive criteria and binds actions to keyboard
//! gestures or to automatic detection.
//!
//! ```text
//! WebModule --LoadedModule::load--> LoadedModule --Matcher--> MatchResult
//!   (serde)       (validation)          (compiled)     (page)
//! ```

mod criteria;
mod error;
mod expr;
mod keys;
mod matcher;
mod module;
mod proposals;
mod rule;
pub mod site;
pub mod store;
mod title;
mod validate;

pub use criteria::{CompiledCriteria, ContextScope, Criteria};
pub use error::{Result, RuleError};
pub use expr::{Pattern, TextFilter, TitleGate, ValueExpr};
pub use keys::Gesture;
pub use matcher::{evaluate, MatchResult, Matcher};
pub use module::{validate_name, SiteKey, WebModule, FORMAT_VERSION};
pub use proposals::{propose, Field, Proposal};
pub use rule::{Action, Rule, RuleKind};
pub use store::{Catalog, CatalogEntry, ModuleStore};
pub use title::page_title;
pub use validate::{parse_context, CompiledAlternative, CompiledRule, ContextTerm, LoadedModule};

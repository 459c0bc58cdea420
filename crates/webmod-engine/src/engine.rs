//! Engine
//!
//! Process-scoped module registry. Navigation selects the module for the
//! site, loading it into a [`Session`] and unloading the previous one.

use std::path::PathBuf;
use std::time::Instant;

use webmod_dom::{NodeId, Page};
use webmod_rules::store::read_module_file;
use webmod_rules::{site, Gesture, LoadedModule, ModuleStore, RuleError, SiteKey, WebModule};

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::executor::ActionExecutor;
use crate::navigation::{Direction, NavQuery, Stop};
use crate::session::Session;

/// Where a catalog module's rules come from
#[derive(Debug)]
enum Source {
    File(PathBuf),
    Memory(LoadedModule),
}

#[derive(Debug)]
struct Entry {
    name: String,
    site: SiteKey,
    source: Source,
}

/// Events the host delivers, serially
#[derive(Debug, Clone)]
pub enum Event {
    /// New or changed page content
    PageChanged(Page),
    /// Normalized gesture press
    Shortcut(Gesture),
    /// Paging request
    Navigate(Direction, NavQuery),
    /// The user moved the caret
    CaretMoved(Option<NodeId>),
    /// Lift the in-zone paging restriction
    ClearZone,
    Shutdown,
}

/// Module registry and active session
pub struct Engine {
    config: Config,
    store: ModuleStore,
    catalog: Vec<Entry>,
    session: Option<Session>,
}

impl Engine {
    /// Engine backed by the module store in `config.modules_dir`
    ///
    /// Broken module files are skipped and returned.
    pub fn open(config: Config) -> Result<(Self, Vec<RuleError>)> {
        config.validate()?;
        let store = ModuleStore::new(&config.modules_dir);
        let mut engine = Self { config, store, catalog: Vec::new(), session: None };
        let broken = engine.refresh_catalog()?;
        Ok((engine, broken))
    }

    /// Engine over in-memory modules, validated up front
    pub fn with_modules(config: Config, modules: Vec<WebModule>) -> Result<Self> {
        config.validate()?;
        let store = ModuleStore::new(&config.modules_dir);
        let mut catalog = Vec::with_capacity(modules.len());
        for module in modules {
            let loaded = LoadedModule::load(module)?;
            catalog.push(Entry {
                name: loaded.name().to_string(),
                site: loaded.module().site.clone(),
                source: Source::Memory(loaded),
            });
        }
        Ok(Self { config, store, catalog, session: None })
    }

    /// Re-read the store catalog, keeping in-memory modules
    pub fn refresh_catalog(&mut self) -> Result<Vec<RuleError>> {
        let listing = self.store.catalog()?;
        self.catalog.retain(|e| matches!(e.source, Source::Memory(_)));
        for entry in listing.entries {
            self.catalog.push(Entry { name: entry.name, site: entry.site, source: Source::File(entry.path) });
        }
        tracing::info!(modules = self.catalog.len(), broken = listing.broken.len(), "module catalog loaded");
        Ok(listing.broken)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Module names, catalog order
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.catalog.iter().map(|e| e.name.as_str())
    }

    pub fn active_module(&self) -> Option<&str> {
        self.session.as_ref().map(Session::name)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Select the module for a site, loading or unloading as needed
    pub fn navigate(&mut self, url: &str, window_title: &str) -> Result<Option<&str>> {
        let selected = site::select(self.catalog.iter().map(|e| &e.site), url, window_title);
        let wanted = selected.map(|idx| self.catalog[idx].name.clone());

        if wanted.as_deref() == self.active_module() {
            return Ok(self.active_module());
        }

        if let Some(old) = self.session.take() {
            tracing::info!(module = old.name(), url, "web module unloaded");
        }

        let Some(idx) = selected else {
            return Ok(None);
        };
        let module = match &self.catalog[idx].source {
            Source::Memory(loaded) => loaded.clone(),
            Source::File(path) => LoadedModule::load(read_module_file(path)?)?,
        };
        tracing::info!(module = module.name(), url, "web module activated");
        self.session = Some(Session::new(module, &self.config));
        Ok(self.active_module())
    }

    /// New page content; selects the module for it first
    pub fn page_changed(&mut self, page: Page, exec: &mut dyn ActionExecutor, now: Instant) -> Result<()> {
        self.navigate(page.url(), page.window_title())?;
        if let Some(session) = self.session.as_mut() {
            session.page_changed(page, exec, now);
        }
        Ok(())
    }

    /// Gesture press; `Ok(false)` when the active module does not bind it
    pub fn shortcut(&mut self, gesture: &Gesture, exec: &mut dyn ActionExecutor, now: Instant) -> Result<bool> {
        let session = self.session.as_mut().ok_or(EngineError::NoActiveModule)?;
        Ok(session.shortcut(gesture, exec, now))
    }

    /// Paging navigation in the active module
    pub fn navigate_results(
        &mut self,
        direction: Direction,
        query: &NavQuery,
        exec: &mut dyn ActionExecutor,
    ) -> Result<Option<Stop>> {
        let session = self.session.as_mut().ok_or(EngineError::NoActiveModule)?;
        Ok(session.navigate(direction, query, exec))
    }

    /// Fire elapsed timers
    pub fn poll(&mut self, exec: &mut dyn ActionExecutor, now: Instant) {
        if let Some(session) = self.session.as_mut() {
            session.poll(exec, now);
        }
    }

    /// Next time [`Engine::poll`] has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.session.as_ref().and_then(Session::next_deadline)
    }

    /// Dispatch one host event
    pub fn handle(&mut self, event: Event, exec: &mut dyn ActionExecutor, now: Instant) -> Result<()> {
        match event {
            Event::PageChanged(page) => self.page_changed(page, exec, now),
            Event::Shortcut(gesture) => self.shortcut(&gesture, exec, now).map(|_| ()),
            Event::Navigate(direction, query) => self.navigate_results(direction, &query, exec).map(|_| ()),
            Event::CaretMoved(element) => {
                if let Some(session) = self.session.as_mut() {
                    session.set_caret(element);
                }
                Ok(())
            }
            Event::ClearZone => {
                if let Some(session) = self.session.as_mut() {
                    session.clear_zone();
                }
                Ok(())
            }
            Event::Shutdown => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Recorder;
    use webmod_rules::{Criteria, Rule};

    fn modules() -> Vec<WebModule> {
        vec![
            WebModule::new("Mail").with_url("mail.example.com").with_rule(Rule::new("inbox", Criteria::tag("main"))),
            WebModule::new("Shop").with_url("shop.example.com"),
        ]
    }

    #[test]
    fn test_navigate_loads_and_unloads() {
        let mut engine = Engine::with_modules(Config::default(), modules()).unwrap();
        assert_eq!(engine.navigate("https://mail.example.com/", "").unwrap(), Some("Mail"));
        assert_eq!(engine.navigate("https://mail.example.com/other", "").unwrap(), Some("Mail"));
        assert_eq!(engine.navigate("https://shop.example.com/", "").unwrap(), Some("Shop"));
        assert_eq!(engine.navigate("https://elsewhere.org/", "").unwrap(), None);
        assert!(engine.session().is_none());
    }

    #[test]
    fn test_shortcut_without_module() {
        let mut engine = Engine::with_modules(Config::default(), modules()).unwrap();
        let mut exec = Recorder::new();
        let err = engine.shortcut(&Gesture::new("a"), &mut exec, Instant::now()).unwrap_err();
        assert!(matches!(err, EngineError::NoActiveModule));
    }

    #[test]
    fn test_invalid_module_rejected_up_front() {
        let bad = WebModule::new("Bad").with_rule(Rule::new("r", Criteria::tag("a").with_context("ghost")));
        let err = Engine::with_modules(Config::default(), vec![bad]).err().unwrap();
        assert!(matches!(err, EngineError::Rules(RuleError::UnknownContext { .. })));
    }
}

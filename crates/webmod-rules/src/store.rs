//! Module store
//!
//! One JSON file per module, `<name>.json`, in a single directory:
//!
//! ```json
//! { "formatVersion": "1.0",
//!   "WebModule": { "name": "Mail", "url": ["mail.example.com"], "windowTitle": "Inbox" },
//!   "Rules": [ { "name": "Search", "criteria": { "tag": "input" } } ] }
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RuleError};
use crate::module::{validate_name, SiteKey, WebModule, FORMAT_VERSION};
use crate::rule::Rule;
use crate::validate::LoadedModule;

const EXTENSION: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
struct ModuleFile {
    #[serde(rename = "formatVersion", default = "default_version")]
    format_version: String,
    #[serde(rename = "WebModule")]
    meta: ModuleMeta,
    #[serde(rename = "Rules", default)]
    rules: Vec<Rule>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModuleMeta {
    name: String,
    #[serde(flatten)]
    site: SiteKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    help: Option<String>,
}

fn default_version() -> String {
    FORMAT_VERSION.to_string()
}

impl From<ModuleFile> for WebModule {
    fn from(file: ModuleFile) -> Self {
        Self {
            name: file.meta.name,
            site: file.meta.site,
            help: file.meta.help,
            format_version: file.format_version,
            rules: file.rules,
        }
    }
}

impl From<&WebModule> for ModuleFile {
    fn from(module: &WebModule) -> Self {
        Self {
            format_version: module.format_version.clone(),
            meta: ModuleMeta {
                name: module.name.clone(),
                site: module.site.clone(),
                help: module.help.clone(),
            },
            rules: module.rules.clone(),
        }
    }
}

/// Serialize a module to its file format
pub fn to_json(module: &WebModule) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ModuleFile::from(module))
}

/// Parse a module file's contents; `origin` names the source in errors
pub fn from_json(text: &str, origin: &Path) -> Result<WebModule> {
    serde_json::from_str::<ModuleFile>(text)
        .map(WebModule::from)
        .map_err(|e| RuleError::json(origin, e))
}

/// Read a module file anywhere on disk
pub fn read_module_file(path: &Path) -> Result<WebModule> {
    let text = fs::read_to_string(path).map_err(|e| RuleError::io(path, e))?;
    from_json(&text, path)
}

/// Catalog entry: enough to pick a module without loading its rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub site: SiteKey,
    pub path: PathBuf,
}

/// Store listing; unreadable files are reported, not fatal
#[derive(Debug, Default)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
    pub broken: Vec<RuleError>,
}

/// Directory of module files
#[derive(Debug, Clone)]
pub struct ModuleStore {
    dir: PathBuf,
}

impl ModuleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, EXTENSION))
    }

    /// List every module in the store, sorted by file name
    pub fn catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::default();
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(catalog),
            Err(e) => return Err(RuleError::io(&self.dir, e)),
        };

        let mut paths = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| RuleError::io(&self.dir, e))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            match read_module_file(&path) {
                Ok(module) => catalog.entries.push(CatalogEntry {
                    name: module.name,
                    site: module.site,
                    path,
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping broken module file");
                    catalog.broken.push(e);
                }
            }
        }
        Ok(catalog)
    }

    /// Read a module by name
    pub fn get(&self, name: &str) -> Result<WebModule> {
        validate_name(name)?;
        let path = self.path_for(name);
        match fs::read_to_string(&path) {
            Ok(text) => from_json(&text, &path),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RuleError::NotFound(name.to_string())),
            Err(e) => Err(RuleError::io(path, e)),
        }
    }

    /// Read and validate a module by name
    pub fn load(&self, name: &str) -> Result<LoadedModule> {
        let module = self.get(name)?;
        let loaded = LoadedModule::load(module)?;
        tracing::info!(module = name, rules = loaded.len(), "web module loaded");
        Ok(loaded)
    }

    /// Write a new module; an existing one is replaced only when `force`
    pub fn create(&self, module: &WebModule, force: bool) -> Result<()> {
        LoadedModule::load(module.clone())?;
        let path = self.path_for(&module.name);
        if path.exists() && !force {
            return Err(RuleError::DuplicateRef(module.name.clone()));
        }
        self.write(&path, module)?;
        tracing::info!(module = %module.name, "web module created");
        Ok(())
    }

    /// Replace the module stored as `previous_name`, renaming its file when
    /// the module name changed
    pub fn update(&self, previous_name: &str, module: &WebModule) -> Result<()> {
        LoadedModule::load(module.clone())?;
        validate_name(previous_name)?;
        let old_path = self.path_for(previous_name);
        if !old_path.exists() {
            return Err(RuleError::NotFound(previous_name.to_string()));
        }
        let new_path = self.path_for(&module.name);
        let renamed = new_path != old_path;
        if renamed && new_path.exists() {
            return Err(RuleError::DuplicateRef(module.name.clone()));
        }

        self.write(&new_path, module)?;
        if renamed {
            fs::remove_file(&old_path).map_err(|e| RuleError::io(&old_path, e))?;
            tracing::info!(from = previous_name, to = %module.name, "web module renamed");
        }
        Ok(())
    }

    /// Remove a module
    pub fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(module = name, "web module deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RuleError::NotFound(name.to_string())),
            Err(e) => Err(RuleError::io(path, e)),
        }
    }

    fn write(&self, path: &Path, module: &WebModule) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| RuleError::io(&self.dir, e))?;
        let json = to_json(module).map_err(|e| RuleError::json(path, e))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| RuleError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| RuleError::io(path, e))
    }
}

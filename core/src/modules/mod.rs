//! Module resolution
//!
//! Classifies import specifiers, maps them to a file path or URL, reads the
//! module text and keeps the per-interpreter caches. Evaluating a module's
//! source is the executor's job (see `executor::imports`).
//!
//! Specifiers are classified in this order:
//!
//! 1. bare identifier: built-in module (`"os"`)
//! 2. path ending in `.tempo` or `.json`, without a URL scheme: file or JSON
//! 3. `http://` or `https://` URL
//! 4. `owner:name`: package
//!
//! Anything else is rejected with an import error.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ModuleSettings;
use crate::errors::ScriptError;
use crate::executor::stdlib;
use crate::executor::types::Val;

pub mod fetch;

#[cfg(test)]
mod tests;

pub use fetch::{Fetcher, HttpFetcher};

pub const SOURCE_EXTENSION: &str = ".tempo";
pub const JSON_EXTENSION: &str = ".json";
/// Entry file of a package directory
pub const PACKAGE_ENTRY: &str = "main.tempo";

/* ===================== Classification ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModuleKind {
    Builtin,
    File,
    Json,
    Http,
    Package,
}

impl ModuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleKind::Builtin => "builtin",
            ModuleKind::File => "file",
            ModuleKind::Json => "json",
            ModuleKind::Http => "http",
            ModuleKind::Package => "package",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_bare_name(specifier: &str) -> bool {
    let mut chars = specifier.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_package_part(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

pub fn classify(specifier: &str) -> Option<ModuleKind> {
    let has_scheme = specifier.contains("://");
    if is_bare_name(specifier) {
        Some(ModuleKind::Builtin)
    } else if !has_scheme && specifier.ends_with(JSON_EXTENSION) {
        Some(ModuleKind::Json)
    } else if !has_scheme && specifier.ends_with(SOURCE_EXTENSION) {
        Some(ModuleKind::File)
    } else if specifier.starts_with("http://") || specifier.starts_with("https://") {
        Some(ModuleKind::Http)
    } else {
        match specifier.split_once(':') {
            Some((owner, name)) if is_package_part(owner) && is_package_part(name) => {
                Some(ModuleKind::Package)
            }
            _ => None,
        }
    }
}

/// Name a module is bound under by a plain `import "spec";`
pub fn intrinsic_name(specifier: &str, kind: ModuleKind) -> String {
    let raw = match kind {
        ModuleKind::Builtin => specifier,
        ModuleKind::Package => specifier
            .split_once(':')
            .map(|(_, name)| name)
            .unwrap_or(specifier),
        ModuleKind::File | ModuleKind::Json | ModuleKind::Http => {
            let path = specifier.split(['?', '#']).next().unwrap_or(specifier);
            let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
            file.split('.').next().unwrap_or(file)
        }
    };
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/* ===================== Locations ===================== */

/// Where a module's text comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    Path(PathBuf),
    Url(String),
}

impl Location {
    /// Cache key: the resolved path or URL
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn is_json(&self) -> bool {
        match self {
            Location::Path(path) => path.extension().is_some_and(|ext| ext == "json"),
            Location::Url(url) => url.ends_with(JSON_EXTENSION),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Path(path) => write!(f, "{}", path.display()),
            Location::Url(url) => f.write_str(url),
        }
    }
}

/// Identity of the file or module whose code is running
#[derive(Debug, Clone)]
pub struct ModuleOrigin {
    pub name: String,
    pub location: Option<Location>,
}

impl ModuleOrigin {
    /// Origin of a top-level program, with an optional source file
    pub fn entry(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self {
                name: path.display().to_string(),
                location: Some(Location::Path(path.to_path_buf())),
            },
            None => Self {
                name: "<script>".to_string(),
                location: None,
            },
        }
    }

    pub fn from_location(location: &Location) -> Self {
        Self {
            name: location.to_string(),
            location: Some(location.clone()),
        }
    }

    /// Directory that relative file imports resolve against
    fn base_dir(&self) -> Option<PathBuf> {
        match &self.location {
            Some(Location::Path(path)) => path.parent().map(Path::to_path_buf),
            _ => None,
        }
    }

    fn base_url(&self) -> Option<&str> {
        match &self.location {
            Some(Location::Url(url)) => Some(url),
            _ => None,
        }
    }
}

fn join_url(base: &str, relative: &str) -> String {
    let dir = match base.rfind('/') {
        Some(idx) => &base[..=idx],
        None => base,
    };
    format!("{}{}", dir, relative.trim_start_matches("./"))
}

/* ===================== Records & Errors ===================== */

/// A loaded module
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub specifier: String,
    pub kind: ModuleKind,
    /// Resolved path or URL (the specifier itself for built-ins)
    pub key: String,
    pub name: String,
    /// Export object for source modules, parsed data for JSON modules
    pub content: Val,
}

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Unknown built-in module '{0}'")]
    UnknownBuiltin(String),

    #[error("Unrecognized module specifier '{0}'")]
    Unrecognized(String),

    #[error("Cannot find module '{specifier}' (searched {})", .searched.join(", "))]
    NotFound {
        specifier: String,
        searched: Vec<String>,
    },

    #[error("Failed to read '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to fetch '{url}': {message}")]
    Fetch { url: String, message: String },

    #[error("Remote module loading is disabled ('{0}')")]
    RemoteDisabled(String),

    #[error("Invalid JSON in '{location}': {source}")]
    Json {
        location: String,
        source: serde_json::Error,
    },

    #[error("Cyclic import: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

impl From<ModuleError> for ScriptError {
    fn from(err: ModuleError) -> Self {
        ScriptError::import(err.to_string())
    }
}

/* ===================== Resolver ===================== */

/// Per-interpreter module resolver and caches
pub struct ModuleResolver {
    settings: ModuleSettings,
    fetcher: Box<dyn Fetcher>,
    cache: HashMap<String, ModuleRecord>,
    builtins: HashMap<String, Val>,
    loading: Vec<String>,
}

impl ModuleResolver {
    pub fn new(settings: ModuleSettings) -> Self {
        let fetcher = Box::new(HttpFetcher::new(settings.http_timeout()));
        Self {
            settings,
            fetcher,
            cache: HashMap::new(),
            builtins: HashMap::new(),
            loading: Vec::new(),
        }
    }

    pub fn set_fetcher(&mut self, fetcher: Box<dyn Fetcher>) {
        self.fetcher = fetcher;
    }

    pub fn settings(&self) -> &ModuleSettings {
        &self.settings
    }

    /// Built-in module object, created once per interpreter
    pub fn builtin(&mut self, name: &str) -> Result<Val, ModuleError> {
        if let Some(module) = self.builtins.get(name) {
            return Ok(module.clone());
        }
        let module =
            stdlib::builtin_module(name).ok_or_else(|| ModuleError::UnknownBuiltin(name.to_string()))?;
        debug!(module = name, "instantiated built-in module");
        self.builtins.insert(name.to_string(), module.clone());
        Ok(module)
    }

    /// Map a non-builtin specifier to the path or URL it loads from
    pub fn locate(
        &self,
        specifier: &str,
        kind: ModuleKind,
        origin: Option<&ModuleOrigin>,
    ) -> Result<Location, ModuleError> {
        match kind {
            ModuleKind::Builtin => Err(ModuleError::Unrecognized(specifier.to_string())),
            ModuleKind::File | ModuleKind::Json => self.locate_path(specifier, origin),
            ModuleKind::Http => self.remote(specifier.to_string()),
            ModuleKind::Package => self.locate_package(specifier),
        }
    }

    fn remote(&self, url: String) -> Result<Location, ModuleError> {
        if !self.settings.allow_remote {
            return Err(ModuleError::RemoteDisabled(url));
        }
        Ok(Location::Url(url))
    }

    fn locate_path(
        &self,
        specifier: &str,
        origin: Option<&ModuleOrigin>,
    ) -> Result<Location, ModuleError> {
        let path = Path::new(specifier);
        let mut candidates = Vec::new();

        if path.is_absolute() {
            candidates.push(path.to_path_buf());
        } else {
            // Relative imports inside a remote module stay remote
            if let Some(base) = origin.and_then(ModuleOrigin::base_url) {
                return self.remote(join_url(base, specifier));
            }
            let base = origin
                .and_then(ModuleOrigin::base_dir)
                .or_else(|| std::env::current_dir().ok())
                .unwrap_or_default();
            candidates.push(base.join(path));
            candidates.extend(self.settings.search_paths.iter().map(|dir| dir.join(path)));
        }

        for candidate in &candidates {
            if candidate.is_file() {
                let resolved = candidate
                    .canonicalize()
                    .unwrap_or_else(|_| candidate.clone());
                debug!(specifier, path = %resolved.display(), "resolved module path");
                return Ok(Location::Path(resolved));
            }
        }

        Err(ModuleError::NotFound {
            specifier: specifier.to_string(),
            searched: candidates
                .iter()
                .map(|c| c.display().to_string())
                .collect(),
        })
    }

    fn locate_package(&self, specifier: &str) -> Result<Location, ModuleError> {
        let (owner, name) = specifier
            .split_once(':')
            .ok_or_else(|| ModuleError::Unrecognized(specifier.to_string()))?;

        if let Some(dir) = &self.settings.packages_dir {
            let candidate = dir.join(owner).join(name).join(PACKAGE_ENTRY);
            if candidate.is_file() {
                debug!(specifier, path = %candidate.display(), "resolved local package");
                return Ok(Location::Path(candidate));
            }
        }

        let url = format!(
            "{}/{}/{}/{}",
            self.settings.registry_url.trim_end_matches('/'),
            owner,
            name,
            PACKAGE_ENTRY
        );
        self.remote(url)
    }

    /// Read a module's text from disk or over the network
    pub fn read_source(&self, location: &Location) -> Result<String, ModuleError> {
        match location {
            Location::Path(path) => fs::read_to_string(path).map_err(|source| ModuleError::Read {
                path: path.clone(),
                source,
            }),
            Location::Url(url) => {
                if !self.settings.allow_remote {
                    return Err(ModuleError::RemoteDisabled(url.clone()));
                }
                self.fetcher.fetch(url)
            }
        }
    }

    pub fn cached(&self, key: &str) -> Option<ModuleRecord> {
        self.cache.get(key).cloned()
    }

    pub fn store(&mut self, record: ModuleRecord) {
        self.cache.insert(record.key.clone(), record);
    }

    /// Mark `key` as loading; fails if it is already being loaded further up
    pub fn begin_loading(&mut self, key: &str) -> Result<(), ModuleError> {
        if let Some(pos) = self.loading.iter().position(|k| k == key) {
            let mut chain = self.loading[pos..].to_vec();
            chain.push(key.to_string());
            return Err(ModuleError::Cycle(chain));
        }
        self.loading.push(key.to_string());
        Ok(())
    }

    pub fn finish_loading(&mut self, key: &str) {
        if let Some(pos) = self.loading.iter().rposition(|k| k == key) {
            self.loading.remove(pos);
        }
    }

    /// Forget every loaded module
    pub fn clear(&mut self) {
        self.cache.clear();
        self.builtins.clear();
        self.loading.clear();
    }
}

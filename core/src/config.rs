//! Interpreter configuration
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. a TOML file: the explicit `config_path`, else `$TEMPO_CONFIG_PATH`,
//!    else `tempo.toml` in the working directory when present
//! 3. environment variables, `TEMPO__<SECTION>__<KEY>`
//!    (e.g. `TEMPO__MODULES__ALLOW_REMOTE=false`)
//! 4. explicit builder overrides

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "tempo.toml";
pub const CONFIG_PATH_ENV: &str = "TEMPO_CONFIG_PATH";
const ENV_PREFIX: &str = "TEMPO";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub interpreter: InterpreterSettings,
    pub modules: ModuleSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterSettings {
    /// Maximum nesting of user function calls
    pub max_call_depth: usize,
}

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            max_call_depth: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleSettings {
    /// Extra directories searched for relative file imports
    pub search_paths: Vec<PathBuf>,
    /// Local directory holding `<owner>/<name>/main.tempo` packages
    pub packages_dir: Option<PathBuf>,
    /// Registry that packages are fetched from when not found locally
    pub registry_url: String,
    pub allow_remote: bool,
    pub http_timeout_secs: u64,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            packages_dir: None,
            registry_url: "https://registry.tempo-lang.dev/packages".to_string(),
            allow_remote: true,
            http_timeout_secs: 30,
        }
    }
}

impl ModuleSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from the default file and environment
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    max_call_depth: Option<usize>,
    allow_remote: Option<bool>,
    search_paths: Vec<PathBuf>,
}

impl ConfigBuilder {
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn max_call_depth(mut self, depth: Option<usize>) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn allow_remote(mut self, allow: Option<bool>) -> Self {
        self.allow_remote = allow;
        self
    }

    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn build(self) -> Result<Config> {
        let explicit_path = self
            .config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut builder = config::Config::builder();
        builder = match &explicit_path {
            Some(path) => builder.add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Toml)
                    .required(true),
            ),
            None => builder.add_source(
                config::File::new(DEFAULT_CONFIG_FILE, config::FileFormat::Toml).required(false),
            ),
        };
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("modules.search_paths"),
        );

        if let Some(depth) = self.max_call_depth {
            builder = builder.set_override("interpreter.max_call_depth", depth as i64)?;
        }
        if let Some(allow) = self.allow_remote {
            builder = builder.set_override("modules.allow_remote", allow)?;
        }

        let mut config: Config = builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.modules.search_paths.extend(self.search_paths);

        if config.interpreter.max_call_depth == 0 {
            anyhow::bail!("interpreter.max_call_depth must be greater than zero");
        }
        Ok(config)
    }
}

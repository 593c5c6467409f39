//! Configuration discovery and layering.
//!
//! Layers, lowest precedence first:
//! 1. built-in defaults
//! 2. `<dir>/agent.toml`
//! 3. `<dir>/agent.<environment>.toml`
//! 4. `APP_*` environment variables
//! 5. `DEV_APP_*` environment variables (Development only)
//!
//! Both files are optional. Environment keys drop their prefix, are
//! lower-cased, and use `__` between nesting levels:
//! `APP_HEALTH__BIND_ADDRESS=0.0.0.0:8081` sets `health.bind_address`.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::config::schema::AgentConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const FILE_STEM: &str = "agent";
pub const ENV_PREFIX: &str = "APP_";
pub const DEV_ENV_PREFIX: &str = "DEV_APP_";
pub const ENVIRONMENT_VAR: &str = "APP_ENVIRONMENT";
pub const CONFIG_DIR_VAR: &str = "APP_CONFIG_DIR";

const KEY_SEPARATOR: &str = "__";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Syntax { path: PathBuf, source: toml::de::Error },
    Parse(toml::de::Error),
    Defaults(toml::ser::Error),
    Validation(Vec<ValidationError>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            ConfigError::Syntax { path, source } => {
                write!(f, "failed to parse {}: {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "invalid configuration: {}", e),
            ConfigError::Defaults(e) => write!(f, "failed to encode defaults: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Syntax { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Defaults(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Hosting environment name ("Production", "Staging", "Development", ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment(String);

impl Environment {
    pub const PRODUCTION: &'static str = "Production";
    pub const DEVELOPMENT: &'static str = "Development";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_development(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::DEVELOPMENT)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Self::PRODUCTION)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where configuration is read from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    dir: PathBuf,
    environment: Environment,
}

impl ConfigSource {
    pub fn new(dir: impl Into<PathBuf>, environment: Environment) -> Self {
        Self {
            dir: dir.into(),
            environment,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Candidate files, lowest precedence first.
    pub fn files(&self) -> [PathBuf; 2] {
        [
            self.dir.join(format!("{FILE_STEM}.toml")),
            self.dir.join(format!("{FILE_STEM}.{}.toml", self.environment.name())),
        ]
    }

    /// Load from files and the process environment.
    pub fn load(&self) -> Result<AgentConfig, ConfigError> {
        self.load_with_vars(std::env::vars())
    }

    /// Load from files and the given variables.
    pub fn load_with_vars<I>(&self, vars: I) -> Result<AgentConfig, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut merged = match Value::try_from(AgentConfig::default()).map_err(ConfigError::Defaults)? {
            Value::Table(table) => table,
            _ => Table::new(),
        };

        for path in self.files() {
            if let Some(layer) = read_layer(&path)? {
                tracing::debug!(path = %path.display(), "Configuration file loaded");
                merge(&mut merged, layer);
            }
        }

        let vars: Vec<(String, String)> = vars.into_iter().collect();
        apply_env(&mut merged, &vars, ENV_PREFIX);
        if self.environment.is_development() {
            apply_env(&mut merged, &vars, DEV_ENV_PREFIX);
        }

        let config: AgentConfig = Value::Table(merged).try_into().map_err(ConfigError::Parse)?;
        validate_config(&config).map_err(ConfigError::Validation)?;

        Ok(config)
    }
}

fn read_layer(path: &Path) -> Result<Option<Table>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    content
        .parse::<Table>()
        .map(Some)
        .map_err(|source| ConfigError::Syntax {
            path: path.to_path_buf(),
            source,
        })
}

/// Deep-merge `layer` into `base`; tables merge, everything else replaces.
/// Keys match case-insensitively and keep the spelling first seen.
fn merge(base: &mut Table, layer: Table) {
    for (key, value) in layer {
        let key = resolve_key(base, &key);
        match value {
            Value::Table(incoming) => match base.get_mut(&key) {
                Some(Value::Table(existing)) => merge(existing, incoming),
                _ => {
                    base.insert(key, Value::Table(incoming));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

fn apply_env(base: &mut Table, vars: &[(String, String)], prefix: &str) {
    for (name, raw) in vars {
        if name == ENVIRONMENT_VAR || name == CONFIG_DIR_VAR {
            continue;
        }
        let Some(key) = name.strip_prefix(prefix) else {
            continue;
        };
        let path: Vec<String> = key
            .to_ascii_lowercase()
            .split(KEY_SEPARATOR)
            .map(str::to_string)
            .collect();
        if path.iter().any(String::is_empty) {
            tracing::warn!(variable = %name, "Ignoring malformed configuration variable");
            continue;
        }
        if !set_path(base, &path, raw) {
            tracing::warn!(
                variable = %name,
                "Ignoring configuration variable that collides with a section"
            );
        }
    }
}

/// Existing key equal to `key` ignoring ASCII case, else `key` itself.
fn resolve_key(table: &Table, key: &str) -> String {
    table
        .keys()
        .find(|existing| existing.eq_ignore_ascii_case(key))
        .cloned()
        .unwrap_or_else(|| key.to_string())
}

/// Set `raw` at `path`, creating tables as needed. Returns false, leaving
/// `table` untouched, when the path would replace a table with a scalar or
/// nest below an existing scalar.
fn set_path(table: &mut Table, path: &[String], raw: &str) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };

    let mut current = table;
    for segment in parents {
        let key = resolve_key(current, segment);
        let entry = current
            .entry(key)
            .or_insert_with(|| Value::Table(Table::new()));
        current = match entry {
            Value::Table(t) => t,
            _ => return false,
        };
    }

    let key = resolve_key(current, last);
    if current.get(&key).is_some_and(Value::is_table) {
        return false;
    }
    let value = coerce(raw, current.get(&key));
    current.insert(key, value);
    true
}

/// Convert a raw variable to the type already present at its key, or infer
/// one when the key is new. Unparseable values stay strings so the schema
/// reports the type error.
fn coerce(raw: &str, existing: Option<&Value>) -> Value {
    let as_string = || Value::String(raw.to_string());
    match existing {
        Some(Value::String(_)) => as_string(),
        Some(Value::Boolean(_)) => raw.parse().map(Value::Boolean).unwrap_or_else(|_| as_string()),
        Some(Value::Integer(_)) => raw.parse().map(Value::Integer).unwrap_or_else(|_| as_string()),
        Some(Value::Float(_)) => raw.parse().map(Value::Float).unwrap_or_else(|_| as_string()),
        _ => infer(raw),
    }
}

fn infer(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        Value::Boolean(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        Value::Float(f)
    } else {
        Value::String(raw.to_string())
    }
}

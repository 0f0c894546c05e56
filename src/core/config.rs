//! # Configuration Store
//!
//! The `Config` struct holds the merged configuration of one bdebstrap run:
//! the values of every `--config` file followed by the command-line overlay.
//! It is validated once by `check`, normalised by `sanitize_packages` and then
//! only read by the renderer. `save` writes the effective configuration next to
//! the build output so the build can be repeated.

use crate::cli::CommandLineArgs;
use crate::constants::{
    ENV_KEY, ENV_PREFIX, HOOKS_DIR, MMDEBSTRAP_KEY, NAME_KEY, OUTPUT_DIR, SOURCE_DATE_EPOCH,
};
use crate::core::merge::{MergeConflict, dict_merge};
use crate::core::packages;
use crate::models::{HookPhase, Map, Value, ValueError};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// `mmdebstrap` options holding a list of strings.
pub const LIST_KEYS: &[&str] = &[
    "aptopts",
    "architectures",
    "cleanup-hooks",
    "components",
    "customize-hooks",
    "dpkgopts",
    "essential-hooks",
    "extract-hooks",
    "keyrings",
    "mirrors",
    "packages",
    "setup-hooks",
];

/// `mmdebstrap` options holding a single string.
pub const STRING_KEYS: &[&str] = &["format", "hostname", "mode", "suite", "target", "variant"];

/// `mmdebstrap` options holding a boolean.
pub const BOOL_KEYS: &[&str] = &["install-recommends"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file '{path}' not found: {source}")]
    NotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Error parsing YAML in '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration in '{path}': {source}")]
    InvalidDocument {
        path: String,
        #[source]
        source: ValueError,
    },
    #[error("Configuration option '{key}' has type '{found}', but expected '{expected}'.")]
    TypeMismatch {
        key: String,
        found: &'static str,
        expected: &'static str,
    },
    #[error(transparent)]
    Merge(#[from] MergeConflict),
    #[error("Invalid SOURCE_DATE_EPOCH '{0}': expected a non-negative number of seconds.")]
    InvalidSourceDateEpoch(String),
    #[error("Failed to serialize configuration to YAML: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("Failed to write configuration to '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

type ConfigResult<T> = Result<T, ConfigError>;

/// The layered configuration of a bdebstrap run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    values: Map,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.values.get(NAME_KEY).and_then(Value::as_str)
    }

    /// The `mmdebstrap` section, if present and a mapping.
    pub fn mmdebstrap(&self) -> Option<&Map> {
        self.values.get(MMDEBSTRAP_KEY).and_then(Value::as_map)
    }

    /// A string option of the `mmdebstrap` section. Empty strings count as unset.
    pub fn mmdebstrap_str(&self, key: &str) -> Option<&str> {
        self.mmdebstrap()
            .and_then(|section| section.get(key))
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn mmdebstrap_bool(&self, key: &str) -> Option<bool> {
        self.mmdebstrap()
            .and_then(|section| section.get(key))
            .and_then(Value::as_bool)
    }

    /// The string items of a list option of the `mmdebstrap` section.
    /// Non-string items are skipped; `check` rejects them beforehand.
    pub fn mmdebstrap_list(&self, key: &str) -> Vec<&str> {
        self.mmdebstrap()
            .and_then(|section| section.get(key))
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns the `mmdebstrap` section for modification, creating it if needed.
    fn mmdebstrap_mut(&mut self) -> ConfigResult<&mut Map> {
        section_mut(&mut self.values, MMDEBSTRAP_KEY)
    }

    /// Reads a YAML file and merges it into this configuration.
    pub fn load(&mut self, path: &Path) -> ConfigResult<()> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: display.clone(),
                    source: e,
                }
            } else {
                ConfigError::Read {
                    path: display.clone(),
                    source: e,
                }
            }
        })?;
        let document: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: display.clone(),
                source: e,
            })?;
        let value = Value::try_from(document).map_err(|e| ConfigError::InvalidDocument {
            path: display.clone(),
            source: e,
        })?;

        match value {
            Value::Map(map) => {
                log::debug!("Merging configuration from '{}'.", display);
                dict_merge(&mut self.values, map)?;
                Ok(())
            }
            // An empty file contributes nothing.
            Value::Null => Ok(()),
            other => Err(ConfigError::TypeMismatch {
                key: display,
                found: other.kind(),
                expected: "mapping",
            }),
        }
    }

    /// Merges the parsed command line on top of the configuration files.
    ///
    /// Configuration files named on the command line are loaded first, in
    /// order. Options that were not given are skipped. A given-but-empty list
    /// clears the configured list and an empty string removes the option;
    /// non-empty lists are appended and scalars replace the configured value.
    pub fn add_command_line_arguments(&mut self, args: &CommandLineArgs) -> ConfigResult<()> {
        for path in &args.config {
            self.load(path)?;
        }

        let mut overlay = Map::new();

        if let Some(name) = &args.name {
            overlay.insert(NAME_KEY.to_string(), Value::from(name.as_str()));
        }

        if !args.env.is_empty() {
            let env: Map = args
                .env
                .iter()
                .map(|(key, value)| (key.clone(), Value::from(value.as_str())))
                .collect();
            overlay.insert(ENV_KEY.to_string(), Value::Map(env));
        }

        dict_merge(&mut self.values, overlay)?;

        let scalars = [
            ("format", &args.format),
            ("hostname", &args.hostname),
            ("mode", &args.mode),
            ("suite", &args.suite),
            ("target", &args.target),
            ("variant", &args.variant),
        ];
        for (key, value) in scalars {
            if let Some(value) = value {
                self.set_mmdebstrap_scalar(key, value)?;
            }
        }

        let mut lists = vec![
            ("aptopts", args.aptopt.as_ref()),
            ("architectures", args.architectures.as_ref()),
            ("components", args.components.as_ref()),
            ("dpkgopts", args.dpkgopt.as_ref()),
            ("keyrings", args.keyring.as_ref()),
            ("mirrors", args.mirrors.as_ref()),
            ("packages", args.packages.as_ref()),
        ];
        lists.extend(
            HookPhase::ALL
                .iter()
                .map(|phase| (phase.config_key(), args.hooks(*phase))),
        );
        for (key, items) in lists {
            if let Some(items) = items {
                self.add_mmdebstrap_list(key, items)?;
            }
        }

        if args.install_recommends {
            self.mmdebstrap_mut()?
                .insert("install-recommends".to_string(), Value::Bool(true));
        }

        Ok(())
    }

    fn set_mmdebstrap_scalar(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let section = self.mmdebstrap_mut()?;
        if value.is_empty() {
            section.shift_remove(key);
        } else {
            section.insert(key.to_string(), Value::from(value));
        }
        Ok(())
    }

    fn add_mmdebstrap_list(&mut self, key: &str, items: &[String]) -> ConfigResult<()> {
        if items.is_empty() {
            self.mmdebstrap_mut()?
                .insert(key.to_string(), Value::List(Vec::new()));
            return Ok(());
        }
        let mut section = Map::new();
        section.insert(key.to_string(), Value::from(items.to_vec()));
        let mut overlay = Map::new();
        overlay.insert(MMDEBSTRAP_KEY.to_string(), Value::Map(section));
        dict_merge(&mut self.values, overlay)?;
        Ok(())
    }

    /// Validates the shape of the configuration.
    ///
    /// A common authoring mistake is an indentation error that turns a list
    /// item into a nested mapping; it is reported with the offending key.
    pub fn check(&self) -> ConfigResult<()> {
        if let Some(name) = self.values.get(NAME_KEY) {
            expect_kind(NAME_KEY, name, "string", |v| v.as_str().is_some())?;
        }

        if let Some(env) = self.values.get(ENV_KEY) {
            let map = match env {
                Value::Map(map) => map,
                Value::Null => return self.check_mmdebstrap(),
                other => {
                    return Err(ConfigError::TypeMismatch {
                        key: ENV_KEY.to_string(),
                        found: other.kind(),
                        expected: "mapping",
                    });
                }
            };
            for (key, value) in map {
                expect_kind(&format!("{}.{}", ENV_KEY, key), value, "scalar", Value::is_scalar)?;
            }
        }

        self.check_mmdebstrap()
    }

    fn check_mmdebstrap(&self) -> ConfigResult<()> {
        let section = match self.values.get(MMDEBSTRAP_KEY) {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Map(section)) => section,
            Some(other) => {
                return Err(ConfigError::TypeMismatch {
                    key: MMDEBSTRAP_KEY.to_string(),
                    found: other.kind(),
                    expected: "mapping",
                });
            }
        };

        for (key, value) in section {
            let path = format!("{}.{}", MMDEBSTRAP_KEY, key);
            if LIST_KEYS.contains(&key.as_str()) {
                let items = match value {
                    Value::List(items) => items,
                    Value::Null => continue,
                    other => {
                        return Err(ConfigError::TypeMismatch {
                            key: path,
                            found: other.kind(),
                            expected: "list",
                        });
                    }
                };
                for (index, item) in items.iter().enumerate() {
                    expect_kind(&format!("{}[{}]", path, index), item, "string", |v| {
                        v.as_str().is_some()
                    })?;
                }
            } else if STRING_KEYS.contains(&key.as_str()) {
                expect_kind(&path, value, "string", |v| v.as_str().is_some())?;
            } else if BOOL_KEYS.contains(&key.as_str()) {
                expect_kind(&path, value, "boolean", |v| v.as_bool().is_some())?;
            } else {
                log::debug!("Ignoring unknown option '{}'.", path);
            }
        }
        Ok(())
    }

    /// Removes duplicate entries from the package list. See `packages::sanitize`.
    pub fn sanitize_packages(&mut self) -> ConfigResult<()> {
        let packages: Vec<String> = self
            .mmdebstrap_list("packages")
            .into_iter()
            .map(str::to_string)
            .collect();
        if packages.is_empty() {
            return Ok(());
        }
        let sanitized = packages::sanitize(&packages);
        if sanitized != packages {
            log::debug!("Sanitized package list: {:?}", sanitized);
        }
        self.mmdebstrap_mut()?
            .insert("packages".to_string(), Value::from(sanitized));
        Ok(())
    }

    /// Environment variables exported to the hooks, in export order.
    pub fn env_items(&self) -> Vec<(String, String)> {
        let mut items = vec![
            (format!("{}HOOKS", ENV_PREFIX), HOOKS_DIR.to_string()),
            (
                format!("{}NAME", ENV_PREFIX),
                self.name().unwrap_or_default().to_string(),
            ),
            (format!("{}OUTPUT_DIR", ENV_PREFIX), OUTPUT_DIR.to_string()),
        ];
        if let Some(env) = self.values.get(ENV_KEY).and_then(Value::as_map) {
            items.extend(
                env.iter()
                    .filter_map(|(key, value)| value.to_env_string().map(|v| (key.clone(), v))),
            );
        }
        items
    }

    /// The reproducibility epoch (`env.SOURCE_DATE_EPOCH`) in seconds.
    pub fn source_date_epoch(&self) -> ConfigResult<Option<u64>> {
        let value = match self
            .values
            .get(ENV_KEY)
            .and_then(Value::as_map)
            .and_then(|env| env.get(SOURCE_DATE_EPOCH))
        {
            Some(value) => value,
            None => return Ok(None),
        };
        match value {
            Value::Number(n) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| ConfigError::InvalidSourceDateEpoch(n.to_string())),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidSourceDateEpoch(s.clone())),
            other => Err(ConfigError::InvalidSourceDateEpoch(
                other.to_env_string().unwrap_or_else(|| other.kind().to_string()),
            )),
        }
    }

    /// Sets the reproducibility epoch. `None` uses the current time in whole seconds.
    pub fn set_source_date_epoch(&mut self, epoch: Option<u64>) -> ConfigResult<()> {
        let epoch = epoch.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        });
        section_mut(&mut self.values, ENV_KEY)?
            .insert(SOURCE_DATE_EPOCH.to_string(), Value::from(epoch));
        Ok(())
    }

    /// Renders the configuration as a YAML document.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(&self.values).map_err(ConfigError::Serialize)
    }

    /// Writes the configuration to `path`. In dry run the document is only logged.
    pub fn save(&self, path: &Path, dry_run: bool) -> ConfigResult<()> {
        let yaml = self.to_yaml()?;
        if dry_run {
            log::info!(
                "Simulation: not writing configuration to '{}':\n{}",
                path.display(),
                yaml
            );
            return Ok(());
        }
        log::info!("Saving configuration to '{}'.", path.display());
        fs::write(path, yaml).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// Returns the nested mapping stored under `key`, creating it when missing or null.
fn section_mut<'a>(values: &'a mut Map, key: &str) -> ConfigResult<&'a mut Map> {
    let entry = values.entry(key.to_string()).or_insert(Value::Null);
    if matches!(entry, Value::Null) {
        *entry = Value::Map(Map::new());
    }
    let found = entry.kind();
    entry.as_map_mut().ok_or(ConfigError::TypeMismatch {
        key: key.to_string(),
        found,
        expected: "mapping",
    })
}

fn expect_kind(
    key: &str,
    value: &Value,
    expected: &'static str,
    accept: impl Fn(&Value) -> bool,
) -> ConfigResult<()> {
    if accept(value) {
        Ok(())
    } else {
        Err(ConfigError::TypeMismatch {
            key: key.to_string(),
            found: value.kind(),
            expected,
        })
    }
}

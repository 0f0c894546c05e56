// src/models.rs

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Insertion-ordered mapping used for every level of the configuration.
pub type Map = IndexMap<String, Value>;

// --- CONFIGURATION VALUES ---

/// A single node of the configuration tree.
///
/// YAML documents are converted into this type when loaded and converted back
/// when saved. Lists are kept heterogeneous on purpose: a misindented YAML
/// block ends up as a `Map` inside a `List`, which `Config::check` reports.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_yaml::Number),
    String(String),
    List(Vec<Value>),
    Map(Map),
}

#[derive(Error, Debug)]
pub enum ValueError {
    #[error("Mapping keys must be scalars, found a {0}.")]
    UnsupportedKey(&'static str),
}

impl Value {
    /// Human readable name of the variant, used in type-mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "mapping",
        }
    }

    /// Whether the value is a leaf (neither list nor mapping).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Map(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Renders a scalar the way it would appear in a shell environment.
    /// Returns `None` for lists and mappings.
    pub fn to_env_string(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::List(_) | Value::Map(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(value.into())
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::List(value.into_iter().map(Value::String).collect())
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Map(value)
    }
}

/// --- Conversions FROM and TO the YAML document model ---
impl TryFrom<serde_yaml::Value> for Value {
    type Error = ValueError;

    fn try_from(value: serde_yaml::Value) -> Result<Self, Self::Error> {
        Ok(match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(b),
            serde_yaml::Value::Number(n) => Value::Number(n),
            serde_yaml::Value::String(s) => Value::String(s),
            serde_yaml::Value::Sequence(items) => Value::List(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            serde_yaml::Value::Mapping(mapping) => {
                let mut map = Map::with_capacity(mapping.len());
                for (key, item) in mapping {
                    map.insert(yaml_key_to_string(key)?, Value::try_from(item)?);
                }
                Value::Map(map)
            }
            // Tags carry no meaning for the configuration; keep the payload.
            serde_yaml::Value::Tagged(tagged) => Value::try_from(tagged.value)?,
        })
    }
}

fn yaml_key_to_string(key: serde_yaml::Value) -> Result<String, ValueError> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Null => Ok("null".to_string()),
        serde_yaml::Value::Sequence(_) => Err(ValueError::UnsupportedKey("list")),
        serde_yaml::Value::Mapping(_) => Err(ValueError::UnsupportedKey("mapping")),
        serde_yaml::Value::Tagged(tagged) => yaml_key_to_string(tagged.value),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map),
        }
    }
}

// --- LOGGING ---

/// Verbosity selected on the command line.
///
/// It configures the logger of this process and is handed to the renderer,
/// which mirrors it onto the delegate tool's own verbosity flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warning,
    Error,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

// --- HOOKS ---

/// Points in mmdebstrap's lifecycle where a shell command can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Setup,
    Extract,
    Essential,
    Customize,
    Cleanup,
}

impl HookPhase {
    pub const ALL: [HookPhase; 5] = [
        HookPhase::Setup,
        HookPhase::Extract,
        HookPhase::Essential,
        HookPhase::Customize,
        HookPhase::Cleanup,
    ];

    /// Key of the hook list inside the `mmdebstrap` section.
    pub fn config_key(self) -> &'static str {
        match self {
            HookPhase::Setup => "setup-hooks",
            HookPhase::Extract => "extract-hooks",
            HookPhase::Essential => "essential-hooks",
            HookPhase::Customize => "customize-hooks",
            HookPhase::Cleanup => "cleanup-hooks",
        }
    }

    /// The mmdebstrap option used to pass hooks of this phase.
    /// mmdebstrap has no cleanup phase, so cleanup hooks run as the last customize hooks.
    pub fn mmdebstrap_option(self) -> &'static str {
        match self {
            HookPhase::Setup => "setup-hook",
            HookPhase::Extract => "extract-hook",
            HookPhase::Essential => "essential-hook",
            HookPhase::Customize | HookPhase::Cleanup => "customize-hook",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_conversion_keeps_key_order() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("zeta: 1\nalpha: [a, b]\nmid: {x: true}\n").unwrap();
        let value = Value::try_from(yaml).unwrap();
        let map = value.as_map().unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(
            map.get("alpha"),
            Some(&Value::from(vec!["a".to_string(), "b".to_string()]))
        );
        assert_eq!(
            map.get("mid").and_then(Value::as_map).and_then(|m| m.get("x")),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn test_non_scalar_key_is_rejected() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("? [a, b]\n: value\n").unwrap();
        let result = Value::try_from(yaml);
        assert!(matches!(result, Err(ValueError::UnsupportedKey("list"))));
    }

    #[test]
    fn test_env_string_rendering() {
        assert_eq!(Value::from(42u64).to_env_string().as_deref(), Some("42"));
        assert_eq!(Value::Bool(false).to_env_string().as_deref(), Some("false"));
        assert_eq!(Value::List(Vec::new()).to_env_string(), None);
    }

    #[test]
    fn test_cleanup_hooks_render_as_customize_hooks() {
        assert_eq!(HookPhase::Cleanup.mmdebstrap_option(), "customize-hook");
        assert_eq!(HookPhase::Cleanup.config_key(), "cleanup-hooks");
    }
}

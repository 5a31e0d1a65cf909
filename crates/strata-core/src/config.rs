//! Configuration loading.
//!
//! Configurations are JSON objects with a discriminator key naming the
//! configuration kind. Config files may contain `#` end-of-line comments and
//! tabs; both are stripped before parsing. Parse and shape problems are
//! fatal at setup time and surfaced as [`ConfigError`].

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

/// Root application configuration kind.
pub const KIND_GLASS: &str = "Glass";
/// Input stage configuration kind.
pub const KIND_GLASS_INPUT: &str = "GlassInput";
/// Output stage configuration kind.
pub const KIND_GLASS_OUTPUT: &str = "GlassOutput";
/// Travel-time table generator configuration kind.
pub const KIND_TRAVEL_TIMES: &str = "gen-travel-times-app";

/// True for the configuration kinds this codebase knows about.
pub fn is_recognized_kind(kind: &str) -> bool {
    matches!(kind, KIND_GLASS | KIND_GLASS_INPUT | KIND_GLASS_OUTPUT | KIND_TRAVEL_TIMES)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("empty configuration string")]
    Empty,
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("configuration is not a JSON object")]
    NotAnObject,
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A parsed configuration object.
#[derive(Debug, Clone)]
pub struct Config {
    json: Value,
}

impl Config {
    /// Loads and parses `dir/name` (or just `name` when `dir` is empty).
    pub fn from_file(dir: &str, name: &str) -> Result<Self, ConfigError> {
        let path = if dir.is_empty() {
            name.to_string()
        } else {
            Path::new(dir).join(name).to_string_lossy().into_owned()
        };
        let contents = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
        log::debug!("config: loaded {path}");
        Self::from_str(&contents)
    }

    /// Parses a configuration string, stripping comments and tabs first.
    pub fn from_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.is_empty() {
            return Err(ConfigError::Empty);
        }

        let mut stripped = String::with_capacity(raw.len());
        for line in raw.lines() {
            let line = line.replace('\t', "");
            // '#' starts a comment running to end of line
            let keep = match line.find('#') {
                Some(0) => "",
                Some(position) => &line[..position],
                None => &line[..],
            };
            if !keep.is_empty() {
                stripped.push_str(keep);
            }
        }

        if stripped.trim().is_empty() {
            return Err(ConfigError::Empty);
        }

        let json: Value = serde_json::from_str(&stripped)?;
        if !json.is_object() {
            return Err(ConfigError::NotAnObject);
        }
        Ok(Self { json })
    }

    pub fn json(&self) -> &Value {
        &self.json
    }

    /// The configuration kind from the discriminator key. `Cmd` is the
    /// current spelling; `Configuration` is accepted as the legacy one.
    pub fn kind(&self) -> Option<&str> {
        self.json
            .get("Cmd")
            .or_else(|| self.json.get("Configuration"))
            .and_then(Value::as_str)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.json.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.json.get(key).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.json.get(key).and_then(Value::as_bool)
    }

    pub fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.json.get(key).and_then(Value::as_array)
    }
}

/// Checks a free-form config value's discriminator against an expected kind.
pub fn value_kind(config: &Value) -> Option<&str> {
    config
        .get("Cmd")
        .or_else(|| config.get("Configuration"))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let config = Config::from_str(r#"{"Cmd":"Glass","Key":1}"#).unwrap();
        assert_eq!(config.kind(), Some("Glass"));
        assert_eq!(config.get_i64("Key"), Some(1));
    }

    #[test]
    fn strips_comments_and_tabs() {
        let raw = "{\"Cmd\":\"Glass\", # trailing comment\n\t\"Key\":1}";
        let config = Config::from_str(raw).unwrap();
        assert_eq!(config.kind(), Some("Glass"));
        assert_eq!(config.get_i64("Key"), Some(1));

        let raw = "# full line comment\n{\"Cmd\":\"GlassInput\"}";
        let config = Config::from_str(raw).unwrap();
        assert_eq!(config.kind(), Some("GlassInput"));
    }

    #[test]
    fn accepts_legacy_discriminator() {
        let config = Config::from_str(r#"{"Configuration":"GlassOutput"}"#).unwrap();
        assert_eq!(config.kind(), Some("GlassOutput"));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(Config::from_str(""), Err(ConfigError::Empty)));
        assert!(matches!(Config::from_str("# only a comment"), Err(ConfigError::Empty)));
        assert!(matches!(Config::from_str("{not json"), Err(ConfigError::Parse(_))));
        assert!(matches!(Config::from_str("[1,2,3]"), Err(ConfigError::NotAnObject)));
    }

    #[test]
    fn recognized_kinds() {
        assert!(is_recognized_kind("Glass"));
        assert!(is_recognized_kind("GlassInput"));
        assert!(is_recognized_kind("GlassOutput"));
        assert!(is_recognized_kind("gen-travel-times-app"));
        assert!(!is_recognized_kind("GlassFrobnicator"));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glass.d");
        std::fs::write(&path, "{\"Cmd\":\"Glass\", # comment\n\"ConfigDirectory\":\"./\"}")
            .unwrap();

        let config =
            Config::from_file(dir.path().to_str().unwrap(), "glass.d").unwrap();
        assert_eq!(config.kind(), Some("Glass"));
        assert_eq!(config.get_str("ConfigDirectory"), Some("./"));

        assert!(matches!(
            Config::from_file(dir.path().to_str().unwrap(), "missing.d"),
            Err(ConfigError::Io { .. })
        ));
    }
}

//! Shared configuration loader for the richdoc toolchain.
//!
//! `defaults/richdoc.default.toml` is embedded into every binary so that docs
//! and runtime behavior stay in sync. Applications layer user-specific files on
//! top of those defaults via [`Loader`] before deserializing into
//! [`RichdocConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use richdoc::format::ParseContext;
use richdoc::formats::markdown::SerializeOptions;
use richdoc::model::VariableDef;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/richdoc.default.toml");

/// Top-level configuration consumed by richdoc applications.
#[derive(Debug, Clone, Deserialize)]
pub struct RichdocConfig {
    pub parse: ParseConfig,
    pub serialize: SerializeConfig,
    #[serde(default)]
    pub variables: Vec<VariableConfig>,
}

/// One `[[variables]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VariableConfig {
    pub api_name: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: String,
}

impl From<&VariableConfig> for VariableDef {
    fn from(config: &VariableConfig) -> Self {
        VariableDef {
            api_name: config.api_name.clone(),
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            kind: config.kind.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParseConfig {
    pub markdown_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SerializeConfig {
    pub markdown_enabled: bool,
}

impl RichdocConfig {
    /// Parser inputs carried by this configuration.
    pub fn parse_context(&self) -> ParseContext {
        ParseContext {
            variables: self.variables.iter().map(VariableDef::from).collect(),
            markdown_enabled: self.parse.markdown_enabled,
        }
    }

    pub fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions {
            markdown_enabled: self.serialize.markdown_enabled,
            variables: self.variables.iter().map(VariableDef::from).collect(),
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<RichdocConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<RichdocConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert!(config.parse.markdown_enabled);
        assert!(config.serialize.markdown_enabled);
        assert!(config.variables.is_empty());
        assert_eq!(config.parse_context(), ParseContext::default());
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("parse.markdown_enabled", false)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert!(!config.parse_context().markdown_enabled);
        assert!(config.serialize_options().markdown_enabled);
    }

    #[test]
    fn reads_variables_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            "[[variables]]\napi_name = \"first_name\"\ntitle = \"First name\"\n"
        )
        .expect("write config");

        let config = Loader::new()
            .with_file(file.path())
            .build()
            .expect("config to build");
        assert_eq!(
            config.parse_context().variables,
            vec![VariableDef::new("first_name", "First name")]
        );
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = Loader::new()
            .with_file("/definitely/not/here/richdoc.toml")
            .build();
        assert!(result.is_err());
    }
}

//! Contexts of the `ocm` command line, kept in `~/.ocm/config`.
//!
//! A context names an API server and the token used to talk to it. The
//! `OCM_URL` and `OCM_TOKEN` environment variables take precedence over the
//! current context.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API server used when no context is selected
pub const DEFAULT_URL: &str = "https://api.openshift.com";

/// Default config file location: ~/.ocm/config
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ocm")
        .join("config")
}

/// Errors that can occur during config operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Context '{0}' not found")]
    ContextNotFound(String),

    #[error("No current context set")]
    NoCurrentContext,

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Failed to write config: {0}")]
    WriteError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A named API server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    /// URL of the API server (e.g., "https://api.openshift.com")
    pub url: String,
    /// Bearer token sent with every request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The complete configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Currently active context name
    #[serde(rename = "current-context")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_context: Option<String>,

    /// Map of context name to context definition
    #[serde(default)]
    pub contexts: BTreeMap<String, Context>,
}

/// Where commands send their requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub url: String,
    pub token: Option<String>,
}

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

/// Parse config from YAML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Serialize config to YAML string
pub fn serialize_config(config: &Config) -> Result<String, ConfigError> {
    serde_yaml::to_string(config).map_err(|e| ConfigError::WriteError(e.to_string()))
}

/// Add or update a context in the config
pub fn add_context(config: &mut Config, context: Context) {
    config.contexts.insert(context.name.clone(), context);
}

/// Remove a context from the config
pub fn remove_context(config: &mut Config, name: &str) -> Option<Context> {
    let removed = config.contexts.remove(name);
    if config.current_context.as_deref() == Some(name) {
        config.current_context = None;
    }
    removed
}

/// Set the current context
pub fn set_current_context(config: &mut Config, name: &str) -> Result<(), ConfigError> {
    if !config.contexts.contains_key(name) {
        return Err(ConfigError::ContextNotFound(name.to_string()));
    }
    config.current_context = Some(name.to_string());
    Ok(())
}

/// Get the current context
pub fn get_current_context(config: &Config) -> Result<&Context, ConfigError> {
    let name = config
        .current_context
        .as_deref()
        .ok_or(ConfigError::NoCurrentContext)?;
    get_context(config, name)
}

/// Get a context by name
pub fn get_context<'a>(config: &'a Config, name: &str) -> Result<&'a Context, ConfigError> {
    config
        .contexts
        .get(name)
        .ok_or_else(|| ConfigError::ContextNotFound(name.to_string()))
}

/// List all context names, sorted
pub fn list_contexts(config: &Config) -> Vec<&str> {
    config.contexts.keys().map(|s| s.as_str()).collect()
}

// ============================================================================
// I/O boundary functions
// ============================================================================

/// Load config from the default location
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&default_config_path())
}

/// Load config from a specific path. A missing file is an empty config.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Save config to the default location
pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    save_config_to(config, &default_config_path())
}

/// Save config to a specific path
pub fn save_config_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serialize_config(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

impl Config {
    /// Resolves the endpoint of a command.
    ///
    /// Explicit values (flags or environment) win over the current context;
    /// without either the default public API is used.
    pub fn endpoint(
        &self,
        url: Option<&str>,
        token: Option<&str>,
    ) -> Result<Endpoint, ConfigError> {
        let current = match self.current_context.as_deref() {
            Some(name) => Some(get_context(self, name)?),
            None => None,
        };

        let url = url
            .map(str::to_string)
            .or_else(|| current.map(|c| c.url.clone()))
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        let token = token
            .map(str::to_string)
            .or_else(|| current.and_then(|c| c.token.clone()));

        Ok(Endpoint { url, token })
    }
}

impl Context {
    /// Create a new context
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            token: None,
            description: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
current-context: staging
contexts:
  staging:
    name: staging
    url: https://api.stage.openshift.com
    token: secret123
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.current_context.as_deref(), Some("staging"));
        assert_eq!(
            config.contexts["staging"].token.as_deref(),
            Some("secret123")
        );
    }

    #[test]
    fn test_parse_empty_config() {
        assert_eq!(parse_config("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = parse_config("contexts: [1, 2");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_serialize_config() {
        let mut config = Config::default();
        add_context(
            &mut config,
            Context::new("local", "http://localhost:8000").with_token("key123"),
        );
        set_current_context(&mut config, "local").unwrap();

        let yaml = serialize_config(&config).unwrap();
        assert!(yaml.contains("current-context: local"));
        assert!(yaml.contains("url: http://localhost:8000"));
    }

    #[test]
    fn test_remove_current_context() {
        let mut config = Config::default();
        add_context(&mut config, Context::new("test", "http://localhost:8000"));
        set_current_context(&mut config, "test").unwrap();

        assert!(remove_context(&mut config, "test").is_some());
        assert!(config.current_context.is_none());
        assert!(remove_context(&mut config, "test").is_none());
    }

    #[test]
    fn test_set_current_context_not_found() {
        let mut config = Config::default();
        let result = set_current_context(&mut config, "nonexistent");
        assert!(matches!(result, Err(ConfigError::ContextNotFound(_))));
        assert!(matches!(
            get_current_context(&config),
            Err(ConfigError::NoCurrentContext)
        ));
    }

    #[test]
    fn test_list_contexts_sorted() {
        let mut config = Config::default();
        add_context(&mut config, Context::new("prod", "https://a"));
        add_context(&mut config, Context::new("dev", "https://b"));
        assert_eq!(list_contexts(&config), vec!["dev", "prod"]);
    }

    #[test]
    fn test_endpoint_resolution() {
        let config = Config::default();
        let endpoint = config.endpoint(None, None).unwrap();
        assert_eq!(endpoint.url, DEFAULT_URL);
        assert!(endpoint.token.is_none());

        let mut config = Config::default();
        add_context(
            &mut config,
            Context::new("local", "http://localhost:8000").with_token("from-context"),
        );
        set_current_context(&mut config, "local").unwrap();

        let endpoint = config.endpoint(None, None).unwrap();
        assert_eq!(endpoint.url, "http://localhost:8000");
        assert_eq!(endpoint.token.as_deref(), Some("from-context"));

        let endpoint = config
            .endpoint(Some("http://override:9000"), Some("from-env"))
            .unwrap();
        assert_eq!(endpoint.url, "http://override:9000");
        assert_eq!(endpoint.token.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_endpoint_with_dangling_context() {
        let config = Config {
            current_context: Some("gone".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.endpoint(None, None),
            Err(ConfigError::ContextNotFound(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config");

        assert_eq!(load_config_from(&path).unwrap(), Config::default());

        let mut config = Config::default();
        add_context(
            &mut config,
            Context::new("prod", "https://api.openshift.com").with_description("Production"),
        );
        set_current_context(&mut config, "prod").unwrap();
        save_config_to(&config, &path).unwrap();

        assert_eq!(load_config_from(&path).unwrap(), config);
    }
}

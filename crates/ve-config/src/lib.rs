//! Configuration management for the view directive engine.
//!
//! Parses `ve.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Settings are resolved in this order, later sources winning:
//!
//! 1. the configuration file (with `${VAR}` expansion),
//! 2. well-known environment variables for fields the file left empty,
//! 3. [`Overrides`] supplied by the caller.
//!
//! The result is validated before it is returned, so an invalid configuration
//! is reported before any wiki page is read.
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `incquery.server`, `incquery.username`, `incquery.password`
//! - `confluence.server`, `confluence.username`, `confluence.password`
//! - `sparql.endpoint`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

use expand::{env_var, expand_env, expand_opt};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "ve.toml";

/// Caller-supplied settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct Overrides {
    /// Override IncQuery server URL.
    pub incquery_server: Option<String>,
    /// Override Confluence server URL.
    pub confluence_server: Option<String>,
    /// Override SPARQL endpoint URL.
    pub sparql_endpoint: Option<String>,
    /// Override Confluence space key.
    pub space: Option<String>,
    /// Override the set of pages to process.
    pub pages: Option<Vec<String>>,
    /// Use this IncQuery compartment URI (replaces any MOPID).
    pub compartment: Option<String>,
    /// Use this MMS `org/project#ref` qualifier (replaces any compartment).
    pub mopid: Option<String>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IncQuery server configuration.
    pub incquery: IncQueryConfig,
    /// Confluence server configuration.
    pub confluence: ConfluenceConfig,
    /// SPARQL endpoint configuration.
    pub sparql: SparqlConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Username/password pair for a collaborator service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// IncQuery server configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IncQueryConfig {
    /// Server URL.
    pub server: String,
    /// Account name.
    pub username: Option<String>,
    /// Account password.
    pub password: Option<String>,
    /// Compartment URI to query.
    pub compartment: Option<String>,
    /// MMS `org/project#ref` qualifier, used when no compartment is given.
    pub mopid: Option<String>,
}

impl IncQueryConfig {
    /// Credentials, if configured.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        credentials(self.username.as_ref(), self.password.as_ref())
    }

    /// Resolve the configured query target.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if neither or both of `compartment`
    /// and `mopid` are set, or the MOPID is malformed.
    pub fn target(&self) -> Result<IncQueryTarget, ConfigError> {
        match (self.compartment.as_deref(), self.mopid.as_deref()) {
            (Some(uri), None) => {
                require_non_empty(uri, "incquery.compartment")?;
                Ok(IncQueryTarget::Compartment(uri.to_owned()))
            }
            (None, Some(mopid)) => IncQueryTarget::parse_mopid(mopid),
            (Some(_), Some(_)) => Err(ConfigError::Validation(
                "incquery.compartment and incquery.mopid are mutually exclusive".into(),
            )),
            (None, None) => Err(ConfigError::Validation(
                "either incquery.compartment or incquery.mopid is required".into(),
            )),
        }
    }
}

/// What the IncQuery client should query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncQueryTarget {
    /// An explicit compartment URI.
    Compartment(String),
    /// An MMS organization / project, optionally pinned to a ref.
    Project {
        /// Organization id.
        org: String,
        /// Project id.
        project: String,
        /// Branch or tag ref.
        git_ref: Option<String>,
    },
}

impl IncQueryTarget {
    /// Parse an `org/project` or `org/project#ref` qualifier.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the org or project is missing.
    pub fn parse_mopid(mopid: &str) -> Result<Self, ConfigError> {
        let invalid = || {
            ConfigError::Validation(format!(
                "incquery.mopid must look like org/project or org/project#ref, got \"{mopid}\""
            ))
        };

        let (path, git_ref) = match mopid.split_once('#') {
            Some((path, git_ref)) => (path, Some(git_ref)),
            None => (mopid, None),
        };
        let (org, project) = path.split_once('/').ok_or_else(invalid)?;
        if org.is_empty() || project.is_empty() {
            return Err(invalid());
        }

        Ok(Self::Project {
            org: org.to_owned(),
            project: project.to_owned(),
            git_ref: git_ref.filter(|r| !r.is_empty()).map(str::to_owned),
        })
    }
}

/// Confluence server configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    /// Server base URL.
    pub server: String,
    /// Account name.
    pub username: Option<String>,
    /// Account password.
    pub password: Option<String>,
    /// Space key whose pages are processed.
    pub space: String,
    /// Page ids to process. Empty means every page with directives.
    pub pages: Vec<String>,
}

impl ConfluenceConfig {
    /// Credentials, if configured.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        credentials(self.username.as_ref(), self.password.as_ref())
    }

    /// URL of the space, as used for the space graph IRI.
    #[must_use]
    pub fn space_url(&self) -> String {
        format!("{}/display/{}", self.server.trim_end_matches('/'), self.space)
    }
}

/// SPARQL endpoint configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SparqlConfig {
    /// Endpoint URL.
    pub endpoint: String,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`incquery.password`").
        field: String,
        /// Error message (e.g., "${`INCQUERY_PASS`} not set").
        message: String,
    },
}

fn credentials(username: Option<&String>, password: Option<&String>) -> Option<Credentials> {
    match (username, password) {
        (Some(username), Some(password)) if !username.is_empty() => Some(Credentials {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    }
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    require_non_empty(url, field)?;
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Require username and password to be set together.
fn require_paired(
    username: Option<&String>,
    password: Option<&String>,
    section: &str,
) -> Result<(), ConfigError> {
    let set = |v: Option<&String>| v.is_some_and(|s| !s.is_empty());
    if set(username) != set(password) {
        return Err(ConfigError::Validation(format!(
            "{section}.username and {section}.password must be set together"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional overrides.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `ve.toml` in current directory and parents,
    /// falling back to an empty configuration filled from the environment.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing or
    /// expansion fails, or the resolved configuration is invalid.
    pub fn load(config_path: Option<&Path>, overrides: Option<&Overrides>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        config.apply_environment();

        if let Some(overrides) = overrides {
            config.apply_overrides(overrides);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text and expand environment references.
    ///
    /// Does not consult the process environment for fallbacks and does not
    /// validate; see [`Config::load`].
    ///
    /// # Errors
    ///
    /// Returns error if parsing or expansion fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_env_vars()?;
        Ok(config)
    }

    /// Validate the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_http_url(&self.incquery.server, "incquery.server")?;
        require_http_url(&self.confluence.server, "confluence.server")?;
        require_http_url(&self.sparql.endpoint, "sparql.endpoint")?;
        require_non_empty(&self.confluence.space, "confluence.space")?;
        require_paired(
            self.incquery.username.as_ref(),
            self.incquery.password.as_ref(),
            "incquery",
        )?;
        require_paired(
            self.confluence.username.as_ref(),
            self.confluence.password.as_ref(),
            "confluence",
        )?;
        self.incquery.target()?;
        Ok(())
    }

    /// Apply overrides to the configuration.
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(server) = &overrides.incquery_server {
            self.incquery.server.clone_from(server);
        }
        if let Some(server) = &overrides.confluence_server {
            self.confluence.server.clone_from(server);
        }
        if let Some(endpoint) = &overrides.sparql_endpoint {
            self.sparql.endpoint.clone_from(endpoint);
        }
        if let Some(space) = &overrides.space {
            self.confluence.space.clone_from(space);
        }
        if let Some(pages) = &overrides.pages {
            self.confluence.pages.clone_from(pages);
        }
        if let Some(compartment) = &overrides.compartment {
            self.incquery.compartment = Some(compartment.clone());
            self.incquery.mopid = None;
        }
        if let Some(mopid) = &overrides.mopid {
            self.incquery.mopid = Some(mopid.clone());
            self.incquery.compartment = None;
        }
    }

    /// Fill fields left empty by the file from well-known environment variables.
    fn apply_environment(&mut self) {
        fill(&mut self.incquery.server, "INCQUERY_SERVER");
        fill_opt(&mut self.incquery.username, "INCQUERY_USER");
        fill_opt(&mut self.incquery.password, "INCQUERY_PASS");
        fill(&mut self.confluence.server, "CONFLUENCE_SERVER");
        fill_opt(&mut self.confluence.username, "CONFLUENCE_USER");
        fill_opt(&mut self.confluence.password, "CONFLUENCE_PASS");
        fill(&mut self.sparql.endpoint, "SPARQL_ENDPOINT");
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.incquery.server = expand_env(&self.incquery.server, "incquery.server")?;
        expand_opt(&mut self.incquery.username, "incquery.username")?;
        expand_opt(&mut self.incquery.password, "incquery.password")?;
        self.confluence.server = expand_env(&self.confluence.server, "confluence.server")?;
        expand_opt(&mut self.confluence.username, "confluence.username")?;
        expand_opt(&mut self.confluence.password, "confluence.password")?;
        self.sparql.endpoint = expand_env(&self.sparql.endpoint, "sparql.endpoint")?;
        Ok(())
    }
}

fn fill(field: &mut String, var: &str) {
    if field.is_empty()
        && let Some(value) = env_var(var)
    {
        *field = value;
    }
}

fn fill_opt(field: &mut Option<String>, var: &str) {
    if field.as_deref().is_none_or(str::is_empty)
        && let Some(value) = env_var(var)
    {
        *field = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid_config() -> Config {
        Config::from_toml(
            r#"
[incquery]
server = "https://incquery.example.com"
compartment = "https://mms.example.com/orgs/o/projects/p"

[confluence]
server = "https://wiki.example.com"
space = "DOCS"

[sparql]
endpoint = "https://sparql.example.com/sparql"
"#,
        )
        .unwrap()
    }

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(msg.contains(s), "Expected error to contain '{s}', got: {msg}");
        }
    }

    #[test]
    fn test_default_config_is_invalid() {
        let config = Config::default();
        assert_validation_error(&config, &["incquery.server", "empty"]);
    }

    #[test]
    fn test_parse_full_config() {
        let config = valid_config();
        assert_eq!(config.incquery.server, "https://incquery.example.com");
        assert_eq!(config.confluence.space, "DOCS");
        assert!(config.confluence.pages.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_space_url() {
        let mut config = valid_config();
        config.confluence.server = "https://wiki.example.com/".to_owned();
        assert_eq!(
            config.confluence.space_url(),
            "https://wiki.example.com/display/DOCS"
        );
    }

    #[test]
    fn test_validate_invalid_scheme() {
        let mut config = valid_config();
        config.sparql.endpoint = "ftp://sparql.example.com".to_owned();
        assert_validation_error(&config, &["sparql.endpoint", "http"]);
    }

    #[test]
    fn test_validate_space_required() {
        let mut config = valid_config();
        config.confluence.space = String::new();
        assert_validation_error(&config, &["confluence.space"]);
    }

    #[test]
    fn test_validate_unpaired_credentials() {
        let mut config = valid_config();
        config.confluence.username = Some("bot".to_owned());
        assert_validation_error(&config, &["confluence.username", "together"]);
    }

    #[test]
    fn test_credentials_when_paired() {
        let mut config = valid_config();
        config.incquery.username = Some("bot".to_owned());
        config.incquery.password = Some("secret".to_owned());
        assert_eq!(
            config.incquery.credentials(),
            Some(Credentials {
                username: "bot".to_owned(),
                password: "secret".to_owned(),
            })
        );
        assert!(config.confluence.credentials().is_none());
    }

    #[test]
    fn test_validate_target_required() {
        let mut config = valid_config();
        config.incquery.compartment = None;
        assert_validation_error(&config, &["compartment", "mopid"]);
    }

    #[test]
    fn test_validate_target_exclusive() {
        let mut config = valid_config();
        config.incquery.mopid = Some("org/project".to_owned());
        assert_validation_error(&config, &["mutually exclusive"]);
    }

    #[test]
    fn test_parse_mopid_with_ref() {
        assert_eq!(
            IncQueryTarget::parse_mopid("jpl/europa#master").unwrap(),
            IncQueryTarget::Project {
                org: "jpl".to_owned(),
                project: "europa".to_owned(),
                git_ref: Some("master".to_owned()),
            }
        );
    }

    #[test]
    fn test_parse_mopid_without_ref() {
        assert_eq!(
            IncQueryTarget::parse_mopid("jpl/europa#").unwrap(),
            IncQueryTarget::Project {
                org: "jpl".to_owned(),
                project: "europa".to_owned(),
                git_ref: None,
            }
        );
    }

    #[test]
    fn test_parse_mopid_invalid() {
        assert!(IncQueryTarget::parse_mopid("europa").is_err());
        assert!(IncQueryTarget::parse_mopid("/europa").is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = valid_config();
        let overrides = Overrides {
            sparql_endpoint: Some("http://localhost:7200/sparql".to_owned()),
            pages: Some(vec!["42".to_owned()]),
            mopid: Some("org/project".to_owned()),
            ..Default::default()
        };

        config.apply_overrides(&overrides);

        assert_eq!(config.sparql.endpoint, "http://localhost:7200/sparql");
        assert_eq!(config.confluence.pages, vec!["42".to_owned()]);
        assert!(config.incquery.compartment.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_overrides_empty() {
        let mut config = valid_config();
        config.apply_overrides(&Overrides::default());
        assert_eq!(config.confluence.server, "https://wiki.example.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_expand_env_vars_credentials() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("VE_TEST_CONFLUENCE_PASS", "hunter2");
        }

        let config = Config::from_toml(
            r#"
[confluence]
username = "${VE_TEST_CONFLUENCE_USER:-bot}"
password = "${VE_TEST_CONFLUENCE_PASS}"
"#,
        )
        .unwrap();

        assert_eq!(config.confluence.username.as_deref(), Some("bot"));
        assert_eq!(config.confluence.password.as_deref(), Some("hunter2"));

        unsafe {
            std::env::remove_var("VE_TEST_CONFLUENCE_PASS");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MISSING_VAR_VE_CONFIG_TEST");
        }

        let err = Config::from_toml(
            r#"
[sparql]
endpoint = "${MISSING_VAR_VE_CONFIG_TEST}"
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("MISSING_VAR_VE_CONFIG_TEST"));
        assert!(err.to_string().contains("sparql.endpoint"));
    }

    #[test]
    fn test_fill_from_environment_only_when_empty() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("VE_TEST_FILL", "https://from-env.example.com");
        }

        let mut empty = String::new();
        fill(&mut empty, "VE_TEST_FILL");
        assert_eq!(empty, "https://from-env.example.com");

        let mut set = "https://from-file.example.com".to_owned();
        fill(&mut set, "VE_TEST_FILL");
        assert_eq!(set, "https://from-file.example.com");

        unsafe {
            std::env::remove_var("VE_TEST_FILL");
        }
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/ve.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_from_file_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[incquery]
server = "https://incquery.example.com"
mopid = "jpl/europa"

[confluence]
server = "https://wiki.example.com"
space = "DOCS"

[sparql]
endpoint = "https://sparql.example.com/sparql"
"#,
        )
        .unwrap();

        let overrides = Overrides {
            space: Some("OTHER".to_owned()),
            ..Default::default()
        };
        let config = Config::load(Some(&path), Some(&overrides)).unwrap();

        assert_eq!(config.confluence.space, "OTHER");
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(
            config.incquery.target().unwrap(),
            IncQueryTarget::Project {
                org: "jpl".to_owned(),
                project: "europa".to_owned(),
                git_ref: None,
            }
        );
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[incquery]
server = "incquery.example.com"
"#,
        )
        .unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}

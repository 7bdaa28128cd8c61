//! Configuration management for azdo.
//!
//! Configuration is assembled from three sources, later ones winning:
//!
//! - the TOML file at `$XDG_CONFIG_HOME/azdo/config.toml`
//! - `AZDO_*` environment variables
//! - command-line flags
//!
//! The file can also describe organizations that do not live on
//! `dev.azure.com`:
//!
//! ```toml
//! default_organization = "contoso"
//!
//! [organizations.fabrikam]
//! url = "https://fabrikam.visualstudio.com"
//! pat = "..."
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use azdo::Config;
//!
//! let config = Config::load_from_file()
//!     .unwrap()
//!     .merge(Config::load_from_env());
//! ```

use crate::{
    error::ConfigError,
    models::{Args, GitProtocol},
    parsed_property::ParsedProperty,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

pub const ORGANIZATION_ENV: &str = "AZDO_ORGANIZATION";
pub const PAT_ENV: &str = "AZDO_PAT";
pub const GIT_PROTOCOL_ENV: &str = "AZDO_GIT_PROTOCOL";

/// Host serving organizations that have no URL configured.
pub const DEFAULT_HOST: &str = "dev.azure.com";

/// Organization lookups needed while parsing names and URLs.
pub trait OrganizationConfig: Send + Sync {
    /// Organization used when a name omits it.
    fn default_organization(&self) -> Result<String, ConfigError>;

    /// Base URL of an organization, e.g. `https://dev.azure.com/contoso`.
    fn organization_url(&self, organization: &str) -> String;

    /// Organizations known to the configuration.
    fn organizations(&self) -> Vec<String>;
}

/// Temporary struct for deserializing TOML configuration
#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    default_organization: Option<String>,
    pat: Option<String>,
    git_protocol: Option<String>,
    #[serde(default)]
    organizations: BTreeMap<String, OrganizationFileEntry>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct OrganizationFileEntry {
    url: Option<String>,
    pat: Option<String>,
}

/// Settings for one organization from the `[organizations.<name>]` table.
#[derive(Debug, Clone, Default)]
pub struct OrganizationSettings {
    /// Base URL; `https://dev.azure.com/<name>` when unset.
    pub url: Option<String>,
    /// Personal access token used for this organization only.
    pub pat: Option<SecretString>,
}

/// Application configuration assembled from CLI arguments, environment variables, config file, and defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Organization used when a name omits it.
    pub default_organization: Option<ParsedProperty<String>>,
    /// Personal access token used when an organization has none of its own.
    pub pat: Option<ParsedProperty<SecretString>>,
    /// Protocol for printed clone URLs.
    pub git_protocol: Option<ParsedProperty<GitProtocol>>,
    /// Per-organization settings, file only.
    pub organizations: BTreeMap<String, OrganizationSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_organization: None,
            pat: None,
            git_protocol: Some(ParsedProperty::Default(GitProtocol::Https)),
            organizations: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from XDG config directory
    #[must_use = "this returns the loaded configuration which should be used"]
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::parse_file(&config_content, config_path)
    }

    fn parse_file(content: &str, config_path: PathBuf) -> Result<Self> {
        let config_file: ConfigFile = toml::from_str(content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        let git_protocol = config_file
            .git_protocol
            .map(|v| {
                GitProtocol::parse(&v).ok_or_else(|| ConfigError::InvalidValue {
                    field: "git_protocol".to_string(),
                    message: format!("'{}' is not one of https, ssh", v),
                })
            })
            .transpose()?;

        let organizations = config_file
            .organizations
            .into_iter()
            .map(|(name, entry)| {
                let settings = OrganizationSettings {
                    url: entry.url.map(|u| u.trim_end_matches('/').to_string()),
                    pat: entry.pat.map(SecretString::from),
                };
                (name, settings)
            })
            .collect();

        Ok(Self {
            default_organization: config_file
                .default_organization
                .map(|v| ParsedProperty::File(v, config_path.clone())),
            pat: config_file
                .pat
                .map(|v| ParsedProperty::File(SecretString::from(v), config_path.clone())),
            git_protocol: git_protocol.map(|v| ParsedProperty::File(v, config_path.clone())),
            organizations,
        })
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            default_organization: std::env::var(ORGANIZATION_ENV)
                .ok()
                .filter(|v| !v.is_empty())
                .map(|v| ParsedProperty::Env(v, ORGANIZATION_ENV)),
            pat: std::env::var(PAT_ENV)
                .ok()
                .filter(|v| !v.is_empty())
                .map(|v| ParsedProperty::Env(SecretString::from(v), PAT_ENV)),
            git_protocol: std::env::var(GIT_PROTOCOL_ENV)
                .ok()
                .and_then(|s| GitProtocol::parse(&s))
                .map(|v| ParsedProperty::Env(v, GIT_PROTOCOL_ENV)),
            organizations: BTreeMap::new(),
        }
    }

    /// Build a Config from command-line values.
    pub fn from_args(args: &Args) -> Self {
        Self {
            default_organization: args
                .global
                .organization
                .as_ref()
                .map(|v| ParsedProperty::Cli(v.clone(), "organization")),
            pat: None,
            git_protocol: args
                .git_protocol()
                .map(|v| ParsedProperty::Cli(v, "protocol")),
            organizations: BTreeMap::new(),
        }
    }

    /// Get the XDG config directory path for azdo
    fn get_config_path() -> Result<PathBuf> {
        // Use XDG_CONFIG_HOME if set, otherwise ~/.config
        let config_dir = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".config"),
        };

        Ok(config_dir.join("azdo").join("config.toml"))
    }

    /// Merge this config with another, preferring values from other when they exist
    pub fn merge(self, other: Self) -> Self {
        let mut organizations = self.organizations;
        organizations.extend(other.organizations);

        Self {
            default_organization: other.default_organization.or(self.default_organization),
            pat: other.pat.or(self.pat),
            git_protocol: other.git_protocol.or(self.git_protocol),
            organizations,
        }
    }

    /// Settings of an organization, matched case-insensitively.
    pub fn organization(&self, name: &str) -> Option<&OrganizationSettings> {
        self.organizations
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, settings)| settings)
    }

    /// Token for an organization: its own PAT, else the global one.
    pub fn pat_for(&self, organization: &str) -> Option<SecretString> {
        self.organization(organization)
            .and_then(|settings| settings.pat.clone())
            .or_else(|| self.pat.as_ref().map(|p| p.value().clone()))
    }

    /// Protocol for printed clone URLs.
    pub fn git_protocol(&self) -> GitProtocol {
        self.git_protocol
            .as_ref()
            .map(|p| *p.value())
            .unwrap_or_default()
    }

    /// Create a sample config file for user reference
    #[must_use = "this operation can fail and the result should be checked"]
    pub fn create_sample_config() -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;

        // Don't overwrite existing config
        if config_path.exists() {
            return Ok(config_path);
        }

        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create config directory: {}", dir.display())
            })?;
        }

        let sample_config = r#"# azdo configuration file
# Location: ~/.config/azdo/config.toml (or $XDG_CONFIG_HOME/azdo/config.toml)

# Organization used when a name or selector omits it
# default_organization = "your-organization"

# Personal Access Token used for every organization without its own
# (consider using the AZDO_PAT environment variable instead)
# pat = "your-pat-token"

# Protocol for printed clone URLs: "https" or "ssh" (defaults to "https")
git_protocol = "https"

# Organizations hosted somewhere other than https://dev.azure.com/<name>
# [organizations.your-organization]
# url = "https://your-organization.visualstudio.com"
# pat = "token-for-this-organization"
"#;

        fs::write(&config_path, sample_config).with_context(|| {
            format!(
                "Failed to write sample config to: {}",
                config_path.display()
            )
        })?;

        Ok(config_path)
    }
}

impl OrganizationConfig for Config {
    fn default_organization(&self) -> Result<String, ConfigError> {
        self.default_organization
            .as_ref()
            .map(|p| p.value().clone())
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "organization".to_string(),
                env_var: ORGANIZATION_ENV.to_string(),
            })
    }

    fn organization_url(&self, organization: &str) -> String {
        self.organization(organization)
            .and_then(|settings| settings.url.clone())
            .unwrap_or_else(|| format!("https://{}/{}", DEFAULT_HOST, organization))
    }

    fn organizations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.organizations.keys().cloned().collect();
        if let Some(default) = &self.default_organization
            && !names.iter().any(|n| n.eq_ignore_ascii_case(default.value()))
        {
            names.push(default.value().clone());
        }
        names
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use secrecy::ExposeSecret;
    use serial_test::file_serial;
    use std::env;
    use tempfile::TempDir;

    fn clear_env() {
        unsafe {
            env::remove_var(ORGANIZATION_ENV);
            env::remove_var(PAT_ENV);
            env::remove_var(GIT_PROTOCOL_ENV);
        }
    }

    /// # Config Default Values
    ///
    /// Tests that a default Config has no organization and uses https.
    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.default_organization.is_none());
        assert!(config.pat.is_none());
        assert_eq!(config.git_protocol(), GitProtocol::Https);
        assert!(config.organizations.is_empty());
        assert!(matches!(
            config.default_organization(),
            Err(ConfigError::MissingRequired { .. })
        ));
    }

    /// # Load Config From Environment Variables
    ///
    /// Tests loading configuration from AZDO_* environment variables.
    ///
    /// ## Test Scenario
    /// - Sets every supported variable
    /// - Loads configuration from the environment
    ///
    /// ## Expected Outcome
    /// - Values are read and tagged with the variable they came from
    #[test]
    #[file_serial(env_tests)]
    fn test_load_from_env_all_variables() {
        clear_env();
        unsafe {
            env::set_var(ORGANIZATION_ENV, "contoso");
            env::set_var(PAT_ENV, "secret-token");
            env::set_var(GIT_PROTOCOL_ENV, "SSH");
        }

        let config = Config::load_from_env();
        clear_env();

        let org = config.default_organization.as_ref().unwrap();
        assert_eq!(org.value(), "contoso");
        assert_eq!(org.origin(), ORGANIZATION_ENV);
        assert_eq!(
            config.pat.as_ref().unwrap().value().expose_secret(),
            "secret-token"
        );
        assert_eq!(config.git_protocol(), GitProtocol::Ssh);
    }

    /// # Load Config With No Environment Variables
    ///
    /// Tests that missing or invalid variables leave fields unset.
    #[test]
    #[file_serial(env_tests)]
    fn test_load_from_env_no_variables() {
        clear_env();
        unsafe {
            env::set_var(GIT_PROTOCOL_ENV, "carrier-pigeon");
        }

        let config = Config::load_from_env();
        clear_env();

        assert!(config.default_organization.is_none());
        assert!(config.pat.is_none());
        assert!(config.git_protocol.is_none());
    }

    /// # Load Config From File
    ///
    /// Tests parsing of a complete TOML configuration.
    ///
    /// ## Test Scenario
    /// - Writes a config with a default organization and two organization tables
    /// - Loads it through XDG_CONFIG_HOME
    ///
    /// ## Expected Outcome
    /// - Top-level values are tagged with the file path
    /// - Organization URLs lose their trailing slash
    #[test]
    #[file_serial(env_tests)]
    fn test_load_from_file_valid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().join("azdo");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("config.toml"),
            r#"
default_organization = "contoso"
git_protocol = "ssh"

[organizations.fabrikam]
url = "https://fabrikam.visualstudio.com/"
pat = "fabrikam-token"

[organizations.contoso]
"#,
        )
        .unwrap();

        unsafe {
            env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }
        let config = Config::load_from_file().unwrap();
        unsafe {
            env::remove_var("XDG_CONFIG_HOME");
        }

        let org = config.default_organization.as_ref().unwrap();
        assert_eq!(org.value(), "contoso");
        assert_eq!(org.source_name(), "file");
        assert_eq!(config.git_protocol(), GitProtocol::Ssh);

        assert_eq!(
            config.organization_url("FABRIKAM"),
            "https://fabrikam.visualstudio.com"
        );
        assert_eq!(config.organization_url("contoso"), "https://dev.azure.com/contoso");
        assert_eq!(
            config.pat_for("fabrikam").unwrap().expose_secret(),
            "fabrikam-token"
        );
        assert!(config.pat_for("contoso").is_none());
    }

    /// # Load Config From Missing File
    ///
    /// Tests that a missing file yields the defaults without creating anything.
    #[test]
    #[file_serial(env_tests)]
    fn test_load_from_file_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }
        let config = Config::load_from_file().unwrap();
        unsafe {
            env::remove_var("XDG_CONFIG_HOME");
        }

        assert!(config.default_organization.is_none());
        assert!(!temp_dir.path().join("azdo").exists());
    }

    /// # Load Config From Invalid File
    ///
    /// Tests that malformed TOML and bad values are reported.
    #[test]
    fn test_parse_file_errors() {
        let path = PathBuf::from("/tmp/azdo/config.toml");

        let err = Config::parse_file("default_organization = [", path.clone()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));

        let err = Config::parse_file("git_protocol = \"ftp\"", path).unwrap_err();
        assert!(err.to_string().contains("git_protocol"));
    }

    /// # Config Merge Precedence
    ///
    /// Tests that values from the later config win.
    ///
    /// ## Test Scenario
    /// - Merges a file config with an env config and a CLI config
    ///
    /// ## Expected Outcome
    /// - The CLI organization wins, the env PAT fills the gap
    /// - Organization tables survive the merge
    #[test]
    fn test_config_merge_other_takes_precedence() {
        let file = Config::parse_file(
            "default_organization = \"from-file\"\n[organizations.from-file]\nurl = \"https://example.com/from-file\"\n",
            PathBuf::from("config.toml"),
        )
        .unwrap();
        let env_config = Config {
            default_organization: Some(ParsedProperty::Env("from-env".into(), ORGANIZATION_ENV)),
            pat: Some(ParsedProperty::Env(SecretString::from("token".to_string()), PAT_ENV)),
            git_protocol: None,
            organizations: BTreeMap::new(),
        };
        let args = Args::try_parse_from(["azdo", "-o", "from-cli", "remote", "url", "--protocol", "ssh"]).unwrap();

        let merged = file.merge(env_config).merge(Config::from_args(&args));

        assert_eq!(merged.default_organization().unwrap(), "from-cli");
        assert_eq!(
            merged.default_organization.as_ref().unwrap().origin(),
            "--organization"
        );
        assert_eq!(merged.git_protocol(), GitProtocol::Ssh);
        assert_eq!(merged.pat_for("anything").unwrap().expose_secret(), "token");
        assert_eq!(
            merged.organization_url("from-file"),
            "https://example.com/from-file"
        );
    }

    /// # Known Organizations
    ///
    /// Tests that the default organization is listed once alongside the table.
    #[test]
    fn test_organizations_includes_default_once() {
        let config = Config::parse_file(
            "default_organization = \"Contoso\"\n[organizations.contoso]\n[organizations.fabrikam]\n",
            PathBuf::from("config.toml"),
        )
        .unwrap();
        assert_eq!(config.organizations(), vec!["contoso", "fabrikam"]);

        let config = Config::parse_file(
            "default_organization = \"solo\"\n",
            PathBuf::from("config.toml"),
        )
        .unwrap();
        assert_eq!(config.organizations(), vec!["solo"]);
    }

    /// # Create Sample Config
    ///
    /// Tests that the sample config is written once and parses.
    ///
    /// ## Expected Outcome
    /// - The file is created with its directory
    /// - A second call leaves user edits alone
    /// - The sample itself loads without errors
    #[test]
    #[file_serial(env_tests)]
    fn test_create_sample_config() {
        let temp_dir = TempDir::new().unwrap();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let path = Config::create_sample_config().unwrap();
        assert_eq!(path, temp_dir.path().join("azdo").join("config.toml"));
        let sample = fs::read_to_string(&path).unwrap();
        assert!(sample.contains("[organizations.your-organization]"));

        fs::write(&path, "default_organization = \"mine\"\n").unwrap();
        Config::create_sample_config().unwrap();
        let config = Config::load_from_file().unwrap();

        unsafe {
            env::remove_var("XDG_CONFIG_HOME");
        }

        assert_eq!(config.default_organization().unwrap(), "mine");
        assert!(Config::parse_file(&sample, path).is_ok());
    }
}

//! Configuration System
//!
//! Startup configuration of a store: the place chain, the global read-only flag,
//! authentication and logging. Sources are layered, later ones overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. global file (`$XDG_CONFIG_HOME/zettelstore/config.toml` or `~/.config/zettelstore/config.toml`)
//! 3. workspace file (`<root>/zettelstore.toml`)
//! 4. environment (`ZETTELSTORE__READONLY=true`, `ZETTELSTORE__AUTH__OWNER=...`)

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::policy::PolicyConfig;
use crate::zettel::keys::Visibility;
use crate::zettel::Zid;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

pub use sources::global_file::global_config_path;
pub use sources::workspace_file::WORKSPACE_CONFIG_FILE;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "ZETTELSTORE";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Place URIs, head of the chain first
    #[serde(default)]
    pub places: Vec<String>,

    /// Reject all modifications
    #[serde(default)]
    pub readonly: bool,

    /// Authentication and visibility
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Authentication settings. Authentication is enabled iff an owner is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Zettel identifier of the owner's user zettel
    #[serde(default)]
    pub owner: Option<String>,

    /// Make expert-visibility zettel accessible
    #[serde(default)]
    pub expert_mode: bool,

    /// Visibility of zettel without a `visibility` key
    #[serde(default = "default_visibility")]
    pub default_visibility: String,
}

fn default_visibility() -> String {
    Visibility::default().as_str().to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            owner: None,
            expert_mode: false,
            default_visibility: default_visibility(),
        }
    }
}

impl AuthConfig {
    /// Owner identifier, if configured and valid.
    pub fn owner_zid(&self) -> Result<Option<Zid>, ConfigError> {
        match self.owner.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(owner) => Zid::parse(owner)
                .map(Some)
                .map_err(|e| ConfigError::Invalid(format!("auth.owner: {}", e))),
        }
    }

    pub fn visibility(&self) -> Result<Visibility, ConfigError> {
        Visibility::parse(self.default_visibility.trim()).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "auth.default_visibility: unknown visibility {:?}",
                self.default_visibility
            ))
        })
    }
}

impl StoreConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        for uri in &self.places {
            if let Err(e) = Url::parse(uri) {
                errors.push(ConfigError::Invalid(format!("place {:?}: {}", uri, e)));
            }
        }
        if let Err(e) = self.auth.owner_zid() {
            errors.push(e);
        }
        if let Err(e) = self.auth.visibility() {
            errors.push(e);
        }
        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Settings of the authorization policy.
    pub fn policy_config(&self) -> Result<PolicyConfig, ConfigError> {
        Ok(PolicyConfig {
            owner: self.auth.owner_zid()?,
            readonly: self.readonly,
            expert_mode: self.auth.expert_mode,
            default_visibility: self.auth.visibility()?,
        })
    }

    /// Configuration rendered as TOML, as shown by the startup configuration zettel.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Loads a [`StoreConfig`] from the layered sources.
#[derive(Debug, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, global file, workspace file under `root` and environment.
    pub fn load(root: &Path) -> Result<StoreConfig, ConfigError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, root)?;
        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load defaults and exactly one file.
    pub fn load_from_file(path: &Path) -> Result<StoreConfig, ConfigError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = builder.add_source(config::File::from(path).required(true));
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Path of the global configuration file, if a home or config directory is known.
    pub fn xdg_config_path() -> Option<PathBuf> {
        global_config_path()
    }
}

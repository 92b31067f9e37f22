//! Tool names, generator verbs and flags, and the bootstrap configuration file.

use crate::error::{BootstrapError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// External tool executables
pub mod tools {
    pub const GIT: &str = "git";
    pub const CURL: &str = "curl";
    pub const TUIST: &str = "tuist";
    pub const SWIFT_FORMAT: &str = "swift-format";
    pub const DOCC: &str = "docc";
    pub const ZIP: &str = "zip";
    pub const SWIFTGEN: &str = "swiftgen";
}

/// Generator verbs
pub mod verbs {
    pub const FETCH: &str = "fetch";
    pub const GENERATE: &str = "generate";
    pub const CACHE: &str = "cache";
    pub const WARM: &str = "warm";
    pub const GRAPH: &str = "graph";
    pub const VERSION: &str = "version";
}

/// Generator flags
pub mod flags {
    pub const PATH: &str = "--path";
    pub const UPDATE: &str = "--update";
    pub const VERBOSE: &str = "--verbose";
    pub const PROFILE: &str = "--profile";
    pub const NO_OPEN: &str = "--no-open";
}

pub const TUIST_FOLDER_NAME: &str = "Tuist";
pub const PROJECTS_FOLDER_NAME: &str = "Projects";
pub const DERIVED_FOLDER_NAME: &str = "Derived";
pub const MASTER_KEY_FILE_PATH: &str = "Tuist/master.key";
pub const CODE_SIGNING_DIR_TEMP: &str = "Tuist/Code_Signing";
pub const CODE_SIGNING_DIR: &str = "Tuist/Signing";
pub const TUIST_INSTALL_SCRIPT_URL: &str = "https://install.tuist.io";

/// Extension of provisioning profile files
pub const PROVISIONING_PROFILE_EXTENSION: &str = "mobileprovision";

/// Master key value that disables signing setup for local runs
pub const MASTER_KEY_SENTINEL: &str = "NA";

/// Environment variable consulted when `--master-key` is not given
pub const MASTER_KEY_ENV: &str = "MASTER_KEY";

pub const DEFAULT_CACHE_PROFILE: &str = "Development";
pub const DEFAULT_BUILD_CONFIGURATION: &str = "Debug";
pub const DEFAULT_SHELL: &str = "/bin/sh";
pub const DEFAULT_ENV_PREFIX: &str = "TUIST_";

/// Location of the user-level config file, relative to the config dir
pub const USER_CONFIG_PATH: &str = "tuist-bootstrap/config.toml";

/// Configuration for a bootstrap run.
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Generator executable (name on PATH or absolute path)
    #[serde(default = "default_generator")]
    pub generator: String,

    /// Version-control executable used to restore the staging directory
    #[serde(default = "default_vcs")]
    pub vcs: String,

    /// Shell used to interpret rendered command lines
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Install script piped into bash when the generator is missing
    #[serde(default = "default_install_url")]
    pub install_script_url: String,

    /// Prefix applied to `--env` entries before they reach the generator
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,

    #[serde(default = "default_cache_profile")]
    pub cache_profile: String,

    #[serde(default = "default_build_configuration")]
    pub build_configuration: String,

    #[serde(default)]
    pub signing: SigningLayout,
}

/// On-disk layout of the code-signing files, relative to the workspace root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningLayout {
    #[serde(default = "default_secrets_file")]
    pub secrets_file: PathBuf,

    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    #[serde(default = "default_final_dir")]
    pub final_dir: PathBuf,

    /// Artifact left by the generator that must survive cleanup
    #[serde(default = "default_identity_artifact")]
    pub identity_artifact: PathBuf,

    /// Where the identity artifact is copied before cleanup
    #[serde(default = "default_identity_output")]
    pub identity_output: PathBuf,

    /// Files with these extensions are never pruned (encrypted at rest)
    #[serde(default = "default_exempt_extensions")]
    pub exempt_extensions: Vec<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            generator: default_generator(),
            vcs: default_vcs(),
            shell: default_shell(),
            install_script_url: default_install_url(),
            env_prefix: default_env_prefix(),
            cache_profile: default_cache_profile(),
            build_configuration: default_build_configuration(),
            signing: SigningLayout::default(),
        }
    }
}

impl Default for SigningLayout {
    fn default() -> Self {
        Self {
            secrets_file: default_secrets_file(),
            staging_dir: default_staging_dir(),
            final_dir: default_final_dir(),
            identity_artifact: default_identity_artifact(),
            identity_output: default_identity_output(),
            exempt_extensions: default_exempt_extensions(),
        }
    }
}

impl BootstrapConfig {
    /// Load configuration from an explicit path.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let expanded = expand_path(path)?;
        let content = tokio::fs::read_to_string(&expanded).await.map_err(|e| {
            BootstrapError::InvalidConfig(format!(
                "Cannot read config file {}: {e}",
                expanded.display()
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else from the user config file if it
    /// exists, else defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path).await;
        }
        match dirs::config_dir().map(|dir| dir.join(USER_CONFIG_PATH)) {
            Some(user_path) if tokio::fs::try_exists(&user_path).await.unwrap_or(false) => {
                Self::from_file(&user_path).await
            }
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.generator.trim().is_empty() {
            return Err(BootstrapError::InvalidConfig(
                "generator must not be empty".to_string(),
            ));
        }
        if self.shell.trim().is_empty() {
            return Err(BootstrapError::InvalidConfig(
                "shell must not be empty".to_string(),
            ));
        }
        let layout = &self.signing;
        if layout.staging_dir == layout.final_dir {
            return Err(BootstrapError::InvalidConfig(format!(
                "signing.staging_dir and signing.final_dir are both {}",
                layout.staging_dir.display()
            )));
        }
        Ok(())
    }
}

/// Expand a leading `~` in a path, returning an error if HOME is not set.
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::tilde(&raw).to_string();

    // shellexpand leaves ~ unchanged when HOME is unset
    if raw.starts_with('~') && expanded.starts_with('~') {
        return Err(BootstrapError::InvalidConfig(format!(
            "Could not expand ~ in {raw} (HOME environment variable not set)"
        )));
    }

    Ok(PathBuf::from(expanded))
}

/// Project directory for a named project: `Projects/<name>`.
#[must_use]
pub fn project_path(name: &str) -> PathBuf {
    Path::new(PROJECTS_FOLDER_NAME).join(name)
}

fn default_generator() -> String {
    tools::TUIST.to_string()
}

fn default_vcs() -> String {
    tools::GIT.to_string()
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

fn default_install_url() -> String {
    TUIST_INSTALL_SCRIPT_URL.to_string()
}

fn default_env_prefix() -> String {
    DEFAULT_ENV_PREFIX.to_string()
}

fn default_cache_profile() -> String {
    DEFAULT_CACHE_PROFILE.to_string()
}

fn default_build_configuration() -> String {
    DEFAULT_BUILD_CONFIGURATION.to_string()
}

fn default_secrets_file() -> PathBuf {
    PathBuf::from(MASTER_KEY_FILE_PATH)
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from(CODE_SIGNING_DIR_TEMP)
}

fn default_final_dir() -> PathBuf {
    PathBuf::from(CODE_SIGNING_DIR)
}

fn default_identity_artifact() -> PathBuf {
    Path::new(CODE_SIGNING_DIR).join(DERIVED_FOLDER_NAME)
}

fn default_identity_output() -> PathBuf {
    PathBuf::from(DERIVED_FOLDER_NAME)
}

fn default_exempt_extensions() -> Vec<String> {
    vec!["encrypted".to_string()]
}

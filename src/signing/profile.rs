//! `TARGET=PROFILE` mappings

use crate::config::PROVISIONING_PROFILE_EXTENSION;
use std::fmt;
use std::str::FromStr;

/// A provisioning profile assigned to a build target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProvisioningProfile {
    pub target: String,
    pub profile: String,
}

impl ProvisioningProfile {
    /// Split on the first `=`. Both sides must be non-empty.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (target, profile) = value.split_once('=')?;
        if target.is_empty() || profile.is_empty() {
            return None;
        }
        Some(Self {
            target: target.to_string(),
            profile: profile.to_string(),
        })
    }

    /// File name the profile is shipped under: `{profile}.mobileprovision`
    #[must_use]
    pub fn source_file_name(&self) -> String {
        format!("{}.{PROVISIONING_PROFILE_EXTENSION}", self.profile)
    }

    /// File name the generator looks for: `{target}.{configuration}.mobileprovision`
    #[must_use]
    pub fn staged_file_name(&self, configuration: &str) -> String {
        format!(
            "{}.{configuration}.{PROVISIONING_PROFILE_EXTENSION}",
            self.target
        )
    }
}

impl FromStr for ProvisioningProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("expected TARGET=PROFILE, got '{s}'"))
    }
}

impl fmt::Display for ProvisioningProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.target, self.profile)
    }
}

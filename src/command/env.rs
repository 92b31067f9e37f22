//! Environment variables passed on the command line

use super::quote;
use crate::signing::ProvisioningProfile;
use crate::warn;

/// Parse `KEY=VALUE` entries into environment pairs with `prefix` on each key.
///
/// Entries that do not parse, or whose prefixed key is not a shell variable
/// name, are dropped with a warning.
pub fn environment_from_pairs(entries: &[String], prefix: &str) -> Vec<(String, String)> {
    entries
        .iter()
        .filter_map(|entry| {
            let Some(pair) = ProvisioningProfile::parse(entry) else {
                warn!("Ignoring malformed environment entry '{entry}' (expected KEY=VALUE)");
                return None;
            };
            let key = format!("{prefix}{}", pair.target);
            if !is_shell_identifier(&key) {
                warn!("Ignoring environment entry '{entry}': '{key}' is not a valid variable name");
                return None;
            }
            Some((key, pair.profile))
        })
        .collect()
}

/// `[A-Za-z_][A-Za-z0-9_]*`, the names a shell accepts in a `KEY=value` prefix.
#[must_use]
pub fn is_shell_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Render pairs as `KEY="value"` joined by spaces.
///
/// Pairs whose key is not a shell identifier are left out; the shell would
/// otherwise run them as a command.
#[must_use]
pub fn escaped_environment(vars: &[(String, String)]) -> String {
    vars.iter()
        .filter(|(key, _)| is_shell_identifier(key))
        .map(|(key, value)| format!("{key}={}", quote(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

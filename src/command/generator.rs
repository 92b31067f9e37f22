//! Generator invocations

use super::{ArgStyle, ShellCommand};
use crate::config::{flags, verbs};
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub update: bool,
    pub verbose: bool,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Explicit targets; ignored when `project_path` is set
    pub targets: Vec<String>,
    pub project_path: Option<PathBuf>,
    /// Cache profile; `None` generates without binary caching
    pub cache_profile: Option<String>,
    pub open: bool,
    pub verbose: bool,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CacheWarmOptions {
    pub targets: Vec<String>,
    pub project_path: Option<PathBuf>,
    pub cache_profile: String,
    pub verbose: bool,
    pub extra_args: Vec<String>,
}

/// Builds commands for the project generator.
#[derive(Debug, Clone)]
pub struct Generator {
    executable: String,
}

impl Generator {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    fn command(&self) -> ShellCommand {
        ShellCommand::new(&self.executable).style(ArgStyle::Tokens)
    }

    #[must_use]
    pub fn version(&self) -> ShellCommand {
        self.command().arg(verbs::VERSION)
    }

    #[must_use]
    pub fn fetch(&self, options: &FetchOptions) -> ShellCommand {
        self.command()
            .arg(verbs::FETCH)
            .arg_if(options.update, flags::UPDATE)
            .arg_if(options.verbose, flags::VERBOSE)
            .args(options.extra_args.iter().cloned())
    }

    #[must_use]
    pub fn generate(&self, options: &GenerateOptions) -> ShellCommand {
        let cmd = self.command().arg(verbs::GENERATE);
        let cmd = match &options.cache_profile {
            Some(profile) => cmd.flag_value(flags::PROFILE, profile.as_str()),
            None => cmd,
        };
        select(cmd, options.project_path.as_ref(), &options.targets)
            .arg_if(!options.open, flags::NO_OPEN)
            .arg_if(options.verbose, flags::VERBOSE)
            .args(options.extra_args.iter().cloned())
    }

    #[must_use]
    pub fn cache_warm(&self, options: &CacheWarmOptions) -> ShellCommand {
        let cmd = self
            .command()
            .args([verbs::CACHE, verbs::WARM])
            .flag_value(flags::PROFILE, options.cache_profile.as_str());
        select(cmd, options.project_path.as_ref(), &options.targets)
            .arg_if(options.verbose, flags::VERBOSE)
            .args(options.extra_args.iter().cloned())
    }

    #[must_use]
    pub fn graph(&self, manifest_path: Option<&PathBuf>) -> ShellCommand {
        let cmd = self.command().arg(verbs::GRAPH).arg(flags::VERBOSE);
        match manifest_path {
            Some(path) => cmd.flag_value(flags::PATH, path.display().to_string()),
            None => cmd,
        }
    }
}

fn select(cmd: ShellCommand, project_path: Option<&PathBuf>, targets: &[String]) -> ShellCommand {
    match project_path {
        Some(path) => cmd.flag_value(flags::PATH, path.display().to_string()),
        None => cmd.args(targets.iter().cloned()),
    }
}

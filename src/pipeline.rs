//! Generator workflows: install check, fetch, cache warm, and the full
//! generate run with code-signing staging around it.

use crate::command::{
    CacheWarmOptions, FetchOptions, GenerateOptions, Generator, environment_from_pairs,
    tools::install_script,
};
use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use crate::output::step;
use crate::runner::Runner;
use crate::signing::{ProvisioningProfile, SigningStager, StageRequest};
use crate::success;
use std::path::{Path, PathBuf};

/// Everything the `generate` workflow needs from the command line.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub targets: Vec<String>,
    pub project_path: Option<PathBuf>,
    /// Directory `fetch` runs in, relative to the root
    pub workspace: Option<PathBuf>,
    pub cache_enabled: bool,
    /// The cache is known to be warm; generate from it without warming
    pub cache_hit: bool,
    pub cache_profile: Option<String>,
    pub configuration: Option<String>,
    pub master_key: Option<String>,
    pub profiles: Vec<ProvisioningProfile>,
    /// Extra `KEY=VALUE` entries exported to the generator
    pub env: Vec<String>,
    pub update: bool,
    pub verbose: bool,
    pub open: bool,
}

/// Runs generator workflows under one workspace root.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    config: BootstrapConfig,
    root: PathBuf,
    runner: Runner,
    generator: Generator,
}

impl Bootstrap {
    pub fn new(config: BootstrapConfig, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            runner: Runner::new(&config.shell, &root),
            generator: Generator::new(&config.generator),
            config,
            root,
        }
    }

    /// Replace the runner, e.g. with a quiet one.
    #[must_use]
    pub fn with_runner(mut self, runner: Runner) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Generator version string.
    pub async fn version(&self) -> Result<String> {
        let result = self.runner.run(&self.generator.version()).await?;
        Ok(result.stdout.trim().to_string())
    }

    /// Make sure the generator is on PATH, installing it if it is not.
    pub async fn ensure_generator(&self) -> Result<String> {
        let executable = self.generator.executable();
        if which::which(executable).is_ok() {
            let version = self.version().await?;
            success!("{executable} {version} is installed already... Skipping installation");
            return Ok(version);
        }

        step(&format!("Installing {executable}..."));
        self.runner
            .run(&install_script(&self.config.install_script_url))
            .await?;

        if which::which(executable).is_err() {
            return Err(BootstrapError::MissingDependency(format!(
                "{executable} not found in PATH after running {}",
                self.config.install_script_url
            )));
        }
        let version = self.version().await?;
        success!("Installed {executable} version {version}");
        Ok(version)
    }

    /// `fetch` inside `workspace` (relative to the root).
    pub async fn fetch(
        &self,
        options: &FetchOptions,
        env: Vec<(String, String)>,
        workspace: Option<&Path>,
    ) -> Result<()> {
        let command = self.generator.fetch(options).envs(env);
        let mut runner = self.runner.clone();
        let scope = runner.enter(workspace.unwrap_or(Path::new(".")));
        scope.run(&command).await?;
        Ok(())
    }

    pub async fn cache_warm(&self, options: &CacheWarmOptions, env: Vec<(String, String)>) -> Result<()> {
        self.runner
            .run(&self.generator.cache_warm(options).envs(env))
            .await?;
        Ok(())
    }

    pub async fn graph(&self, manifest_path: Option<&PathBuf>) -> Result<()> {
        self.runner.run(&self.generator.graph(manifest_path)).await?;
        Ok(())
    }

    /// Stage signing, fetch, optionally warm the cache, generate, and restore
    /// the signing layout whether or not generation succeeded.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<()> {
        self.ensure_generator().await?;

        let stage_request = StageRequest {
            master_key: request.master_key.clone(),
            profiles: request.profiles.clone(),
            configuration: request
                .configuration
                .clone()
                .unwrap_or_else(|| self.config.build_configuration.clone()),
        };
        let stager = SigningStager::new(&self.root, self.config.signing.clone(), &self.config.vcs);

        step("Staging code signing");
        let staged = stager.stage(&self.runner, &stage_request).await?;

        let outcome = self.generate_steps(request).await;

        step("Restoring code signing");
        staged.restore(&self.runner).await;

        outcome
    }

    async fn generate_steps(&self, request: &GenerateRequest) -> Result<()> {
        let env = self.environment(request);
        let cache_profile = request
            .cache_profile
            .clone()
            .unwrap_or_else(|| self.config.cache_profile.clone());

        step("Fetching dependencies");
        let fetch = FetchOptions {
            update: request.update,
            verbose: request.verbose,
            extra_args: Vec::new(),
        };
        self.fetch(&fetch, env.clone(), request.workspace.as_deref())
            .await?;

        if request.cache_enabled && !request.cache_hit {
            step("Warming cache");
            let warm = CacheWarmOptions {
                targets: request.targets.clone(),
                project_path: request.project_path.clone(),
                cache_profile: cache_profile.clone(),
                verbose: request.verbose,
                extra_args: Vec::new(),
            };
            self.cache_warm(&warm, env.clone()).await?;
        }

        step("Generating project");
        let generate = GenerateOptions {
            targets: request.targets.clone(),
            project_path: request.project_path.clone(),
            cache_profile: request.cache_enabled.then_some(cache_profile),
            open: request.open,
            verbose: request.verbose,
            extra_args: Vec::new(),
        };
        self.runner
            .run(&self.generator.generate(&generate).envs(env))
            .await?;

        success!("Project generated");
        Ok(())
    }

    /// Profile mappings and `--env` entries, prefixed for the generator.
    fn environment(&self, request: &GenerateRequest) -> Vec<(String, String)> {
        let entries: Vec<String> = request
            .profiles
            .iter()
            .map(ToString::to_string)
            .chain(request.env.iter().cloned())
            .collect();
        environment_from_pairs(&entries, &self.config.env_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// A generator that appends its arguments and TUIST_ environment to a log,
    /// failing on `generate` when `FAIL_GENERATE` exists.
    fn fake_generator(root: &Path) -> String {
        let script = root.join("fake-tuist");
        fs::write(
            &script,
            "#!/bin/sh\n\
             echo \"$*\" >> calls.log\n\
             env | grep '^TUIST_' | sort >> env.log\n\
             if [ \"$1\" = version ]; then echo 4.2.0; fi\n\
             if [ \"$1\" = generate ] && [ -e FAIL_GENERATE ]; then echo boom >&2; exit 1; fi\n",
        )
        .unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        }
        script.display().to_string()
    }

    fn bootstrap(root: &Path) -> Bootstrap {
        let config = BootstrapConfig {
            generator: fake_generator(root),
            vcs: "true".to_string(),
            ..BootstrapConfig::default()
        };
        let runner = Runner::new(&config.shell, root).quiet();
        Bootstrap::new(config, root).with_runner(runner)
    }

    fn calls(root: &Path) -> Vec<String> {
        fs::read_to_string(root.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn installed_generator_reports_version() {
        let root = TempDir::new().unwrap();
        let version = bootstrap(root.path()).ensure_generator().await.unwrap();
        assert_eq!(version, "4.2.0");
    }

    #[tokio::test]
    async fn generate_runs_fetch_warm_generate_in_order() {
        let root = TempDir::new().unwrap();
        let request = GenerateRequest {
            project_path: Some(PathBuf::from("Projects/App")),
            cache_enabled: true,
            verbose: true,
            update: true,
            ..GenerateRequest::default()
        };
        bootstrap(root.path()).generate(&request).await.unwrap();

        assert_eq!(
            calls(root.path()),
            [
                "version",
                "fetch --update --verbose",
                "cache warm --profile Development --path Projects/App --verbose",
                "generate --profile Development --path Projects/App --no-open --verbose",
            ]
        );
    }

    #[tokio::test]
    async fn cache_hit_skips_warming() {
        let root = TempDir::new().unwrap();
        let request = GenerateRequest {
            targets: vec!["App".to_string()],
            cache_enabled: true,
            cache_hit: true,
            cache_profile: Some("CI".to_string()),
            open: true,
            ..GenerateRequest::default()
        };
        bootstrap(root.path()).generate(&request).await.unwrap();
        assert_eq!(calls(root.path()), ["version", "fetch", "generate --profile CI App"]);
    }

    #[tokio::test]
    async fn environment_reaches_generator_with_prefix() {
        let root = TempDir::new().unwrap();
        let request = GenerateRequest {
            profiles: vec![ProvisioningProfile::parse("App=App Dev").unwrap()],
            env: vec!["STAGE=beta".to_string(), "broken".to_string()],
            ..GenerateRequest::default()
        };
        bootstrap(root.path()).generate(&request).await.unwrap();

        let env = fs::read_to_string(root.path().join("env.log")).unwrap();
        assert!(env.contains("TUIST_App=App Dev"));
        assert!(env.contains("TUIST_STAGE=beta"));
        assert!(!env.contains("broken"));
    }

    #[tokio::test]
    async fn unusable_variable_names_do_not_break_generation() {
        let root = TempDir::new().unwrap();
        let config = BootstrapConfig {
            generator: fake_generator(root.path()),
            vcs: "true".to_string(),
            env_prefix: String::new(),
            ..BootstrapConfig::default()
        };
        let runner = Runner::new(&config.shell, root.path()).quiet();
        let bootstrap = Bootstrap::new(config, root.path()).with_runner(runner);

        let request = GenerateRequest {
            profiles: vec![ProvisioningProfile::parse("App-Widget=Widget Dist").unwrap()],
            env: vec!["true;touch INJECTED;X=1".to_string()],
            ..GenerateRequest::default()
        };
        bootstrap.generate(&request).await.unwrap();

        assert_eq!(calls(root.path()), ["version", "fetch", "generate --no-open"]);
        assert!(!root.path().join("INJECTED").exists());
    }

    #[tokio::test]
    async fn failed_generation_still_restores_signing() {
        let root = TempDir::new().unwrap();
        let staging = root.path().join("Tuist/Code_Signing");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("A.mobileprovision"), "a").unwrap();
        fs::write(root.path().join("FAIL_GENERATE"), "").unwrap();

        let request = GenerateRequest {
            master_key: Some("secret".to_string()),
            profiles: vec![ProvisioningProfile::parse("Foo=A").unwrap()],
            configuration: Some("Release".to_string()),
            ..GenerateRequest::default()
        };
        let err = bootstrap(root.path()).generate(&request).await.unwrap_err();

        assert_eq!(err.exit_code(), Some(1));
        assert!(err.to_string().contains("boom"));
        assert!(!root.path().join("Tuist/master.key").exists());
        assert!(!root.path().join("Tuist/Signing").exists());
    }

    #[tokio::test]
    async fn fetch_runs_inside_workspace() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("Workspace")).unwrap();
        let bootstrap = bootstrap(root.path());
        bootstrap
            .fetch(&FetchOptions::default(), Vec::new(), Some(Path::new("Workspace")))
            .await
            .unwrap();
        assert_eq!(calls(&root.path().join("Workspace")), ["fetch"]);
        assert!(calls(root.path()).is_empty());
    }
}

//! Code-signing file staging
//!
//! The generator expects provisioning profiles named after their target and
//! build configuration inside the final signing directory, plus the master
//! key next to it. The repository ships them under the staging directory with
//! their original names. Staging rearranges that layout for one run;
//! restoring puts the working tree back.

use super::profile::ProvisioningProfile;
use crate::command::tools::vcs_checkout;
use crate::config::{MASTER_KEY_SENTINEL, SigningLayout};
use crate::error::{BootstrapError, Result};
use crate::runner::Runner;
use crate::{cleanup_path, cleanup_path_blocking, success, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// How far staging got. Restoring undoes whatever was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StageState {
    Untouched,
    SecretsWritten,
    ProfilesMatched,
    ProfilesPruned,
    DirectoryRenamed,
    Cleaned,
}

/// Inputs for one staging run.
#[derive(Debug, Clone, Default)]
pub struct StageRequest {
    pub master_key: Option<String>,
    pub profiles: Vec<ProvisioningProfile>,
    pub configuration: String,
}

impl StageRequest {
    /// The key to write, or `None` when signing setup should be skipped.
    fn effective_key(&self) -> Option<&str> {
        self.master_key
            .as_deref()
            .filter(|key| !key.is_empty() && *key != MASTER_KEY_SENTINEL)
    }
}

/// Prepares the signing layout under a workspace root.
#[derive(Debug, Clone)]
pub struct SigningStager {
    root: PathBuf,
    layout: SigningLayout,
    vcs: String,
}

impl SigningStager {
    pub fn new(root: impl Into<PathBuf>, layout: SigningLayout, vcs: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            layout,
            vcs: vcs.into(),
        }
    }

    /// Stage the signing files and return a guard that restores them.
    ///
    /// If a step fails, whatever was already staged is restored before the
    /// error is returned.
    pub async fn stage(&self, runner: &Runner, request: &StageRequest) -> Result<StagedSigning> {
        let mut staged = StagedSigning::new(self);

        if let Err(e) = staged.apply(request).await {
            staged.restore(runner).await;
            return Err(e);
        }

        Ok(staged)
    }
}

/// Staged signing files for one run.
///
/// Call [`StagedSigning::restore`] when generation finishes. If the guard is
/// dropped without it, the same steps run synchronously from `Drop`.
#[derive(Debug)]
pub struct StagedSigning {
    root: PathBuf,
    layout: SigningLayout,
    vcs: String,
    state: StageState,
    staging_touched: bool,
    /// Profiles created under their staged names that are still in the
    /// staging directory. Version control does not remove them.
    created: Vec<PathBuf>,
    restored: bool,
}

impl StagedSigning {
    fn new(stager: &SigningStager) -> Self {
        Self {
            root: stager.root.clone(),
            layout: stager.layout.clone(),
            vcs: stager.vcs.clone(),
            state: StageState::Untouched,
            staging_touched: false,
            created: Vec::new(),
            restored: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> StageState {
        self.state
    }

    fn path(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    async fn apply(&mut self, request: &StageRequest) -> Result<()> {
        let Some(key) = request.effective_key() else {
            println!("No master key supplied, skipping code signing setup");
            return Ok(());
        };

        // Set first: a half-written key file must still be removed
        self.state = StageState::SecretsWritten;
        self.write_secrets(key).await?;

        let staging_dir = self.path(&self.layout.staging_dir);
        if !is_dir(&staging_dir).await {
            println!(
                "Code signing directory {} not found, skipping profile setup",
                staging_dir.display()
            );
            return Ok(());
        }

        self.staging_touched = true;
        let matched = match_profiles(
            &staging_dir,
            &request.profiles,
            &request.configuration,
            &mut self.created,
        )
        .await?;
        self.state = StageState::ProfilesMatched;

        prune_files(&staging_dir, &matched, &self.layout.exempt_extensions).await?;
        self.state = StageState::ProfilesPruned;

        let final_dir = self.path(&self.layout.final_dir);
        if tokio::fs::try_exists(&final_dir).await? {
            tokio::fs::remove_dir_all(&final_dir).await?;
        }
        tokio::fs::rename(&staging_dir, &final_dir).await.map_err(|e| {
            BootstrapError::Staging(format!(
                "Cannot rename {} to {}: {e}",
                staging_dir.display(),
                final_dir.display()
            ))
        })?;
        // They moved with the directory; deleting the final directory covers them
        self.created.clear();
        self.state = StageState::DirectoryRenamed;

        success!("Code signing staged in {}", final_dir.display());
        Ok(())
    }

    async fn write_secrets(&self, key: &str) -> Result<()> {
        let secrets = self.path(&self.layout.secrets_file);
        if let Some(parent) = secrets.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Create owner-only before any content lands in it
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        drop(options.open(&secrets).await?);

        #[cfg(unix)]
        {
            // A key file left by an earlier run keeps its old mode on open
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&secrets, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::write(&secrets, key).await?;
        Ok(())
    }

    fn needs_restore(&self) -> bool {
        !self.restored && self.state != StageState::Untouched
    }

    /// Restore the working tree. Every step is best-effort; failures are
    /// reported as warnings.
    pub async fn restore(mut self, runner: &Runner) -> StageState {
        if !self.needs_restore() {
            return self.finish();
        }

        let artifact = self.path(&self.layout.identity_artifact);
        if tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
            let output = self.path(&self.layout.identity_output);
            report_identity_copy(copy_tree(&artifact, &output).await, &artifact, &output);
        }

        for staged in std::mem::take(&mut self.created) {
            cleanup_path(&staged, "staged provisioning profile").await;
        }
        cleanup_path(self.path(&self.layout.secrets_file), "master key file").await;
        cleanup_path(self.path(&self.layout.final_dir), "signing directory").await;

        if self.staging_touched {
            let mut runner = runner.clone();
            let scope = runner.enter(&self.root);
            let checkout = vcs_checkout(&self.vcs, &self.layout.staging_dir);
            if let Err(e) = scope.run(&checkout).await {
                warn!("Failed to restore {}: {e}", self.layout.staging_dir.display());
            }
        }

        self.finish()
    }

    fn finish(&mut self) -> StageState {
        self.restored = true;
        if self.state != StageState::Untouched {
            self.state = StageState::Cleaned;
        }
        self.state
    }
}

impl Drop for StagedSigning {
    fn drop(&mut self) {
        if !self.needs_restore() {
            return;
        }

        let artifact = self.path(&self.layout.identity_artifact);
        if artifact.exists() {
            let output = self.path(&self.layout.identity_output);
            report_identity_copy(copy_tree_blocking(&artifact, &output), &artifact, &output);
        }

        for staged in std::mem::take(&mut self.created) {
            cleanup_path_blocking(&staged, "staged provisioning profile");
        }
        cleanup_path_blocking(&self.path(&self.layout.secrets_file), "master key file");
        cleanup_path_blocking(&self.path(&self.layout.final_dir), "signing directory");

        if self.staging_touched {
            let result = std::process::Command::new(&self.vcs)
                .args(["checkout", "-f"])
                .arg(&self.layout.staging_dir)
                .current_dir(&self.root)
                .output();
            match result {
                Ok(output) if output.status.success() => {}
                Ok(output) => warn!(
                    "Failed to restore {}: {}",
                    self.layout.staging_dir.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                Err(e) => warn!("Failed to restore {}: {e}", self.layout.staging_dir.display()),
            }
        }

        self.finish();
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Rename each `{profile}.mobileprovision` to `{target}.{configuration}.mobileprovision`.
///
/// A profile shared by several targets is copied from its first staged name.
/// Every file created under a staged name is pushed onto `created` as soon as
/// it exists, so a later failure can still remove it.
async fn match_profiles(
    staging_dir: &Path,
    profiles: &[ProvisioningProfile],
    configuration: &str,
    created: &mut Vec<PathBuf>,
) -> Result<HashSet<PathBuf>> {
    let mut matched = HashSet::new();
    let mut staged_by_profile: HashMap<&str, PathBuf> = HashMap::new();

    for mapping in profiles {
        let source = staging_dir.join(mapping.source_file_name());
        let destination = staging_dir.join(mapping.staged_file_name(configuration));

        if let Some(previous) = staged_by_profile.get(mapping.profile.as_str()) {
            tokio::fs::copy(previous, &destination).await?;
        } else if is_file(&source).await {
            tokio::fs::rename(&source, &destination).await?;
        } else {
            return Err(BootstrapError::Staging(format!(
                "Provisioning profile not found for {}: {}",
                mapping.target,
                source.display()
            )));
        }
        created.push(destination.clone());

        println!(
            "Matched {} -> {}",
            mapping.source_file_name(),
            mapping.staged_file_name(configuration)
        );
        staged_by_profile
            .entry(mapping.profile.as_str())
            .or_insert_with(|| destination.clone());
        matched.insert(destination);
    }

    Ok(matched)
}

/// Delete visible files that were not matched and are not exempt.
async fn prune_files(dir: &Path, keep: &HashSet<PathBuf>, exempt_extensions: &[String]) -> Result<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !entry.file_type().await?.is_file() || keep.contains(&path) {
            continue;
        }

        let exempt = path
            .extension()
            .map(|ext| ext.to_string_lossy())
            .is_some_and(|ext| exempt_extensions.iter().any(|e| *e == ext));
        if exempt {
            continue;
        }

        tokio::fs::remove_file(&path).await?;
        println!("Deleted File: {}", entry.file_name().to_string_lossy());
    }
    Ok(())
}

fn report_identity_copy(result: std::io::Result<()>, artifact: &Path, output: &Path) {
    match result {
        Ok(()) => success!("Copied signing identity to {}", output.display()),
        Err(e) => warn!(
            "Failed to copy signing identity {} to {}: {e}",
            artifact.display(),
            output.display()
        ),
    }
}

async fn copy_tree(from: &Path, to: &Path) -> std::io::Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((source, destination)) = pending.pop() {
        if tokio::fs::metadata(&source).await?.is_dir() {
            tokio::fs::create_dir_all(&destination).await?;
            let mut entries = tokio::fs::read_dir(&source).await?;
            while let Some(entry) = entries.next_entry().await? {
                pending.push((entry.path(), destination.join(entry.file_name())));
            }
        } else {
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(&source, &destination).await?;
        }
    }
    Ok(())
}

fn copy_tree_blocking(from: &Path, to: &Path) -> std::io::Result<()> {
    if from.is_dir() {
        std::fs::create_dir_all(to)?;
        for entry in std::fs::read_dir(from)? {
            let entry = entry?;
            copy_tree_blocking(&entry.path(), &to.join(entry.file_name()))?;
        }
    } else {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(from, to)?;
    }
    Ok(())
}

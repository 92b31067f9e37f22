//! Project generation bootstrap: command building, process running and
//! code-signing staging around an external project generator.

#[macro_use]
pub mod output;

use std::io;
use std::path::Path;

/// Remove a signing file or directory left by a run.
///
/// A missing path is fine. Failures are printed as warnings with a hint and
/// never returned, so one stuck file does not stop the rest of the restore.
pub async fn cleanup_path<P: AsRef<Path>>(path: P, description: &str) {
    let path = path.as_ref();

    let Ok(metadata) = tokio::fs::symlink_metadata(path).await else {
        return;
    };
    let result = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    if let Err(e) = result {
        report_cleanup_failure(path, description, &e);
    }
}

/// Blocking [`cleanup_path`], for `Drop` where no runtime can be awaited.
pub(crate) fn cleanup_path_blocking(path: &Path, description: &str) {
    let Ok(metadata) = std::fs::symlink_metadata(path) else {
        return;
    };
    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    if let Err(e) = result {
        report_cleanup_failure(path, description, &e);
    }
}

fn report_cleanup_failure(path: &Path, description: &str, e: &io::Error) {
    // Removed by someone else in the meantime
    if e.kind() == io::ErrorKind::NotFound {
        return;
    }

    let hint = match e.kind() {
        io::ErrorKind::PermissionDenied => {
            "signing files may belong to another user; remove them by hand before the next run"
        }
        io::ErrorKind::DirectoryNotEmpty => {
            "the generator may still hold files open; rerun once it has exited"
        }
        _ => "remove it by hand so it is not committed",
    };
    warn!(
        "Could not remove {description} at {}: {e}\n   Hint: {hint}",
        path.display()
    );
}

pub mod command;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod plugins;
pub mod runner;
pub mod show;
pub mod signing;

// Re-export common types
pub use command::{ArgStyle, ShellCommand};
pub use config::{BootstrapConfig, SigningLayout};
pub use error::{BootstrapError, Result};
pub use pipeline::{Bootstrap, GenerateRequest};
pub use runner::{DirScope, ExecutionResult, Runner};
pub use signing::{ProvisioningProfile, SigningStager, StageRequest, StageState, StagedSigning};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn cleanup_removes_files_and_directories() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("master.key");
        let nested = dir.path().join("Signing/Derived");
        std::fs::write(&file, "k").unwrap();
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("a"), "a").unwrap();

        cleanup_path(&file, "master key").await;
        cleanup_path(dir.path().join("Signing"), "signing directory").await;
        cleanup_path(dir.path().join("absent"), "nothing").await;

        assert!(!file.exists());
        assert!(!dir.path().join("Signing").exists());
    }

    #[test]
    fn blocking_cleanup_matches_async() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("Signing/Derived");
        std::fs::create_dir_all(&nested).unwrap();

        cleanup_path_blocking(&dir.path().join("Signing"), "signing directory");
        cleanup_path_blocking(&dir.path().join("absent"), "nothing");

        assert!(!dir.path().join("Signing").exists());
    }
}

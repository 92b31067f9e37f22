//! Formatter, documentation compiler, archiver and source generator runs.
//!
//! Each function checks that its tool is installed, runs it, and reports where
//! the result went.

use crate::command::tools::{
    DocsRequest, archive_executables, compile_docs, format_sources, generate_sources,
};
use crate::config::tools;
use crate::error::{BootstrapError, Result};
use crate::runner::Runner;
use crate::success;
use std::path::{Path, PathBuf};

fn require_tool(tool: &str) -> Result<()> {
    which::which(tool).map(|_| ()).map_err(|_| {
        BootstrapError::MissingDependency(format!("'{tool}' not found in PATH"))
    })
}

/// Format each target directory in place.
pub async fn format_targets(runner: &Runner, config_file: &Path, target_dirs: &[PathBuf]) -> Result<()> {
    if target_dirs.is_empty() {
        return Err(BootstrapError::InvalidConfig(
            "Expected at least one target directory to format".to_string(),
        ));
    }
    require_tool(tools::SWIFT_FORMAT)?;

    for dir in target_dirs {
        runner.run(&format_sources(config_file, dir)).await?;
        success!("Formatted the source code in {}.", dir.display());
    }
    Ok(())
}

/// Compile documentation for one target.
pub async fn build_docs(runner: &Runner, request: &DocsRequest<'_>) -> Result<()> {
    require_tool(tools::DOCC)?;
    runner.run(&compile_docs(request)).await?;
    success!("Generated documentation at {}.", request.output_dir.display());
    Ok(())
}

/// Zip built executables into `<output_dir>/<archive_name>.zip`.
pub async fn archive(
    runner: &Runner,
    product: &str,
    archive_name: &str,
    output_dir: &Path,
    executables: &[PathBuf],
) -> Result<PathBuf> {
    if product.is_empty() || archive_name.is_empty() {
        return Err(BootstrapError::InvalidConfig(
            "Expected two arguments: product name and archive name".to_string(),
        ));
    }
    if executables.is_empty() {
        return Err(BootstrapError::InvalidConfig(format!(
            "No built executables given for product {product}"
        )));
    }
    let missing: Vec<String> = executables
        .iter()
        .filter(|exe| !exe.is_file())
        .map(|exe| exe.display().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(BootstrapError::InvalidConfig(format!(
            "Couldn't find built executables for {product}: {}",
            missing.join(", ")
        )));
    }
    require_tool(tools::ZIP)?;

    tokio::fs::create_dir_all(output_dir).await?;
    let archive = output_dir.join(format!("{archive_name}.zip"));
    runner.run(&archive_executables(&archive, executables)).await?;
    success!("Created distribution archive at {}.", archive.display());
    Ok(archive)
}

/// Run the source generator for one target.
pub async fn generate_target_sources(
    runner: &Runner,
    config_file: &Path,
    target: &str,
    output_dir: &Path,
) -> Result<()> {
    require_tool(tools::SWIFTGEN)?;
    tokio::fs::create_dir_all(output_dir).await?;
    let project_dir = runner.current_dir().to_path_buf();
    runner
        .run(&generate_sources(config_file, &project_dir, target, output_dir))
        .await?;
    success!("Generated sources for {target} in {}.", output_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn runner(root: &Path) -> Runner {
        Runner::new("/bin/sh", root).quiet()
    }

    #[tokio::test]
    async fn archive_requires_product_and_name() {
        let root = TempDir::new().unwrap();
        let err = archive(&runner(root.path()), "Graph", "", root.path(), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("product name and archive name"));
    }

    #[tokio::test]
    async fn archive_reports_missing_executables() {
        let root = TempDir::new().unwrap();
        let exe = root.path().join("Graph");
        let err = archive(&runner(root.path()), "Graph", "Graph-v1.0", root.path(), &[exe])
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidConfig(_)));
        assert!(!root.path().join("Graph-v1.0.zip").exists());
    }

    #[tokio::test]
    async fn format_requires_targets() {
        let root = TempDir::new().unwrap();
        let err = format_targets(&runner(root.path()), Path::new(".swift-format.json"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidConfig(_)));
    }

    #[test]
    fn missing_tool_is_a_dependency_error() {
        let err = require_tool("definitely-not-a-real-tool-7f3a").unwrap_err();
        assert!(matches!(err, BootstrapError::MissingDependency(_)));
    }
}

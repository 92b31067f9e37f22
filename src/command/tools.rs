//! Invocations of helper tools: version control, installer, formatter,
//! documentation compiler, archiver and source generator.

use super::{ArgStyle, ShellCommand};
use crate::config::tools;
use std::path::Path;

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Discard local changes under `path`: `<vcs> checkout -f <path>`.
#[must_use]
pub fn vcs_checkout(vcs: &str, path: &Path) -> ShellCommand {
    ShellCommand::new(vcs)
        .args(["checkout", "-f"])
        .arg(path_arg(path))
}

/// `curl -Ls <url> | bash`
#[must_use]
pub fn install_script(url: &str) -> ShellCommand {
    ShellCommand::new(tools::CURL)
        .style(ArgStyle::Tokens)
        .arg("-Ls")
        .arg(url)
        .pipe(ShellCommand::new("bash"))
}

/// Format a target directory in place with the formatter's config file.
#[must_use]
pub fn format_sources(config_file: &Path, target_dir: &Path) -> ShellCommand {
    ShellCommand::new(tools::SWIFT_FORMAT)
        .style(ArgStyle::Tokens)
        .flag_value("--configuration", path_arg(config_file))
        .args(["--in-place", "--recursive"])
        .arg(path_arg(target_dir))
}

/// Inputs for one documentation compiler run.
#[derive(Debug, Clone)]
pub struct DocsRequest<'a> {
    pub target: &'a str,
    pub catalog: Option<&'a Path>,
    pub symbol_graph_dir: &'a Path,
    pub output_dir: &'a Path,
}

/// `docc convert [<catalog>] --fallback-... --output-dir <dir>`
#[must_use]
pub fn compile_docs(request: &DocsRequest<'_>) -> ShellCommand {
    let cmd = ShellCommand::new(tools::DOCC)
        .style(ArgStyle::Tokens)
        .arg("convert");
    let cmd = match request.catalog {
        Some(catalog) => cmd.arg(path_arg(catalog)),
        None => cmd,
    };
    cmd.flag_value("--fallback-display-name", request.target)
        .flag_value("--fallback-bundle-identifier", request.target)
        .flag_value("--fallback-bundle-version", "0")
        .flag_value("--additional-symbol-graph-dir", path_arg(request.symbol_graph_dir))
        .flag_value("--output-dir", path_arg(request.output_dir))
}

/// `zip -j <archive> <executables...>`
#[must_use]
pub fn archive_executables(archive: &Path, executables: &[impl AsRef<Path>]) -> ShellCommand {
    ShellCommand::new(tools::ZIP)
        .style(ArgStyle::Tokens)
        .arg("-j")
        .arg(path_arg(archive))
        .args(executables.iter().map(|exe| path_arg(exe.as_ref())))
}

/// `swiftgen config run --config <file>` with the directories it expects in
/// the environment.
#[must_use]
pub fn generate_sources(
    config_file: &Path,
    project_dir: &Path,
    target: &str,
    output_dir: &Path,
) -> ShellCommand {
    ShellCommand::new(tools::SWIFTGEN)
        .style(ArgStyle::Tokens)
        .args(["config", "run"])
        .flag_value("--config", path_arg(config_file))
        .env("PROJECT_DIR", path_arg(project_dir))
        .env("TARGET_NAME", target)
        .env("DERIVED_SOURCES_DIR", path_arg(output_dir))
}

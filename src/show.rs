//! Display the effective configuration and tool status

use crate::config::{BootstrapConfig, USER_CONFIG_PATH, tools};
use std::io::Write;
use std::path::Path;
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

fn status_line(buffer: &mut Buffer, found: bool, label: &str, detail: &str) {
    let (color, mark) = if found {
        (Color::Green, "✅")
    } else {
        (Color::Red, "❌")
    };
    let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)));
    let _ = writeln!(buffer, "{mark} {label}: {detail}");
    let _ = buffer.reset();
}

/// Print where configuration came from, the resolved values, and which
/// external tools are on PATH.
pub fn show_config(config: &BootstrapConfig, root: &Path, config_path: Option<&Path>) {
    let bufwtr = BufferWriter::stdout(ColorChoice::Auto);
    let mut buffer = bufwtr.buffer();

    let user_path = dirs::config_dir().map(|dir| dir.join(USER_CONFIG_PATH));
    match (config_path, user_path) {
        (Some(path), _) => status_line(&mut buffer, true, "Config", &path.display().to_string()),
        (None, Some(path)) if path.exists() => {
            status_line(&mut buffer, true, "Config", &path.display().to_string());
        }
        _ => {
            let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
            let _ = writeln!(&mut buffer, "⚠️  Config: using built-in defaults");
            let _ = buffer.reset();
        }
    }

    let _ = writeln!(&mut buffer, "\nWorkspace root:       {}", root.display());
    let _ = writeln!(&mut buffer, "Generator:            {}", config.generator);
    let _ = writeln!(&mut buffer, "Version control:      {}", config.vcs);
    let _ = writeln!(&mut buffer, "Shell:                {}", config.shell);
    let _ = writeln!(&mut buffer, "Install script:       {}", config.install_script_url);
    let _ = writeln!(&mut buffer, "Environment prefix:   {}", config.env_prefix);
    let _ = writeln!(&mut buffer, "Cache profile:        {}", config.cache_profile);
    let _ = writeln!(&mut buffer, "Build configuration:  {}", config.build_configuration);

    let layout = &config.signing;
    let _ = writeln!(&mut buffer, "\nSigning:");
    let _ = writeln!(&mut buffer, "   Secrets file:      {}", layout.secrets_file.display());
    let _ = writeln!(&mut buffer, "   Staging directory: {}", layout.staging_dir.display());
    let _ = writeln!(&mut buffer, "   Final directory:   {}", layout.final_dir.display());
    let _ = writeln!(
        &mut buffer,
        "   Identity artifact: {} -> {}",
        layout.identity_artifact.display(),
        layout.identity_output.display()
    );
    let _ = writeln!(
        &mut buffer,
        "   Kept extensions:   {}",
        layout.exempt_extensions.join(", ")
    );
    let staging = root.join(&layout.staging_dir);
    status_line(
        &mut buffer,
        staging.is_dir(),
        "Staging directory",
        &staging.display().to_string(),
    );

    let _ = writeln!(&mut buffer, "\nTools:");
    for tool in [
        config.generator.as_str(),
        config.vcs.as_str(),
        tools::CURL,
        tools::SWIFT_FORMAT,
        tools::DOCC,
        tools::ZIP,
        tools::SWIFTGEN,
    ] {
        match which::which(tool) {
            Ok(path) => status_line(&mut buffer, true, tool, &path.display().to_string()),
            Err(_) => status_line(&mut buffer, false, tool, "Not found"),
        }
    }

    let _ = bufwtr.print(&buffer);
}

//! Shell command construction
//!
//! A [`ShellCommand`] is rendered to a single command line and handed to the
//! shell by the runner. Construction keeps the declared argument order and
//! drops empty arguments, so optional values can be passed unconditionally.
//!
//! - `env` - `KEY=VALUE` parsing and environment prefixes
//! - `generator` - generator verbs (fetch, generate, cache warm, graph, version)
//! - `tools` - version control, installer and plugin tool invocations

pub mod env;
pub mod generator;
pub mod tools;

pub use env::{environment_from_pairs, escaped_environment, is_shell_identifier};
pub use generator::{CacheWarmOptions, FetchOptions, GenerateOptions, Generator};

use std::fmt;

/// How arguments are written onto the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgStyle {
    /// Every argument wrapped in double quotes: `"a" "b c"`
    #[default]
    Quoted,
    /// One bare token per argument, quoting only where the shell needs it
    Tokens,
}

/// An external process invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellCommand {
    executable: String,
    arguments: Vec<String>,
    environment: Vec<(String, String)>,
    style: ArgStyle,
    pipe_into: Option<Box<ShellCommand>>,
}

impl ShellCommand {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            ..Self::default()
        }
    }

    /// A command that does nothing when run.
    #[must_use]
    pub fn noop() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn style(mut self, style: ArgStyle) -> Self {
        self.style = style;
        self
    }

    /// Append an argument. Empty values are dropped.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        let arg = arg.into();
        if !arg.is_empty() {
            self.arguments.push(arg);
        }
        self
    }

    #[must_use]
    pub fn arg_if(self, condition: bool, arg: impl Into<String>) -> Self {
        if condition { self.arg(arg) } else { self }
    }

    #[must_use]
    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        args.into_iter().fold(self, |cmd, arg| cmd.arg(arg))
    }

    /// Append a flag followed by its value; both are skipped if the value is empty.
    #[must_use]
    pub fn flag_value(self, flag: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            return self;
        }
        self.arg(flag).arg(value)
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn envs<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.environment.extend(vars);
        self
    }

    /// Pipe this command's stdout into `next`.
    #[must_use]
    pub fn pipe(mut self, next: ShellCommand) -> Self {
        self.pipe_into = Some(Box::new(next));
        self
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.executable.is_empty()
    }

    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    #[must_use]
    pub fn environment(&self) -> &[(String, String)] {
        &self.environment
    }

    /// Render the full command line: environment prefix, executable, arguments.
    #[must_use]
    pub fn render(&self) -> String {
        if self.is_noop() {
            return String::new();
        }

        let mut line = escaped_environment(&self.environment);
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&shell_token(&self.executable));

        let arguments = match self.style {
            ArgStyle::Quoted => quote_arguments(&self.arguments),
            ArgStyle::Tokens => token_arguments(&self.arguments),
        };
        if !arguments.is_empty() {
            line.push(' ');
            line.push_str(&arguments);
        }

        if let Some(next) = self.pipe_into.as_deref().filter(|next| !next.is_noop()) {
            line.push_str(" | ");
            line.push_str(&next.render());
        }

        line
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Wrap a value in double quotes, escaping what the shell would expand.
#[must_use]
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// All arguments quoted and joined: `"a" "b c"`. Empty arguments are skipped.
///
/// Splitting the result on `" "` gives the arguments back unless one of them
/// contains `"`, `\`, `$` or a backtick: those characters are written with a
/// backslash in front, which the shell removes again.
#[must_use]
pub fn quote_arguments(arguments: &[String]) -> String {
    arguments
        .iter()
        .filter(|arg| !arg.is_empty())
        .map(|arg| quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Arguments as bare tokens, quoting only those the shell would split or expand.
#[must_use]
pub fn token_arguments(arguments: &[String]) -> String {
    arguments
        .iter()
        .filter(|arg| !arg.is_empty())
        .map(|arg| shell_token(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_token(value: &str) -> String {
    if needs_quoting(value) {
        quote(value)
    } else {
        value.to_string()
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value.chars().any(|ch| {
            ch.is_whitespace()
                || matches!(
                    ch,
                    '"' | '\'' | '\\' | '$' | '`' | '|' | '&' | ';' | '<' | '>' | '(' | ')'
                        | '*' | '?' | '[' | ']' | '{' | '}' | '#' | '!' | '~'
                )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    fn split_quoted(rendered: &str) -> Vec<String> {
        rendered
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap()
            .split("\" \"")
            .map(str::to_string)
            .collect()
    }

    #[yare::parameterized(
        single          = { &["generate"] },
        repeated_spaces = { &["a b  c"] },
        path_with_space = { &["checkout", "-f", "Tuist/Code Signing"] },
        separator       = { &["--", "x"] },
    )]
    fn quoted_arguments_split_back_on_quote_boundaries(args: &[&str]) {
        let args = strings(args);
        assert_eq!(split_quoted(&quote_arguments(&args)), args);
    }

    #[yare::parameterized(
        dollar    = { "$HOME", "\"\\$HOME\"" },
        quote     = { "say \"hi\"", "\"say \\\"hi\\\"\"" },
        backslash = { "a\\b", "\"a\\\\b\"" },
        backtick  = { "`id`", "\"\\`id\\`\"" },
    )]
    fn shell_expansions_are_escaped(arg: &str, expected: &str) {
        assert_eq!(quote_arguments(&strings(&[arg])), expected);
    }

    #[test]
    fn empty_arguments_are_dropped() {
        let cmd = ShellCommand::new("tuist")
            .arg("")
            .arg("generate")
            .flag_value("--profile", "")
            .args(["", "--verbose"]);
        assert_eq!(cmd.arguments(), ["generate", "--verbose"]);
        assert_eq!(quote_arguments(&strings(&["a", "", "b"])), "\"a\" \"b\"");
    }

    #[test]
    fn tokens_quote_only_when_needed() {
        let cmd = ShellCommand::new("tuist")
            .style(ArgStyle::Tokens)
            .args(["generate", "--path", "Projects/My App", "--no-open"]);
        assert_eq!(cmd.render(), "tuist generate --path \"Projects/My App\" --no-open");
    }

    #[test]
    fn quoted_style_renders_every_argument_in_quotes() {
        let cmd = ShellCommand::new("git").args(["checkout", "-f", "Tuist/Code_Signing"]);
        assert_eq!(cmd.render(), "git \"checkout\" \"-f\" \"Tuist/Code_Signing\"");
    }

    #[test]
    fn environment_precedes_the_command() {
        let cmd = ShellCommand::new("tuist")
            .style(ArgStyle::Tokens)
            .arg("fetch")
            .env("TUIST_APP", "Sportsbook Dev");
        assert_eq!(cmd.render(), "TUIST_APP=\"Sportsbook Dev\" tuist fetch");
    }

    #[test]
    fn quote_escapes_shell_expansion() {
        assert_eq!(quote("a\"b$c`d\\"), "\"a\\\"b\\$c\\`d\\\\\"");
    }

    #[test]
    fn noop_renders_nothing() {
        let cmd = ShellCommand::noop().arg("ignored");
        assert!(cmd.is_noop());
        assert_eq!(cmd.render(), "");
    }

    #[test]
    fn pipe_joins_commands() {
        let cmd = ShellCommand::new("curl")
            .style(ArgStyle::Tokens)
            .args(["-Ls", "https://install.tuist.io"])
            .pipe(ShellCommand::new("bash"));
        assert_eq!(cmd.render(), "curl -Ls https://install.tuist.io | bash");
    }

    #[test]
    fn declared_order_is_preserved() {
        let cmd = ShellCommand::new("tool").args(["--zeta", "--alpha", "--path", "x"]);
        assert_eq!(cmd.arguments(), ["--zeta", "--alpha", "--path", "x"]);
    }
}

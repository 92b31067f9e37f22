//! Colored terminal output
//!
//! ERROR HANDLING STRATEGY FOR DECORATIVE I/O:
//! All termcolor operations use `let _ =` to deliberately ignore errors.
//! Colored output is decorative and non-essential. If stderr/stdout is unavailable
//! (broken pipe, no TTY, etc.), the program continues gracefully without colors.

use std::fmt;
use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Which standard stream a status line goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Print `marker` in `color`, then the message uncolored.
///
/// Backs the `warn!`, `error!` and `success!` macros.
pub fn status(stream: Stream, color: Color, marker: &str, message: fmt::Arguments<'_>) {
    let bufwtr = match stream {
        Stream::Stdout => BufferWriter::stdout(ColorChoice::Auto),
        Stream::Stderr => BufferWriter::stderr(ColorChoice::Auto),
    };
    let mut buffer = bufwtr.buffer();
    let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)));
    let _ = write!(&mut buffer, "{marker}");
    let _ = buffer.reset();
    let _ = writeln!(&mut buffer, "{message}");
    let _ = bufwtr.print(&buffer);
}

/// Yellow warning on stderr
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::output::status(
            $crate::output::Stream::Stderr,
            termcolor::Color::Yellow,
            "⚠️  ",
            format_args!($($arg)*),
        )
    };
}

/// Red error on stderr
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::output::status(
            $crate::output::Stream::Stderr,
            termcolor::Color::Red,
            "❌ ",
            format_args!($($arg)*),
        )
    };
}

/// Green success line on stdout
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::output::status(
            $crate::output::Stream::Stdout,
            termcolor::Color::Green,
            "✓ ",
            format_args!($($arg)*),
        )
    };
}

/// Print a block of text to stdout in a single color.
///
/// Used for command echoes: yellow before a command runs, green for its output.
pub fn echo(message: &str, color: Color) {
    if message.is_empty() {
        return;
    }
    let bufwtr = BufferWriter::stdout(ColorChoice::Auto);
    let mut buffer = bufwtr.buffer();
    let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)).set_intense(true));
    let _ = writeln!(&mut buffer, "{}", message.trim_end());
    let _ = buffer.reset();
    let _ = bufwtr.print(&buffer);
}

/// Print a banner line, as used at the start of each pipeline step.
pub fn step(title: &str) {
    let bufwtr = BufferWriter::stdout(ColorChoice::Auto);
    let mut buffer = bufwtr.buffer();
    let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Blue)).set_bold(true));
    let _ = write!(&mut buffer, "==> ");
    let _ = buffer.reset();
    let _ = writeln!(&mut buffer, "{title}");
    let _ = bufwtr.print(&buffer);
}

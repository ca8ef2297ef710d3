//! Formatting pass applied to generated files before they are written.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::diagnostic::GeneratorError;

pub trait Formatter {
    fn format(&self, path: &Path, source: &str) -> Result<String, GeneratorError>;
}

impl<T: Formatter + ?Sized> Formatter for Box<T> {
    fn format(&self, path: &Path, source: &str) -> Result<String, GeneratorError> {
        (**self).format(path, source)
    }
}

/// Leaves source untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFormatter;

impl Formatter for NoopFormatter {
    fn format(&self, _path: &Path, source: &str) -> Result<String, GeneratorError> {
        Ok(source.to_string())
    }
}

/// Pipes source through an external command such as `npx prettier`.
///
/// `--stdin-filepath <path>` is appended so the formatter can pick a parser
/// from the file extension.
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    program: String,
    args: Vec<String>,
}

impl CommandFormatter {
    /// Parses a whitespace separated command line.
    pub fn new(command: &str) -> Result<Self, GeneratorError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| GeneratorError::FormatFailed {
            message: "empty format command".to_string(),
        })?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl Formatter for CommandFormatter {
    fn format(&self, path: &Path, source: &str) -> Result<String, GeneratorError> {
        let failed = |message: String| GeneratorError::FormatFailed {
            message: format!("{} ({}): {}", self.program, path.display(), message),
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--stdin-filepath")
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failed(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes()).map_err(|e| failed(e.to_string()))?;
        }

        let output = child.wait_with_output().map_err(|e| failed(e.to_string()))?;
        if !output.status.success() {
            return Err(failed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        String::from_utf8(output.stdout).map_err(|e| failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop() {
        let out = NoopFormatter.format(Path::new("a.ts"), "const a = 1\n").unwrap();
        assert_eq!(out, "const a = 1\n");
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(matches!(
            CommandFormatter::new("   "),
            Err(GeneratorError::FormatFailed { .. })
        ));
    }

    #[test]
    fn test_missing_program_fails() {
        let formatter = CommandFormatter::new("modgen-no-such-formatter --write").unwrap();
        assert!(formatter.format(Path::new("a.ts"), "x").is_err());
    }
}

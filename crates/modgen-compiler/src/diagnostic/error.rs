//! Generator error types.
#![allow(unused_assignments)]

use std::path::PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while generating or merging module files.
#[allow(unused_assignments)]
#[derive(Error, Diagnostic, Debug)]
pub enum GeneratorError {
    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("Failed to read file '{}': {message}", path.display())]
    #[diagnostic(code(modgen::io::read_error))]
    ReadFailed {
        path: PathBuf,
        message: String,
    },

    #[error("Failed to write file '{}': {message}", path.display())]
    #[diagnostic(
        code(modgen::io::write_error),
        help("Files written before this one were kept. Generation is idempotent, re-run it once the problem is fixed.")
    )]
    WriteFailed {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Failed to initialize parser")]
    #[diagnostic(code(modgen::parse::init_failed))]
    ParserInitFailed,

    #[error("Failed to parse file: {}", path.display())]
    #[diagnostic(code(modgen::parse::parse_failed))]
    ParseFailed {
        path: PathBuf,
    },

    // =========================================================================
    // Module Schema Errors
    // =========================================================================
    #[error("Invalid module schema '{}': {message}", path.display())]
    #[diagnostic(code(modgen::schema::invalid))]
    InvalidModuleSchema {
        path: PathBuf,
        message: String,
    },

    #[error("Model '{model}' references unknown model '{target}'")]
    #[diagnostic(
        code(modgen::schema::unknown_model),
        help("Parents and relations must name another model of the same module")
    )]
    UnknownModel {
        model: String,
        target: String,
    },

    #[error("Duplicate model name: {name}")]
    #[diagnostic(code(modgen::schema::duplicate_model))]
    DuplicateModel {
        name: String,
    },

    // =========================================================================
    // Merge Errors
    // =========================================================================
    #[error("Cannot encode {kind} value: {detail}")]
    #[diagnostic(
        code(modgen::merge::unsupported_value),
        help("Middleware arguments must be identifiers, strings, finite numbers, booleans, null, regular expressions, arrays, objects or nested middleware calls")
    )]
    UnsupportedValueKind {
        kind: String,
        detail: String,
    },

    #[error("Route {method} {matcher} references schema '{schema}' which is neither declared nor imported")]
    #[diagnostic(
        code(modgen::merge::dangling_schema),
        help("Add the schema with add_schema or import it before serializing")
    )]
    DanglingSchemaReference {
        schema: String,
        method: String,
        matcher: String,
    },

    #[error("Schema dependency cycle: {}", cycle.join(" -> "))]
    #[diagnostic(
        code(modgen::merge::dependency_cycle),
        help("Schemas are emitted after the schemas they mention. Break the cycle by restructuring the definitions")
    )]
    DependencyCycle {
        cycle: Vec<String>,
    },

    // =========================================================================
    // Code Generation Errors
    // =========================================================================
    #[error("Failed to render template '{template}': {message}")]
    #[diagnostic(code(modgen::codegen::template_failed))]
    TemplateFailed {
        template: String,
        message: String,
    },

    #[error("Failed to format generated code: {message}")]
    #[diagnostic(code(modgen::codegen::format_failed))]
    FormatFailed {
        message: String,
    },
}

impl GeneratorError {
    /// Creates a read error.
    pub fn read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a write error.
    pub fn write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported value error.
    pub fn unsupported(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnsupportedValueKind {
            kind: kind.into(),
            detail: detail.into(),
        }
    }
}

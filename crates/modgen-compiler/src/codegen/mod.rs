//! TypeScript code generation.
//!
//! Two kinds of output are produced:
//! - Module, model, route and admin files rendered from templates. These are
//!   owned by the generator and overwritten on every run.
//! - The shared middleware file, serialized from a merged
//!   [`DeclarationStore`](crate::ir::DeclarationStore) so that hand edits and
//!   other modules' routes survive.

pub mod case;
pub mod middleware;
pub mod paths;
pub mod routes;
pub mod templates;

use std::path::PathBuf;

pub use case::Helpers;
pub use middleware::serialize;
pub use routes::{model_declarations, module_declarations};
pub use templates::{TemplateId, TemplateRenderer, TemplateScope};

/// Generated files, relative to the project root.
#[derive(Debug, Default)]
pub struct GeneratedCode {
    pub files: Vec<(PathBuf, String)>,
}

impl GeneratedCode {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

//! Generator configuration.

use std::path::{Path, PathBuf};

/// Where generated files live inside a Medusa project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Source directory, relative to the project root.
    pub src_dir: PathBuf,
}

impl ProjectLayout {
    pub fn modules_dir(&self) -> PathBuf {
        self.src_dir.join("modules")
    }

    pub fn api_dir(&self) -> PathBuf {
        self.src_dir.join("api")
    }

    pub fn admin_dir(&self) -> PathBuf {
        self.src_dir.join("admin")
    }

    pub fn module_dir(&self, module_name: &str) -> PathBuf {
        self.modules_dir().join(module_name)
    }

    /// Directory of the API routes mounted at `route_path` (`/admin/...`).
    pub fn route_dir(&self, route_path: &str) -> PathBuf {
        self.api_dir().join(route_path.trim_start_matches('/'))
    }
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("src"),
        }
    }
}

/// Configuration for the module generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Medusa project root. Every other path is relative to it.
    pub root: PathBuf,

    pub layout: ProjectLayout,

    /// Shared middleware file, relative to `root`.
    pub middleware_path: PathBuf,

    /// Report what would be written without touching the disk.
    pub dry_run: bool,

    /// Formatter command reading source on stdin (e.g. `npx prettier`).
    /// `--stdin-filepath <file>` is appended.
    pub format_command: Option<String>,
}

impl GeneratorConfig {
    /// Absolute location of the middleware file.
    pub fn middleware_file(&self) -> PathBuf {
        self.root.join(&self.middleware_path)
    }

    /// Directory containing the middleware file, relative to `root`.
    pub fn middleware_dir(&self) -> &Path {
        self.middleware_path.parent().unwrap_or_else(|| Path::new(""))
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            layout: ProjectLayout::default(),
            middleware_path: PathBuf::from("src/api/middlewares.ts"),
            dry_run: false,
            format_command: None,
        }
    }
}

//! # modgen compiler
//!
//! Generates Medusa modules from declarative module schemas and keeps the
//! project's shared `middlewares.ts` in sync without clobbering what other
//! modules or hand edits put there.
//!
//! ## Architecture
//!
//! ```text
//! Module schema (JSON)          Existing middlewares.ts
//!        │                              │
//!        ▼                              ▼
//! ┌──────────────┐              ┌──────────────┐
//! │   Schema     │              │   Frontend   │  tree-sitter, tolerant
//! │  (validate)  │              │  (TS → IR)   │
//! └──────┬───────┘              └──────┬───────┘
//!        │                              │
//!        ├──────────────┐               ▼
//!        ▼              │       ┌──────────────┐
//! ┌──────────────┐      └─────▶ │    Merge     │  merge-by-key
//! │  Templates   │              │    (IR)      │
//! │ (files, TS)  │              └──────┬───────┘
//! └──────────────┘                     ▼
//!                               ┌──────────────┐
//!                               │  Serialize   │  deterministic order
//!                               │  (IR → TS)   │
//!                               └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use modgen_compiler::{load_module_schemas, Generator, GeneratorConfig};
//!
//! let modules: Vec<_> = load_module_schemas("schemas".as_ref())?
//!     .into_iter()
//!     .map(|(_, module)| module)
//!     .collect();
//! let mut generator = Generator::for_config(GeneratorConfig::default())?;
//! let result = generator.generate(&modules)?;
//! ```

pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod format;
pub mod frontend;
pub mod fs;
pub mod ir;
pub mod merge;
pub mod schema;

use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use config::{GeneratorConfig, ProjectLayout};
pub use diagnostic::{GeneratorError, ParseWarning};
pub use format::{CommandFormatter, Formatter, NoopFormatter};
pub use fs::{DryRunFileSystem, FileSystem, MemoryFileSystem, OsFileSystem};
pub use ir::DeclarationStore;
pub use schema::{load_module_schemas, parse_module_schema, ModuleSchema};

use codegen::{GeneratedCode, Helpers, TemplateRenderer};
use frontend::typescript::{MiddlewareParser, ParseReport};

/// Summary of a generation run.
#[derive(Debug, Default)]
pub struct GenerateResult {
    pub modules: usize,
    /// Files whose content changed, relative to the project root.
    pub files_written: Vec<PathBuf>,
    /// Files that already had the generated content.
    pub files_unchanged: usize,
    /// Routes in the merged middleware file.
    pub routes: usize,
    /// Fragments of the existing middleware file that were dropped.
    pub warnings: Vec<ParseWarning>,
}

/// Summary of a check run. Nothing is written.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub modules: usize,
    /// Files a generation run would produce.
    pub files: usize,
    pub routes: usize,
    pub warnings: Vec<ParseWarning>,
}

/// Drives a generation run.
///
/// Rendered files are written first, then the shared middleware file goes
/// through a single read, merge, serialize and write cycle for all modules.
pub struct Generator<F: FileSystem, M: Formatter> {
    config: GeneratorConfig,
    fs: F,
    formatter: M,
    renderer: TemplateRenderer,
    parser: MiddlewareParser,
}

impl Generator<Box<dyn FileSystem>, Box<dyn Formatter>> {
    /// Builds a generator from the configuration alone: the file system
    /// honours `dry_run` and the formatter honours `format_command`.
    pub fn for_config(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        let fs: Box<dyn FileSystem> = if config.dry_run {
            Box::new(DryRunFileSystem::new())
        } else {
            Box::new(OsFileSystem)
        };
        let formatter: Box<dyn Formatter> = match config.format_command.as_deref() {
            Some(command) => Box::new(CommandFormatter::new(command)?),
            None => Box::new(NoopFormatter),
        };
        Self::new(config, fs, formatter)
    }
}

impl<F: FileSystem, M: Formatter> Generator<F, M> {
    pub fn new(config: GeneratorConfig, fs: F, formatter: M) -> Result<Self, GeneratorError> {
        Self::with_helpers(config, fs, formatter, &Helpers::standard())
    }

    /// Like [`Generator::new`] with an explicit template helper table.
    pub fn with_helpers(
        config: GeneratorConfig,
        fs: F,
        formatter: M,
        helpers: &Helpers,
    ) -> Result<Self, GeneratorError> {
        let renderer = TemplateRenderer::new(helpers, config.layout.clone())?;
        let parser = MiddlewareParser::new()?;
        Ok(Self {
            config,
            fs,
            formatter,
            renderer,
            parser,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn file_system(&self) -> &F {
        &self.fs
    }

    /// Generates every module and merges their routes into the middleware
    /// file.
    ///
    /// Template files are written before the middleware file is touched. A
    /// failure while merging leaves the middleware file as it was.
    pub fn generate(&mut self, modules: &[ModuleSchema]) -> Result<GenerateResult, GeneratorError> {
        let generated = self.render(modules)?;
        let mut result = GenerateResult {
            modules: modules.len(),
            ..Default::default()
        };

        for (path, content) in &generated.files {
            self.write_file(path, content, &mut result)?;
        }

        if let Some(first) = modules.first() {
            for (path, content) in self.renderer.render_project_files(first)? {
                let target = self.config.root.join(&path);
                if self.fs.read_text(&target)?.is_some() {
                    debug!(path = %path.display(), "support file exists, leaving it alone");
                    continue;
                }
                self.write_file(&path, &content, &mut result)?;
            }
        }

        let (store, warnings) = self.merged_middleware(modules)?;
        let source = codegen::serialize(&store)?;
        let middleware_path = self.config.middleware_path.clone();
        self.write_file(&middleware_path, &source, &mut result)?;

        result.routes = store.route_count();
        result.warnings = warnings;
        info!(
            modules = result.modules,
            written = result.files_written.len(),
            unchanged = result.files_unchanged,
            routes = result.routes,
            "generation finished"
        );
        Ok(result)
    }

    /// Runs everything except the writes.
    pub fn check(&mut self, modules: &[ModuleSchema]) -> Result<CheckReport, GeneratorError> {
        let generated = self.render(modules)?;
        let (store, warnings) = self.merged_middleware(modules)?;
        codegen::serialize(&store)?;

        Ok(CheckReport {
            modules: modules.len(),
            files: generated.len() + 1,
            routes: store.route_count(),
            warnings,
        })
    }

    /// Reads and parses the current middleware file. A missing file yields
    /// an empty store.
    pub fn read_middleware(&mut self) -> Result<ParseReport, GeneratorError> {
        let path = self.config.middleware_file();
        match self.fs.read_text(&path)? {
            Some(source) => self.parser.parse(&source, &path),
            None => {
                debug!(path = %path.display(), "no middleware file yet");
                Ok(ParseReport::default())
            }
        }
    }

    fn render(&self, modules: &[ModuleSchema]) -> Result<GeneratedCode, GeneratorError> {
        let mut generated = GeneratedCode::default();
        for module in modules {
            module.validate(Path::new(&module.module_name))?;
            let files = self.renderer.render_module(module)?;
            debug!(module = %module.module_name, files = files.len(), "rendered module");
            generated.files.extend(files);
        }
        Ok(generated)
    }

    fn merged_middleware(
        &mut self,
        modules: &[ModuleSchema],
    ) -> Result<(DeclarationStore, Vec<ParseWarning>), GeneratorError> {
        let ParseReport { mut store, warnings } = self.read_middleware()?;

        let middleware_dir = self.config.middleware_dir().to_path_buf();
        for module in modules {
            let declarations = codegen::module_declarations(module, &self.config.layout, &middleware_dir)?;
            store.merge(declarations)?;
        }
        Ok((store, warnings))
    }

    /// Formats and writes `content` to `path` (relative to the root) unless
    /// the file already holds exactly that.
    fn write_file(&mut self, path: &Path, content: &str, result: &mut GenerateResult) -> Result<(), GeneratorError> {
        let target = self.config.root.join(path);
        let formatted = self.formatter.format(&target, content)?;

        if self.fs.read_text(&target)?.as_deref() == Some(formatted.as_str()) {
            result.files_unchanged += 1;
            return Ok(());
        }

        self.fs.write_text(&target, &formatted)?;
        info!(path = %path.display(), "wrote");
        result.files_written.push(path.to_path_buf());
        Ok(())
    }
}

//! modgen CLI.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use modgen_compiler::{load_module_schemas, Generator, GeneratorConfig, ModuleSchema, ProjectLayout};

mod ui;

#[derive(Parser)]
#[command(name = "modgen")]
#[command(about = "Generates Medusa modules from schemas and merges their admin middlewares")]
struct Cli {
    /// Log debug output (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments shared by every command.
#[derive(Args)]
struct ProjectArgs {
    /// Module schema file, or a directory of `*.json` schemas
    schemas: PathBuf,

    /// Medusa project root
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Source directory, relative to the root
    #[arg(long, default_value = "src")]
    src_dir: PathBuf,

    /// Shared middleware file, relative to the root
    #[arg(short, long, default_value = "src/api/middlewares.ts")]
    middleware: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate module files and merge routes into the middleware file
    Generate {
        #[command(flatten)]
        project: ProjectArgs,

        /// Show what would be written without touching the disk
        #[arg(long)]
        dry_run: bool,

        /// Formatter reading source on stdin, e.g. "npx prettier"
        #[arg(long)]
        format_command: Option<String>,
    },

    /// Validate schemas and the existing middleware file without writing
    Check {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate {
            project,
            dry_run,
            format_command,
        } => generate(project, dry_run, format_command),
        Commands::Check { project } => check(project),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn config_for(project: &ProjectArgs) -> GeneratorConfig {
    GeneratorConfig {
        root: project.root.clone(),
        layout: ProjectLayout {
            src_dir: project.src_dir.clone(),
        },
        middleware_path: project.middleware.clone(),
        ..Default::default()
    }
}

fn load_modules(schemas: &Path) -> miette::Result<Vec<ModuleSchema>> {
    let loaded = load_module_schemas(schemas)?;
    if loaded.is_empty() {
        return Err(miette::miette!("no module schemas found in {}", schemas.display()));
    }
    for (path, module) in &loaded {
        ui::dim(&format!("{} {}", module.module_name, path.display()));
    }
    Ok(loaded.into_iter().map(|(_, module)| module).collect())
}

/// Generate module files and merge the middleware file.
fn generate(project: ProjectArgs, dry_run: bool, format_command: Option<String>) -> miette::Result<()> {
    let start = Instant::now();
    let modules = load_modules(&project.schemas)?;

    let config = GeneratorConfig {
        dry_run,
        format_command,
        ..config_for(&project)
    };

    let spinner = ui::spinner("Generating modules...");
    let mut generator = Generator::for_config(config)?;
    let result = match generator.generate(&modules) {
        Ok(result) => result,
        Err(e) => {
            spinner.finish_and_clear();
            ui::error_header();
            return Err(e.into());
        }
    };
    spinner.finish_and_clear();

    for path in &result.files_written {
        ui::file_line(path, dry_run);
    }
    println!();

    if !result.warnings.is_empty() {
        ui::warning(&format!(
            "{} fragment(s) of the middleware file were not understood and were dropped",
            result.warnings.len()
        ));
        for warning in &result.warnings {
            ui::dim(&warning.to_string());
        }
        println!();
    }

    ui::box_header(if dry_run { "DRY RUN" } else { "GENERATED" });
    ui::box_line("");
    ui::box_line(&format!(
        "   {}",
        ui::summary(result.modules, result.files_written.len(), result.routes)
    ));
    ui::box_line(&format!("   {} file(s) already up to date", result.files_unchanged));
    ui::box_line("");
    ui::box_footer();
    println!();

    ui::timing("Done", start.elapsed().as_millis());
    println!();
    Ok(())
}

/// Validate schemas and the middleware file.
fn check(project: ProjectArgs) -> miette::Result<()> {
    let modules = load_modules(&project.schemas)?;
    let spinner = ui::spinner("Checking modules...");

    let mut generator = Generator::for_config(GeneratorConfig {
        dry_run: true,
        ..config_for(&project)
    })?;
    let report = match generator.check(&modules) {
        Ok(report) => report,
        Err(e) => {
            spinner.finish_and_clear();
            ui::error_header();
            return Err(e.into());
        }
    };
    spinner.finish_and_clear();

    for warning in &report.warnings {
        ui::warning(&warning.to_string());
    }
    if report.warnings.is_empty() {
        ui::looking_good();
    }
    println!();
    ui::info(&ui::summary(report.modules, report.files, report.routes));
    println!();
    Ok(())
}

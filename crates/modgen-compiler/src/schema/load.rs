//! Loading module schemas from disk.

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::ModuleSchema;
use crate::diagnostic::GeneratorError;

/// Parses and validates one module schema from JSON text.
pub fn parse_module_schema(content: &str, path: &Path) -> Result<ModuleSchema, GeneratorError> {
    let module: ModuleSchema =
        serde_json::from_str(content).map_err(|e| GeneratorError::InvalidModuleSchema {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    module.validate(path)?;
    Ok(module)
}

/// Loads every module schema at `path`.
///
/// A file is loaded on its own; a directory is walked for `*.json` files,
/// in sorted path order.
pub fn load_module_schemas(path: &Path) -> Result<Vec<(PathBuf, ModuleSchema)>, GeneratorError> {
    let files = if path.is_dir() {
        let mut files = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| GeneratorError::read(path, e.to_string()))?;
            let is_json = entry.path().extension().map(|ext| ext == "json").unwrap_or(false);
            if entry.file_type().is_file() && is_json {
                files.push(entry.into_path());
            }
        }
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut modules = Vec::with_capacity(files.len());
    for file in files {
        let content = std::fs::read_to_string(&file).map_err(|e| GeneratorError::read(&file, e.to_string()))?;
        let module = parse_module_schema(&content, &file)?;
        debug!(path = %file.display(), module = %module.module_name, "loaded module schema");
        modules.push((file, module));
    }

    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SERIES: &str = r#"{
        "moduleName": "vehicles",
        "plural": "vehicles",
        "models": [{ "name": "VehicleSeries", "singular": "series", "plural": "series",
                     "fields": [{ "name": "start_year", "type": "number" }] }]
    }"#;

    #[test]
    fn test_load_directory_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.json"), SERIES).unwrap();
        std::fs::write(dir.path().join("nested/a.json"), SERIES.replace("vehicles", "cars")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let modules = load_module_schemas(dir.path()).unwrap();
        let names: Vec<&str> = modules.iter().map(|(_, m)| m.module_name.as_str()).collect();
        assert_eq!(names, vec!["vehicles", "cars"]);
    }

    #[test]
    fn test_invalid_json_names_the_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("broken.json");
        std::fs::write(&file, "{ not json").unwrap();

        match load_module_schemas(&file) {
            Err(GeneratorError::InvalidModuleSchema { path, .. }) => assert_eq!(path, file),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let result = load_module_schemas(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(GeneratorError::ReadFailed { .. })));
    }
}

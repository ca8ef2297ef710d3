//! Relative import paths between generated files.

use std::path::{Component, Path};

/// Returns the import specifier that reaches `target` from a file in
/// `from_dir`, e.g. `./admin/wipers/validators` or `../../modules/wipers`.
///
/// Both paths are relative to the same root. Separators are always `/`.
pub fn import_path(from_dir: &Path, target: &Path) -> String {
    let relative = pathdiff::diff_paths(target, from_dir).unwrap_or_else(|| target.to_path_buf());

    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::ParentDir => Some("..".to_string()),
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{}", joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_directory() {
        assert_eq!(
            import_path(Path::new("src/api"), Path::new("src/api/admin/wipers/validators")),
            "./admin/wipers/validators"
        );
    }

    #[test]
    fn test_parent_directory() {
        assert_eq!(
            import_path(Path::new("src/api/admin/wipers/[id]"), Path::new("src/modules/wipers")),
            "../../../../modules/wipers"
        );
    }
}

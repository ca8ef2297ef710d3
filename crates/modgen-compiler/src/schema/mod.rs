//! Declarative module schemas.
//!
//! A module schema describes one Medusa module and its models. Schemas are
//! JSON files with camelCase keys:
//!
//! ```json
//! {
//!   "moduleName": "wipers",
//!   "plural": "wipers",
//!   "models": [
//!     { "name": "Wiper", "singular": "wiper", "plural": "wipers", "isParent": true,
//!       "fields": [{ "name": "name", "type": "text" }] }
//!   ]
//! }
//! ```

mod load;

pub use load::{load_module_schemas, parse_module_schema};

use std::collections::HashSet;
use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::diagnostic::GeneratorError;
use crate::ir::is_identifier;

/// One Medusa module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSchema {
    /// Module name, used for the module directory and service registration.
    pub module_name: String,

    /// Plural used in admin route paths.
    pub plural: String,

    pub models: Vec<ModelSchema>,
}

/// One data model inside a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSchema {
    /// PascalCase model name.
    pub name: String,
    pub singular: String,
    pub plural: String,

    /// Parent models own the module's root route prefix.
    #[serde(default)]
    pub is_parent: bool,

    #[serde(default)]
    pub parent: Option<ParentRef>,

    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

/// Link from a child model to its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    pub model: String,
    /// Route prefix under `/admin`, e.g. `vehicles/series`.
    pub route_prefix: String,
}

/// A model field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub relation: Option<Relation>,

    /// Extra zod chain appended in the validators, e.g. `min(1)`.
    #[serde(default)]
    pub validation: Option<String>,

    /// Extra model DSL chain calls, e.g. `nullable()`, `unique()`.
    #[serde(default)]
    pub chainables: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Date,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    #[serde(rename = "type")]
    pub kind: RelationKind,
    pub model: String,
    #[serde(default)]
    pub mapped_by: Option<String>,
    #[serde(default)]
    pub through: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    BelongsTo,
    HasMany,
    ManyToMany,
}

impl ModuleSchema {
    pub fn model(&self, name: &str) -> Option<&ModelSchema> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Models whose routes live under the module's root prefix.
    pub fn children_of<'a>(&'a self, parent: &'a ModelSchema) -> impl Iterator<Item = &'a ModelSchema> {
        self.models
            .iter()
            .filter(move |m| m.parent.as_ref().map(|p| p.model == parent.name).unwrap_or(false))
    }

    /// Checks names and cross references. `path` is only used in errors.
    pub fn validate(&self, path: &Path) -> Result<(), GeneratorError> {
        let invalid = |message: String| GeneratorError::InvalidModuleSchema {
            path: path.to_path_buf(),
            message,
        };

        if self.module_name.trim().is_empty() {
            return Err(invalid("moduleName must not be empty".to_string()));
        }
        check_path_segment(&self.plural).map_err(|m| invalid(format!("plural: {}", m)))?;
        if self.models.is_empty() {
            return Err(invalid(format!("module '{}' has no models", self.module_name)));
        }

        let mut names = HashSet::new();
        for model in &self.models {
            if !is_identifier(&model.name) {
                return Err(invalid(format!("'{}' is not a valid model name", model.name)));
            }
            if !names.insert(model.name.as_str()) {
                return Err(GeneratorError::DuplicateModel {
                    name: model.name.clone(),
                });
            }
            check_path_segment(&model.singular)
                .map_err(|m| invalid(format!("{}.singular: {}", model.name, m)))?;
            check_path_segment(&model.plural)
                .map_err(|m| invalid(format!("{}.plural: {}", model.name, m)))?;
        }

        for model in &self.models {
            if let Some(parent) = &model.parent {
                if parent.model == model.name || self.model(&parent.model).is_none() {
                    return Err(GeneratorError::UnknownModel {
                        model: model.name.clone(),
                        target: parent.model.clone(),
                    });
                }
                if parent.route_prefix.trim_matches('/').is_empty() {
                    return Err(invalid(format!("{}.parent.routePrefix must not be empty", model.name)));
                }
            }

            let mut fields = HashSet::new();
            for field in &model.fields {
                if !is_identifier(&field.name) {
                    return Err(invalid(format!("{}: '{}' is not a valid field name", model.name, field.name)));
                }
                if !fields.insert(field.name.as_str()) {
                    return Err(invalid(format!("{}: duplicate field '{}'", model.name, field.name)));
                }
                if let Some(relation) = &field.relation {
                    if self.model(&relation.model).is_none() {
                        return Err(GeneratorError::UnknownModel {
                            model: model.name.clone(),
                            target: relation.model.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

fn check_path_segment(s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err("must not be empty".to_string());
    }
    if s.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(format!("'{}' must not contain whitespace or '/'", s));
    }
    Ok(())
}

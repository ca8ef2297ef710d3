//! Middleware declarations generated for a model.
//!
//! Every model gets a list schema, query validation on its GET routes and
//! body validation on its POST routes. The declarations are collected in a
//! fresh [`DeclarationStore`] which the driver merges into the store parsed
//! from the existing middleware file.

use std::path::Path;

use super::case::pascal_case;
use super::paths::import_path;
use crate::config::ProjectLayout;
use crate::diagnostic::GeneratorError;
use crate::ir::{ArgValue, DeclarationStore, HttpMethod, MiddlewareInvocation, RouteDeclaration, UNLESS_PATH};
use crate::schema::{FieldSchema, ModelSchema, ModuleSchema, RelationKind};

pub const HTTP_SOURCE: &str = "@medusajs/framework/http";
pub const VALIDATORS_SOURCE: &str = "@medusajs/medusa/api/utils/validators";
pub const VALIDATE_QUERY: &str = "validateAndTransformQuery";
pub const VALIDATE_BODY: &str = "validateAndTransformBody";

/// Helper module providing `unlessPath`, relative to the API directory.
pub const UNLESS_PATH_MODULE: &str = "utils/unless-path";

/// Pluralized model name as used by generated service methods:
/// `WiperKit` with plural `kits` becomes `WiperKits`.
pub fn plural_name(model: &ModelSchema) -> String {
    let singular = pascal_case(&model.singular);
    let plural = pascal_case(&model.plural);
    match model.name.strip_suffix(&singular) {
        Some(stem) if !singular.is_empty() => format!("{}{}", stem, plural),
        _ => format!("{}s", model.name),
    }
}

/// Admin route path of a model's collection, e.g. `/admin/vehicles/series`.
pub fn base_path(module: &ModuleSchema, model: &ModelSchema) -> String {
    if model.is_parent {
        format!("/admin/{}", module.plural)
    } else if let Some(parent) = &model.parent {
        format!("/admin/{}/{}", parent.route_prefix.trim_matches('/'), model.plural)
    } else {
        format!("/admin/{}/{}", module.plural, model.plural)
    }
}

pub fn list_schema_name(model: &ModelSchema) -> String {
    format!("Get{}Schema", plural_name(model))
}

pub fn create_validator_name(model: &ModelSchema) -> String {
    format!("PostAdminCreate{}", model.name)
}

pub fn update_validator_name(model: &ModelSchema) -> String {
    format!("PostAdminUpdate{}", model.name)
}

/// Column names a list/retrieve query returns when no `fields` are given.
pub fn default_fields(model: &ModelSchema) -> Vec<String> {
    let mut fields = vec!["id".to_string()];
    fields.extend(model.fields.iter().filter_map(stored_column));
    fields.push("created_at".to_string());
    fields.push("updated_at".to_string());
    fields
}

fn stored_column(field: &FieldSchema) -> Option<String> {
    match &field.relation {
        None => Some(field.name.clone()),
        Some(relation) if relation.kind == RelationKind::BelongsTo => Some(format!("{}_id", field.name)),
        Some(_) => None,
    }
}

/// Regex matching the collection paths of children nested under `model`'s
/// base path, if there are any.
fn nested_children_pattern(module: &ModuleSchema, model: &ModelSchema) -> Option<String> {
    let base = base_path(module, model);
    let prefix = format!("{}/", base);
    let nested: Vec<String> = module
        .models
        .iter()
        .filter(|m| m.name != model.name)
        .map(|m| base_path(module, m))
        .filter(|path| path.starts_with(&prefix))
        .map(|path| escape_regex(&path[prefix.len()..]))
        .collect();

    if nested.is_empty() {
        return None;
    }
    let alternatives = if nested.len() == 1 {
        nested[0].clone()
    } else {
        format!("({})", nested.join("|"))
    };
    Some(format!("^{}\\/{}", escape_regex(&base), alternatives))
}

/// Escapes regex metacharacters and `/` so `literal` matches itself.
fn escape_regex(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if "\\^$.|?*+()[]{}/".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Builds the middleware declarations for one model.
///
/// `middleware_dir` is the directory of the middleware file, relative to the
/// project root; import paths are computed from it.
pub fn model_declarations(
    module: &ModuleSchema,
    model: &ModelSchema,
    layout: &ProjectLayout,
    middleware_dir: &Path,
) -> Result<DeclarationStore, GeneratorError> {
    let mut store = DeclarationStore::new();
    let base = base_path(module, model);
    let schema = list_schema_name(model);
    let create = create_validator_name(model);
    let update = update_validator_name(model);
    let defaults = ArgValue::strings(default_fields(model));

    store.add_imports(HTTP_SOURCE, ["defineMiddlewares", VALIDATE_BODY, VALIDATE_QUERY]);
    store.add_import(VALIDATORS_SOURCE, "createFindParams");
    let validators = import_path(middleware_dir, &layout.route_dir(&base).join("validators"));
    store.add_imports(&validators, [create.as_str(), update.as_str()]);
    store.add_schema(&schema, "createFindParams()")?;

    let query = |is_list: bool| {
        MiddlewareInvocation::new(
            VALIDATE_QUERY,
            vec![
                ArgValue::ident(&schema),
                ArgValue::object([("defaults", defaults.clone()), ("isList", ArgValue::Boolean(is_list))]),
            ],
        )
    };
    let body = |validator: &str| MiddlewareInvocation::new(VALIDATE_BODY, vec![ArgValue::ident(validator)]);

    let list = match nested_children_pattern(module, model) {
        Some(pattern) => {
            let helper = import_path(middleware_dir, &layout.api_dir().join(UNLESS_PATH_MODULE));
            store.add_import(&helper, UNLESS_PATH);
            MiddlewareInvocation::unless_path(pattern, "", query(true))
        }
        None => query(true),
    };

    let item = format!("{}/:id", base);
    store.add_route(RouteDeclaration::new(HttpMethod::Get, &base, vec![list]))?;
    store.add_route(RouteDeclaration::new(HttpMethod::Post, &base, vec![body(&create)]))?;
    store.add_route(RouteDeclaration::new(HttpMethod::Get, &item, vec![query(false)]))?;
    store.add_route(RouteDeclaration::new(HttpMethod::Post, &item, vec![body(&update)]))?;

    Ok(store)
}

/// Declarations for every model of a module, in schema order.
pub fn module_declarations(
    module: &ModuleSchema,
    layout: &ProjectLayout,
    middleware_dir: &Path,
) -> Result<DeclarationStore, GeneratorError> {
    let mut store = DeclarationStore::new();
    for model in &module.models {
        store.merge(model_declarations(module, model, layout, middleware_dir)?)?;
    }
    Ok(store)
}

//! Mutation API over a [`DeclarationStore`].
//!
//! Every operation is merge-by-key: imports union their names, schemas and
//! routes are replaced wholesale by a later write with the same key. Nothing
//! here touches the file system.

pub mod order;

use tracing::debug;

use crate::diagnostic::GeneratorError;
use crate::frontend::typescript::MiddlewareParser;
use crate::ir::{is_identifier, DeclarationStore, ImportDeclaration, RouteDeclaration, SchemaDefinition};

/// Identifiers ending with this suffix are treated as schema references.
pub const SCHEMA_SUFFIX: &str = "Schema";

impl DeclarationStore {
    /// Adds `name` to the import of `source`, creating the import if absent.
    pub fn add_import(&mut self, source: &str, name: &str) {
        let import = self
            .imports
            .entry(source.to_string())
            .or_insert_with(|| ImportDeclaration::new(source));
        let name = normalize_specifier(name);
        if !name.is_empty() {
            import.names.insert(name);
        }
    }

    /// Adds several names to the import of `source`.
    pub fn add_imports<'a>(&mut self, source: &str, names: impl IntoIterator<Item = &'a str>) {
        let mut any = false;
        for name in names {
            self.add_import(source, name);
            any = true;
        }
        if !any {
            self.imports
                .entry(source.to_string())
                .or_insert_with(|| ImportDeclaration::new(source));
        }
    }

    /// Adds an exported schema constant, replacing any previous definition.
    pub fn add_schema(&mut self, name: &str, expression: &str) -> Result<(), GeneratorError> {
        self.add_schema_definition(name, expression, true)
    }

    /// Adds a schema constant, replacing any previous definition with the
    /// same name in place.
    ///
    /// Fails with `UnsupportedValueKind` if `name` is not an identifier or
    /// `expression` is not a single expression; the store is left untouched
    /// in that case.
    pub fn add_schema_definition(
        &mut self,
        name: &str,
        expression: &str,
        is_exported: bool,
    ) -> Result<(), GeneratorError> {
        if !is_identifier(name) {
            return Err(GeneratorError::unsupported(
                "schema",
                format!("'{}' is not a valid binding name", name),
            ));
        }
        let expression = expression.trim().trim_end_matches(';').trim_end();
        MiddlewareParser::new()?.check_expression(expression)?;
        self.insert_schema(SchemaDefinition::new(name, expression, is_exported));
        Ok(())
    }

    /// Stores an already checked definition.
    pub(crate) fn insert_schema(&mut self, definition: SchemaDefinition) {
        match self.schemas.iter_mut().find(|s| s.name == definition.name) {
            Some(existing) => {
                debug!(schema = %definition.name, "replacing schema definition");
                *existing = definition;
            }
            None => self.schemas.push(definition),
        }
    }

    /// Adds a route, replacing the whole declaration stored under the same
    /// `(method, matcher)` key.
    ///
    /// Fails with `UnsupportedValueKind` if an argument cannot be encoded;
    /// the store is left untouched in that case.
    pub fn add_route(&mut self, route: RouteDeclaration) -> Result<(), GeneratorError> {
        for middleware in &route.middlewares {
            middleware.validate()?;
        }
        for (key, value) in &route.extra {
            if key.is_empty() {
                return Err(GeneratorError::unsupported("object", "empty route property key"));
            }
            value.validate()?;
        }

        if let Some(previous) = self.routes.insert(route.key(), route) {
            debug!(method = %previous.method, matcher = %previous.matcher, "replacing route");
        }
        Ok(())
    }

    /// Keeps a top-level statement verbatim.
    pub fn add_preserved(&mut self, statement: &str) {
        let statement = statement.trim();
        if !statement.is_empty() && !self.preserved.iter().any(|s| s == statement) {
            self.preserved.push(statement.to_string());
        }
    }

    /// Sets a `defineMiddlewares` config property other than `routes`,
    /// replacing any previous value for `key`.
    pub fn add_config_property(&mut self, key: &str, value: &str) {
        let value = value.trim().to_string();
        match self.config_properties.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value,
            None => self.config_properties.push((key.to_string(), value)),
        }
    }

    /// Applies every declaration of `other` on top of this store.
    pub fn merge(&mut self, other: DeclarationStore) -> Result<(), GeneratorError> {
        for import in other.imports.into_values() {
            let source = import.source.clone();
            self.add_imports(&source, import.names.iter().map(String::as_str));
        }
        for schema in other.schemas {
            self.insert_schema(schema);
        }
        for route in other.routes.into_values() {
            self.add_route(route)?;
        }
        for statement in other.preserved {
            self.add_preserved(&statement);
        }
        for (key, value) in other.config_properties {
            self.add_config_property(&key, &value);
        }
        Ok(())
    }

    /// Schema-suffixed identifiers used by routes that nothing in the store
    /// binds, as `(schema, route)` pairs.
    pub fn dangling_schema_references(&self) -> Vec<(String, &RouteDeclaration)> {
        let mut dangling = Vec::new();
        for route in self.routes.values() {
            let mut idents = Vec::new();
            for middleware in &route.middlewares {
                middleware.referenced_identifiers(&mut idents);
            }
            for (_, value) in &route.extra {
                value.referenced_identifiers(&mut idents);
            }
            for ident in idents {
                // Only the root of a dotted path is a binding.
                let root = ident.split('.').next().unwrap_or(ident);
                if root.ends_with(SCHEMA_SUFFIX)
                    && !self.is_bound(root)
                    && !dangling.iter().any(|(name, _): &(String, &RouteDeclaration)| name == root)
                {
                    dangling.push((root.to_string(), route));
                }
            }
        }
        dangling
    }

    /// Fails on the first dangling schema reference.
    pub fn check_references(&self) -> Result<(), GeneratorError> {
        match self.dangling_schema_references().into_iter().next() {
            Some((schema, route)) => Err(GeneratorError::DanglingSchemaReference {
                schema,
                method: route.method.to_string(),
                matcher: route.matcher.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Collapses runs of whitespace inside an import specifier.
fn normalize_specifier(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Structural model of a generated middleware file.
//!
//! The [`DeclarationStore`] is the aggregate root: the parser fills it from an
//! existing file, the mutation API (see [`crate::merge`]) applies new
//! declarations, and the serializer renders it back to source.

mod value;

pub use value::{is_identifier, is_identifier_path, ArgValue, MiddlewareInvocation, UNLESS_PATH};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// HTTP methods a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            "HEAD" => Ok(Self::Head),
            _ => Err(format!("unknown HTTP method '{}'", s)),
        }
    }
}

/// Import statement(s) for one source module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDeclaration {
    pub source: String,
    /// Specifier texts: `a`, `b as c`, `type T`, `default as X`, `* as ns`.
    pub names: BTreeSet<String>,
}

impl ImportDeclaration {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            names: BTreeSet::new(),
        }
    }

    /// Returns the local binding introduced by each specifier.
    pub fn bindings(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|name| {
            let name = name.strip_prefix("type ").unwrap_or(name);
            match name.rsplit_once(" as ") {
                Some((_, local)) => local.trim(),
                None => name.trim(),
            }
        })
    }
}

/// A named schema constant with an opaque right-hand side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDefinition {
    pub name: String,
    /// Source text of the initializer, kept verbatim.
    pub expression: String,
    pub exported: bool,
}

impl SchemaDefinition {
    pub fn new(name: impl Into<String>, expression: impl Into<String>, exported: bool) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            exported,
        }
    }
}

/// Returns true if `text` contains `name` delimited by non-identifier
/// characters.
pub fn mentions_identifier(text: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let bytes = text.as_bytes();
    let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b'$';
    text.match_indices(name).any(|(start, _)| {
        let end = start + name.len();
        let before_ok = start == 0 || !is_ident(bytes[start - 1]);
        let after_ok = end == bytes.len() || !is_ident(bytes[end]);
        before_ok && after_ok
    })
}

/// Key uniquely identifying a route in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteKey {
    pub method: HttpMethod,
    pub matcher: String,
}

/// One entry of the `routes` array.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDeclaration {
    pub matcher: String,
    pub method: HttpMethod,
    pub middlewares: Vec<MiddlewareInvocation>,
    /// Route properties the generator does not own, kept in source order.
    pub extra: Vec<(String, ArgValue)>,
}

impl RouteDeclaration {
    pub fn new(method: HttpMethod, matcher: impl Into<String>, middlewares: Vec<MiddlewareInvocation>) -> Self {
        Self {
            matcher: matcher.into(),
            method,
            middlewares,
            extra: Vec::new(),
        }
    }

    pub fn key(&self) -> RouteKey {
        RouteKey {
            method: self.method,
            matcher: self.matcher.clone(),
        }
    }

    /// Number of non-empty `/`-delimited segments.
    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    /// Number of `:param` segments.
    pub fn param_count(&self) -> usize {
        self.segments().filter(|s| s.starts_with(':')).count()
    }

    pub fn has_param(&self) -> bool {
        self.param_count() > 0
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.matcher.split('/').filter(|s| !s.is_empty())
    }
}

/// In-memory model of one middleware file.
#[derive(Debug, Clone, Default)]
pub struct DeclarationStore {
    pub(crate) imports: BTreeMap<String, ImportDeclaration>,
    /// Insertion order is the base order of the dependency walk.
    pub(crate) schemas: Vec<SchemaDefinition>,
    pub(crate) routes: BTreeMap<RouteKey, RouteDeclaration>,
    /// Top-level statements that are neither imports, schemas nor the
    /// registration call, kept verbatim.
    pub(crate) preserved: Vec<String>,
    /// Properties of the `defineMiddlewares` config other than `routes`
    /// (e.g. `errorHandler`), as `(key, verbatim value)`.
    pub(crate) config_properties: Vec<(String, String)>,
}

impl DeclarationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportDeclaration> {
        self.imports.values()
    }

    pub fn import(&self, source: &str) -> Option<&ImportDeclaration> {
        self.imports.get(source)
    }

    pub fn schemas(&self) -> &[SchemaDefinition] {
        &self.schemas
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaDefinition> {
        self.schemas.iter().find(|s| s.name == name)
    }

    pub fn routes(&self) -> impl Iterator<Item = &RouteDeclaration> {
        self.routes.values()
    }

    pub fn route(&self, method: HttpMethod, matcher: &str) -> Option<&RouteDeclaration> {
        self.routes.get(&RouteKey {
            method,
            matcher: matcher.to_string(),
        })
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn preserved(&self) -> &[String] {
        &self.preserved
    }

    pub fn config_properties(&self) -> &[(String, String)] {
        &self.config_properties
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
            && self.schemas.is_empty()
            && self.routes.is_empty()
            && self.preserved.is_empty()
            && self.config_properties.is_empty()
    }

    /// Returns true if `name` is bound by an import or a schema definition.
    pub fn is_bound(&self, name: &str) -> bool {
        self.schema(name).is_some()
            || self.imports.values().any(|import| import.bindings().any(|b| b == name))
    }

    /// Compares declarations irrespective of schema emission order.
    pub fn same_declarations(&self, other: &DeclarationStore) -> bool {
        let schemas = |store: &DeclarationStore| {
            store
                .schemas
                .iter()
                .map(|s| (s.name.clone(), (s.expression.clone(), s.exported)))
                .collect::<BTreeMap<_, _>>()
        };
        self.imports == other.imports
            && self.routes == other.routes
            && self.preserved == other.preserved
            && self.config_properties == other.config_properties
            && schemas(self) == schemas(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_shape() {
        let route = RouteDeclaration::new(HttpMethod::Post, "/admin/wipers/:id/kits/:kit_id", vec![]);
        assert_eq!(route.segment_count(), 5);
        assert_eq!(route.param_count(), 2);
        assert!(route.has_param());

        let root = RouteDeclaration::new(HttpMethod::Get, "/admin/wipers/", vec![]);
        assert_eq!(root.segment_count(), 2);
        assert!(!root.has_param());
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<HttpMethod>(), Ok(HttpMethod::Get));
        assert_eq!("DELETE".parse::<HttpMethod>(), Ok(HttpMethod::Delete));
        assert!("FETCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_mentions_whole_identifiers() {
        let expression = "BaseSchema.extend({ q: z.string() })";
        assert!(mentions_identifier(expression, "BaseSchema"));
        assert!(!mentions_identifier(expression, "Base"));
        assert!(!mentions_identifier(expression, "ExtendedSchema"));
        assert!(!mentions_identifier("MyBaseSchema.strict()", "BaseSchema"));
        assert!(!mentions_identifier(expression, ""));
    }

    #[test]
    fn test_import_bindings() {
        let mut import = ImportDeclaration::new("./validators");
        import.names.insert("PostAdminCreateWiper".to_string());
        import.names.insert("type Foo as Bar".to_string());
        import.names.insert("* as helpers".to_string());
        let bindings: Vec<&str> = import.bindings().collect();
        assert!(bindings.contains(&"PostAdminCreateWiper"));
        assert!(bindings.contains(&"Bar"));
        assert!(bindings.contains(&"helpers"));
    }
}

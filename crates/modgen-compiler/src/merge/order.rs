//! Canonical emission order for routes, imports and schemas.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::diagnostic::GeneratorError;
use crate::ir::{
    is_identifier, mentions_identifier, DeclarationStore, HttpMethod, ImportDeclaration, RouteDeclaration,
    SchemaDefinition,
};

/// Import sources treated as framework/library code. They are emitted before
/// local imports.
pub const FRAMEWORK_PREFIXES: &[&str] = &["@medusajs/", "@mikro-orm/", "zod", "awilix", "express"];

/// Banner group of a route in the serialized `routes` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RouteGroup {
    Get,
    /// POST without a path parameter.
    Create,
    /// POST with a path parameter, PUT and PATCH.
    Update,
    Delete,
    Other,
}

impl RouteGroup {
    pub fn of(route: &RouteDeclaration) -> Self {
        match route.method {
            HttpMethod::Get => Self::Get,
            HttpMethod::Post if route.has_param() => Self::Update,
            HttpMethod::Post => Self::Create,
            HttpMethod::Put | HttpMethod::Patch => Self::Update,
            HttpMethod::Delete => Self::Delete,
            HttpMethod::Options | HttpMethod::Head => Self::Other,
        }
    }

    /// Comment line emitted above the group.
    pub fn banner(&self) -> &'static str {
        match self {
            Self::Get => "// GET routes",
            Self::Create => "// CREATE routes",
            Self::Update => "// UPDATE routes",
            Self::Delete => "// DELETE routes",
            Self::Other => "// OTHER routes",
        }
    }
}

/// Rank of a method inside its group.
fn method_rank(method: HttpMethod) -> u8 {
    match method {
        HttpMethod::Get => 0,
        HttpMethod::Post => 1,
        HttpMethod::Put => 2,
        HttpMethod::Patch => 3,
        HttpMethod::Delete => 4,
        HttpMethod::Head => 5,
        HttpMethod::Options => 6,
    }
}

/// Total order over routes: group, segment count (descending), parameter
/// count (ascending), matcher.
pub fn compare_routes(a: &RouteDeclaration, b: &RouteDeclaration) -> Ordering {
    RouteGroup::of(a)
        .cmp(&RouteGroup::of(b))
        .then_with(|| method_rank(a.method).cmp(&method_rank(b.method)))
        .then_with(|| b.segment_count().cmp(&a.segment_count()))
        .then_with(|| a.param_count().cmp(&b.param_count()))
        .then_with(|| a.matcher.cmp(&b.matcher))
}

/// Returns the store's routes in emission order.
pub fn sorted_routes(store: &DeclarationStore) -> Vec<&RouteDeclaration> {
    let mut routes: Vec<&RouteDeclaration> = store.routes().collect();
    routes.sort_by(|a, b| compare_routes(a, b));
    routes
}

pub fn is_framework_source(source: &str) -> bool {
    FRAMEWORK_PREFIXES.iter().any(|prefix| {
        if prefix.ends_with('/') {
            source.starts_with(prefix)
        } else {
            source == *prefix || source.starts_with(&format!("{}/", prefix))
        }
    })
}

/// Framework imports first, then everything else, each lexicographic.
pub fn sorted_imports(store: &DeclarationStore) -> Vec<&ImportDeclaration> {
    let mut imports: Vec<&ImportDeclaration> = store.imports().collect();
    imports.sort_by(|a, b| {
        let group = |i: &ImportDeclaration| if is_framework_source(&i.source) { 0 } else { 1 };
        group(a).cmp(&group(b)).then_with(|| a.source.cmp(&b.source))
    });
    imports
}

/// A top-level binding or statement in emission order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopLevel<'a> {
    Schema(&'a SchemaDefinition),
    /// A preserved statement, verbatim.
    Statement(&'a str),
}

/// One node of the dependency walk.
struct Node<'a> {
    item: TopLevel<'a>,
    /// Text evaluated when the module loads; empty for hoisted functions.
    eager: &'a str,
    /// Names this node declares that others may need initialized first.
    bindings: Vec<String>,
}

impl Node<'_> {
    fn label(&self) -> String {
        match self.item {
            TopLevel::Schema(schema) => schema.name.clone(),
            TopLevel::Statement(text) => self
                .bindings
                .first()
                .cloned()
                .unwrap_or_else(|| strip_leading_comments(text).lines().next().unwrap_or("").to_string()),
        }
    }

    fn depends_on(&self, other: &Node) -> bool {
        !self.eager.is_empty() && other.bindings.iter().any(|name| mentions_identifier(self.eager, name))
    }
}

/// Orders schemas and preserved statements so each one follows every binding
/// its initializer reads.
///
/// The walk starts from insertion order, schemas first; a node reachable from
/// several others is emitted once. Function declarations are hoisted and take
/// no part in the ordering. Cycles are an error.
pub fn ordered_declarations(store: &DeclarationStore) -> Result<Vec<TopLevel<'_>>, GeneratorError> {
    let mut nodes: Vec<Node> = store
        .schemas()
        .iter()
        .map(|schema| Node {
            item: TopLevel::Schema(schema),
            eager: &schema.expression,
            bindings: vec![schema.name.clone()],
        })
        .collect();
    for statement in store.preserved() {
        let (eager, bindings) = match declared_bindings(statement) {
            Some(bindings) => (statement.as_str(), bindings),
            None => ("", Vec::new()),
        };
        nodes.push(Node {
            item: TopLevel::Statement(statement),
            eager,
            bindings,
        });
    }

    let mut ordered = Vec::with_capacity(nodes.len());
    let mut done: HashSet<usize> = HashSet::new();
    let mut stack: Vec<usize> = Vec::new();

    for index in 0..nodes.len() {
        visit(&nodes, index, &mut done, &mut stack, &mut ordered)?;
    }

    Ok(ordered)
}

fn visit<'a>(
    nodes: &[Node<'a>],
    index: usize,
    done: &mut HashSet<usize>,
    stack: &mut Vec<usize>,
    ordered: &mut Vec<TopLevel<'a>>,
) -> Result<(), GeneratorError> {
    if done.contains(&index) {
        return Ok(());
    }
    if let Some(pos) = stack.iter().position(|&i| i == index) {
        let mut cycle: Vec<String> = stack[pos..].iter().map(|&i| nodes[i].label()).collect();
        cycle.push(nodes[index].label());
        return Err(GeneratorError::DependencyCycle { cycle });
    }

    stack.push(index);
    let node = &nodes[index];
    for (dep, candidate) in nodes.iter().enumerate() {
        if dep != index && node.depends_on(candidate) {
            visit(nodes, dep, done, stack, ordered)?;
        }
    }
    stack.pop();

    done.insert(index);
    ordered.push(node.item);
    Ok(())
}

/// Runtime names declared by a preserved statement.
///
/// `None` for function declarations, which are hoisted. Statements that
/// declare nothing (expressions, type aliases) yield an empty list.
fn declared_bindings(statement: &str) -> Option<Vec<String>> {
    let mut rest = strip_leading_comments(statement);
    loop {
        let (word, tail) = split_word(rest);
        match word {
            "export" | "default" | "declare" | "async" | "abstract" => rest = tail,
            "function" => return None,
            "const" | "let" | "var" => return Some(declarator_names(tail)),
            "class" | "enum" => {
                let (name, _) = split_word(tail);
                return Some(if is_identifier(name) { vec![name.to_string()] } else { Vec::new() });
            }
            _ => return Some(Vec::new()),
        }
    }
}

/// Splits off the leading identifier-like word.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(text.len());
    (&text[..end], &text[end..])
}

fn strip_leading_comments(text: &str) -> &str {
    let mut rest = text.trim_start();
    loop {
        if let Some(line) = rest.strip_prefix("//") {
            rest = line.find('\n').map(|i| &line[i + 1..]).unwrap_or("").trim_start();
        } else if let Some(block) = rest.strip_prefix("/*") {
            rest = block.find("*/").map(|i| &block[i + 2..]).unwrap_or("").trim_start();
        } else {
            return rest;
        }
    }
}

/// Names bound by the declarator list of a `const`/`let`/`var` statement,
/// including every name inside a destructuring pattern.
fn declarator_names(list: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0i32;
    let mut in_pattern = true;
    let mut pattern = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in list.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            // Type annotation or initializer ends the binding pattern.
            ':' | '=' if depth == 0 && in_pattern => {
                push_identifiers(&mut pattern, &mut names);
                in_pattern = false;
            }
            ',' if depth == 0 => {
                push_identifiers(&mut pattern, &mut names);
                in_pattern = true;
                continue;
            }
            ';' if depth == 0 => break,
            _ => {}
        }
        if in_pattern {
            pattern.push(c);
        }
    }
    push_identifiers(&mut pattern, &mut names);
    names
}

fn push_identifiers(pattern: &mut String, names: &mut Vec<String>) {
    names.extend(
        pattern
            .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .filter(|word| is_identifier(word))
            .map(str::to_string),
    );
    pattern.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::RouteDeclaration;

    fn route(method: HttpMethod, matcher: &str) -> RouteDeclaration {
        RouteDeclaration::new(method, matcher, vec![])
    }

    fn declaration_labels(store: &DeclarationStore) -> Vec<String> {
        ordered_declarations(store)
            .unwrap()
            .into_iter()
            .map(|item| match item {
                TopLevel::Schema(schema) => schema.name.clone(),
                TopLevel::Statement(text) => text.to_string(),
            })
            .collect()
    }

    fn matchers(store: &DeclarationStore) -> Vec<String> {
        sorted_routes(store)
            .iter()
            .map(|r| format!("{} {}", r.method, r.matcher))
            .collect()
    }

    #[test]
    fn test_more_specific_routes_first() {
        let mut store = DeclarationStore::new();
        store.add_route(route(HttpMethod::Get, "/admin/wipers")).unwrap();
        store.add_route(route(HttpMethod::Get, "/admin/wipers/kits")).unwrap();

        assert_eq!(matchers(&store), vec!["GET /admin/wipers/kits", "GET /admin/wipers"]);
    }

    #[test]
    fn test_get_before_post_regardless_of_insertion() {
        let mut store = DeclarationStore::new();
        store.add_route(route(HttpMethod::Post, "/admin/a/b/c")).unwrap();
        store.add_route(route(HttpMethod::Get, "/admin/z")).unwrap();
        store.add_route(route(HttpMethod::Post, "/admin/z")).unwrap();
        store.add_route(route(HttpMethod::Get, "/admin/a")).unwrap();

        assert_eq!(
            matchers(&store),
            vec!["GET /admin/a", "GET /admin/z", "POST /admin/a/b/c", "POST /admin/z"]
        );
    }

    #[test]
    fn test_create_before_update_and_static_before_param() {
        let mut store = DeclarationStore::new();
        store.add_route(route(HttpMethod::Post, "/admin/wipers/:id")).unwrap();
        store.add_route(route(HttpMethod::Post, "/admin/wipers")).unwrap();
        store.add_route(route(HttpMethod::Get, "/admin/wipers/:id")).unwrap();
        store.add_route(route(HttpMethod::Get, "/admin/wipers/kits")).unwrap();
        store.add_route(route(HttpMethod::Delete, "/admin/wipers/:id")).unwrap();

        assert_eq!(
            matchers(&store),
            vec![
                "GET /admin/wipers/kits",
                "GET /admin/wipers/:id",
                "POST /admin/wipers",
                "POST /admin/wipers/:id",
                "DELETE /admin/wipers/:id",
            ]
        );
    }

    #[test]
    fn test_groups() {
        assert_eq!(RouteGroup::of(&route(HttpMethod::Post, "/admin/x")), RouteGroup::Create);
        assert_eq!(RouteGroup::of(&route(HttpMethod::Post, "/admin/x/:id")), RouteGroup::Update);
        assert_eq!(RouteGroup::of(&route(HttpMethod::Patch, "/admin/x")), RouteGroup::Update);
        assert_eq!(RouteGroup::of(&route(HttpMethod::Head, "/admin/x")), RouteGroup::Other);
    }

    #[test]
    fn test_framework_imports_first() {
        let mut store = DeclarationStore::new();
        store.add_import("./utils/unless-path", "unlessPath");
        store.add_import("zod", "z");
        store.add_import("@medusajs/medusa/api/utils/validators", "createFindParams");
        store.add_import("@medusajs/framework/http", "defineMiddlewares");
        store.add_import("../lib", "helper");

        let sources: Vec<&str> = sorted_imports(&store).iter().map(|i| i.source.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                "@medusajs/framework/http",
                "@medusajs/medusa/api/utils/validators",
                "zod",
                "../lib",
                "./utils/unless-path",
            ]
        );
    }

    #[test]
    fn test_framework_prefix_matching() {
        assert!(is_framework_source("zod"));
        assert!(is_framework_source("express/lib"));
        assert!(!is_framework_source("zodiac"));
        assert!(is_framework_source("@medusajs/framework/utils"));
        assert!(!is_framework_source("./zod"));
    }

    #[test]
    fn test_schema_dependency_order() {
        let mut store = DeclarationStore::new();
        store.add_schema("ExtendedSchema", "BaseSchema.extend({ q: z.string() })").unwrap();
        store.add_schema("BaseSchema", "z.object({ id: z.string() })").unwrap();

        assert_eq!(declaration_labels(&store), vec!["BaseSchema", "ExtendedSchema"]);
    }

    #[test]
    fn test_shared_dependency_emitted_once() {
        let mut store = DeclarationStore::new();
        store.add_schema("LeftSchema", "BaseSchema.extend({})").unwrap();
        store.add_schema("RightSchema", "BaseSchema.merge(LeftSchema)").unwrap();
        store.add_schema("BaseSchema", "z.object({})").unwrap();

        assert_eq!(declaration_labels(&store), vec!["BaseSchema", "LeftSchema", "RightSchema"]);
    }

    #[test]
    fn test_cycle_is_an_error() {
        let mut store = DeclarationStore::new();
        store.add_schema("ASchema", "BSchema.extend({})").unwrap();
        store.add_schema("BSchema", "ASchema.extend({})").unwrap();

        let err = ordered_declarations(&store).unwrap_err();
        match err {
            GeneratorError::DependencyCycle { cycle } => {
                assert_eq!(cycle, vec!["ASchema", "BSchema", "ASchema"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_statement_read_by_schema_comes_first() {
        let mut store = DeclarationStore::new();
        store.add_schema("ListSchema", "z.object({ limit: z.number().default(PAGE_SIZE) })").unwrap();
        store.add_preserved("const PAGE_SIZE = 50;");
        store.add_preserved("function helper() {\n  return ListSchema;\n}");
        store.add_preserved("const LIMITS = ListSchema.shape;");

        assert_eq!(
            declaration_labels(&store),
            vec![
                "const PAGE_SIZE = 50;",
                "ListSchema",
                "function helper() {\n  return ListSchema;\n}",
                "const LIMITS = ListSchema.shape;",
            ]
        );
    }

    #[test]
    fn test_statement_cycle_is_an_error() {
        let mut store = DeclarationStore::new();
        store.add_schema("ListSchema", "z.object({ limit: LIMIT })").unwrap();
        store.add_preserved("const LIMIT = ListSchema.shape.limit;");

        let err = ordered_declarations(&store).unwrap_err();
        assert!(matches!(err, GeneratorError::DependencyCycle { ref cycle } if cycle[0] == "ListSchema"));
    }

    #[test]
    fn test_declared_bindings() {
        assert_eq!(declared_bindings("const PAGE_SIZE = 50;"), Some(vec!["PAGE_SIZE".to_string()]));
        assert_eq!(
            declared_bindings("// shared limits\nexport const { a, b: c } = LIMITS, d = \"x, y\";"),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()])
        );
        assert_eq!(declared_bindings("let total: number = 0;"), Some(vec!["total".to_string()]));
        assert_eq!(declared_bindings("export class Cache {}"), Some(vec!["Cache".to_string()]));
        assert_eq!(declared_bindings("export async function load() {}"), None);
        assert_eq!(declared_bindings("console.log(PAGE_SIZE);"), Some(Vec::new()));
    }
}

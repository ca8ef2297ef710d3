//! Structural parser for `middlewares.ts` using tree-sitter.
//!
//! Only three shapes are modelled: import statements, `*Schema` constant
//! bindings and the `routes` array of the default-exported
//! `defineMiddlewares({ ... })` call. Any other top-level statement is kept
//! verbatim. Fragments that look like one of the three shapes but cannot be
//! decoded are skipped with a [`ParseWarning`].

use std::path::{Path, PathBuf};
use tracing::warn;
use tree_sitter::{Node, Parser};

use crate::codegen::middleware::HEADER;
use crate::diagnostic::{GeneratorError, ParseWarning, Span};
use crate::ir::{
    is_identifier_path, ArgValue, DeclarationStore, HttpMethod, MiddlewareInvocation, RouteDeclaration,
    SchemaDefinition,
};
use crate::merge::SCHEMA_SUFFIX;

/// Name of the middleware registration call.
pub const DEFINE_MIDDLEWARES: &str = "defineMiddlewares";

/// Result of parsing one file.
#[derive(Debug, Default)]
pub struct ParseReport {
    pub store: DeclarationStore,
    pub warnings: Vec<ParseWarning>,
}

/// Parser for generated (or compatible hand-written) middleware files.
pub struct MiddlewareParser {
    parser: Parser,
}

impl MiddlewareParser {
    /// Creates a new parser.
    pub fn new() -> Result<Self, GeneratorError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .map_err(|_| GeneratorError::ParserInitFailed)?;
        Ok(Self { parser })
    }

    /// Parses `source` into a declaration store.
    ///
    /// Never fails on unfamiliar syntax; only parser setup failures are
    /// errors.
    pub fn parse(&mut self, source: &str, path: &Path) -> Result<ParseReport, GeneratorError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| GeneratorError::ParseFailed { path: path.to_path_buf() })?;

        let mut visitor = Visitor::new(source, path);
        visitor.visit_program(tree.root_node());

        for warning in &visitor.warnings {
            warn!(file = %path.display(), "{}", warning);
        }

        Ok(ParseReport {
            store: visitor.store,
            warnings: visitor.warnings,
        })
    }

    /// Checks that `expression` is exactly one expression that can stand as
    /// the initializer of a `const` binding.
    pub fn check_expression(&mut self, expression: &str) -> Result<(), GeneratorError> {
        if expression.trim().is_empty() {
            return Err(GeneratorError::unsupported("expression", "empty expression"));
        }
        let source = format!("const __binding = {};", expression);
        let tree = self
            .parser
            .parse(&source, None)
            .ok_or_else(|| GeneratorError::ParseFailed { path: PathBuf::from("<expression>") })?;

        let root = tree.root_node();
        let statements = named_children(root);
        let declarator = match statements.as_slice() {
            [statement] if !root.has_error() && statement.kind() == "lexical_declaration" => {
                let declarators = named_children(*statement);
                match declarators.as_slice() {
                    [declarator] if statement.byte_range() == (0..source.len()) => Some(*declarator),
                    _ => None,
                }
            }
            _ => None,
        };
        let value = declarator.and_then(|d| d.child_by_field_name("value"));
        match value {
            Some(value) if value.utf8_text(source.as_bytes()).ok() == Some(expression.trim()) => Ok(()),
            _ => Err(GeneratorError::unsupported(
                "expression",
                format!("'{}' is not a single expression", expression),
            )),
        }
    }

    /// Decodes a single TypeScript expression into an argument value.
    pub fn parse_arg_value(&mut self, expression: &str) -> Result<ArgValue, GeneratorError> {
        let source = format!("({});", expression);
        let tree = self
            .parser
            .parse(&source, None)
            .ok_or_else(|| GeneratorError::ParseFailed { path: PathBuf::from("<expression>") })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(GeneratorError::unsupported(
                "expression",
                format!("'{}' is not a valid expression", expression),
            ));
        }

        let visitor = Visitor::new(&source, Path::new("<expression>"));
        let statement = named_children(root)
            .into_iter()
            .find(|n| n.kind() == "expression_statement")
            .and_then(|n| named_children(n).into_iter().next())
            .ok_or_else(|| GeneratorError::unsupported("expression", "empty expression"))?;

        let value = visitor
            .decode_value(statement)
            .map_err(|e| GeneratorError::unsupported(e.kind, e.detail))?;
        value.validate()?;
        Ok(value)
    }
}

/// Why a value could not be decoded.
#[derive(Debug)]
struct DecodeError {
    kind: String,
    detail: String,
}

impl DecodeError {
    fn new(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
        }
    }
}

/// Collects named children, skipping comments.
fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Walks the syntax tree and fills a declaration store.
struct Visitor<'a> {
    source: &'a str,
    path: &'a Path,
    store: DeclarationStore,
    warnings: Vec<ParseWarning>,
    seen_registration: bool,
    /// Top-level comments since the last statement.
    leading_comments: Vec<&'a str>,
}

impl<'a> Visitor<'a> {
    fn new(source: &'a str, path: &'a Path) -> Self {
        Self {
            source,
            path,
            store: DeclarationStore::new(),
            warnings: Vec::new(),
            seen_registration: false,
            leading_comments: Vec::new(),
        }
    }

    fn span(&self, node: Node) -> Span {
        Span::new(
            self.path.to_path_buf(),
            node.start_position().row,
            node.start_position().column,
            node.end_position().row,
            node.end_position().column,
        )
    }

    fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn warn(&mut self, fragment: &'static str, message: impl Into<String>, node: Node) {
        let span = self.span(node);
        self.warnings.push(ParseWarning::new(fragment, message, span));
    }

    fn visit_program(&mut self, node: Node) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            if child.kind() == "comment" {
                let text = self.node_text(child);
                if !HEADER.lines().any(|line| line == text) {
                    self.leading_comments.push(text);
                }
                continue;
            }
            match child.kind() {
                "import_statement" => self.visit_import(child),
                "export_statement" => self.visit_export(child),
                "lexical_declaration" | "variable_declaration" => {
                    self.visit_declaration(child, false, child);
                }
                "empty_statement" => {}
                "ERROR" => self.warn("statement", "unparseable source", child),
                _ => self.preserve(child),
            }
            // Comments above anything but a preserved statement are dropped.
            self.leading_comments.clear();
        }
    }

    /// Keeps `node` verbatim, together with the comments directly above it.
    fn preserve(&mut self, node: Node) {
        if node.has_error() {
            self.warn("statement", "statement contains syntax errors", node);
            return;
        }
        let mut lines = std::mem::take(&mut self.leading_comments);
        lines.push(self.node_text(node));
        self.store.add_preserved(&lines.join("\n"));
    }

    // =========================================================================
    // Imports
    // =========================================================================

    fn visit_import(&mut self, node: Node) {
        if node.has_error() {
            self.warn("import", "import statement contains syntax errors", node);
            return;
        }

        let source_node = node
            .child_by_field_name("source")
            .or_else(|| named_children(node).into_iter().find(|n| n.kind() == "string"));
        let Some(source_node) = source_node else {
            self.warn("import", "import statement without a source module", node);
            return;
        };
        let source = string_contents(self.node_text(source_node));

        let type_only = {
            let mut cursor = node.walk();
            let is_type = node.children(&mut cursor).any(|c| c.kind() == "type");
            is_type
        };
        let prefix = if type_only { "type " } else { "" };

        let mut names = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "import_clause" => {
                    for part in named_children(child) {
                        match part.kind() {
                            "identifier" => {
                                names.push(format!("{}default as {}", prefix, self.node_text(part)));
                            }
                            "namespace_import" => {
                                names.push(normalize(self.node_text(part)));
                            }
                            "named_imports" => {
                                for spec in named_children(part) {
                                    if spec.kind() == "import_specifier" {
                                        names.push(format!("{}{}", prefix, normalize(self.node_text(spec))));
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                }
                "import_require_clause" => {
                    self.warn("import", "import-require syntax is not supported", node);
                    return;
                }
                _ => {}
            }
        }

        self.store.add_imports(&source, names.iter().map(String::as_str));
    }

    // =========================================================================
    // Exports and bindings
    // =========================================================================

    fn visit_export(&mut self, node: Node) {
        if let Some(declaration) = node.child_by_field_name("declaration") {
            if matches!(declaration.kind(), "lexical_declaration" | "variable_declaration") {
                self.visit_declaration(declaration, true, node);
            } else {
                self.preserve(node);
            }
            return;
        }

        let value = node.child_by_field_name("value").or_else(|| {
            named_children(node)
                .into_iter()
                .find(|n| n.kind() == "call_expression")
        });

        match value {
            Some(call) if self.is_registration_call(call) => self.visit_registration(call),
            _ => self.preserve(node),
        }
    }

    fn is_registration_call(&self, node: Node) -> bool {
        node.kind() == "call_expression"
            && node
                .child_by_field_name("function")
                .map(|f| self.node_text(f) == DEFINE_MIDDLEWARES)
                .unwrap_or(false)
    }

    /// `statement` is the node kept verbatim when the binding is not a schema.
    fn visit_declaration(&mut self, node: Node, exported: bool, statement: Node) {
        let declarators: Vec<Node> = named_children(node)
            .into_iter()
            .filter(|n| n.kind() == "variable_declarator")
            .collect();

        let schema_like = |v: &Self, d: &Node| {
            d.child_by_field_name("name")
                .map(|n| n.kind() == "identifier" && v.node_text(n).ends_with(SCHEMA_SUFFIX))
                .unwrap_or(false)
        };

        if !declarators.iter().any(|d| schema_like(self, d)) {
            self.preserve(statement);
            return;
        }

        if declarators.len() != 1 {
            self.warn("schema", "several bindings in one schema declaration", statement);
            self.preserve(statement);
            return;
        }

        let declarator = declarators[0];
        if declarator.has_error() {
            self.warn("schema", "schema definition contains syntax errors", declarator);
            return;
        }

        let name = declarator
            .child_by_field_name("name")
            .map(|n| self.node_text(n))
            .unwrap_or("");
        match declarator.child_by_field_name("value") {
            Some(value) => {
                let expression = self.node_text(value);
                self.store.insert_schema(SchemaDefinition::new(name, expression, exported));
            }
            None => self.warn("schema", format!("schema '{}' has no initializer", name), declarator),
        }
    }

    // =========================================================================
    // defineMiddlewares({ routes: [...] })
    // =========================================================================

    fn visit_registration(&mut self, call: Node) {
        if self.seen_registration {
            self.warn("middlewares", "more than one defineMiddlewares call", call);
            return;
        }
        self.seen_registration = true;

        let config = call
            .child_by_field_name("arguments")
            .and_then(|args| named_children(args).into_iter().next());
        let Some(config) = config.filter(|c| c.kind() == "object") else {
            self.warn("middlewares", "defineMiddlewares expects an object literal", call);
            return;
        };

        for property in named_children(config) {
            if property.kind() != "pair" {
                self.warn("middlewares", "unsupported property in middleware config", property);
                continue;
            }
            let (Some(key), Some(value)) = (
                property.child_by_field_name("key"),
                property.child_by_field_name("value"),
            ) else {
                self.warn("middlewares", "incomplete property in middleware config", property);
                continue;
            };

            let key = property_key(self.node_text(key), key.kind());
            if key == "routes" {
                if value.kind() == "array" {
                    self.visit_routes(value);
                } else {
                    self.warn("middlewares", "routes must be an array literal", value);
                }
            } else if property.has_error() {
                self.warn("middlewares", format!("property '{}' contains syntax errors", key), property);
            } else {
                let text = self.node_text(value);
                self.store.add_config_property(&key, text);
            }
        }
    }

    fn visit_routes(&mut self, array: Node) {
        for element in named_children(array) {
            if element.kind() != "object" {
                self.warn(
                    "route",
                    format!("expected an object literal, found {}", element.kind()),
                    element,
                );
                continue;
            }
            if element.has_error() {
                self.warn("route", "route entry contains syntax errors", element);
                continue;
            }

            match self.decode_route(element) {
                Ok(routes) => {
                    for route in routes {
                        if let Err(e) = self.store.add_route(route) {
                            self.warn("route", e.to_string(), element);
                        }
                    }
                }
                Err(e) => self.warn("route", format!("{} ({})", e.detail, e.kind), element),
            }
        }
    }

    fn decode_route(&self, object: Node) -> Result<Vec<RouteDeclaration>, DecodeError> {
        let mut matcher = None;
        let mut methods = Vec::new();
        let mut middlewares = Vec::new();
        let mut extra = Vec::new();

        for property in named_children(object) {
            if property.kind() != "pair" {
                return Err(DecodeError::new(
                    property.kind(),
                    "route entries may only contain key/value pairs",
                ));
            }
            let key_node = property
                .child_by_field_name("key")
                .ok_or_else(|| DecodeError::new("pair", "missing key"))?;
            let value = property
                .child_by_field_name("value")
                .ok_or_else(|| DecodeError::new("pair", "missing value"))?;
            let key = property_key(self.node_text(key_node), key_node.kind());

            match key.as_str() {
                "matcher" => match self.decode_value(value)? {
                    ArgValue::String(s) => matcher = Some(s),
                    other => {
                        return Err(DecodeError::new(other.kind_name(), "matcher must be a string literal"));
                    }
                },
                "method" => {
                    methods = match self.decode_value(value)? {
                        ArgValue::String(s) => vec![parse_method(&s)?],
                        ArgValue::Array(items) => items
                            .iter()
                            .map(|item| match item {
                                ArgValue::String(s) => parse_method(s),
                                other => Err(DecodeError::new(other.kind_name(), "method must be a string literal")),
                            })
                            .collect::<Result<Vec<_>, _>>()?,
                        other => {
                            return Err(DecodeError::new(other.kind_name(), "method must be a string or an array"));
                        }
                    };
                }
                "middlewares" => {
                    if value.kind() != "array" {
                        return Err(DecodeError::new(value.kind(), "middlewares must be an array literal"));
                    }
                    for (index, item) in named_children(value).into_iter().enumerate() {
                        match self.decode_value(item)? {
                            ArgValue::Invocation(invocation) => middlewares.push(invocation),
                            other => {
                                return Err(DecodeError::new(
                                    other.kind_name(),
                                    format!("middleware #{} is not a call expression", index + 1),
                                ));
                            }
                        }
                    }
                }
                _ => extra.push((key, self.decode_value(value)?)),
            }
        }

        let matcher = matcher.ok_or_else(|| DecodeError::new("route", "missing matcher"))?;
        if methods.is_empty() {
            return Err(DecodeError::new("route", "missing method"));
        }

        Ok(methods
            .into_iter()
            .map(|method| RouteDeclaration {
                matcher: matcher.clone(),
                method,
                middlewares: middlewares.clone(),
                extra: extra.clone(),
            })
            .collect())
    }

    // =========================================================================
    // Values
    // =========================================================================

    fn decode_value(&self, node: Node) -> Result<ArgValue, DecodeError> {
        if node.has_error() {
            return Err(DecodeError::new(node.kind(), "syntax error"));
        }

        match node.kind() {
            "identifier" | "undefined" => Ok(ArgValue::Identifier(self.node_text(node).to_string())),
            "member_expression" => {
                let path: String = self.node_text(node).split_whitespace().collect();
                if is_identifier_path(&path) {
                    Ok(ArgValue::Identifier(path))
                } else {
                    Err(DecodeError::new("member_expression", format!("'{}' is not a plain member path", path)))
                }
            }
            "string" => Ok(ArgValue::String(unescape(&string_contents(self.node_text(node))))),
            "template_string" => {
                if named_children(node).iter().any(|c| c.kind() == "template_substitution") {
                    return Err(DecodeError::new("template_string", "template substitutions cannot be regenerated"));
                }
                Ok(ArgValue::String(unescape(&string_contents(self.node_text(node)))))
            }
            "number" => parse_number(self.node_text(node)).map(ArgValue::Number),
            "true" => Ok(ArgValue::Boolean(true)),
            "false" => Ok(ArgValue::Boolean(false)),
            "null" => Ok(ArgValue::Null),
            "regex" => {
                let pattern = node
                    .child_by_field_name("pattern")
                    .map(|p| self.node_text(p))
                    .unwrap_or("");
                let flags = node
                    .child_by_field_name("flags")
                    .map(|f| self.node_text(f))
                    .unwrap_or("");
                Ok(ArgValue::regex(pattern, flags))
            }
            "array" => named_children(node)
                .into_iter()
                .map(|item| self.decode_value(item))
                .collect::<Result<Vec<_>, _>>()
                .map(ArgValue::Array),
            "object" => {
                let mut pairs = Vec::new();
                for property in named_children(node) {
                    match property.kind() {
                        "pair" => {
                            let key = property
                                .child_by_field_name("key")
                                .ok_or_else(|| DecodeError::new("pair", "missing key"))?;
                            if key.kind() == "computed_property_name" {
                                return Err(DecodeError::new("computed_property_name", "computed keys cannot be regenerated"));
                            }
                            let value = property
                                .child_by_field_name("value")
                                .ok_or_else(|| DecodeError::new("pair", "missing value"))?;
                            pairs.push((property_key(self.node_text(key), key.kind()), self.decode_value(value)?));
                        }
                        "shorthand_property_identifier" => {
                            let name = self.node_text(property).to_string();
                            pairs.push((name.clone(), ArgValue::Identifier(name)));
                        }
                        other => {
                            return Err(DecodeError::new(other, "unsupported object member"));
                        }
                    }
                }
                Ok(ArgValue::Object(pairs))
            }
            "call_expression" => {
                if node.child_by_field_name("type_arguments").is_some() {
                    return Err(DecodeError::new("call_expression", "type arguments cannot be regenerated"));
                }
                let function = node
                    .child_by_field_name("function")
                    .ok_or_else(|| DecodeError::new("call_expression", "missing callee"))?;
                let name: String = self.node_text(function).split_whitespace().collect();
                if !is_identifier_path(&name) {
                    return Err(DecodeError::new(function.kind(), format!("'{}' is not a plain callee", name)));
                }
                let args = match node.child_by_field_name("arguments") {
                    Some(args) if args.kind() == "arguments" => named_children(args)
                        .into_iter()
                        .map(|arg| self.decode_value(arg))
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(other) => {
                        return Err(DecodeError::new(other.kind(), "tagged templates cannot be regenerated"));
                    }
                    None => Vec::new(),
                };
                Ok(ArgValue::Invocation(MiddlewareInvocation::new(name, args)))
            }
            "unary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|o| self.node_text(o))
                    .unwrap_or("");
                let argument = node
                    .child_by_field_name("argument")
                    .ok_or_else(|| DecodeError::new("unary_expression", "missing operand"))?;
                match (operator, self.decode_value(argument)?) {
                    ("-", ArgValue::Number(n)) => Ok(ArgValue::Number(-n)),
                    ("+", ArgValue::Number(n)) => Ok(ArgValue::Number(n)),
                    _ => Err(DecodeError::new("unary_expression", format!("operator '{}' cannot be regenerated", operator))),
                }
            }
            "parenthesized_expression" => {
                let inner = named_children(node)
                    .into_iter()
                    .next()
                    .ok_or_else(|| DecodeError::new("parenthesized_expression", "empty parentheses"))?;
                self.decode_value(inner)
            }
            "arrow_function" | "function_expression" | "function" => {
                Err(DecodeError::new("function", "inline functions cannot be regenerated"))
            }
            other => Err(DecodeError::new(other, "unsupported expression")),
        }
    }
}

fn parse_method(s: &str) -> Result<HttpMethod, DecodeError> {
    s.parse::<HttpMethod>().map_err(|e| DecodeError::new("method", e))
}

/// Returns the key text of an object property, unquoting string keys.
fn property_key(text: &str, kind: &str) -> String {
    if kind == "string" {
        unescape(&string_contents(text))
    } else {
        text.to_string()
    }
}

/// Strips the surrounding quotes or backticks of a string literal.
fn string_contents(text: &str) -> String {
    let quoted = text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"'))
            || (text.starts_with('\'') && text.ends_with('\''))
            || (text.starts_with('`') && text.ends_with('`')));
    if quoted {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_number(text: &str) -> Result<f64, DecodeError> {
    let cleaned = text.replace('_', "");
    let lower = cleaned.to_ascii_lowercase();
    let radix = if lower.starts_with("0x") {
        Some(16)
    } else if lower.starts_with("0o") {
        Some(8)
    } else if lower.starts_with("0b") {
        Some(2)
    } else {
        None
    };

    let parsed = match radix {
        Some(radix) => u64::from_str_radix(&lower[2..], radix).ok().map(|n| n as f64),
        None => lower.trim_end_matches('n').parse::<f64>().ok(),
    };
    parsed.ok_or_else(|| DecodeError::new("number", format!("cannot read number '{}'", text)))
}

/// Resolves JavaScript string escape sequences.
pub(crate) fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push_str("\\x");
                        out.push_str(&hex);
                    }
                }
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|&ch| ch != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            // Line continuation.
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParseReport {
        let mut parser = MiddlewareParser::new().unwrap();
        parser.parse(source, Path::new("middlewares.ts")).unwrap()
    }

    const EXISTING: &str = r#"
// This file is auto-generated.
import { defineMiddlewares, validateAndTransformQuery } from "@medusajs/framework/http";
import { validateAndTransformBody } from "@medusajs/framework/http";
import { PostAdminCreateWiper } from "./admin/wipers/validators";

export const GetWipersSchema = createFindParams();

export default defineMiddlewares({
  routes: [
    // GET routes
    {
      matcher: "/admin/wipers",
      method: "GET",
      middlewares: [
        validateAndTransformQuery(GetWipersSchema, {
          defaults: ["id", "name"],
          isList: true,
        }),
      ],
    },
    {
      matcher: "/admin/wipers",
      method: "POST",
      middlewares: [validateAndTransformBody(PostAdminCreateWiper)],
    },
  ],
});
"#;

    #[test]
    fn test_parse_imports_are_unioned() {
        let report = parse(EXISTING);
        let http = report.store.import("@medusajs/framework/http").unwrap();
        let names: Vec<&str> = http.names.iter().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["defineMiddlewares", "validateAndTransformBody", "validateAndTransformQuery"]
        );
        assert_eq!(report.store.imports().count(), 2);
    }

    #[test]
    fn test_parse_schema_definition() {
        let report = parse(EXISTING);
        let schema = report.store.schema("GetWipersSchema").unwrap();
        assert_eq!(schema.expression, "createFindParams()");
        assert!(schema.exported);
    }

    #[test]
    fn test_parse_routes() {
        let report = parse(EXISTING);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(report.store.route_count(), 2);

        let get = report.store.route(HttpMethod::Get, "/admin/wipers").unwrap();
        assert_eq!(get.middlewares.len(), 1);
        assert_eq!(get.middlewares[0].name, "validateAndTransformQuery");
        assert_eq!(
            get.middlewares[0].args,
            vec![
                ArgValue::ident("GetWipersSchema"),
                ArgValue::object([
                    ("defaults", ArgValue::strings(["id", "name"])),
                    ("isList", ArgValue::Boolean(true)),
                ]),
            ]
        );

        let post = report.store.route(HttpMethod::Post, "/admin/wipers").unwrap();
        assert_eq!(post.middlewares[0].args, vec![ArgValue::ident("PostAdminCreateWiper")]);
    }

    #[test]
    fn test_parse_unless_path() {
        let source = r#"
export default defineMiddlewares({
  routes: [
    {
      matcher: "/admin/wipers",
      method: "GET",
      middlewares: [unlessPath(/.*\/kits/, validateAndTransformQuery(GetWipersSchema, {}))],
    },
  ],
});
"#;
        let report = parse(source);
        let route = report.store.route(HttpMethod::Get, "/admin/wipers").unwrap();
        let middleware = &route.middlewares[0];
        assert!(middleware.is_unless_path());
        assert_eq!(middleware.args[0], ArgValue::regex(".*\\/kits", ""));
    }

    #[test]
    fn test_irregular_route_is_skipped() {
        let source = r#"
export default defineMiddlewares({
  routes: [
    {
      matcher: "/admin/wipers",
      method: "GET",
      middlewares: [authenticate("user", ["session", "bearer"])],
    },
    {
      matcher: "/admin/broken",
      method: "GET",
      middlewares: [(req, res, next) => next()],
    },
    "not a route",
  ],
});
"#;
        let report = parse(source);
        assert_eq!(report.store.route_count(), 1);
        assert!(report.store.route(HttpMethod::Get, "/admin/wipers").is_some());
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().all(|w| w.fragment == "route"));
    }

    #[test]
    fn test_route_without_method_is_skipped() {
        let source = r#"
export default defineMiddlewares({
  routes: [{ matcher: "/admin/wipers", middlewares: [] }],
});
"#;
        let report = parse(source);
        assert_eq!(report.store.route_count(), 0);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_method_array_expands() {
        let source = r#"
export default defineMiddlewares({
  routes: [
    {
      matcher: "/admin/wipers*",
      method: ["GET", "POST"],
      middlewares: [authenticate("user", "session")],
      bodyParser: { sizeLimit: "2mb" },
    },
  ],
});
"#;
        let report = parse(source);
        assert_eq!(report.store.route_count(), 2);
        let post = report.store.route(HttpMethod::Post, "/admin/wipers*").unwrap();
        assert_eq!(
            post.extra,
            vec![(
                "bodyParser".to_string(),
                ArgValue::object([("sizeLimit", ArgValue::string("2mb"))])
            )]
        );
    }

    #[test]
    fn test_unfamiliar_statements_are_preserved() {
        let source = r#"
import { z } from "zod";

const PAGE_SIZE = 50;

function helper() {
  return PAGE_SIZE;
}

export const ListSchema = z.object({ limit: z.number().default(PAGE_SIZE) });
"#;
        let report = parse(source);
        assert!(report.warnings.is_empty());
        assert_eq!(report.store.preserved().len(), 2);
        assert_eq!(report.store.preserved()[0], "const PAGE_SIZE = 50;");
        assert!(report.store.schema("ListSchema").is_some());
    }

    #[test]
    fn test_comments_stay_with_preserved_statements() {
        let source = format!(
            "{}\n\n{}",
            HEADER,
            r#"// eslint-disable-next-line no-unused-vars
import { z } from "zod";

// Largest page an admin list may request.
/* keep in sync with the storefront */
const PAGE_SIZE = 50;

// dropped with the schema it annotates
export const ListSchema = z.object({ limit: z.number().default(PAGE_SIZE) });
"#
        );
        let report = parse(&source);
        assert!(report.warnings.is_empty());
        assert_eq!(
            report.store.preserved(),
            &["// Largest page an admin list may request.\n/* keep in sync with the storefront */\nconst PAGE_SIZE = 50;"]
        );
    }

    #[test]
    fn test_default_and_namespace_imports() {
        let source = r#"
import cors from "cors";
import * as helpers from "./helpers";
import type { MedusaRequest } from "@medusajs/framework/http";
import "./side-effect";
"#;
        let report = parse(source);
        assert!(report.store.import("cors").unwrap().names.contains("default as cors"));
        assert!(report.store.import("./helpers").unwrap().names.contains("* as helpers"));
        assert!(report
            .store
            .import("@medusajs/framework/http")
            .unwrap()
            .names
            .contains("type MedusaRequest"));
        assert!(report.store.import("./side-effect").unwrap().names.is_empty());
    }

    #[test]
    fn test_garbage_does_not_fail() {
        let mut parser = MiddlewareParser::new().unwrap();
        let report = parser.parse("this is }} not {{ typescript", Path::new("x.ts"));
        assert!(report.is_ok());
    }

    #[test]
    fn test_parse_arg_value() {
        let mut parser = MiddlewareParser::new().unwrap();
        assert_eq!(
            parser.parse_arg_value(r#"authenticate("user", ["session"])"#).unwrap(),
            ArgValue::Invocation(MiddlewareInvocation::new(
                "authenticate",
                vec![ArgValue::string("user"), ArgValue::strings(["session"])],
            ))
        );
        assert_eq!(parser.parse_arg_value("-1.5").unwrap(), ArgValue::Number(-1.5));
        assert_eq!(
            parser.parse_arg_value("{ limit: 0x10 }").unwrap(),
            ArgValue::object([("limit", ArgValue::Number(16.0))])
        );

        let err = parser.parse_arg_value("() => 1").unwrap_err();
        assert!(matches!(err, GeneratorError::UnsupportedValueKind { .. }));
    }

    #[test]
    fn test_check_expression() {
        let mut parser = MiddlewareParser::new().unwrap();
        assert!(parser.check_expression("createFindParams()").is_ok());
        assert!(parser
            .check_expression("z.object({ limit: z.number().default(PAGE_SIZE) })")
            .is_ok());
        assert!(parser.check_expression("z.string().refine((v) => v.length > 0)").is_ok());

        for bad in ["", "   ", "a; b", "a, b", "createFindParams() // note", "z.object({"] {
            let err = parser.check_expression(bad).unwrap_err();
            assert!(matches!(err, GeneratorError::UnsupportedValueKind { .. }), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r#"a\"b"#), "a\"b");
        assert_eq!(unescape(r"line\nbreak"), "line\nbreak");
        assert_eq!(unescape(r"A\u{42}"), "AB");
        assert_eq!(unescape(r"back\\slash"), "back\\slash");
    }
}

//! Serializer for the shared `middlewares.ts` file.
//!
//! Renders a [`DeclarationStore`] in canonical order. Layout follows
//! prettier's defaults (two-space indent, double quotes, trailing commas,
//! 80 column print width) so the formatting pass is close to a no-op, and the
//! output parses back into an equal store.

use crate::diagnostic::GeneratorError;
use crate::frontend::typescript::DEFINE_MIDDLEWARES;
use crate::ir::{is_identifier, ArgValue, DeclarationStore, ImportDeclaration, MiddlewareInvocation, RouteDeclaration};
use crate::merge::order::{ordered_declarations, sorted_imports, sorted_routes, RouteGroup, TopLevel};

/// First lines of every serialized middleware file.
pub const HEADER: &str = "// This file is generated by modgen. Routes, schemas and imports are merged\n\
                          // on every run; other statements and the comments above them are kept\n\
                          // as written.";

const PRINT_WIDTH: usize = 80;

/// Renders the store as TypeScript source.
///
/// Fails if a route references a schema nothing binds, or if schema
/// definitions depend on each other in a cycle.
pub fn serialize(store: &DeclarationStore) -> Result<String, GeneratorError> {
    store.check_references()?;
    let declarations = ordered_declarations(store)?;

    let mut blocks: Vec<String> = Vec::new();

    let imports: Vec<String> = sorted_imports(store).into_iter().flat_map(render_import).collect();
    if !imports.is_empty() {
        blocks.push(imports.join("\n"));
    }

    // Adjacent schemas share a block; each preserved statement gets its own.
    let mut schemas: Vec<String> = Vec::new();
    for declaration in declarations {
        match declaration {
            TopLevel::Schema(schema) => {
                let export = if schema.exported { "export " } else { "" };
                schemas.push(format!("{}const {} = {};", export, schema.name, schema.expression));
            }
            TopLevel::Statement(text) => {
                if !schemas.is_empty() {
                    blocks.push(schemas.join("\n"));
                    schemas.clear();
                }
                blocks.push(text.to_string());
            }
        }
    }
    if !schemas.is_empty() {
        blocks.push(schemas.join("\n"));
    }

    blocks.push(render_registration(store));

    let mut output = String::new();
    output.push_str(HEADER);
    output.push_str("\n\n");
    output.push_str(&blocks.join("\n\n"));
    output.push('\n');
    Ok(output)
}

/// Renders the import statements for one source.
///
/// Namespace imports cannot share a statement with named imports, so each
/// gets its own line.
fn render_import(import: &ImportDeclaration) -> Vec<String> {
    let source = quote(&import.source);
    if import.names.is_empty() {
        return vec![format!("import {};", source)];
    }

    let (namespaces, named): (Vec<&String>, Vec<&String>) =
        import.names.iter().partition(|name| name.starts_with("* as "));

    let mut lines: Vec<String> = namespaces
        .iter()
        .map(|ns| format!("import {} from {};", ns, source))
        .collect();

    if !named.is_empty() {
        let names: Vec<&str> = named.iter().map(|n| n.as_str()).collect();
        let flat = format!("import {{ {} }} from {};", names.join(", "), source);
        if flat.len() <= PRINT_WIDTH {
            lines.push(flat);
        } else {
            let mut statement = String::from("import {\n");
            for name in names {
                statement.push_str(&format!("  {},\n", name));
            }
            statement.push_str(&format!("}} from {};", source));
            lines.push(statement);
        }
    }

    lines
}

fn render_registration(store: &DeclarationStore) -> String {
    let mut output = String::new();
    output.push_str(&format!("export default {}({{\n", DEFINE_MIDDLEWARES));

    let routes = sorted_routes(store);
    if routes.is_empty() {
        output.push_str("  routes: [],\n");
    } else {
        output.push_str("  routes: [\n");
        let mut current: Option<RouteGroup> = None;
        for route in routes {
            let group = RouteGroup::of(route);
            if current != Some(group) {
                if current.is_some() {
                    output.push('\n');
                }
                output.push_str(&format!("    {}\n", group.banner()));
                current = Some(group);
            }
            output.push_str("    ");
            output.push_str(&render_route(route));
            output.push_str(",\n");
        }
        output.push_str("  ],\n");
    }

    for (key, value) in store.config_properties() {
        output.push_str(&format!("  {}: {},\n", render_key(key), value));
    }

    output.push_str("});");
    output
}

/// Renders one route object at the indentation of a `routes` element.
fn render_route(route: &RouteDeclaration) -> String {
    let mut pairs = vec![
        ("matcher".to_string(), ArgValue::String(route.matcher.clone())),
        ("method".to_string(), ArgValue::String(route.method.to_string())),
        (
            "middlewares".to_string(),
            ArgValue::Array(route.middlewares.iter().cloned().map(ArgValue::Invocation).collect()),
        ),
    ];
    pairs.extend(route.extra.iter().cloned());
    broken(&ArgValue::Object(pairs), 4)
}

// =============================================================================
// Values
// =============================================================================

/// Renders a value on a single line.
pub fn render_value(value: &ArgValue) -> String {
    match value {
        ArgValue::Identifier(name) => name.clone(),
        ArgValue::String(s) => quote(s),
        ArgValue::Number(n) => format!("{}", n),
        ArgValue::Boolean(b) => b.to_string(),
        ArgValue::Null => "null".to_string(),
        ArgValue::Regex { pattern, flags } => format!("/{}/{}", pattern, flags),
        ArgValue::Array(items) => {
            let items: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", items.join(", "))
        }
        ArgValue::Object(pairs) if pairs.is_empty() => "{}".to_string(),
        ArgValue::Object(pairs) => {
            let pairs: Vec<String> = pairs.iter().map(|(k, v)| render_pair(k, v, None)).collect();
            format!("{{ {} }}", pairs.join(", "))
        }
        ArgValue::Invocation(call) => render_call(call),
    }
}

fn render_call(call: &MiddlewareInvocation) -> String {
    let args: Vec<String> = call.args.iter().map(render_value).collect();
    format!("{}({})", call.name, args.join(", "))
}

/// Renders `key: value`, or the shorthand form when the value is an
/// identifier equal to the key. `indent` selects the multi-line layout.
fn render_pair(key: &str, value: &ArgValue, indent: Option<usize>) -> String {
    if matches!(value, ArgValue::Identifier(name) if name == key && is_identifier(key)) {
        return key.to_string();
    }
    let key = render_key(key);
    match indent {
        Some(indent) => {
            let used = indent + key.len() + 2;
            format!("{}: {}", key, layout(value, indent, used))
        }
        None => format!("{}: {}", key, render_value(value)),
    }
}

fn render_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Renders `value` starting at column `used`, breaking it over several lines
/// indented by `indent` when it does not fit.
fn layout(value: &ArgValue, indent: usize, used: usize) -> String {
    let flat = render_value(value);
    if used + flat.len() <= PRINT_WIDTH {
        return flat;
    }
    match value {
        ArgValue::Array(items) if !items.is_empty() => broken(value, indent),
        ArgValue::Object(pairs) if !pairs.is_empty() => broken(value, indent),
        ArgValue::Invocation(call) if !call.args.is_empty() => layout_call(call, indent, used),
        _ => flat,
    }
}

/// Breaks a call over several lines. A trailing object or array argument is
/// hugged: `name(a, {` on the first line and `})` on the last.
fn layout_call(call: &MiddlewareInvocation, indent: usize, used: usize) -> String {
    if let Some((last, rest)) = call.args.split_last() {
        let huggable = matches!(last, ArgValue::Object(p) if !p.is_empty())
            || matches!(last, ArgValue::Array(i) if !i.is_empty());
        if huggable {
            let mut head = format!("{}(", call.name);
            for arg in rest {
                head.push_str(&render_value(arg));
                head.push_str(", ");
            }
            if used + head.len() + 1 <= PRINT_WIDTH {
                return format!("{}{})", head, broken(last, indent));
            }
        }
    }

    let pad = " ".repeat(indent + 2);
    let mut output = format!("{}(\n", call.name);
    for arg in &call.args {
        output.push_str(&pad);
        output.push_str(&layout(arg, indent + 2, indent + 2));
        output.push_str(",\n");
    }
    output.push_str(&" ".repeat(indent));
    output.push(')');
    output
}

/// Renders an array or object with one element per line.
fn broken(value: &ArgValue, indent: usize) -> String {
    let pad = " ".repeat(indent + 2);
    let (open, close, lines): (&str, &str, Vec<String>) = match value {
        ArgValue::Array(items) => (
            "[",
            "]",
            items.iter().map(|item| layout(item, indent + 2, indent + 2)).collect(),
        ),
        ArgValue::Object(pairs) => (
            "{",
            "}",
            pairs
                .iter()
                .map(|(k, v)| render_pair(k, v, Some(indent + 2)))
                .collect(),
        ),
        other => return render_value(other),
    };

    let mut output = format!("{}\n", open);
    for line in lines {
        output.push_str(&pad);
        output.push_str(&line);
        output.push_str(",\n");
    }
    output.push_str(&" ".repeat(indent));
    output.push_str(close);
    output
}

/// Quotes a string with double quotes, escaping as JavaScript does.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::HttpMethod;

    fn create_route() -> RouteDeclaration {
        RouteDeclaration::new(
            HttpMethod::Post,
            "/admin/wipers",
            vec![MiddlewareInvocation::new(
                "validateAndTransformBody",
                vec![ArgValue::ident("PostAdminCreateWiper")],
            )],
        )
    }

    #[test]
    fn test_serialize_layout() {
        let mut store = DeclarationStore::new();
        store.add_imports(
            "@medusajs/framework/http",
            ["defineMiddlewares", "validateAndTransformBody"],
        );
        store.add_import("./admin/wipers/validators", "PostAdminCreateWiper");
        store.add_route(create_route()).unwrap();

        let expected = format!(
            "{}\n\n{}",
            HEADER,
            r#"import {
  defineMiddlewares,
  validateAndTransformBody,
} from "@medusajs/framework/http";
import { PostAdminCreateWiper } from "./admin/wipers/validators";

export default defineMiddlewares({
  routes: [
    // CREATE routes
    {
      matcher: "/admin/wipers",
      method: "POST",
      middlewares: [validateAndTransformBody(PostAdminCreateWiper)],
    },
  ],
});
"#
        );
        assert_eq!(serialize(&store).unwrap(), expected);
    }

    #[test]
    fn test_empty_store() {
        let output = serialize(&DeclarationStore::new()).unwrap();
        assert!(output.starts_with(HEADER));
        assert!(output.ends_with("export default defineMiddlewares({\n  routes: [],\n});\n"));
    }

    #[test]
    fn test_hugged_object_argument() {
        let call = MiddlewareInvocation::new(
            "validateAndTransformQuery",
            vec![
                ArgValue::ident("GetWipersSchema"),
                ArgValue::object([
                    ("defaults", ArgValue::strings(["id", "name", "created_at", "updated_at"])),
                    ("isList", ArgValue::Boolean(true)),
                ]),
            ],
        );
        let rendered = layout(&ArgValue::Invocation(call), 8, 8);
        assert_eq!(
            rendered,
            "validateAndTransformQuery(GetWipersSchema, {\n          defaults: [\"id\", \"name\", \"created_at\", \"updated_at\"],\n          isList: true,\n        })"
        );
    }

    #[test]
    fn test_banners_and_groups() {
        let mut store = DeclarationStore::new();
        store.add_schema("GetWipersSchema", "createFindParams()").unwrap();
        store.add_route(create_route()).unwrap();
        store
            .add_route(RouteDeclaration::new(
                HttpMethod::Get,
                "/admin/wipers",
                vec![MiddlewareInvocation::new(
                    "validateAndTransformQuery",
                    vec![ArgValue::ident("GetWipersSchema")],
                )],
            ))
            .unwrap();
        store.add_import("./admin/wipers/validators", "PostAdminCreateWiper");

        let output = serialize(&store).unwrap();
        let get = output.find("// GET routes").unwrap();
        let create = output.find("// CREATE routes").unwrap();
        assert!(get < create);
        assert!(output.contains("    },\n\n    // CREATE routes\n"));
        assert!(output.contains("export const GetWipersSchema = createFindParams();\n"));
    }

    #[test]
    fn test_dangling_reference_aborts() {
        let mut store = DeclarationStore::new();
        store
            .add_route(RouteDeclaration::new(
                HttpMethod::Get,
                "/admin/wipers",
                vec![MiddlewareInvocation::new(
                    "validateAndTransformQuery",
                    vec![ArgValue::ident("GetWipersSchema")],
                )],
            ))
            .unwrap();
        assert!(matches!(
            serialize(&store),
            Err(GeneratorError::DanglingSchemaReference { .. })
        ));
    }

    #[test]
    fn test_render_values() {
        assert_eq!(render_value(&ArgValue::Number(50.0)), "50");
        assert_eq!(render_value(&ArgValue::Number(-1.5)), "-1.5");
        assert_eq!(render_value(&ArgValue::regex(".*\\/kits", "i")), "/.*\\/kits/i");
        assert_eq!(render_value(&ArgValue::string("a \"b\"\n")), r#""a \"b\"\n""#);
        assert_eq!(
            render_value(&ArgValue::object([
                ("fields", ArgValue::ident("fields")),
                ("content-type", ArgValue::Null),
            ])),
            r#"{ fields, "content-type": null }"#
        );
        assert_eq!(render_value(&ArgValue::Array(vec![])), "[]");
    }

    #[test]
    fn test_namespace_and_side_effect_imports() {
        let mut store = DeclarationStore::new();
        store.add_import("./helpers", "* as helpers");
        store.add_import("./helpers", "wrap");
        store.add_imports("./polyfill", std::iter::empty());

        let output = serialize(&store).unwrap();
        assert!(output.contains("import * as helpers from \"./helpers\";\nimport { wrap } from \"./helpers\";"));
        assert!(output.contains("import \"./polyfill\";"));
    }
}

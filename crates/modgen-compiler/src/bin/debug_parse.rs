//! Debug script to see what the middleware parser produces.
//!
//! Usage: `debug_parse [path/to/middlewares.ts]`. Without an argument a small
//! built-in sample is parsed.

use std::path::PathBuf;
use modgen_compiler::codegen::middleware::serialize;
use modgen_compiler::frontend::typescript::MiddlewareParser;

const SAMPLE: &str = r#"
import { defineMiddlewares, validateAndTransformQuery } from "@medusajs/framework/http";
import { createFindParams } from "@medusajs/medusa/api/utils/validators";

export const GetWipersSchema = createFindParams();

export default defineMiddlewares({
  routes: [
    {
      matcher: "/admin/wipers",
      method: "GET",
      middlewares: [validateAndTransformQuery(GetWipersSchema, { isList: true })],
    },
  ],
});
"#;

fn main() {
    let (source, path) = match std::env::args().nth(1) {
        Some(arg) => {
            let path = PathBuf::from(arg);
            match std::fs::read_to_string(&path) {
                Ok(source) => (source, path),
                Err(e) => {
                    println!("Error: {}: {}", path.display(), e);
                    return;
                }
            }
        }
        None => (SAMPLE.to_string(), PathBuf::from("middlewares.ts")),
    };

    let mut parser = MiddlewareParser::new().unwrap();
    let report = match parser.parse(&source, &path) {
        Ok(report) => report,
        Err(e) => {
            println!("Error: {:?}", e);
            return;
        }
    };

    println!("Parsed file: {:?}", path);
    println!("\nImports:");
    for import in report.store.imports() {
        println!("  {} <- {:?}", import.source, import.names);
    }
    println!("\nSchemas:");
    for schema in report.store.schemas() {
        println!("  {} (exported: {}) = {}", schema.name, schema.exported, schema.expression);
    }
    println!("\nRoutes:");
    for route in report.store.routes() {
        println!("  {} {}", route.method, route.matcher);
        for middleware in &route.middlewares {
            println!("    {:?}", middleware);
        }
    }
    println!("\nPreserved statements: {}", report.store.preserved().len());
    for warning in &report.warnings {
        println!("warning: {}", warning);
    }

    println!("\nRe-serialized:");
    match serialize(&report.store) {
        Ok(text) => println!("{}", text),
        Err(e) => println!("Error: {:?}", e),
    }
}

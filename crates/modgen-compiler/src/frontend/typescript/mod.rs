//! TypeScript frontend for existing middleware files.

mod parser;

pub use parser::{MiddlewareParser, ParseReport, DEFINE_MIDDLEWARES};
pub(crate) use parser::unescape;

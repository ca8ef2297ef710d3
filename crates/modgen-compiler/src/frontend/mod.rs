//! Source frontends.

pub mod typescript;

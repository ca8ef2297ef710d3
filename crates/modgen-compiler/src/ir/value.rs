//! Middleware argument values.

use crate::diagnostic::GeneratorError;

/// Name of the path-conditional wrapper middleware.
pub const UNLESS_PATH: &str = "unlessPath";

/// Flags accepted on a regular expression literal.
const REGEX_FLAGS: &str = "dgimsuyv";

/// A value passed as a positional argument to a middleware call.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Reference to a binding, possibly dotted (`Foo`, `Foo.bar`).
    Identifier(String),
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Regex { pattern: String, flags: String },
    Array(Vec<ArgValue>),
    /// Object literal, keys in source order.
    Object(Vec<(String, ArgValue)>),
    Invocation(MiddlewareInvocation),
}

/// A named function-call-like middleware attached to a route.
#[derive(Debug, Clone, PartialEq)]
pub struct MiddlewareInvocation {
    pub name: String,
    pub args: Vec<ArgValue>,
}

impl MiddlewareInvocation {
    pub fn new(name: impl Into<String>, args: Vec<ArgValue>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Wraps `inner` so it is skipped for paths matching `pattern`.
    pub fn unless_path(pattern: impl Into<String>, flags: impl Into<String>, inner: MiddlewareInvocation) -> Self {
        Self::new(
            UNLESS_PATH,
            vec![ArgValue::regex(pattern, flags), ArgValue::Invocation(inner)],
        )
    }

    pub fn is_unless_path(&self) -> bool {
        self.name == UNLESS_PATH
            && self.args.len() == 2
            && matches!(self.args[0], ArgValue::Regex { .. })
            && matches!(self.args[1], ArgValue::Invocation(_))
    }

    /// Checks that every part of the call can be written back as source.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        if !is_identifier_path(&self.name) {
            return Err(GeneratorError::unsupported(
                "middleware",
                format!("'{}' is not a callable name", self.name),
            ));
        }
        self.args.iter().try_for_each(ArgValue::validate)
    }

    /// Collects every identifier referenced from the arguments, recursively.
    pub fn referenced_identifiers<'a>(&'a self, out: &mut Vec<&'a str>) {
        for arg in &self.args {
            arg.referenced_identifiers(out);
        }
    }
}

impl ArgValue {
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Builds a regex literal. Bare `/` outside character classes is escaped
    /// so the pattern can sit between the literal's delimiters.
    pub fn regex(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self::Regex {
            pattern: escape_delimiters(&pattern.into()),
            flags: flags.into(),
        }
    }

    /// Builds an object literal from `(key, value)` pairs.
    pub fn object<K: Into<String>>(pairs: impl IntoIterator<Item = (K, ArgValue)>) -> Self {
        Self::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds an array of string literals.
    pub fn strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::Array(values.into_iter().map(|v| Self::String(v.into())).collect())
    }

    /// Human-readable name of the value kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Identifier(_) => "identifier",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Null => "null",
            Self::Regex { .. } => "regex",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Invocation(_) => "invocation",
        }
    }

    /// Checks that the value can be encoded as a TypeScript literal.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        match self {
            Self::Identifier(name) => {
                if is_identifier_path(name) {
                    Ok(())
                } else {
                    Err(GeneratorError::unsupported(
                        "identifier",
                        format!("'{}' is not a valid identifier reference", name),
                    ))
                }
            }
            Self::Number(n) if !n.is_finite() => Err(GeneratorError::unsupported(
                "number",
                format!("{} has no literal form", n),
            )),
            Self::Regex { pattern, flags } => {
                if pattern.is_empty() {
                    return Err(GeneratorError::unsupported("regex", "empty pattern"));
                }
                check_regex_body(pattern).map_err(|detail| GeneratorError::unsupported("regex", detail))?;
                let mut seen = String::new();
                for flag in flags.chars() {
                    if !REGEX_FLAGS.contains(flag) || seen.contains(flag) {
                        return Err(GeneratorError::unsupported(
                            "regex",
                            format!("invalid flags '{}'", flags),
                        ));
                    }
                    seen.push(flag);
                }
                Ok(())
            }
            Self::Array(items) => items.iter().try_for_each(Self::validate),
            Self::Object(pairs) => {
                for (key, value) in pairs {
                    if key.is_empty() {
                        return Err(GeneratorError::unsupported("object", "empty property key"));
                    }
                    value.validate()?;
                }
                Ok(())
            }
            Self::Invocation(inner) => inner.validate(),
            Self::String(_) | Self::Number(_) | Self::Boolean(_) | Self::Null => Ok(()),
        }
    }

    /// Collects every identifier referenced by this value, recursively.
    pub fn referenced_identifiers<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Identifier(name) => out.push(name),
            Self::Array(items) => {
                for item in items {
                    item.referenced_identifiers(out);
                }
            }
            Self::Object(pairs) => {
                for (_, value) in pairs {
                    value.referenced_identifiers(out);
                }
            }
            Self::Invocation(inner) => inner.referenced_identifiers(out),
            _ => {}
        }
    }
}

/// Escapes every unescaped `/` that is outside a character class.
fn escape_delimiters(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut escaped = false;
    let mut in_class = false;
    for c in pattern.chars() {
        if escaped {
            escaped = false;
        } else {
            match c {
                '\\' => escaped = true,
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => out.push('\\'),
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

/// Checks that `pattern` can be written between `/` delimiters and read back
/// as the same literal.
fn check_regex_body(pattern: &str) -> Result<(), String> {
    if pattern.starts_with('*') {
        return Err("pattern cannot start with '*'".to_string());
    }
    let mut escaped = false;
    let mut in_class = false;
    for (offset, c) in pattern.char_indices() {
        if matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}') {
            return Err("pattern spans several lines".to_string());
        }
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => return Err(format!("unescaped '/' at offset {}", offset)),
            _ => {}
        }
    }
    if escaped {
        return Err("pattern ends with a lone backslash".to_string());
    }
    if in_class {
        return Err("unterminated character class".to_string());
    }
    Ok(())
}

/// Returns true for `name` or `name.member.member`.
pub fn is_identifier_path(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_identifier)
}

/// Returns true if `s` is a plain JavaScript identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

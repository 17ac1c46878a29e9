//! Tera-based template rendering with located diagnostics.
//!
//! Every template body is prefixed with the [`DISCLAIMER`] banner and
//! rendered in two phases:
//!
//! 1. **parse** - Tera syntax parsing, then a resolution pass that checks
//!    every function and filter the template calls against the Tera
//!    builtins and the [`FunctionRegistry`].
//! 2. **execute** - evaluation against the serialized render parameters,
//!    written incrementally into an output buffer.
//!
//! Failures in either phase are mapped back onto the banner-prefixed
//! template text by the line mapper. Line numbers in diagnostics therefore
//! include the banner lines.

use std::error::Error as StdError;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::debug;

use crate::core::error::{Diagnostic, LineMapError, Phase};
use crate::generation::functions::FunctionRegistry;
use crate::generation::line_map::{self, Locator};

/// Banner prepended to every template. `app_info` comes from the params.
pub const DISCLAIMER: &str = "// Code generated by argen. DO NOT EDIT.
// This code was generated from a template.
//
// Manual changes to this file may cause unexpected behavior in your application.
// Manual changes to this file will be overwritten if the code is regenerated.
//
// Generate info: {{ app_info }}
";

/// Name the combined template is registered under
pub const TEMPLATE_NAME: &str = "record_package";

const TERA_FILTERS: &[&str] = &[
    "abs", "addslashes", "as_str", "capitalize", "concat", "date", "default", "escape",
    "escape_xml", "filesizeformat", "filter", "first", "float", "get", "group_by", "indent",
    "int", "join", "json_encode", "last", "length", "linebreaksbr", "lower", "map", "nth",
    "pluralize", "replace", "reverse", "round", "safe", "slice", "slugify", "sort", "spaceless",
    "split", "striptags", "title", "trim", "trim_end", "trim_end_matches", "trim_start",
    "trim_start_matches", "truncate", "unique", "upper", "urlencode", "urlencode_strict",
    "wordcount",
];

const TERA_FUNCTIONS: &[&str] = &["get_env", "get_random", "now", "range", "super", "throw"];

const KEYWORDS: &[&str] = &[
    "and", "as", "block", "break", "continue", "elif", "else", "endblock", "endfilter", "endfor",
    "endif", "endmacro", "endraw", "extends", "false", "False", "filter", "for", "if", "import",
    "in", "include", "is", "macro", "not", "or", "raw", "set", "set_global", "true", "True",
    "with",
];

static PEST_LOCATOR_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-->\s*(\d+):(\d+)").expect("pest locator pattern is valid"));

static ENDRAW_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{%-?\s*endraw\s*-?%\}").expect("endraw pattern is valid"));

/// Tera failure with its whole cause chain flattened into the message
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TemplateError {
    message: String,
    #[source]
    source: tera::Error,
}

impl TemplateError {
    fn new(source: tera::Error) -> Self {
        Self {
            message: flatten_chain(&source),
            source,
        }
    }

    /// Position reported by the template parser, if any
    pub fn locator(&self) -> Option<Locator> {
        let caps = PEST_LOCATOR_RX.captures(&self.message)?;
        Some(Locator::new(caps[1].parse().ok()?, caps[2].parse().ok()?))
    }
}

fn flatten_chain(err: &dyn StdError) -> String {
    let mut parts = vec![err.to_string()];
    let mut cur = err.source();
    while let Some(e) = cur {
        parts.push(e.to_string());
        cur = e.source();
    }
    parts.join(": ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Function,
    Filter,
}

impl fmt::Display for CallableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallableKind::Function => f.write_str("function"),
            CallableKind::Filter => f.write_str("filter"),
        }
    }
}

/// A template calls a function or filter nobody registered
#[derive(Debug, Clone, Error)]
#[error("{}: {kind} \"{name}\" is not defined", position(.locator))]
pub struct UndefinedCallable {
    pub kind: CallableKind,
    pub name: String,
    pub locator: Locator,
}

fn position(locator: &Locator) -> String {
    format!("{}:{}", locator.line, locator.column)
}

/// Renders templates against a shared, read-only function registry
#[derive(Clone, Copy)]
pub struct TemplateRenderer<'r> {
    registry: &'r FunctionRegistry,
}

impl Default for TemplateRenderer<'static> {
    fn default() -> Self {
        Self::new(FunctionRegistry::standard())
    }
}

impl<'r> TemplateRenderer<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Render `body` with the disclaimer banner prefixed.
    ///
    /// `backend` only labels the diagnostic. On failure no buffer is
    /// returned.
    pub fn render<P: Serialize>(
        &self,
        backend: &str,
        body: &str,
        params: &P,
    ) -> Result<Vec<u8>, Diagnostic> {
        let source = format!("{DISCLAIMER}{body}");

        let tera = self
            .parse(&source)
            .map_err(|context| Diagnostic::new(backend, Phase::Parse, context))?;

        let out = execute(&tera, &source, params)
            .map_err(|context| Diagnostic::new(backend, Phase::Execute, context))?;

        debug!(
            backend = %backend,
            template_lines = source.lines().count(),
            bytes = out.len(),
            "Rendered template"
        );

        Ok(out)
    }

    fn parse(&self, source: &str) -> Result<Tera, LineMapError> {
        let mut tera = Tera::default();
        self.registry.install(&mut tera);

        if let Err(err) = tera.add_raw_template(TEMPLATE_NAME, source) {
            let err = TemplateError::new(err);
            return Err(match err.locator() {
                Some(locator) => line_map::annotate_at(locator, err, source),
                None => line_map::annotate(err, source),
            });
        }

        if let Some(undefined) = self.find_undefined_callable(source) {
            let locator = undefined.locator;
            return Err(line_map::annotate_at(locator, undefined, source));
        }

        Ok(tera)
    }

    /// First call to a function or filter that neither Tera nor the
    /// registry provides, in source order.
    pub fn find_undefined_callable(&self, source: &str) -> Option<UndefinedCallable> {
        scan_callables(source).into_iter().find(|call| match call.kind {
            CallableKind::Function => {
                !TERA_FUNCTIONS.contains(&call.name.as_str())
                    && !self.registry.has_function(&call.name)
            }
            CallableKind::Filter => {
                !TERA_FILTERS.contains(&call.name.as_str()) && !self.registry.has_filter(&call.name)
            }
        })
    }
}

fn execute<P: Serialize>(tera: &Tera, source: &str, params: &P) -> Result<Vec<u8>, LineMapError> {
    let context = Context::from_serialize(params)
        .map_err(|err| line_map::annotate(TemplateError::new(err), source))?;

    let mut out = Vec::new();
    tera.render_to(TEMPLATE_NAME, &context, &mut out)
        .map_err(|err| line_map::annotate(TemplateError::new(err), source))?;

    Ok(out)
}

/// Every function call and filter application inside `{{ }}` and `{% %}`
/// tags. Comments and `raw` blocks are skipped, string literals ignored.
pub fn scan_callables(source: &str) -> Vec<UndefinedCallable> {
    let bytes = source.as_bytes();
    let mut calls = Vec::new();
    let mut pos = 0;

    while let Some(found) = source[pos..].find('{') {
        let start = pos + found;
        let Some(&next) = bytes.get(start + 1) else {
            break;
        };

        match next {
            b'#' => {
                pos = source[start + 2..]
                    .find("#}")
                    .map_or(bytes.len(), |end| start + 2 + end + 2);
            }
            b'{' | b'%' => {
                let closer = if next == b'{' { b'}' } else { b'%' };
                let body_start = start + 2;
                let body_end = find_tag_end(bytes, body_start, closer);
                let body = &source[body_start..body_end];

                if next == b'%' && tag_keyword(body) == Some("raw") {
                    pos = ENDRAW_RX
                        .find(&source[body_end..])
                        .map_or(bytes.len(), |m| body_end + m.end());
                    continue;
                }

                scan_tag(source, body_start, body, next == b'%', &mut calls);
                pos = (body_end + 2).min(bytes.len());
            }
            _ => pos = start + 1,
        }
    }

    calls
}

/// Offset of the tag closer (`}}` or `%}`), skipping string literals.
fn find_tag_end(bytes: &[u8], from: usize, closer: u8) -> usize {
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if matches!(b, b'"' | b'\'' | b'`') => quote = Some(b),
            None if b == closer && bytes.get(i + 1) == Some(&b'}') => return i,
            None => {}
        }
        i += 1;
    }
    bytes.len()
}

fn tag_keyword(body: &str) -> Option<&str> {
    body.trim_start_matches('-')
        .split_whitespace()
        .next()
        .map(|w| w.trim_end_matches('-'))
}

fn scan_tag(
    source: &str,
    offset: usize,
    body: &str,
    is_statement: bool,
    calls: &mut Vec<UndefinedCallable>,
) {
    let masked = mask_strings(body);
    let tokens = tokenize(&masked);

    for (idx, &(tok_start, tok)) in tokens.iter().enumerate() {
        if !is_ident(tok) {
            continue;
        }
        let prev = idx.checked_sub(1).map(|i| tokens[i].1);
        let prev2 = idx.checked_sub(2).map(|i| tokens[i].1);
        let next = tokens.get(idx + 1).map(|t| t.1);

        let kind = if prev == Some("|") {
            Some(CallableKind::Filter)
        } else if is_statement
            && prev == Some("filter")
            && tokens[..idx - 1].iter().all(|t| t.1 == "-")
        {
            Some(CallableKind::Filter)
        } else if next == Some("(")
            && !KEYWORDS.contains(&tok)
            && !matches!(prev, Some("::") | Some(".") | Some("macro") | Some("is"))
            && !(prev == Some("not") && prev2 == Some("is"))
        {
            Some(CallableKind::Function)
        } else {
            None
        };

        if let Some(kind) = kind {
            calls.push(UndefinedCallable {
                kind,
                name: tok.to_string(),
                locator: locate(source, offset + tok_start),
            });
        }
    }
}

/// Blank out string literal contents, keeping byte offsets intact.
fn mask_strings(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut quote: Option<char> = None;
    for ch in body.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                out.push(ch);
            }
            Some(_) => out.extend(std::iter::repeat_n(' ', ch.len_utf8())),
            None => {
                if matches!(ch, '"' | '\'' | '`') {
                    quote = Some(ch);
                }
                out.push(ch);
            }
        }
    }
    out
}

/// Split a tag body into identifiers, `::` and single punctuation tokens.
fn tokenize(body: &str) -> Vec<(usize, &str)> {
    let bytes = body.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
        } else if b.is_ascii_alphanumeric() || b == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push((start, &body[start..i]));
        } else if b == b':' && bytes.get(i + 1) == Some(&b':') {
            tokens.push((i, "::"));
            i += 2;
        } else {
            let len = body[i..].chars().next().map_or(1, char::len_utf8);
            tokens.push((i, &body[i..i + len]));
            i += len;
        }
    }
    tokens
}

fn is_ident(tok: &str) -> bool {
    tok.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
}

fn locate(source: &str, offset: usize) -> Locator {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    Locator::new(line, offset - line_start + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BANNER_LINES: usize = 7;

    fn renderer() -> TemplateRenderer<'static> {
        TemplateRenderer::default()
    }

    #[test]
    fn test_banner_line_count() {
        assert_eq!(DISCLAIMER.lines().count(), BANNER_LINES);
    }

    #[test]
    fn test_render_prefixes_banner() {
        let out = renderer()
            .render(
                "octopus",
                "pub struct {{ name | pascal_case }};\n",
                &json!({"app_info": "argen@test", "name": "user_account"}),
            )
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("// Code generated by argen. DO NOT EDIT.\n"));
        assert!(text.contains("// Generate info: argen@test\n"));
        assert!(text.ends_with("pub struct UserAccount;\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let params = json!({"app_info": "x", "items": {"b": 2, "a": 1, "c": 3}});
        let body = "{% for k, v in items %}{{ k }}={{ v }};{% endfor %}";
        let first = renderer().render("meta", body, &params).unwrap();
        let second = renderer().render("meta", body, &params).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_undefined_function_fails_at_parse() {
        let body = "pub struct A;\n\n{{ no_such_helper(x=1) }}\n";
        let diag = renderer()
            .render("octopus", body, &json!({"app_info": "x"}))
            .unwrap_err();

        assert_eq!(diag.phase, Phase::Parse);
        assert_eq!(diag.backend, "octopus");
        let snippet = diag.snippet().expect("located");
        let lines: Vec<&str> = snippet.split('\n').collect();
        assert_eq!(lines[1], "{{ no_such_helper(x=1) }}");
        assert_eq!(lines[2], format!("   {}", line_map::CARET));
        assert!(diag.to_string().contains(&format!(
            "{}:4: function \"no_such_helper\" is not defined",
            BANNER_LINES + 3
        )));
    }

    #[test]
    fn test_undefined_filter_fails_at_parse() {
        let diag = renderer()
            .render("meta", "{{ name | shout }}", &json!({"app_info": "x", "name": "a"}))
            .unwrap_err();
        assert_eq!(diag.phase, Phase::Parse);
        assert!(diag.to_string().contains("filter \"shout\" is not defined"));
    }

    #[test]
    fn test_syntax_error_fails_at_parse_with_location() {
        let body = "line one\n{% if %}\n";
        let diag = renderer()
            .render("octopus", body, &json!({"app_info": "x"}))
            .unwrap_err();

        assert_eq!(diag.phase, Phase::Parse);
        let snippet = diag.snippet().expect("tera reports a position");
        assert!(snippet.contains("{% if %}"));
    }

    #[test]
    fn test_missing_variable_fails_at_execute() {
        let diag = renderer()
            .render("octopus", "{{ missing_field }}", &json!({"app_info": "x"}))
            .unwrap_err();

        assert_eq!(diag.phase, Phase::Execute);
        assert!(diag.snippet().is_none());
        assert!(matches!(diag.context, LineMapError::Unlocated { .. }));
        assert!(diag.to_string().contains("missing_field"));
    }

    #[test]
    fn test_scan_skips_builtins_strings_comments_and_macros() {
        let source = r#"{# {{ nope() }} #}
{{ "not_a_call(" }}
{% for i in range(end=3) %}{{ i | upper }}{% endfor %}
{% if x is divisibleby(3) %}{{ self::row(x=1) }}{% endif %}
{% macro row(x) %}{% endmacro %}
{% raw %}{{ raw_call() }}{% endraw %}
{% filter upper %}a{% endfilter %}
{% if (a and b) %}{% endif %}"#;

        let calls = scan_callables(source);
        let names: Vec<_> = calls.iter().map(|c| (c.kind, c.name.as_str())).collect();
        assert_eq!(
            names,
            vec![
                (CallableKind::Function, "range"),
                (CallableKind::Filter, "upper"),
                (CallableKind::Filter, "upper"),
            ]
        );
        assert!(renderer().find_undefined_callable(source).is_none());
    }

    #[test]
    fn test_scan_locates_calls() {
        let calls = scan_callables("a\nbb {{ x | snake_case }}");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].locator, Locator::new(2, 11));
    }

    #[test]
    fn test_registry_functions_resolve() {
        let source = "{{ octopus_pack(format=\"uint32\") }} {{ f | rust_type }}";
        assert!(renderer().find_undefined_callable(source).is_none());
    }
}

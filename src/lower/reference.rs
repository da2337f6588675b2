//! Parse `{{<type>.<nodeId>[.path]}}` references out of free-text fields and
//! turn field strings into `ValueExpr`.

use std::collections::HashMap;

use crate::error::CompileError;
use crate::ir::types::*;

/// Type tags that can start a variable reference.
pub const REFERENCE_TAGS: [&str; 4] = ["service", "artifact", "shell", "python"];

/// One `{{...}}` occurrence that matches the reference grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'a> {
    /// Everything between the delimiters, e.g. `service.db.hostname`.
    pub variable_id: &'a str,
    /// The node-id segment, e.g. `db`.
    pub node_id: &'a str,
    /// Byte range of the whole token including delimiters.
    pub start: usize,
    pub end: usize,
}

/// Split a reference body into its node-id segment if it follows the grammar.
///
/// The path after the node id is opaque.
fn parse_reference_body(inner: &str) -> Option<&str> {
    let (tag, rest) = inner.split_once('.')?;
    if !REFERENCE_TAGS.contains(&tag) {
        return None;
    }
    let node_id = rest.split('.').next().unwrap_or_default();
    if node_id.is_empty() || node_id.chars().any(char::is_whitespace) {
        return None;
    }
    Some(node_id)
}

/// All references in `input`, left to right.
///
/// A `{{...}}` whose body does not match the grammar is literal text.
pub fn scan_references(input: &str) -> Vec<Reference<'_>> {
    let mut refs = Vec::new();
    let mut offset = 0;

    while let Some(open) = input[offset..].find("{{") {
        let start = offset + open;
        let body_start = start + 2;
        let Some(close) = input[body_start..].find("}}") else {
            break;
        };
        let body_end = body_start + close;
        let inner = &input[body_start..body_end];

        match parse_reference_body(inner) {
            Some(node_id) => {
                refs.push(Reference {
                    variable_id: inner,
                    node_id,
                    start,
                    end: body_end + 2,
                });
                offset = body_end + 2;
            }
            // Retry one byte further so `{{{service.a.name}}` still matches.
            None => offset = start + 1,
        }
    }

    refs
}

/// Resolve a field string into a `ValueExpr`.
///
/// - no references → string literal
/// - the whole field is one reference → the variable's expression, bare
/// - otherwise → `"...{}...".format(...)` with arguments in order of appearance
///
/// `variables` maps variable ids to their generated expressions.
pub fn resolve_value_expr(
    input: &str,
    quote: Quote,
    node_id: &str,
    variables: &HashMap<String, String>,
) -> Result<ValueExpr, CompileError> {
    let refs = scan_references(input);

    if refs.is_empty() {
        return Ok(ValueExpr::Literal(LiteralValue::String {
            value: input.to_string(),
            quote,
        }));
    }

    let mut args = Vec::with_capacity(refs.len());
    for r in &refs {
        args.push(lookup_variable(r.variable_id, node_id, variables)?);
    }

    // Pure reference: the entire field is `{{...}}`
    if refs.len() == 1 && refs[0].start == 0 && refs[0].end == input.len() {
        return Ok(ValueExpr::reference(args.remove(0)));
    }

    let mut template = String::with_capacity(input.len());
    let mut cursor = 0;
    for r in &refs {
        template.push_str(&escape_format_braces(&input[cursor..r.start]));
        template.push_str("{}");
        cursor = r.end;
    }
    template.push_str(&escape_format_braces(&input[cursor..]));

    Ok(ValueExpr::Format {
        template,
        args,
        quote,
    })
}

fn lookup_variable(
    variable_id: &str,
    node_id: &str,
    variables: &HashMap<String, String>,
) -> Result<String, CompileError> {
    if let Some(expr) = variables.get(variable_id) {
        return Ok(expr.clone());
    }
    // Older graphs spell port variables `ports.<i>`
    if let Some(canonical) = legacy_port_alias(variable_id) {
        if let Some(expr) = variables.get(&canonical) {
            return Ok(expr.clone());
        }
    }
    Err(CompileError::UnresolvedReference {
        node_id: node_id.to_string(),
        reference: variable_id.to_string(),
    })
}

fn legacy_port_alias(variable_id: &str) -> Option<String> {
    let rest = variable_id.strip_prefix("service.")?;
    let (node_id, path) = rest.split_once('.')?;
    let index_path = path.strip_prefix("ports.")?;
    Some(format!("service.{}.port.{}", node_id, index_path))
}

/// Double literal braces so `str.format` leaves them alone.
fn escape_format_braces(s: &str) -> String {
    s.replace('{', "{{").replace('}', "}}")
}

/// Neutralise `{{...}}` in a template body so the execution engine's
/// template renderer emits it verbatim: `{{x}}` → ``{{`{{x}}`}}``.
pub fn escape_template_delimiters(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut remaining = input;

    while let Some(start) = remaining.find("{{") {
        let after_open = &remaining[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                out.push_str(&remaining[..start]);
                out.push_str("{{`{{");
                out.push_str(&after_open[..end]);
                out.push_str("}}`}}");
                remaining = &after_open[end + 2..];
            }
            None => break,
        }
    }

    out.push_str(remaining);
    out
}

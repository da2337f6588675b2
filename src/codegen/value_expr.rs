//! ValueExpr → Starlark expression string conversion.

use crate::ir::types::*;
use crate::lower::variables::escape_string;

/// Convert a `ValueExpr` into a single-line Starlark expression string.
pub fn emit_value_expr(expr: &ValueExpr) -> String {
    match expr {
        ValueExpr::Literal(lit) => emit_literal(lit),
        ValueExpr::Reference { expr } => expr.clone(),
        ValueExpr::Format {
            template,
            args,
            quote,
        } => format!("{}.format({})", quoted(template, *quote), args.join(", ")),
        ValueExpr::RawExpr { expr } => expr.clone(),
        ValueExpr::Call {
            callee,
            args,
            kwargs,
        } => {
            let mut parts: Vec<String> = args.iter().map(emit_value_expr).collect();
            parts.extend(
                kwargs
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, emit_value_expr(v))),
            );
            format!("{}({})", callee, parts.join(", "))
        }
        ValueExpr::Dict { entries } => {
            let parts: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", emit_value_expr(k), emit_value_expr(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        ValueExpr::List { items } => {
            let parts: Vec<String> = items.iter().map(emit_value_expr).collect();
            format!("[{}]", parts.join(", "))
        }
        ValueExpr::Splat { value } => format!("**{}", emit_value_expr(value)),
    }
}

/// True when `expr` reads best on one line: scalars, empty containers,
/// lists of scalars and keyword-less calls over scalars.
pub fn is_inline(expr: &ValueExpr) -> bool {
    match expr {
        ValueExpr::Literal(_)
        | ValueExpr::Reference { .. }
        | ValueExpr::Format { .. }
        | ValueExpr::RawExpr { .. } => true,
        ValueExpr::Call { args, kwargs, .. } => kwargs.is_empty() && args.iter().all(is_scalar),
        ValueExpr::Dict { entries } => entries.is_empty(),
        ValueExpr::List { items } => items.iter().all(is_scalar),
        ValueExpr::Splat { value } => is_inline(value),
    }
}

fn is_scalar(expr: &ValueExpr) -> bool {
    matches!(
        expr,
        ValueExpr::Literal(_)
            | ValueExpr::Reference { .. }
            | ValueExpr::Format { .. }
            | ValueExpr::RawExpr { .. }
    )
}

fn emit_literal(lit: &LiteralValue) -> String {
    match lit {
        LiteralValue::String { value, quote } => quoted(value, *quote),
        LiteralValue::Integer { value } => format!("{}", value),
        LiteralValue::Number { value } => format!("{}", value),
        LiteralValue::Boolean { value } => {
            if *value {
                "True".to_string()
            } else {
                "False".to_string()
            }
        }
        LiteralValue::None => "None".to_string(),
    }
}

fn quoted(value: &str, quote: Quote) -> String {
    match quote {
        Quote::Double => format!("\"{}\"", escape_string(value)),
        Quote::Triple => format!("\"\"\"{}\"\"\"", escape_block(value)),
    }
}

/// Triple-quoted strings keep their line breaks; only `\` and `"` are escaped.
fn escape_block(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

//! Emit call statements, one keyword argument per line.

use super::value_expr::{emit_value_expr, is_inline};
use super::writer::CodeWriter;
use crate::ir::types::*;

/// Emit `binding = call(...)` or a bare call.
pub fn emit_statement(stmt: &Statement, w: &mut CodeWriter) {
    if let Some(binding) = &stmt.binding {
        w.write(&format!("{} = ", binding));
    }
    emit_expr(&stmt.call, "", w);
}

/// Emit `expr` starting on the current line, ending the last line with
/// `suffix`. Containers that are not inline are spread over several lines.
fn emit_expr(expr: &ValueExpr, suffix: &str, w: &mut CodeWriter) {
    if is_inline(expr) {
        w.line(&format!("{}{}", emit_value_expr(expr), suffix));
        return;
    }

    match expr {
        ValueExpr::Call {
            callee,
            args,
            kwargs,
        } => {
            w.line(&format!("{}(", callee));
            w.indent();
            for arg in args {
                emit_expr(arg, ",", w);
            }
            for (key, value) in kwargs {
                w.write(&format!("{} = ", key));
                emit_expr(value, ",", w);
            }
            w.dedent();
            w.line(&format!("){}", suffix));
        }
        ValueExpr::Dict { entries } => {
            w.line("{");
            w.indent();
            for (key, value) in entries {
                w.write(&format!("{}: ", emit_value_expr(key)));
                emit_expr(value, ",", w);
            }
            w.dedent();
            w.line(&format!("}}{}", suffix));
        }
        ValueExpr::List { items } => {
            w.line("[");
            w.indent();
            for item in items {
                emit_expr(item, ",", w);
            }
            w.dedent();
            w.line(&format!("]{}", suffix));
        }
        ValueExpr::Splat { value } => {
            w.write("**");
            emit_expr(value, suffix, w);
        }
        // Scalars are always inline.
        _ => w.line(&format!("{}{}", emit_value_expr(expr), suffix)),
    }
}

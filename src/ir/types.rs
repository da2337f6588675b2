//! IR type definitions for the resource-graph compiler.
//!
//! The IR bridges the node graph (input) and the Starlark script (output).
//! Every field string has already been interpolated into a `ValueExpr` and
//! every node has been turned into one or more call statements, in dependency
//! order, so codegen is a plain walk.
//! SYNC NOTE: New node types need a statement shape here, plus matching
//! lower/codegen/test updates.

use serde::{Deserialize, Serialize};

// =============================================================================
// TOP-LEVEL IR
// =============================================================================

/// Complete intermediate representation of a compiled resource graph.
/// Produced by the lowering pass, consumed by the codegen pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptIR {
    /// Module-level `import_module` statements for package nodes.
    pub imports: Vec<Statement>,
    /// The body of `run(plan)`, one or more statements per node.
    pub body: Vec<Statement>,
    /// Trailing `plan.remove_service` calls for stale services.
    pub removals: Vec<Statement>,
}

impl ScriptIR {
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.imports
            .iter()
            .chain(self.body.iter())
            .chain(self.removals.iter())
    }
}

/// `binding = call` or a bare `call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// The node this statement was lowered from, if any.
    pub node_id: Option<String>,
    /// Script-level identifier the call result is assigned to.
    pub binding: Option<String>,
    /// Always a `ValueExpr::Call`.
    pub call: ValueExpr,
}

// =============================================================================
// VALUE EXPRESSIONS
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quote {
    /// `"..."`
    #[default]
    Double,
    /// `"""..."""`, keeps line breaks.
    Triple,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ValueExpr {
    /// A literal value: `"hello"`, `42`, `True`.
    Literal(LiteralValue),
    /// A variable's generated accessor, emitted unquoted: `db.hostname`.
    Reference { expr: String },
    /// Literal with `{}` placeholders plus a `.format(...)` call.
    /// `template` already has literal braces doubled.
    Format {
        template: String,
        args: Vec<String>,
        quote: Quote,
    },
    /// Raw Starlark emitted verbatim (escape hatch).
    RawExpr { expr: String },
    /// `callee(arg, key = value, ...)`
    Call {
        callee: String,
        args: Vec<ValueExpr>,
        kwargs: Vec<(String, ValueExpr)>,
    },
    Dict { entries: Vec<(ValueExpr, ValueExpr)> },
    List { items: Vec<ValueExpr> },
    /// `**value`, only valid as a call argument.
    Splat { value: Box<ValueExpr> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "literal_type")]
pub enum LiteralValue {
    String { value: String, quote: Quote },
    Integer { value: i64 },
    Number { value: f64 },
    Boolean { value: bool },
    None,
}

// =============================================================================
// VALUE EXPRESSION CONSTRUCTORS
// =============================================================================

impl ValueExpr {
    pub fn string(s: impl Into<String>) -> Self {
        ValueExpr::Literal(LiteralValue::String {
            value: s.into(),
            quote: Quote::Double,
        })
    }

    /// A triple-quoted string literal.
    pub fn text(s: impl Into<String>) -> Self {
        ValueExpr::Literal(LiteralValue::String {
            value: s.into(),
            quote: Quote::Triple,
        })
    }

    pub fn integer(v: i64) -> Self {
        ValueExpr::Literal(LiteralValue::Integer { value: v })
    }

    pub fn number(v: f64) -> Self {
        ValueExpr::Literal(LiteralValue::Number { value: v })
    }

    pub fn boolean(v: bool) -> Self {
        ValueExpr::Literal(LiteralValue::Boolean { value: v })
    }

    pub fn none() -> Self {
        ValueExpr::Literal(LiteralValue::None)
    }

    pub fn reference(expr: impl Into<String>) -> Self {
        ValueExpr::Reference { expr: expr.into() }
    }

    pub fn raw(expr: impl Into<String>) -> Self {
        ValueExpr::RawExpr { expr: expr.into() }
    }

    pub fn call(callee: impl Into<String>, kwargs: Vec<(&str, ValueExpr)>) -> Self {
        ValueExpr::Call {
            callee: callee.into(),
            args: vec![],
            kwargs: kwargs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    pub fn dict(entries: Vec<(ValueExpr, ValueExpr)>) -> Self {
        ValueExpr::Dict { entries }
    }

    pub fn list(items: Vec<ValueExpr>) -> Self {
        ValueExpr::List { items }
    }

    pub fn splat(value: ValueExpr) -> Self {
        ValueExpr::Splat {
            value: Box::new(value),
        }
    }

    /// True for a plain string literal equal to `""`.
    pub fn is_empty_string(&self) -> bool {
        matches!(self, ValueExpr::Literal(LiteralValue::String { value, .. }) if value.is_empty())
    }
}

impl Statement {
    pub fn assign(node_id: &str, binding: impl Into<String>, call: ValueExpr) -> Self {
        Statement {
            node_id: Some(node_id.to_string()),
            binding: Some(binding.into()),
            call,
        }
    }

    pub fn bare(call: ValueExpr) -> Self {
        Statement {
            node_id: None,
            binding: None,
            call,
        }
    }
}

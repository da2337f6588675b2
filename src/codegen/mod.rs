//! Codegen pass: ScriptIR → Starlark orchestration script.
//!
//! Public API: `codegen(ir) -> String`

mod statements;
mod value_expr;
mod writer;

pub use value_expr::emit_value_expr;

use crate::ir::types::ScriptIR;
use statements::emit_statement;
use writer::CodeWriter;

/// Name of the generated entry routine.
pub const ENTRY_POINT: &str = "run";

/// Generate the script body (without the build-state trailer).
pub fn codegen(ir: &ScriptIR) -> String {
    let mut w = CodeWriter::new();

    // 1. MODULE IMPORTS
    for stmt in &ir.imports {
        emit_statement(stmt, &mut w);
    }
    if !ir.imports.is_empty() {
        w.blank();
    }

    // 2. ENTRY ROUTINE
    w.block_open(&format!("def {}(plan)", ENTRY_POINT));
    if ir.body.is_empty() && ir.removals.is_empty() {
        w.line("pass");
    }

    // 3. RESOURCES, in dependency order, one blank line apart
    for (i, stmt) in ir.body.iter().enumerate() {
        if i > 0 {
            w.blank();
        }
        emit_statement(stmt, &mut w);
    }

    // 4. STALE SERVICE REMOVAL
    if !ir.body.is_empty() && !ir.removals.is_empty() {
        w.blank();
    }
    for stmt in &ir.removals {
        emit_statement(stmt, &mut w);
    }
    w.block_close();

    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::*;

    #[test]
    fn empty_ir_produces_pass() {
        assert_eq!(codegen(&ScriptIR::default()), "def run(plan):\n    pass\n");
    }

    #[test]
    fn imports_precede_entry_routine() {
        let ir = ScriptIR {
            imports: vec![Statement::assign(
                "p",
                "pkg_module",
                ValueExpr::Call {
                    callee: "import_module".into(),
                    args: vec![ValueExpr::string("github.com/org/pkg/main.star")],
                    kwargs: vec![],
                },
            )],
            body: vec![],
            removals: vec![Statement::bare(ValueExpr::call(
                "plan.remove_service",
                vec![("name", ValueExpr::string("old"))],
            ))],
        };
        assert_eq!(
            codegen(&ir),
            concat!(
                "pkg_module = import_module(\"github.com/org/pkg/main.star\")\n",
                "\n",
                "def run(plan):\n",
                "    plan.remove_service(\n",
                "        name = \"old\",\n",
                "    )\n",
            )
        );
    }
}

//! Variable resolution: which runtime attributes each node exposes to the
//! other nodes, and the generated Starlark accessor for each.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::parse::types::NodeData;

/// An addressable runtime attribute of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// `<type>.<nodeId>[.<path>]`, the text written between `{{` and `}}`.
    pub id: String,
    pub display_name: String,
    pub value_expression: String,
}

impl Variable {
    fn new(id: String, display_name: String, value_expression: String) -> Self {
        Variable {
            id,
            display_name,
            value_expression,
        }
    }
}

/// Convert a display name into its script identifier.
///
/// Whitespace and `-` become `_`, then the result is lower-cased. Anything
/// else that cannot appear in an identifier is also replaced by `_`.
/// Distinct names can map to the same identifier; IR validation reports that.
pub fn script_identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

/// Escape text for embedding inside a double-quoted Starlark string.
pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Derive every variable exposed by the nodes in `data`.
pub fn resolve_variables(data: &BTreeMap<String, NodeData>) -> Vec<Variable> {
    data.iter()
        .flat_map(|(id, node)| node_variables(id, node))
        .collect()
}

/// Variable id → generated expression, for interpolation.
pub fn variable_lookup(variables: &[Variable]) -> HashMap<String, String> {
    variables
        .iter()
        .map(|v| (v.id.clone(), v.value_expression.clone()))
        .collect()
}

fn node_variables(id: &str, data: &NodeData) -> Vec<Variable> {
    let ident = script_identifier(data.name());
    let name = data.name();

    match data {
        NodeData::Service(service) => {
            let mut vars = vec![
                Variable::new(
                    format!("service.{id}.name"),
                    name.to_string(),
                    format!("{ident}.name"),
                ),
                Variable::new(
                    format!("service.{id}.hostname"),
                    format!("{name}.hostname"),
                    format!("{ident}.hostname"),
                ),
            ];
            for (i, port) in service.ports.iter().enumerate() {
                let port_ref = format!("{ident}.ports[\"{}\"]", escape_string(&port.name));
                vars.push(Variable::new(
                    format!("service.{id}.port.{i}"),
                    format!("{name}.ports.{}", port.name),
                    format!(
                        "\"{{}}://{{}}:{{}}\".format({port_ref}.application_protocol, {ident}.hostname, {port_ref}.number)"
                    ),
                ));
                vars.push(Variable::new(
                    format!("service.{id}.port.{i}.port"),
                    format!("{name}.ports.{}.port", port.name),
                    format!("str({port_ref}.number)"),
                ));
                vars.push(Variable::new(
                    format!("service.{id}.port.{i}.applicationProtocol"),
                    format!("{name}.ports.{}.application_protocol", port.name),
                    format!("{port_ref}.application_protocol"),
                ));
            }
            for (i, env) in service.env.iter().enumerate() {
                vars.push(Variable::new(
                    format!("service.{id}.env.{i}.value"),
                    format!("{name}.env.{}", env.key),
                    format!("\"{}\"", escape_string(&env.value)),
                ));
            }
            vars
        }
        NodeData::Artifact(_) => vec![Variable::new(
            format!("artifact.{id}"),
            name.to_string(),
            ident,
        )],
        NodeData::Shell(shell) => {
            let mut vars = vec![Variable::new(
                format!("shell.{id}"),
                name.to_string(),
                format!("{ident}.files_artifacts[0]"),
            )];
            for (i, env) in shell.env.iter().enumerate() {
                vars.push(Variable::new(
                    format!("shell.{id}.env.{i}.value"),
                    format!("{name}.env.{}", env.key),
                    format!("\"{}\"", escape_string(&env.value)),
                ));
            }
            vars
        }
        NodeData::Python(python) => {
            let mut vars = vec![Variable::new(
                format!("python.{id}"),
                name.to_string(),
                format!("{ident}.files_artifacts[0]"),
            )];
            for (i, arg) in python.args.iter().enumerate() {
                vars.push(Variable::new(
                    format!("python.{id}.args.{i}.arg"),
                    format!("{name}.args[{i}]"),
                    format!("\"{}\"", escape_string(&arg.arg)),
                ));
            }
            vars
        }
        NodeData::Package(_) => vec![],
    }
}

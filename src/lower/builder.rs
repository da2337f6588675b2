//! Statement builder: walk topo-sorted nodes and build one call statement per
//! resource, with a fixed keyword order per node type.
//! SYNC NOTE: `lower_node` must be updated when node types change in
//! `parse::types`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::CompileError;
use crate::ir::types::*;
use crate::parse::types::*;

use super::reference::{escape_template_delimiters, resolve_value_expr};
use super::variables::script_identifier;

/// Field interpolation bound to one node.
struct FieldContext<'a> {
    node_id: &'a str,
    variables: &'a HashMap<String, String>,
}

impl FieldContext<'_> {
    fn field(&self, input: &str) -> Result<ValueExpr, CompileError> {
        resolve_value_expr(input, Quote::Double, self.node_id, self.variables)
    }

    /// Multi-line bodies (shell commands, python code).
    fn block(&self, input: &str) -> Result<ValueExpr, CompileError> {
        resolve_value_expr(input, Quote::Triple, self.node_id, self.variables)
    }

    fn env_vars(&self, env: &[EnvVar]) -> Result<ValueExpr, CompileError> {
        let entries = env
            .iter()
            .map(|var| Ok((self.field(&var.key)?, self.field(&var.value)?)))
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(ValueExpr::dict(entries))
    }

    fn files(&self, files: &[FileMount]) -> Result<ValueExpr, CompileError> {
        let entries = files
            .iter()
            .map(|f| Ok((self.field(&f.mount_point)?, self.field(&f.name)?)))
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(ValueExpr::dict(entries))
    }

    fn image(&self, image: &ImageConfig) -> Result<ValueExpr, CompileError> {
        match image {
            ImageConfig::Locator(locator) => self.field(locator),
            ImageConfig::Spec(ImageSpec::Image {
                image,
                registry,
                registry_username,
                registry_password,
            }) => {
                if [registry, registry_username, registry_password]
                    .iter()
                    .all(|v| v.is_empty())
                {
                    return self.field(image);
                }
                Ok(ValueExpr::call(
                    "ImageSpec",
                    vec![
                        ("name", self.field(image)?),
                        ("username", self.field(registry_username)?),
                        ("password", self.field(registry_password)?),
                        ("registry", self.field(registry)?),
                    ],
                ))
            }
            ImageConfig::Spec(ImageSpec::Dockerfile {
                image,
                build_context_dir,
                target_stage,
            }) => {
                let mut kwargs = vec![
                    ("image_name", self.field(image)?),
                    ("build_context_dir", self.field(build_context_dir)?),
                ];
                if !target_stage.is_empty() {
                    kwargs.push(("target_stage", self.field(target_stage)?));
                }
                Ok(ValueExpr::call("ImageBuildSpec", kwargs))
            }
            ImageConfig::Spec(ImageSpec::Nix {
                image,
                build_context_dir,
                flake_location_dir,
                flake_output,
            }) => {
                let mut kwargs = vec![
                    ("image_name", self.field(image)?),
                    ("build_context_dir", self.field(build_context_dir)?),
                    ("flake_location_dir", self.field(flake_location_dir)?),
                ];
                if !flake_output.is_empty() {
                    kwargs.push(("flake_output", self.field(flake_output)?));
                }
                Ok(ValueExpr::call("NixBuildSpec", kwargs))
            }
        }
    }

    /// `store = [StoreSpec(...)]`, only when a store path is set.
    fn store(&self, store: &str, binding: &str) -> Result<Option<ValueExpr>, CompileError> {
        if store.is_empty() {
            return Ok(None);
        }
        Ok(Some(ValueExpr::list(vec![ValueExpr::call(
            "StoreSpec",
            vec![
                ("src", self.field(store)?),
                ("name", ValueExpr::string(binding)),
            ],
        )])))
    }

    /// Disabled → `None`; enabled with a duration → that duration; enabled
    /// and blank → engine default (omitted).
    fn wait(&self, enabled: bool, wait: &str) -> Result<Option<ValueExpr>, CompileError> {
        if !enabled {
            return Ok(Some(ValueExpr::none()));
        }
        if wait.is_empty() {
            return Ok(None);
        }
        self.field(wait).map(Some)
    }

    fn json(&self, value: &serde_json::Value) -> Result<ValueExpr, CompileError> {
        Ok(match value {
            serde_json::Value::Null => ValueExpr::none(),
            serde_json::Value::Bool(b) => ValueExpr::boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ValueExpr::integer(i)
                } else if n.is_u64() {
                    // Above i64::MAX: keep the digits exactly.
                    ValueExpr::raw(n.to_string())
                } else {
                    ValueExpr::number(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => self.field(s)?,
            serde_json::Value::Array(items) => ValueExpr::list(
                items
                    .iter()
                    .map(|item| self.json(item))
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(map) => self.json_object(map)?,
        })
    }

    fn json_object(
        &self,
        map: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ValueExpr, CompileError> {
        let entries = map
            .iter()
            .map(|(k, v)| Ok((self.field(k)?, self.json(v)?)))
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(ValueExpr::dict(entries))
    }
}

/// Lowered statements for the whole graph.
pub struct BuiltStatements {
    pub imports: Vec<Statement>,
    pub body: Vec<Statement>,
}

/// Build statements for `order`, collecting every node's errors.
pub fn build_statements(
    order: &[String],
    data: &BTreeMap<String, NodeData>,
    variables: &HashMap<String, String>,
) -> Result<BuiltStatements, Vec<CompileError>> {
    let mut imports = Vec::new();
    let mut body = Vec::new();
    let mut errors = Vec::new();

    for node_id in order {
        let Some(node) = data.get(node_id) else {
            continue;
        };
        let ctx = FieldContext {
            node_id: node_id.as_str(),
            variables,
        };
        match lower_node(&ctx, node) {
            Ok(lowered) => {
                imports.extend(lowered.import);
                body.extend(lowered.statements);
            }
            Err(e) => errors.push(e),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(BuiltStatements { imports, body })
}

struct LoweredNode {
    import: Option<Statement>,
    statements: Vec<Statement>,
}

impl LoweredNode {
    fn single(statement: Statement) -> Self {
        LoweredNode {
            import: None,
            statements: vec![statement],
        }
    }
}

fn lower_node(ctx: &FieldContext<'_>, node: &NodeData) -> Result<LoweredNode, CompileError> {
    let binding = script_identifier(node.name());
    match node {
        NodeData::Service(d) => lower_service(ctx, d, binding),
        NodeData::Artifact(d) => lower_artifact(ctx, d, binding).map(LoweredNode::single),
        NodeData::Shell(d) => lower_shell(ctx, d, binding).map(LoweredNode::single),
        NodeData::Python(d) => lower_python(ctx, d, binding).map(LoweredNode::single),
        NodeData::Package(d) => lower_package(ctx, d, binding),
    }
}

fn lower_service(
    ctx: &FieldContext<'_>,
    d: &ServiceNodeData,
    binding: String,
) -> Result<LoweredNode, CompileError> {
    let ports = d
        .ports
        .iter()
        .map(|port| {
            Ok((
                ctx.field(&port.name)?,
                ValueExpr::call(
                    "PortSpec",
                    vec![
                        ("number", ValueExpr::integer(i64::from(port.port))),
                        (
                            "transport_protocol",
                            ValueExpr::string(port.transport_protocol.as_str()),
                        ),
                        ("application_protocol", ctx.field(&port.application_protocol)?),
                    ],
                ),
            ))
        })
        .collect::<Result<Vec<_>, CompileError>>()?;

    let config = ValueExpr::call(
        "ServiceConfig",
        vec![
            ("image", ctx.image(&d.image)?),
            ("ports", ValueExpr::dict(ports)),
            ("env_vars", ctx.env_vars(&d.env)?),
            ("files", ctx.files(&d.files)?),
        ],
    );

    let mut statements = vec![Statement::assign(
        ctx.node_id,
        binding.clone(),
        ValueExpr::call(
            "plan.add_service",
            vec![("name", ctx.field(&d.name)?), ("config", config)],
        ),
    )];

    if let Some(exec) = d.exec_step.as_ref().filter(|e| e.enabled) {
        let command = exec
            .command
            .split_whitespace()
            .map(|token| ctx.field(token))
            .collect::<Result<Vec<_>, _>>()?;
        let mut kwargs = vec![
            ("service_name", ValueExpr::reference(format!("{binding}.name"))),
            (
                "recipe",
                ValueExpr::call("ExecRecipe", vec![("command", ValueExpr::list(command))]),
            ),
        ];
        if !exec.acceptable_codes.is_empty() {
            kwargs.push((
                "acceptable_codes",
                ValueExpr::list(
                    exec.acceptable_codes
                        .iter()
                        .map(|code| ValueExpr::integer(*code))
                        .collect(),
                ),
            ));
        }
        statements.push(Statement::assign(
            ctx.node_id,
            format!("{binding}_exec"),
            ValueExpr::call("plan.exec", kwargs),
        ));
    }

    Ok(LoweredNode {
        import: None,
        statements,
    })
}

fn lower_artifact(
    ctx: &FieldContext<'_>,
    d: &ArtifactNodeData,
    binding: String,
) -> Result<Statement, CompileError> {
    let config = d
        .files
        .iter()
        .map(|(path, content)| {
            (
                ValueExpr::string(path.as_str()),
                ValueExpr::call(
                    "struct",
                    vec![
                        ("template", ValueExpr::text(escape_template_delimiters(content))),
                        ("data", ValueExpr::dict(vec![])),
                    ],
                ),
            )
        })
        .collect();

    Ok(Statement::assign(
        ctx.node_id,
        binding,
        ValueExpr::call(
            "plan.render_templates",
            vec![("name", ctx.field(&d.name)?), ("config", ValueExpr::dict(config))],
        ),
    ))
}

fn lower_shell(
    ctx: &FieldContext<'_>,
    d: &ShellNodeData,
    binding: String,
) -> Result<Statement, CompileError> {
    let mut kwargs = vec![("run", ctx.block(&d.command)?)];
    let image = ctx.image(&d.image)?;
    if !image.is_empty_string() {
        kwargs.push(("image", image));
    }
    kwargs.push(("env_vars", ctx.env_vars(&d.env)?));
    kwargs.push(("files", ctx.files(&d.files)?));
    if let Some(store) = ctx.store(&d.store, &binding)? {
        kwargs.push(("store", store));
    }
    if let Some(wait) = ctx.wait(d.wait_enabled, &d.wait)? {
        kwargs.push(("wait", wait));
    }

    Ok(Statement::assign(
        ctx.node_id,
        binding,
        ValueExpr::call("plan.run_sh", kwargs),
    ))
}

fn lower_python(
    ctx: &FieldContext<'_>,
    d: &PythonNodeData,
    binding: String,
) -> Result<Statement, CompileError> {
    let mut kwargs = vec![("run", ctx.block(&d.command)?)];
    let image = ctx.image(&d.image)?;
    if !image.is_empty_string() {
        kwargs.push(("image", image));
    }
    let packages = d
        .packages
        .iter()
        .map(|p| ctx.field(&p.package_name))
        .collect::<Result<Vec<_>, _>>()?;
    kwargs.push(("packages", ValueExpr::list(packages)));
    let args = d
        .args
        .iter()
        .map(|a| ctx.field(&a.arg))
        .collect::<Result<Vec<_>, _>>()?;
    kwargs.push(("args", ValueExpr::list(args)));
    kwargs.push(("files", ctx.files(&d.files)?));
    if let Some(store) = ctx.store(&d.store, &binding)? {
        kwargs.push(("store", store));
    }
    if let Some(wait) = ctx.wait(d.wait_enabled, &d.wait)? {
        kwargs.push(("wait", wait));
    }

    Ok(Statement::assign(
        ctx.node_id,
        binding,
        ValueExpr::call("plan.run_python", kwargs),
    ))
}

fn lower_package(
    ctx: &FieldContext<'_>,
    d: &PackageNodeData,
    binding: String,
) -> Result<LoweredNode, CompileError> {
    let module = format!("{binding}_module");
    let import = Statement::assign(
        ctx.node_id,
        module.clone(),
        ValueExpr::Call {
            callee: "import_module".into(),
            args: vec![ctx.field(&format!("{}/main.star", d.package_id))?],
            kwargs: vec![],
        },
    );
    let run = Statement::assign(
        ctx.node_id,
        binding,
        ValueExpr::Call {
            callee: format!("{module}.run"),
            args: vec![
                ValueExpr::raw("plan"),
                ValueExpr::splat(ctx.json_object(&d.args)?),
            ],
            kwargs: vec![],
        },
    );

    Ok(LoweredNode {
        import: Some(import),
        statements: vec![run],
    })
}

/// `plan.remove_service` for every service in `prior` whose name no longer
/// belongs to a service in `current`. Prior node order is kept.
pub fn build_removals(current: &ResourceGraph, prior: &ResourceGraph) -> Vec<Statement> {
    let current_names: BTreeSet<&str> = current
        .nodes
        .iter()
        .filter_map(|n| current.data.get(&n.id))
        .filter_map(|d| match d {
            NodeData::Service(s) => Some(s.name.as_str()),
            _ => None,
        })
        .collect();

    let mut seen = BTreeSet::new();
    prior
        .nodes
        .iter()
        .filter_map(|n| match prior.data.get(&n.id) {
            Some(NodeData::Service(s)) => Some(s.name.as_str()),
            _ => None,
        })
        .filter(|name| !current_names.contains(name) && seen.insert(*name))
        .map(|name| {
            Statement::bare(ValueExpr::call(
                "plan.remove_service",
                vec![("name", ValueExpr::string(name))],
            ))
        })
        .collect()
}

//! Rust types mirroring the enclave builder's node store.
//!
//! These types are the serde target for the host UI's graph JSON and for the
//! build-state snapshot embedded in generated scripts.
//! SYNC NOTE: Keep the field names aligned with the builder's node forms.
//! When a node shape changes, also review `lower::variables`,
//! `lower::dependencies` and `lower::builder`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// RESOURCE GRAPH
// =============================================================================

/// The `{nodes, edges, data}` triple describing a composed environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Display hints only. Ordering is derived from field contents.
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub data: BTreeMap<String, NodeData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Set on resources a package node declares. Such children are created
    /// by the package's `run` and are never emitted on their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node: Option<String>,
}

impl Node {
    /// True for nodes that get their own statement in the script.
    pub fn is_primary(&self) -> bool {
        self.parent_node.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Service,
    Artifact,
    Shell,
    Python,
    Package,
}

impl NodeKind {
    /// The tag used as the first segment of variable ids.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Service => "service",
            NodeKind::Artifact => "artifact",
            NodeKind::Shell => "shell",
            NodeKind::Python => "python",
            NodeKind::Package => "package",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// `target` depends on `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Edge {
            id: None,
            source: source.into(),
            target: target.into(),
        }
    }
}

// =============================================================================
// NODE DATA: tagged union over the five node types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeData {
    Service(ServiceNodeData),
    Artifact(ArtifactNodeData),
    Shell(ShellNodeData),
    Python(PythonNodeData),
    Package(PackageNodeData),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Service(_) => NodeKind::Service,
            NodeData::Artifact(_) => NodeKind::Artifact,
            NodeData::Shell(_) => NodeKind::Shell,
            NodeData::Python(_) => NodeKind::Python,
            NodeData::Package(_) => NodeKind::Package,
        }
    }

    /// User-facing display name.
    pub fn name(&self) -> &str {
        match self {
            NodeData::Service(d) => &d.name,
            NodeData::Artifact(d) => &d.name,
            NodeData::Shell(d) => &d.name,
            NodeData::Python(d) => &d.name,
            NodeData::Package(d) => &d.name,
        }
    }

    /// Validity as judged by the host UI. Advisory only.
    pub fn is_valid(&self) -> bool {
        match self {
            NodeData::Service(d) => d.is_valid,
            NodeData::Artifact(d) => d.is_valid,
            NodeData::Shell(d) => d.is_valid,
            NodeData::Python(d) => d.is_valid,
            NodeData::Package(d) => d.is_valid,
        }
    }

    /// Every free-text field that may hold `{{...}}` references.
    ///
    /// Artifact file contents are template bodies and are deliberately absent.
    pub fn text_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name()];
        match self {
            NodeData::Service(d) => {
                d.image.collect_text(&mut fields);
                for port in &d.ports {
                    fields.push(&port.name);
                    fields.push(&port.application_protocol);
                }
                push_env(&d.env, &mut fields);
                push_files(&d.files, &mut fields);
                if let Some(exec) = &d.exec_step {
                    fields.push(&exec.command);
                }
            }
            NodeData::Artifact(_) => {}
            NodeData::Shell(d) => {
                fields.push(&d.command);
                d.image.collect_text(&mut fields);
                push_env(&d.env, &mut fields);
                push_files(&d.files, &mut fields);
                fields.push(&d.store);
                fields.push(&d.wait);
            }
            NodeData::Python(d) => {
                fields.push(&d.command);
                d.image.collect_text(&mut fields);
                fields.extend(d.packages.iter().map(|p| p.package_name.as_str()));
                fields.extend(d.args.iter().map(|a| a.arg.as_str()));
                push_files(&d.files, &mut fields);
                fields.push(&d.store);
                fields.push(&d.wait);
            }
            NodeData::Package(d) => {
                fields.push(&d.package_id);
                for (key, value) in &d.args {
                    fields.push(key);
                    collect_json_strings(value, &mut fields);
                }
            }
        }
        fields
    }
}

fn push_env<'a>(env: &'a [EnvVar], fields: &mut Vec<&'a str>) {
    for var in env {
        fields.push(&var.key);
        fields.push(&var.value);
    }
}

fn push_files<'a>(files: &'a [FileMount], fields: &mut Vec<&'a str>) {
    for file in files {
        fields.push(&file.mount_point);
        fields.push(&file.name);
    }
}

fn collect_json_strings<'a>(value: &'a serde_json::Value, fields: &mut Vec<&'a str>) {
    match value {
        serde_json::Value::String(s) => fields.push(s),
        serde_json::Value::Array(items) => {
            for item in items {
                collect_json_strings(item, fields);
            }
        }
        serde_json::Value::Object(map) => {
            for (key, item) in map {
                fields.push(key);
                collect_json_strings(item, fields);
            }
        }
        _ => {}
    }
}

// =============================================================================
// SHARED SHAPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

/// Mounts the artifact referenced by `name` at `mount_point`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMount {
    pub mount_point: String,
    pub name: String,
}

/// Container image for a service or execution task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageConfig {
    /// A bare image locator such as `postgres:16`.
    Locator(String),
    Spec(ImageSpec),
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig::Locator(String::new())
    }
}

impl ImageConfig {
    fn collect_text<'a>(&'a self, fields: &mut Vec<&'a str>) {
        match self {
            ImageConfig::Locator(image) => fields.push(image),
            ImageConfig::Spec(ImageSpec::Image {
                image,
                registry,
                registry_username,
                registry_password,
            }) => fields.extend([
                image.as_str(),
                registry.as_str(),
                registry_username.as_str(),
                registry_password.as_str(),
            ]),
            ImageConfig::Spec(ImageSpec::Dockerfile {
                image,
                build_context_dir,
                target_stage,
            }) => fields.extend([
                image.as_str(),
                build_context_dir.as_str(),
                target_stage.as_str(),
            ]),
            ImageConfig::Spec(ImageSpec::Nix {
                image,
                build_context_dir,
                flake_location_dir,
                flake_output,
            }) => fields.extend([
                image.as_str(),
                build_context_dir.as_str(),
                flake_location_dir.as_str(),
                flake_output.as_str(),
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImageSpec {
    #[serde(rename_all = "camelCase")]
    Image {
        image: String,
        #[serde(default)]
        registry: String,
        #[serde(default)]
        registry_username: String,
        #[serde(default)]
        registry_password: String,
    },
    #[serde(rename_all = "camelCase")]
    Dockerfile {
        image: String,
        build_context_dir: String,
        #[serde(default)]
        target_stage: String,
    },
    #[serde(rename_all = "camelCase")]
    Nix {
        image: String,
        build_context_dir: String,
        flake_location_dir: String,
        #[serde(default)]
        flake_output: String,
    },
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNodeData {
    pub name: String,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub files: Vec<FileMount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_step: Option<ExecStep>,
    #[serde(default)]
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub name: String,
    pub port: u16,
    #[serde(default)]
    pub transport_protocol: TransportProtocol,
    #[serde(default)]
    pub application_protocol: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportProtocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

impl TransportProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportProtocol::Tcp => "TCP",
            TransportProtocol::Udp => "UDP",
            TransportProtocol::Sctp => "SCTP",
        }
    }
}

/// Follow-up command run inside the service once it is up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecStep {
    pub enabled: bool,
    pub command: String,
    #[serde(default)]
    pub acceptable_codes: Vec<i64>,
}

// =============================================================================
// ARTIFACT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactNodeData {
    pub name: String,
    /// Relative file path → file content (a template body).
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub is_valid: bool,
}

// =============================================================================
// EXECUTION TASKS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellNodeData {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub files: Vec<FileMount>,
    /// Path inside the task whose contents become the task's output artifact.
    #[serde(default)]
    pub store: String,
    #[serde(default = "default_wait_enabled")]
    pub wait_enabled: bool,
    #[serde(default)]
    pub wait: String,
    #[serde(default)]
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PythonNodeData {
    pub name: String,
    /// Python source code.
    pub command: String,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub packages: Vec<PythonPackage>,
    #[serde(default)]
    pub args: Vec<PythonArg>,
    #[serde(default)]
    pub files: Vec<FileMount>,
    #[serde(default)]
    pub store: String,
    #[serde(default = "default_wait_enabled")]
    pub wait_enabled: bool,
    #[serde(default)]
    pub wait: String,
    #[serde(default)]
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PythonPackage {
    pub package_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PythonArg {
    pub arg: String,
}

fn default_wait_enabled() -> bool {
    true
}

// =============================================================================
// PACKAGE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageNodeData {
    pub name: String,
    pub package_id: String,
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub is_valid: bool,
}

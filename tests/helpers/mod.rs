#![allow(dead_code)]

use graphscript::parse::types::*;

// =============================================================================
// Fixtures
// =============================================================================

pub const DB_API_GRAPH: &str = include_str!("../fixtures/db_api_graph.json");
pub const MIXED_GRAPH: &str = include_str!("../fixtures/mixed_graph.json");

pub fn fixture(json: &str) -> ResourceGraph {
    graphscript::parse::parse(json).expect("fixture should parse")
}

// =============================================================================
// Resource graph builders
// =============================================================================

/// Build a graph from `(id, data)` pairs, keeping the given node order.
pub fn graph_of(entries: Vec<(&str, NodeData)>) -> ResourceGraph {
    let mut graph = ResourceGraph::default();
    for (id, data) in entries {
        graph.nodes.push(Node {
            id: id.into(),
            kind: data.kind(),
            position: None,
            parent_node: None,
        });
        graph.data.insert(id.into(), data);
    }
    graph
}

pub fn service(name: &str, env: Vec<(&str, &str)>) -> NodeData {
    NodeData::Service(ServiceNodeData {
        name: name.into(),
        image: ImageConfig::Locator("busybox".into()),
        ports: vec![],
        env: env
            .into_iter()
            .map(|(key, value)| EnvVar {
                key: key.into(),
                value: value.into(),
            })
            .collect(),
        files: vec![],
        exec_step: None,
        is_valid: true,
    })
}

pub fn service_with_port(name: &str, port_name: &str, port: u16) -> NodeData {
    let NodeData::Service(mut data) = service(name, vec![]) else {
        unreachable!()
    };
    data.ports.push(Port {
        name: port_name.into(),
        port,
        transport_protocol: TransportProtocol::Tcp,
        application_protocol: "http".into(),
    });
    NodeData::Service(data)
}

pub fn artifact(name: &str, files: Vec<(&str, &str)>) -> NodeData {
    NodeData::Artifact(ArtifactNodeData {
        name: name.into(),
        files: files
            .into_iter()
            .map(|(path, content)| (path.to_string(), content.to_string()))
            .collect(),
        is_valid: true,
    })
}

pub fn shell(name: &str, command: &str) -> NodeData {
    NodeData::Shell(ShellNodeData {
        name: name.into(),
        command: command.into(),
        image: ImageConfig::default(),
        env: vec![],
        files: vec![],
        store: String::new(),
        wait_enabled: true,
        wait: String::new(),
        is_valid: true,
    })
}

/// Shell task whose env var `VALUE` holds `value`, so references in `value`
/// become dependencies.
pub fn shell_referencing(name: &str, value: &str) -> NodeData {
    let NodeData::Shell(mut data) = shell(name, "true") else {
        unreachable!()
    };
    data.env.push(EnvVar {
        key: "VALUE".into(),
        value: value.into(),
    });
    NodeData::Shell(data)
}

//! Build-state trailer: the resource graph embedded at the end of every
//! generated script so the graph can be recovered from the script alone.
//!
//! Format: `# EMUI_BUILD_STATE=<base64(json({nodes, edges, data}))>`

use std::collections::HashSet;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use tracing::warn;

use crate::error::LoadError;
use crate::parse::types::ResourceGraph;

pub const BUILD_STATE_KEY: &str = "EMUI_BUILD_STATE";

/// Standard alphabet, accepting payloads with or without padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// True if `script` carries a build-state trailer.
pub fn contains_build_state(script: &str) -> bool {
    script.lines().any(|line| state_payload(line).is_some())
}

/// Encode a graph as the trailer payload (base64 of its JSON form).
pub fn serialize_state(graph: &ResourceGraph) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(graph)?;
    Ok(STANDARD.encode(json))
}

/// The full trailer line, without a line break.
pub fn state_trailer(graph: &ResourceGraph) -> Result<String, serde_json::Error> {
    Ok(format!("# {}={}", BUILD_STATE_KEY, serialize_state(graph)?))
}

/// Append the trailer to a generated script, separated by a blank line.
pub fn append_state_trailer(
    script: &str,
    graph: &ResourceGraph,
) -> Result<String, serde_json::Error> {
    let trailer = state_trailer(graph)?;
    let mut out = String::with_capacity(script.len() + trailer.len() + 2);
    out.push_str(script);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&trailer);
    out.push('\n');
    Ok(out)
}

/// The payload of a trailer line: a comment whose text starts with
/// `EMUI_BUILD_STATE=`. Field values that merely mention the key never match.
fn state_payload(line: &str) -> Option<&str> {
    line.trim_start()
        .strip_prefix('#')?
        .trim_start()
        .strip_prefix(BUILD_STATE_KEY)?
        .strip_prefix('=')
        .map(str::trim)
}

/// Recover the resource graph from a previously generated script.
///
/// The last trailer line wins, since the trailer is always appended. Data
/// entries without a matching node are dropped.
pub fn load(script: &str) -> Result<ResourceGraph, LoadError> {
    let payload = script
        .lines()
        .filter_map(state_payload)
        .last()
        .ok_or(LoadError::MissingPriorState)?;

    let bytes = LENIENT
        .decode(payload)
        .map_err(|e| LoadError::PriorStateDecode(e.to_string()))?;
    let json = String::from_utf8(bytes).map_err(|e| LoadError::PriorStateDecode(e.to_string()))?;
    let mut graph: ResourceGraph =
        serde_json::from_str(&json).map_err(|e| LoadError::PriorStateDecode(e.to_string()))?;

    prune_orphan_data(&mut graph);
    Ok(graph)
}

/// Drop data entries that no node refers to.
pub fn prune_orphan_data(graph: &mut ResourceGraph) {
    let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    graph.data.retain(|id, _| {
        let keep = ids.contains(id.as_str());
        if !keep {
            warn!(node_id = %id, "pruning node data without a node");
        }
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::types::*;

    fn graph() -> ResourceGraph {
        let mut graph = ResourceGraph::default();
        graph.nodes.push(Node {
            id: "a".into(),
            kind: NodeKind::Artifact,
            position: None,
            parent_node: None,
        });
        graph.data.insert(
            "a".into(),
            NodeData::Artifact(ArtifactNodeData {
                name: "config".into(),
                files: [("app.conf".to_string(), "port={{x}}".to_string())].into(),
                is_valid: true,
            }),
        );
        graph
    }

    #[test]
    fn trailer_round_trips() {
        let g = graph();
        let script = append_state_trailer("def run(plan):\n    pass\n", &g).unwrap();
        assert!(script.ends_with('\n'));
        assert!(script.contains("\n\n# EMUI_BUILD_STATE="));
        assert_eq!(load(&script), Ok(g));
    }

    #[test]
    fn missing_trailer() {
        assert_eq!(
            load("def run(plan):\n    pass\n"),
            Err(LoadError::MissingPriorState)
        );
        assert!(!contains_build_state("def run(plan):\n    pass\n"));
    }

    #[test]
    fn garbage_payload_is_a_decode_error() {
        let err = load("# EMUI_BUILD_STATE=!!!not base64!!!").unwrap_err();
        assert!(matches!(err, LoadError::PriorStateDecode(_)));
    }

    #[test]
    fn payload_that_is_not_a_graph() {
        let script = format!("# EMUI_BUILD_STATE={}", STANDARD.encode("[1, 2]"));
        assert!(matches!(load(&script), Err(LoadError::PriorStateDecode(_))));
    }

    #[test]
    fn unpadded_payload_is_accepted() {
        let g = graph();
        let encoded = serialize_state(&g).unwrap();
        let script = format!("# EMUI_BUILD_STATE={}  ", encoded.trim_end_matches('='));
        assert_eq!(load(&script), Ok(g));
    }

    #[test]
    fn orphan_data_is_pruned() {
        let mut g = graph();
        g.data.insert(
            "ghost".into(),
            NodeData::Artifact(ArtifactNodeData {
                name: "ghost".into(),
                files: Default::default(),
                is_valid: true,
            }),
        );
        let script = format!("# EMUI_BUILD_STATE={}", serialize_state(&g).unwrap());
        let loaded = load(&script).unwrap();
        assert_eq!(loaded.data.len(), 1);
        assert!(loaded.data.contains_key("a"));
    }

    #[test]
    fn key_outside_a_trailer_comment_is_ignored() {
        let g = graph();
        let body = "def run(plan):\n    x = \"EMUI_BUILD_STATE\"\n    y = \"EMUI_BUILD_STATE=abc\"\n";
        assert!(!contains_build_state(body));
        assert_eq!(load(body), Err(LoadError::MissingPriorState));

        let script = append_state_trailer(body, &g).unwrap();
        assert!(contains_build_state(&script));
        assert_eq!(load(&script), Ok(g));
    }

    #[test]
    fn last_trailer_wins() {
        let first = graph();
        let mut second = graph();
        second.nodes[0].position = Some(Position { x: 1.5, y: -2.25 });
        let script =
            append_state_trailer(&append_state_trailer("", &first).unwrap(), &second).unwrap();
        assert_eq!(load(&script), Ok(second));
    }

    #[test]
    fn fractional_positions_round_trip() {
        let mut g = graph();
        for (i, (x, y)) in [
            (1744.7180964782501, -0.1),
            (-616.9999999999999, 333.33333333333337),
            (0.30000000000000004, 1e-7),
        ]
        .into_iter()
        .enumerate()
        {
            let id = format!("n{i}");
            g.nodes.push(Node {
                id: id.clone(),
                kind: NodeKind::Artifact,
                position: Some(Position { x, y }),
                parent_node: None,
            });
            g.data.insert(
                id,
                NodeData::Artifact(ArtifactNodeData {
                    name: format!("a{i}"),
                    files: Default::default(),
                    is_valid: true,
                }),
            );
        }
        let script = append_state_trailer("", &g).unwrap();
        assert_eq!(load(&script), Ok(g));
    }
}

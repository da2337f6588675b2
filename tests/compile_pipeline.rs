//! End-to-end pipeline: parse → validate → lower → IR validate → codegen.

mod helpers;

use graphscript::parse::types::*;
use graphscript::{CompileError, CompileOptions, compile, compile_with_prior_script, state};
use helpers::*;

fn no_trailer() -> CompileOptions {
    CompileOptions {
        emit_build_state: false,
        ..Default::default()
    }
}

#[test]
fn db_api_sorts_dependency_first() {
    let graph = fixture(DB_API_GRAPH);
    let output = compile(&graph, None, &CompileOptions::default()).unwrap();

    assert_eq!(output.order, vec!["db".to_string(), "api".to_string()]);
    assert_eq!(output.edges, vec![Edge::new("db", "api")]);
    assert!(output.script.contains("\"DB_HOST\": db.hostname,"));

    let db_at = output.script.find("db = plan.add_service(").unwrap();
    let api_at = output.script.find("api = plan.add_service(").unwrap();
    assert!(db_at < api_at);
}

#[test]
fn db_api_script() {
    let graph = fixture(DB_API_GRAPH);
    let output = compile(&graph, None, &no_trailer()).unwrap();

    insta::assert_snapshot!(output.script, @r#"
def run(plan):
    db = plan.add_service(
        name = "db",
        config = ServiceConfig(
            image = "postgres:16",
            ports = {
                "postgres": PortSpec(
                    number = 5432,
                    transport_protocol = "TCP",
                    application_protocol = "postgresql",
                ),
            },
            env_vars = {
                "POSTGRES_PASSWORD": "secret",
            },
            files = {},
        ),
    )

    api = plan.add_service(
        name = "api",
        config = ServiceConfig(
            image = "my/api:latest",
            ports = {
                "http": PortSpec(
                    number = 8080,
                    transport_protocol = "TCP",
                    application_protocol = "http",
                ),
            },
            env_vars = {
                "DB_HOST": db.hostname,
                "DB_URL": "postgres://{}:{}/app".format(db.hostname, str(db.ports["postgres"].number)),
            },
            files = {},
        ),
    )
"#);
}

#[test]
fn mixed_graph_script() {
    let graph = fixture(MIXED_GRAPH);
    let output = compile(&graph, None, &no_trailer()).unwrap();

    assert_eq!(
        output.order,
        vec![
            "seed".to_string(),
            "conf".to_string(),
            "migrate".to_string(),
            "kv".to_string()
        ]
    );

    insta::assert_snapshot!(output.script, @r#"
redis_module = import_module("github.com/kurtosis-tech/redis-package/main.star")

def run(plan):
    seed = plan.run_python(
        run = """print(\"seeded\")""",
        packages = ["requests"],
        args = ["--fast"],
        files = {},
        wait = None,
    )

    app_config = plan.render_templates(
        name = "app config",
        config = {
            "app.conf": struct(
                template = """listen={{`{{port}}`}}
""",
                data = {},
            ),
        },
    )

    migrate = plan.run_sh(
        run = """cat /conf/app.conf > /out/done""",
        image = "alpine:3",
        env_vars = {},
        files = {
            "/conf": app_config,
        },
        store = [
            StoreSpec(
                src = "/out",
                name = "migrate",
            ),
        ],
    )

    redis = redis_module.run(
        plan,
        **{
            "password": migrate.files_artifacts[0],
            "replicas": 2,
        },
    )
"#);
}

#[test]
fn trailer_follows_a_blank_line() {
    let graph = fixture(DB_API_GRAPH);
    let output = compile(&graph, None, &CompileOptions::default()).unwrap();

    let lines: Vec<&str> = output.script.lines().collect();
    let last = lines.last().unwrap();
    assert!(last.starts_with("# EMUI_BUILD_STATE="));
    assert_eq!(lines[lines.len() - 2], "");
    assert_eq!(state::load(&output.script).unwrap(), graph);
}

#[test]
fn empty_graph_compiles_to_pass() {
    let output = compile(&ResourceGraph::default(), None, &no_trailer()).unwrap();
    assert_eq!(output.script, "def run(plan):\n    pass\n");
}

#[test]
fn cycle_produces_no_script() {
    let graph = graph_of(vec![
        ("a", shell_referencing("a", "{{shell.b}}")),
        ("b", shell_referencing("b", "{{shell.a}}")),
    ]);
    let errors = compile(&graph, None, &CompileOptions::default()).unwrap_err();
    assert_eq!(
        errors,
        vec![CompileError::CycleDetected {
            node_ids: vec!["a".into(), "b".into()],
        }]
    );
    assert_eq!(errors[0].code(), "L001");
}

#[test]
fn self_reference_is_not_a_cycle() {
    let graph = graph_of(vec![("a", service("a", vec![("SELF", "{{service.a.hostname}}")]))]);
    let output = compile(&graph, None, &no_trailer()).unwrap();
    assert_eq!(output.order, vec!["a".to_string()]);
    assert!(output.edges.is_empty());
}

#[test]
fn unknown_variable_fails_fast() {
    let graph = graph_of(vec![("a", service("a", vec![("X", "{{service.ghost.hostname}}")]))]);
    let errors = compile(&graph, None, &CompileOptions::default()).unwrap_err();
    assert_eq!(
        errors,
        vec![CompileError::UnresolvedReference {
            node_id: "a".into(),
            reference: "service.ghost.hostname".into(),
        }]
    );
}

#[test]
fn non_grammar_braces_stay_literal() {
    let graph = graph_of(vec![("a", service("a", vec![("TPL", "{{ .Values.x }}")]))]);
    let output = compile(&graph, None, &no_trailer()).unwrap();
    assert!(output.script.contains("\"TPL\": \"{{ .Values.x }}\","));
}

#[test]
fn colliding_names_are_rejected() {
    let graph = graph_of(vec![("a", service("My DB", vec![])), ("b", service("my-db", vec![]))]);
    let errors = compile(&graph, None, &CompileOptions::default()).unwrap_err();
    assert_eq!(
        errors,
        vec![CompileError::DuplicateBinding {
            binding: "my_db".into(),
            node_ids: vec!["a".into(), "b".into()],
        }]
    );
}

#[test]
fn structural_errors_are_all_reported() {
    let mut graph = graph_of(vec![("a.b", service("x", vec![]))]);
    graph.nodes.push(Node {
        id: "lonely".into(),
        kind: NodeKind::Shell,
        position: None,
        parent_node: None,
    });
    let errors = compile(&graph, None, &CompileOptions::default()).unwrap_err();
    let codes: Vec<&str> = errors.iter().map(CompileError::code).collect();
    assert_eq!(codes, vec!["V001", "V004"]);
}

#[test]
fn advisory_edges_are_ignored() {
    let mut graph = fixture(DB_API_GRAPH);
    graph.edges.push(Edge::new("api", "db"));
    let output = compile(&graph, None, &CompileOptions::default()).unwrap();
    assert_eq!(output.order, vec!["db".to_string(), "api".to_string()]);
}

#[test]
fn exec_step_follows_its_service() {
    let NodeData::Service(mut web) = service("web", vec![]) else {
        unreachable!()
    };
    web.exec_step = Some(ExecStep {
        enabled: true,
        command: "echo   ready".into(),
        acceptable_codes: vec![0, 1],
    });
    let graph = graph_of(vec![("web", NodeData::Service(web))]);
    let output = compile(&graph, None, &no_trailer()).unwrap();

    assert!(output.script.contains(concat!(
        "    web_exec = plan.exec(\n",
        "        service_name = web.name,\n",
        "        recipe = ExecRecipe(\n",
        "            command = [\"echo\", \"ready\"],\n",
        "        ),\n",
        "        acceptable_codes = [0, 1],\n",
        "    )\n",
    )));
}

// ---------------------------------------------------------------------------
// Stale service removal
// ---------------------------------------------------------------------------

#[test]
fn removed_services_are_torn_down() {
    let prior = fixture(DB_API_GRAPH);
    let current = graph_of(vec![("db", service("db", vec![]))]);

    let output = compile(&current, Some(&prior), &no_trailer()).unwrap();
    assert!(output.script.ends_with(concat!(
        "\n",
        "    plan.remove_service(\n",
        "        name = \"api\",\n",
        "    )\n",
    )));
    assert_eq!(output.script.matches("plan.remove_service").count(), 1);
}

#[test]
fn removal_can_be_disabled() {
    let prior = fixture(DB_API_GRAPH);
    let current = graph_of(vec![("db", service("db", vec![]))]);
    let options = CompileOptions {
        remove_stale_services: false,
        ..no_trailer()
    };

    let output = compile(&current, Some(&prior), &options).unwrap();
    assert!(!output.script.contains("plan.remove_service"));
}

#[test]
fn prior_script_drives_removals() {
    let prior = fixture(DB_API_GRAPH);
    let prior_script = compile(&prior, None, &CompileOptions::default())
        .unwrap()
        .script;
    let current = graph_of(vec![("db", service("db", vec![]))]);

    let output =
        compile_with_prior_script(&current, Some(&prior_script), &no_trailer()).unwrap();
    assert!(output.script.contains("plan.remove_service("));
}

#[test]
fn prior_script_without_state_is_a_fresh_build() {
    let current = graph_of(vec![("db", service("db", vec![]))]);
    let output = compile_with_prior_script(
        &current,
        Some("def run(plan):\n    pass\n"),
        &no_trailer(),
    )
    .unwrap();
    assert!(!output.script.contains("plan.remove_service"));
}

#[test]
fn undecodable_prior_state_is_an_error() {
    let current = graph_of(vec![("db", service("db", vec![]))]);
    let errors = compile_with_prior_script(
        &current,
        Some("# EMUI_BUILD_STATE=bm90IGpzb24="),
        &no_trailer(),
    )
    .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code(), "S002");
}

// ---------------------------------------------------------------------------
// Packages
// ---------------------------------------------------------------------------

fn package(name: &str, args: serde_json::Value) -> NodeData {
    let serde_json::Value::Object(args) = args else {
        unreachable!()
    };
    NodeData::Package(PackageNodeData {
        name: name.into(),
        package_id: "github.com/org/redis-package".into(),
        args,
        is_valid: true,
    })
}

/// `api` depends on a service the `kv` package spawns, listed before both.
fn graph_with_package_child() -> ResourceGraph {
    let mut graph = graph_of(vec![
        ("api", shell_referencing("api", "{{service.kv:1.hostname}}")),
        ("kv", package("kv", serde_json::json!({}))),
        ("kv:1", service("redis", vec![])),
    ]);
    graph.nodes[2].parent_node = Some("kv".into());
    graph
}

#[test]
fn package_children_are_ordered_through_their_package() {
    let graph = graph_with_package_child();
    let output = compile(&graph, None, &no_trailer()).unwrap();

    assert_eq!(output.order, vec!["kv".to_string(), "api".to_string()]);
    assert_eq!(output.edges, vec![Edge::new("kv:1", "api")]);
    assert!(!output.script.contains("plan.add_service("));
    assert!(output.script.contains("\"VALUE\": redis.hostname"));

    let kv_at = output.script.find("kv = kv_module.run(").unwrap();
    let api_at = output.script.find("api = plan.run_sh(").unwrap();
    assert!(kv_at < api_at);
}

#[test]
fn package_children_are_not_torn_down() {
    let graph = graph_with_package_child();
    let output = compile(&graph, Some(&graph), &no_trailer()).unwrap();
    assert!(!output.script.contains("plan.remove_service"));
}

#[test]
fn child_of_a_missing_package_is_rejected() {
    let mut graph = graph_with_package_child();
    graph.nodes[2].parent_node = Some("nowhere".into());
    let errors = compile(&graph, None, &no_trailer()).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code(), "V005");
}

#[test]
fn large_package_arguments_are_not_clamped() {
    let graph = graph_of(vec![(
        "kv",
        package(
            "kv",
            serde_json::json!({"big": 1e20, "huge": 18446744073709551615u64}),
        ),
    )]);
    let output = compile(&graph, None, &no_trailer()).unwrap();
    assert!(output.script.contains("100000000000000000000"));
    assert!(output.script.contains("18446744073709551615"));
    assert!(!output.script.contains("9223372036854775807"));
}

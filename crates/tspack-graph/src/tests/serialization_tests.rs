use super::*;

fn resolver() -> Resolver {
    Resolver::new(Arc::new(VirtualRuntime::new("/proj")), ResolveOptions::default())
}

#[test]
fn json_round_trip_preserves_modules_and_edges() {
    let graph = graph_of(&[
        ("/proj/d.ts", "export const d = 4;", &[]),
        ("/proj/b.ts", "export * from './d';", &["./d"]),
        ("/proj/c.ts", "import './d';", &["./d"]),
        ("/proj/a.ts", "import './b'; import './c';", &["./b", "./c"]),
    ]);
    let json = graph.to_json().unwrap();

    let restored = DependencyGraph::from_json_with_resolver(&json, resolver()).unwrap();

    assert_eq!(restored.modules(), graph.modules());
    for id in graph.module_ids() {
        assert_eq!(restored.dependencies(&id), graph.dependencies(&id));
        assert_eq!(restored.dependents(&id), graph.dependents(&id));
    }
}

#[test]
fn json_uses_tuple_arrays() {
    let graph = graph_of(&[("/proj/b.ts", "", &[]), ("/proj/a.ts", "", &["./b"])]);
    let value: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();

    assert_eq!(value["modules"][0][0], "/proj/b.ts");
    assert_eq!(value["dependencies"][0][0], "/proj/a.ts");
    assert_eq!(value["dependencies"][0][1][0], "/proj/b.ts");
    assert_eq!(value["dependents"][0][1][0], "/proj/a.ts");
}

fn record(path: &str) -> serde_json::Value {
    serde_json::json!([path, { "id": path, "code": "", "dependencies": [] }])
}

#[test]
fn from_json_rejects_cycles() {
    let json = serde_json::json!({
        "modules": [record("/proj/a.ts"), record("/proj/b.ts")],
        "dependencies": [["/proj/a.ts", ["/proj/b.ts"]], ["/proj/b.ts", ["/proj/a.ts"]]],
        "dependents": [["/proj/b.ts", ["/proj/a.ts"]], ["/proj/a.ts", ["/proj/b.ts"]]],
    });

    let err = DependencyGraph::from_json_with_resolver(&json.to_string(), resolver()).unwrap_err();
    assert!(matches!(err, Error::CircularDependency { ref cycle } if cycle.len() == 3));
}

#[test]
fn from_json_rejects_unknown_paths() {
    let json = serde_json::json!({
        "modules": [record("/proj/a.ts")],
        "dependencies": [["/proj/a.ts", ["/proj/ghost.ts"]]],
        "dependents": [["/proj/ghost.ts", ["/proj/a.ts"]]],
    });

    let err = DependencyGraph::from_json_with_resolver(&json.to_string(), resolver()).unwrap_err();
    assert!(matches!(
        err,
        Error::MissingModule { ref path, ref referenced_by }
            if path == "/proj/ghost.ts" && referenced_by == "/proj/a.ts"
    ));
}

#[test]
fn from_json_rejects_inconsistent_reverse_edges() {
    let json = serde_json::json!({
        "modules": [record("/proj/a.ts"), record("/proj/b.ts")],
        "dependencies": [["/proj/a.ts", ["/proj/b.ts"]]],
        "dependents": [],
    });

    let err = DependencyGraph::from_json_with_resolver(&json.to_string(), resolver()).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[test]
fn malformed_json_is_a_serialization_error() {
    let err = DependencyGraph::from_json_with_resolver("{\"modules\": 3}", resolver()).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[test]
fn dot_export_lists_nodes_and_edges() {
    let graph = graph_of(&[("/proj/b.ts", "", &[]), ("/proj/a.ts", "", &["./b"])]);
    let dot = graph.to_dot_format();

    assert!(dot.starts_with("digraph DependencyGraph {"));
    assert!(dot.contains("\"/proj/b.ts\";"));
    assert!(dot.contains("\"/proj/a.ts\" -> \"/proj/b.ts\";"));
}

//! Property-based tests for graph invariants.

use super::*;
use proptest::prelude::*;

fn path(i: usize) -> String {
    format!("/proj/m{i}.ts")
}

/// Edges `i -> j` only for `j < i`, so every generated graph is acyclic.
fn dag_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..=12).prop_flat_map(|n| {
        (0..n)
            .map(|i| prop::collection::btree_set(0..i.max(1), 0..=i.min(4)))
            .collect::<Vec<_>>()
            .prop_map(|sets| {
                sets.into_iter()
                    .enumerate()
                    .map(|(i, set)| set.into_iter().filter(|&j| j < i).collect())
                    .collect()
            })
    })
}

fn build(edges: &[Vec<usize>]) -> DependencyGraph {
    let runtime = VirtualRuntime::new("/proj");
    for i in 0..edges.len() {
        runtime.add_file(path(i), "");
    }
    let graph = DependencyGraph::with_resolver(Resolver::new(
        Arc::new(runtime),
        ResolveOptions::default(),
    ));
    // Register in reverse so insertion order differs from dependency order.
    for (i, deps) in edges.iter().enumerate().rev() {
        let specifiers = deps.iter().map(|j| format!("./m{j}")).collect();
        graph
            .update_module(Module::new(id(&path(i)), "", specifiers))
            .unwrap();
    }
    graph
}

fn assert_transpose(graph: &DependencyGraph) -> std::result::Result<(), TestCaseError> {
    for from in graph.module_ids() {
        for to in graph.dependencies(&from) {
            prop_assert!(graph.dependents(&to).contains(&from));
        }
        for importer in graph.dependents(&from) {
            prop_assert!(graph.dependencies(&importer).contains(&from));
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_topological_order_is_valid(edges in dag_strategy()) {
        let graph = build(&edges);
        prop_assert!(!graph.has_cycle());

        let order = graph.topological_order();
        prop_assert_eq!(order.len(), edges.len());
        let position = |m: &ModuleId| order.iter().position(|o| o == m);

        for module in graph.module_ids() {
            for dep in graph.dependencies(&module) {
                prop_assert!(position(&dep) < position(&module));
            }
        }
    }

    #[test]
    fn prop_reverse_edges_stay_transposed_after_updates(
        edges in dag_strategy(),
        shrink in prop::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        let graph = build(&edges);
        assert_transpose(&graph)?;

        // Drop one dependency from randomly chosen modules.
        for pick in shrink {
            let i = pick.index(edges.len());
            let mut deps = graph.module(&id(&path(i))).unwrap().dependencies.clone();
            if !deps.is_empty() {
                deps.remove(pick.index(deps.len()));
            }
            graph.update_module(Module::new(id(&path(i)), "", deps)).unwrap();
            assert_transpose(&graph)?;
        }
    }

    #[test]
    fn prop_json_round_trip(edges in dag_strategy()) {
        let graph = build(&edges);
        let restored = DependencyGraph::from_json_with_resolver(
            &graph.to_json().unwrap(),
            graph.resolver().clone(),
        )
        .unwrap();

        prop_assert_eq!(restored.module_ids(), graph.module_ids());
        for m in graph.module_ids() {
            prop_assert_eq!(restored.dependencies(&m), graph.dependencies(&m));
            prop_assert_eq!(restored.dependents(&m), graph.dependents(&m));
        }
    }
}

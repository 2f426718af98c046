use super::*;

#[test]
fn unreachable_cycle_is_pruned_reachable_modules_stay() {
    let graph = graph_of(&[
        ("/proj/main.ts", "", &["./used"]),
        ("/proj/used.ts", "", &[]),
        ("/proj/x.ts", "", &["./y"]),
        ("/proj/y.ts", "", &["./x"]),
    ]);

    let removed = graph.remove_unused_modules();

    assert_eq!(paths(&removed), ["/proj/x.ts", "/proj/y.ts"]);
    assert_eq!(paths(&graph.module_ids()), ["/proj/main.ts", "/proj/used.ts"]);
    assert!(graph.dependents(&id("/proj/y.ts")).is_empty());
}

#[test]
fn isolated_module_counts_as_entry_point() {
    let graph = graph_of(&[("/proj/a.ts", "", &[]), ("/proj/b.ts", "", &[])]);
    assert!(graph.remove_unused_modules().is_empty());
    assert_eq!(graph.len(), 2);
}

#[test]
fn singleton_chain_is_merged_into_its_only_dependent() {
    let graph = graph_of(&[
        ("/proj/src/util.ts", "export const u = 1;", &[]),
        ("/proj/src/lib/b.ts", "import { u } from '../util'; export const b = u;", &["../util"]),
        ("/proj/src/a.ts", "import { b } from './lib/b'; console.log(b);", &["./lib/b"]),
        ("/proj/src/main.ts", "import './a'; import './util';", &["./a", "./util"]),
    ]);
    let syntax = TextSyntax::default();

    let merged = graph.merge_modules(&syntax).unwrap();

    assert_eq!(
        merged,
        vec![(id("/proj/src/lib/b.ts"), id("/proj/src/a.ts"))]
    );
    assert!(!graph.contains(&id("/proj/src/lib/b.ts")));

    let a = graph.module(&id("/proj/src/a.ts")).unwrap();
    assert!(a.code.contains("console.log(b);"));
    assert!(a.code.contains("export const b = u;"));
    assert_eq!(a.dependencies, vec!["/proj/src/util.ts".to_string()]);
    assert_eq!(paths(&graph.dependencies(&id("/proj/src/a.ts"))), ["/proj/src/util.ts"]);
    assert_eq!(
        paths(&graph.dependents(&id("/proj/src/util.ts"))),
        ["/proj/src/main.ts", "/proj/src/a.ts"]
    );
    assert!(graph.dependents(&id("/proj/src/lib/b.ts")).is_empty());

    let requests = syntax.requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, vec!["./lib/b".to_string()]);
    assert_eq!(
        requests[0].1,
        vec![("../util".to_string(), "/proj/src/util.ts".to_string())]
    );
}

#[test]
fn chains_merge_until_fixpoint() {
    let graph = graph_of(&[
        ("/proj/c.ts", "C", &[]),
        ("/proj/b.ts", "B", &["./c"]),
        ("/proj/a.ts", "A", &["./b"]),
    ]);

    let merged = graph.merge_modules(&TextSyntax::default()).unwrap();

    assert_eq!(merged.len(), 2);
    assert_eq!(paths(&graph.module_ids()), ["/proj/a.ts"]);
    assert_eq!(&*graph.module(&id("/proj/a.ts")).unwrap().code, "A\nB\nC");
    assert!(graph.dependencies(&id("/proj/a.ts")).is_empty());
}

#[test]
fn declined_chains_stay_separate_and_others_still_merge() {
    let graph = graph_of(&[
        ("/proj/c.ts", "C", &[]),
        ("/proj/b.ts", "B", &["./c"]),
        ("/proj/a.ts", "A", &["./b"]),
    ]);
    let syntax = TextSyntax {
        refuse: vec![id("/proj/c.ts")],
        ..TextSyntax::default()
    };

    let merged = graph.merge_modules(&syntax).unwrap();

    assert_eq!(merged, vec![(id("/proj/b.ts"), id("/proj/a.ts"))]);
    assert_eq!(paths(&graph.module_ids()), ["/proj/c.ts", "/proj/a.ts"]);
    assert_eq!(&*graph.module(&id("/proj/a.ts")).unwrap().code, "A\nB");
    assert_eq!(paths(&graph.dependencies(&id("/proj/a.ts"))), ["/proj/c.ts"]);
    // b->c and then a->c were both offered once
    assert_eq!(syntax.requests.lock().len(), 3);
}

#[test]
fn shared_dependency_is_not_merged() {
    let graph = graph_of(&[
        ("/proj/shared.ts", "", &[]),
        ("/proj/a.ts", "", &["./shared"]),
        ("/proj/b.ts", "", &["./shared"]),
    ]);
    assert!(graph.merge_modules(&TextSyntax::default()).unwrap().is_empty());
    assert_eq!(graph.len(), 3);
}

#[test]
fn mutual_imports_are_not_merged() {
    let graph = graph_of(&[("/proj/a.ts", "", &["./b"]), ("/proj/b.ts", "", &["./a"])]);
    assert!(graph.merge_modules(&TextSyntax::default()).unwrap().is_empty());
}

#[test]
fn reorder_sorts_heaviest_first_and_keeps_ties_topological() {
    let graph = graph_of(&[
        ("/proj/main.ts", "m", &["./big", "./x", "./y"]),
        ("/proj/x.ts", "xx", &[]),
        ("/proj/y.ts", "yy", &[]),
        ("/proj/big.ts", "a much larger module body", &[]),
    ]);

    graph.optimize_module_order(&TextSyntax::default()).unwrap();

    assert_eq!(
        paths(&graph.module_ids()),
        ["/proj/big.ts", "/proj/x.ts", "/proj/y.ts", "/proj/main.ts"]
    );
    // Emission order is still dependency-first.
    assert_eq!(graph.topological_order().last(), Some(&id("/proj/main.ts")));
}

#[test]
fn optimize_graph_runs_all_passes() {
    let graph = graph_of(&[
        ("/proj/leaf.ts", "export const leaf = 1;", &[]),
        ("/proj/entry.ts", "import { leaf } from './leaf';", &["./leaf"]),
        ("/proj/p.ts", "", &["./q"]),
        ("/proj/q.ts", "", &["./p"]),
    ]);

    let report = graph.optimize_graph(&TextSyntax::default()).unwrap();

    assert_eq!(paths(&report.removed), ["/proj/p.ts", "/proj/q.ts"]);
    assert_eq!(
        report.merged,
        vec![(id("/proj/leaf.ts"), id("/proj/entry.ts"))]
    );
    assert_eq!(paths(&graph.module_ids()), ["/proj/entry.ts"]);
}

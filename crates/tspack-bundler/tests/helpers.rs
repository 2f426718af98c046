//! Shared test utilities for tspack-bundler tests

#![allow(dead_code)]

use std::sync::Arc;

use tspack_bundler::{BuildConfig, BuildResult};
use tspack_graph::{Runtime, VirtualRuntime};

pub const A_TS: &str = "import { b } from './b';\n\nconsole.log(b);\n";
pub const B_TS: &str = "export const b: number = 1;\n";

/// A virtual project rooted at `/proj`.
pub fn project(files: &[(&str, &str)]) -> Arc<VirtualRuntime> {
    let runtime = files
        .iter()
        .fold(VirtualRuntime::new("/proj"), |runtime, (path, code)| {
            runtime.file(format!("/proj/{path}"), *code)
        });
    Arc::new(runtime)
}

/// `a.ts` importing `b.ts`.
pub fn two_module_project() -> Arc<VirtualRuntime> {
    project(&[("a.ts", A_TS), ("b.ts", B_TS)])
}

/// Config for the entry `a.ts` inside `/proj`.
pub fn config() -> BuildConfig {
    BuildConfig::new("a.ts").cwd("/proj")
}

pub async fn build(config: &BuildConfig, runtime: Arc<VirtualRuntime>) -> tspack_bundler::Result<BuildResult> {
    let runtime: Arc<dyn Runtime> = runtime;
    tspack_bundler::build_with_runtime(config, runtime).await
}

/// Assert `first` occurs in `code` before `second`.
pub fn assert_before(code: &str, first: &str, second: &str) {
    let a = code
        .find(first)
        .unwrap_or_else(|| panic!("expected '{first}' in:\n{code}"));
    let b = code
        .find(second)
        .unwrap_or_else(|| panic!("expected '{second}' in:\n{code}"));
    assert!(a < b, "expected '{first}' before '{second}' in:\n{code}");
}

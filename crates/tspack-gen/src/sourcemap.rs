//! Source map construction and composition.
//!
//! The generator produces maps at three points: the initial map from
//! fragments to their originating files, the map emitted by the downlevel
//! printer, and the map emitted by the minifier. Each later map points into
//! the code the previous stage produced, so they are chained with
//! [`merge_source_maps`] rather than replaced.

use std::path::Path;

use oxc_sourcemap::{SourceMap, SourceMapBuilder, Token};
use rustc_hash::FxHashMap;
use tspack_graph::{FxIndexMap, Runtime};

use crate::error::{GenError, Result};
use crate::fragment::CodeFragment;

/// Map produced from a fragment list, plus the sources whose text could not
/// be read.
#[derive(Debug)]
pub struct InitialSourceMap {
    pub map: SourceMap,
    /// Sources embedded without content; their `sourcesContent` entry is
    /// emitted as `null` by [`to_json`].
    pub missing_content: Vec<String>,
}

/// Build the map from the code produced by
/// [`merge_code_fragments`](crate::merge_code_fragments) back to each
/// fragment's origin.
///
/// Every positioned fragment contributes one mapping at the point where its
/// code starts in the joined output. Following lines of a multi-line
/// fragment map to the matching original lines at column 0. Source content is
/// embedded from `runtime`; an unreadable source is embedded without content.
pub async fn generate_initial_source_map(
    fragments: &[CodeFragment],
    file: &str,
    runtime: &dyn Runtime,
) -> InitialSourceMap {
    let mut sources: FxIndexMap<&str, Option<String>> = FxIndexMap::default();
    for fragment in fragments {
        if let Some(source) = fragment.source_file.as_deref() {
            sources.entry(source).or_insert(None);
        }
    }

    let mut missing_content = Vec::new();
    for (source, content) in sources.iter_mut() {
        match runtime.read_to_string(Path::new(source)).await {
            Ok(text) => *content = Some(text),
            Err(err) => {
                tracing::debug!(source = %source, error = %err, "source content unavailable");
                missing_content.push((*source).to_string());
            }
        }
    }

    let mut builder = SourceMapBuilder::default();
    builder.set_file(file);
    let mut source_ids: FxHashMap<&str, u32> = FxHashMap::default();
    for (source, content) in &sources {
        let id = builder.add_source_and_content(source, content.as_deref().unwrap_or(""));
        source_ids.insert(*source, id);
    }

    let mut line = 0u32;
    let mut column = 0u32;
    let mut first = true;
    for fragment in fragments.iter().filter(|fragment| !fragment.code.is_empty()) {
        if !first {
            line += 1;
            column = 0;
        }
        first = false;

        let origin = match (fragment.line, fragment.column, fragment.source_file.as_deref()) {
            (Some(src_line), Some(src_col), Some(source)) => source_ids
                .get(source)
                .map(|id| (*id, src_line.saturating_sub(1), src_col.saturating_sub(1))),
            _ => None,
        };

        let mut lines = fragment.code.split('\n');
        let head = lines.next().unwrap_or("");
        if let Some((id, src_line, src_col)) = origin {
            builder.add_token(line, column, src_line, src_col, Some(id), None);
        }
        column += utf16_len(head);

        for (offset, rest) in lines.enumerate() {
            line += 1;
            if let Some((id, src_line, _)) = origin {
                builder.add_token(line, 0, src_line + offset as u32 + 1, 0, Some(id), None);
            }
            column = utf16_len(rest);
        }
    }

    InitialSourceMap {
        map: builder.into_sourcemap(),
        missing_content,
    }
}

/// Compose two maps: `new` maps generated code to an intermediate text and
/// `old` maps that intermediate text to the originals.
///
/// Each mapping of `new` is followed into `old` through the nearest preceding
/// mapping on the same intermediate line. Mappings with no counterpart are
/// dropped. Sources, content and names come from `old`; `file` comes from
/// `new` when it has one.
pub fn merge_source_maps(old: &SourceMap, new: &SourceMap) -> SourceMap {
    let lookup = LineLookup::new(old);
    let mut builder = SourceMapBuilder::default();
    if let Some(file) = new.get_file().or(old.get_file()) {
        builder.set_file(&file.to_string());
    }

    let mut sources: FxHashMap<u32, u32> = FxHashMap::default();
    let mut names: FxHashMap<String, u32> = FxHashMap::default();

    for token in new.get_tokens() {
        if token.get_source_id().is_none() {
            continue;
        }
        let Some(origin) = lookup.find(token.get_src_line(), token.get_src_col()) else {
            continue;
        };
        let Some(old_source) = origin.get_source_id() else {
            continue;
        };

        let source_id = *sources.entry(old_source).or_insert_with(|| {
            builder.add_source_and_content(
                old.get_source(old_source).map(|source| &**source).unwrap_or_default(),
                old.get_source_content(old_source).map(|content| &**content).unwrap_or_default(),
            )
        });

        let name = origin
            .get_name_id()
            .and_then(|id| old.get_name(id))
            .or_else(|| token.get_name_id().and_then(|id| new.get_name(id)));
        let name_id = name.map(|name| {
            *names
                .entry(name.to_string())
                .or_insert_with(|| builder.add_name(name))
        });

        builder.add_token(
            token.get_dst_line(),
            token.get_dst_col(),
            origin.get_src_line(),
            origin.get_src_col(),
            Some(source_id),
            name_id,
        );
    }

    builder.into_sourcemap()
}

/// Move every mapping down by `lines` generated lines, for code that gained a
/// prologue after the map was produced.
pub fn shift_lines(map: &SourceMap, lines: u32) -> SourceMap {
    if lines == 0 {
        return map.clone();
    }

    let mut builder = SourceMapBuilder::default();
    if let Some(file) = map.get_file() {
        builder.set_file(&file.to_string());
    }
    let mut sources: FxHashMap<u32, u32> = FxHashMap::default();
    let mut names: FxHashMap<u32, u32> = FxHashMap::default();

    for token in map.get_tokens() {
        let source_id = token.get_source_id().map(|id| {
            *sources.entry(id).or_insert_with(|| {
                builder.add_source_and_content(
                    map.get_source(id).map(|source| &**source).unwrap_or_default(),
                    map.get_source_content(id).map(|content| &**content).unwrap_or_default(),
                )
            })
        });
        let name_id = token.get_name_id().and_then(|id| {
            let name = map.get_name(id)?;
            Some(*names.entry(id).or_insert_with(|| builder.add_name(name)))
        });
        builder.add_token(
            token.get_dst_line() + lines,
            token.get_dst_col(),
            token.get_src_line(),
            token.get_src_col(),
            source_id,
            name_id,
        );
    }

    builder.into_sourcemap()
}

/// Parse a JSON source map.
pub fn from_json(json: &str) -> Result<SourceMap> {
    SourceMap::from_json_string(json).map_err(|err| GenError::SourceMap(format!("{err:?}")))
}

/// Serialize `map`, writing `null` as the content of every source listed in
/// `missing_content`.
pub fn to_json(map: &SourceMap, missing_content: &[String]) -> Result<String> {
    let json = map.to_json_string();
    if missing_content.is_empty() {
        return Ok(json);
    }

    let mut value: serde_json::Value =
        serde_json::from_str(&json).map_err(|err| GenError::SourceMap(err.to_string()))?;
    let sources: Vec<String> = value
        .get("sources")
        .and_then(|sources| sources.as_array())
        .map(|sources| {
            sources
                .iter()
                .map(|source| source.as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default();

    if let Some(contents) = value
        .get_mut("sourcesContent")
        .and_then(|contents| contents.as_array_mut())
    {
        for (source, content) in sources.iter().zip(contents.iter_mut()) {
            if missing_content.iter().any(|missing| missing == source) {
                *content = serde_json::Value::Null;
            }
        }
    }

    serde_json::to_string(&value).map_err(|err| GenError::SourceMap(err.to_string()))
}

/// Tokens of one map bucketed by generated line for positional lookup.
struct LineLookup {
    lines: Vec<Vec<Token>>,
}

impl LineLookup {
    fn new(map: &SourceMap) -> Self {
        let mut lines: Vec<Vec<Token>> = Vec::new();
        for token in map.get_tokens() {
            let line = token.get_dst_line() as usize;
            if lines.len() <= line {
                lines.resize_with(line + 1, Vec::new);
            }
            lines[line].push(token);
        }
        for tokens in &mut lines {
            tokens.sort_by_key(|token| token.get_dst_col());
        }
        Self { lines }
    }

    fn find(&self, line: u32, column: u32) -> Option<Token> {
        let tokens = self.lines.get(line as usize)?;
        let index = tokens.partition_point(|token| token.get_dst_col() <= column);
        index.checked_sub(1).map(|index| tokens[index])
    }
}

fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::merge_code_fragments;
    use tspack_graph::VirtualRuntime;

    fn fragment(code: &str, line: u32, column: u32, file: &str) -> CodeFragment {
        CodeFragment {
            code: code.to_string(),
            line: Some(line),
            column: Some(column),
            source_file: Some(file.to_string()),
        }
    }

    fn positions(map: &SourceMap) -> Vec<(u32, u32, u32, u32)> {
        map.get_tokens()
            .map(|t| (t.get_dst_line(), t.get_dst_col(), t.get_src_line(), t.get_src_col()))
            .collect()
    }

    #[tokio::test]
    async fn initial_map_tracks_fragment_starts() {
        let runtime = VirtualRuntime::new("/proj")
            .file("/proj/a.ts", "const a = 1;\n\nfunction f() {\n  return a;\n}\n");
        let fragments = vec![
            fragment("const a = 1;", 1, 1, "/proj/a.ts"),
            CodeFragment::synthetic(""),
            fragment("function f() {\n  return a;\n}", 3, 1, "/proj/a.ts"),
        ];
        assert_eq!(
            merge_code_fragments(&fragments),
            "const a = 1;\nfunction f() {\n  return a;\n}"
        );

        let initial = generate_initial_source_map(&fragments, "out.js", &runtime).await;
        assert!(initial.missing_content.is_empty());
        assert_eq!(
            positions(&initial.map),
            vec![(0, 0, 0, 0), (1, 0, 2, 0), (2, 0, 3, 0), (3, 0, 4, 0)]
        );
        assert_eq!(initial.map.get_source(0).map(|s| &**s), Some("/proj/a.ts"));
        assert!(initial.map.get_source_content(0).unwrap().starts_with("const a"));
    }

    #[tokio::test]
    async fn unreadable_sources_are_emitted_without_content() {
        let runtime = VirtualRuntime::new("/proj").file("/proj/a.ts", "let a;");
        let fragments = vec![
            fragment("let a;", 1, 1, "/proj/a.ts"),
            fragment("let b;", 1, 1, "/proj/gone.ts"),
        ];

        let initial = generate_initial_source_map(&fragments, "out.js", &runtime).await;
        assert_eq!(initial.missing_content, vec!["/proj/gone.ts".to_string()]);

        let json = to_json(&initial.map, &initial.missing_content).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["sourcesContent"][0], "let a;");
        assert!(value["sourcesContent"][1].is_null());
    }

    #[test]
    fn composition_follows_the_nearest_preceding_mapping() {
        // intermediate -> original
        let mut old = SourceMapBuilder::default();
        let src = old.add_source_and_content("/proj/a.ts", "original");
        old.add_token(0, 0, 10, 4, Some(src), None);
        old.add_token(0, 8, 11, 2, Some(src), None);
        old.add_token(2, 0, 20, 0, Some(src), None);
        let old = old.into_sourcemap();

        // generated -> intermediate
        let mut new = SourceMapBuilder::default();
        let mid = new.add_source_and_content("bundle.ts", "");
        new.add_token(0, 0, 0, 3, Some(mid), None);
        new.add_token(0, 5, 0, 9, Some(mid), None);
        new.add_token(1, 0, 1, 0, Some(mid), None);
        new.add_token(1, 7, 2, 1, Some(mid), None);
        let new = new.into_sourcemap();

        let composed = merge_source_maps(&old, &new);
        assert_eq!(
            positions(&composed),
            vec![(0, 0, 10, 4), (0, 5, 11, 2), (1, 7, 20, 0)]
        );
        assert_eq!(composed.get_source(0).map(|s| &**s), Some("/proj/a.ts"));
        assert_eq!(composed.get_source_content(0).map(|s| &**s), Some("original"));
    }

    #[test]
    fn shifting_moves_generated_lines_only() {
        let mut builder = SourceMapBuilder::default();
        let src = builder.add_source_and_content("/a.ts", "x");
        builder.add_token(0, 2, 5, 1, Some(src), None);
        let shifted = shift_lines(&builder.into_sourcemap(), 3);
        assert_eq!(positions(&shifted), vec![(3, 2, 5, 1)]);
    }

    #[test]
    fn json_round_trip_keeps_mappings() {
        let mut builder = SourceMapBuilder::default();
        let src = builder.add_source_and_content("/a.ts", "let a = 1;");
        builder.add_token(0, 0, 0, 0, Some(src), None);
        builder.add_token(1, 4, 0, 4, Some(src), None);
        let map = builder.into_sourcemap();

        let parsed = from_json(&to_json(&map, &[]).unwrap()).unwrap();
        assert_eq!(positions(&parsed), positions(&map));
    }
}

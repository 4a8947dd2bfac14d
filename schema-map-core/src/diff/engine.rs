use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::diff::result::DiffEntry;
use crate::schema::{FieldKind, FieldSpec, SchemaTable};
use crate::value::{LocalObject, LocalValue};

const SENSITIVE_MASK: &str = "(sensitive)";

/// Configures local-object diff behavior.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Include [`DiffEntry::Identical`] rows for unchanged leaf fields.
    pub include_identical: bool,
    /// Maximum nested block depth. `-1` means unlimited.
    pub max_depth: i32,
    /// Field paths or field names to ignore.
    pub ignore_paths: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            include_identical: false,
            max_depth: -1,
            ignore_paths: Vec::new(),
        }
    }
}

/// Diff two local objects of the same schema with default options.
pub fn diff(before: &LocalObject, after: &LocalObject, table: &SchemaTable) -> Vec<DiffEntry> {
    diff_with_options(before, after, table, &DiffOptions::default())
}

/// Diff two local objects of the same schema.
///
/// `BlockSet` entries are matched by identity value (`member[web01]`),
/// `Block` entries by position (`rule[2]`). Sensitive values are masked.
pub fn diff_with_options(
    before: &LocalObject,
    after: &LocalObject,
    table: &SchemaTable,
    opts: &DiffOptions,
) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    diff_object(before, after, table, "", 0, opts, &mut out);
    out
}

fn diff_object(
    before: &LocalObject,
    after: &LocalObject,
    table: &SchemaTable,
    path: &str,
    depth: i32,
    opts: &DiffOptions,
    out: &mut Vec<DiffEntry>,
) {
    if opts.max_depth >= 0 && depth > opts.max_depth {
        return;
    }

    for field in table {
        let child_path = join_path(path, &field.local_name);
        if should_ignore(&child_path, opts) {
            continue;
        }

        match (before.get(&field.local_name), after.get(&field.local_name)) {
            (None, None) => {}
            (Some(left), None) => out.push(DiffEntry::Removed {
                path: child_path,
                value: masked(left, field),
            }),
            (None, Some(right)) => out.push(DiffEntry::Added {
                path: child_path,
                value: masked(right, field),
            }),
            (Some(left), Some(right)) => {
                diff_field(field, left, right, &child_path, depth, opts, out)
            }
        }
    }
}

struct MatchContext<'a, 'b> {
    parent_path: &'a str,
    nested: &'a SchemaTable,
    depth: i32,
    opts: &'a DiffOptions,
    out: &'b mut Vec<DiffEntry>,
}

fn diff_field(
    field: &FieldSpec,
    left: &LocalValue,
    right: &LocalValue,
    path: &str,
    depth: i32,
    opts: &DiffOptions,
    out: &mut Vec<DiffEntry>,
) {
    if let (Some(nested), LocalValue::Blocks(left_entries), LocalValue::Blocks(right_entries)) =
        (field.nested.as_ref(), left, right)
    {
        let mut ctx = MatchContext {
            parent_path: path,
            nested,
            depth,
            opts,
            out,
        };
        match (field.kind, field.identity_key.as_deref()) {
            (FieldKind::BlockSet, Some(key)) => {
                match_by_key(key, left_entries, right_entries, &mut ctx)
            }
            _ => match_by_index(left_entries, right_entries, &mut ctx),
        }
        return;
    }

    if left == right {
        if opts.include_identical {
            out.push(DiffEntry::Identical {
                path: path.to_string(),
            });
        }
        return;
    }

    out.push(DiffEntry::Modified {
        path: path.to_string(),
        before: masked(left, field),
        after: masked(right, field),
    });
}

fn match_by_index(left: &[LocalObject], right: &[LocalObject], ctx: &mut MatchContext<'_, '_>) {
    let max = left.len().max(right.len());
    for i in 0..max {
        let child_path = format!("{}[{}]", ctx.parent_path, i + 1);
        match (left.get(i), right.get(i)) {
            (Some(l), Some(r)) => diff_object(
                l,
                r,
                ctx.nested,
                &child_path,
                ctx.depth + 1,
                ctx.opts,
                ctx.out,
            ),
            (Some(l), None) => ctx.out.push(DiffEntry::Removed {
                path: child_path,
                value: masked_object(l, ctx.nested),
            }),
            (None, Some(r)) => ctx.out.push(DiffEntry::Added {
                path: child_path,
                value: masked_object(r, ctx.nested),
            }),
            (None, None) => {}
        }
    }
}

fn match_by_key(
    key_field: &str,
    left: &[LocalObject],
    right: &[LocalObject],
    ctx: &mut MatchContext<'_, '_>,
) {
    let right_keys: Vec<Option<String>> = right
        .iter()
        .map(|n| n.scalar(key_field).map(ToString::to_string))
        .collect();

    let mut used_right = HashSet::new();

    for (left_idx, left_node) in left.iter().enumerate() {
        let left_key = left_node.scalar(key_field).map(ToString::to_string);
        let child_path = entry_path(ctx.parent_path, left_key.as_deref(), left_idx);

        let matched_right = left_key.as_ref().and_then(|left_key_val| {
            right_keys.iter().enumerate().find_map(|(idx, right_key)| {
                if !used_right.contains(&idx) && right_key.as_ref() == Some(left_key_val) {
                    Some(idx)
                } else {
                    None
                }
            })
        });

        if let Some(right_idx) = matched_right {
            used_right.insert(right_idx);
            diff_object(
                left_node,
                &right[right_idx],
                ctx.nested,
                &child_path,
                ctx.depth + 1,
                ctx.opts,
                ctx.out,
            );
        } else {
            ctx.out.push(DiffEntry::Removed {
                path: child_path,
                value: masked_object(left_node, ctx.nested),
            });
        }
    }

    for (right_idx, right_node) in right.iter().enumerate() {
        if used_right.contains(&right_idx) {
            continue;
        }
        let child_path = entry_path(ctx.parent_path, right_keys[right_idx].as_deref(), right_idx);
        ctx.out.push(DiffEntry::Added {
            path: child_path,
            value: masked_object(right_node, ctx.nested),
        });
    }
}

fn entry_path(parent: &str, key: Option<&str>, idx: usize) -> String {
    match key {
        Some(key) => format!("{parent}[{key}]"),
        None => format!("{parent}[{}]", idx + 1),
    }
}

fn masked(value: &LocalValue, field: &FieldSpec) -> Value {
    if field.sensitive {
        return Value::String(SENSITIVE_MASK.to_string());
    }
    match (value, field.nested.as_ref()) {
        (LocalValue::Blocks(entries), Some(nested)) => Value::Array(
            entries
                .iter()
                .map(|entry| masked_object(entry, nested))
                .collect(),
        ),
        _ => serde_json::to_value(value).unwrap_or(Value::Null),
    }
}

fn masked_object(obj: &LocalObject, table: &SchemaTable) -> Value {
    let mut out = Map::new();
    for (name, value) in obj.iter() {
        let rendered = match table.field(name) {
            Some(field) => masked(value, field),
            None => serde_json::to_value(value).unwrap_or(Value::Null),
        };
        out.insert(name.to_string(), rendered);
    }
    Value::Object(out)
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn should_ignore(path: &str, opts: &DiffOptions) -> bool {
    opts.ignore_paths.iter().any(|ignore| {
        path == ignore
            || path.ends_with(&format!(".{ignore}"))
            || path.starts_with(&format!("{ignore}["))
            || path.contains(&format!(".{ignore}["))
    })
}

use schema_map_core::{FieldKind, FieldSpec, SchemaTable};

/// Render a schema table as an indented tree with a configurable max depth.
///
/// Each line shows `local <- remote`, the shape and any flags:
///
/// ```text
/// member <- member  block_set key=name
///   name <- name  string
/// ```
pub fn render_schema(table: &SchemaTable, max_depth: usize) -> String {
    let mut out = String::new();
    render_table(table, 0, max_depth, &mut out);
    out
}

fn render_table(table: &SchemaTable, depth: usize, max_depth: usize, out: &mut String) {
    for field in table {
        render_field(field, depth, max_depth, out);
    }
}

fn render_field(field: &FieldSpec, depth: usize, max_depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!(
        "{indent}{} <- {}  {}\n",
        field.local_name,
        field.remote_name,
        describe(field)
    ));

    if depth >= max_depth {
        return;
    }
    if let Some(nested) = &field.nested {
        render_table(nested, depth + 1, max_depth, out);
    }
}

fn describe(field: &FieldSpec) -> String {
    let mut parts = vec![match field.kind {
        FieldKind::Scalar => field.scalar_type.to_string(),
        FieldKind::ScalarList => format!("list<{}>", field.scalar_type),
        FieldKind::Block => "block".to_string(),
        FieldKind::BlockSet => "block_set".to_string(),
    }];
    if let Some(key) = &field.identity_key {
        parts.push(format!("key={key}"));
    }
    if field.sensitive {
        parts.push("sensitive".to_string());
    }
    if field.omit_when_absent {
        parts.push("omit_when_absent".to_string());
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use schema_map_core::{FieldSpec, ScalarType, SchemaTable};

    use super::render_schema;

    #[test]
    fn renders_nested_fields_up_to_depth() {
        let table = SchemaTable::new(vec![
            FieldSpec::scalar("passwd", "passwd", ScalarType::String).sensitive(),
            FieldSpec::block(
                "ipv4_exclude_range",
                "ipv4-exclude-range",
                "id",
                SchemaTable::new(vec![FieldSpec::scalar("id", "id", ScalarType::Integer)]),
            ),
        ]);

        assert_eq!(
            render_schema(&table, 1),
            "passwd <- passwd  string sensitive\n\
             ipv4_exclude_range <- ipv4-exclude-range  block key=id\n\
             \x20 id <- id  integer\n"
        );
        assert!(!render_schema(&table, 0).contains("  id <- id"));
    }
}

use colored::Colorize;
use schema_map_core::{format_summary, format_text, DiffEntry};

use crate::resource::{Plan, PlanAction};

/// Render diff entries for terminal output.
pub fn render_text(entries: &[DiffEntry]) -> String {
    let raw = format_text(entries);
    let mut out = Vec::new();

    for line in raw.lines() {
        let colored = if line.starts_with('+') {
            line.green().to_string()
        } else if line.starts_with('-') {
            line.red().to_string()
        } else if line.starts_with('~') {
            line.yellow().to_string()
        } else {
            line.to_string()
        };
        out.push(colored);
    }

    out.join("\n")
}

/// Render summary counts for terminal output.
pub fn render_summary(entries: &[DiffEntry]) -> String {
    format_summary(entries).cyan().to_string()
}

/// Header line, changes, then counts.
pub fn render_plan(plan: &Plan) -> String {
    let action = match plan.action {
        PlanAction::Create => "create".green().bold(),
        PlanAction::Update => "update".yellow().bold(),
        PlanAction::NoOp => "no changes".normal(),
    };
    let mut out = vec![format!("{} {} [{}]", action, plan.resource_type, plan.id)];
    if !plan.entries.is_empty() {
        out.push(render_text(&plan.entries));
    }
    out.push(render_summary(&plan.entries));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use schema_map_core::DiffEntry;
    use serde_json::json;

    use super::render_plan;
    use crate::resource::{Plan, PlanAction};

    #[test]
    fn plan_lists_header_changes_and_counts() {
        colored::control::set_override(false);
        let plan = Plan {
            resource_type: "firewall_addrgrp".to_string(),
            id: "web".to_string(),
            action: PlanAction::Update,
            entries: vec![DiffEntry::Removed {
                path: "member[a]".to_string(),
                value: json!({"name": "a"}),
            }],
        };

        assert_eq!(
            render_plan(&plan),
            "update firewall_addrgrp [web]\n\
             - member[a] = {\"name\":\"a\"}\n\
             identical=0 modified=0 added=0 removed=1"
        );
    }
}

//! Output formatting for the kanban board and the timeline strip.

use crate::ledger::format_duration;
use crate::membership::Plan;
use crate::scheduler::Timeline;
use crate::types::{ColumnSummary, KanbanColumn, Task, TaskGroup, Tokens};
use serde::Serialize;
use std::str::FromStr;

/// Output format for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

/// Serialize any value as pretty JSON for the `json` output format.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// `token` or `tokens` with the amount.
pub fn format_tokens(tokens: Tokens) -> String {
    let unit = if tokens == 1.0 { "token" } else { "tokens" };
    format!("{} {}", tokens, unit)
}

/// Card label for a task's effort: `Free` for zero, else duration and tokens.
pub fn task_effort_label(tokens: Tokens) -> String {
    if tokens == 0.0 {
        "Free".to_string()
    } else {
        format!("{} ({})", format_duration(tokens), format_tokens(tokens))
    }
}

/// Task groups with their cached totals, as markdown.
pub fn format_groups_markdown(groups: &[TaskGroup]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Task Groups ({})\n\n", groups.len()));
    for group in groups {
        md.push_str(&format!(
            "## {}\n- **id**: `{}`\n- **total**: {} ({})\n",
            group.title,
            group.id,
            format_duration(group.total_tokens),
            format_tokens(group.total_tokens)
        ));
        if group.tasks.is_empty() {
            md.push_str("\n_No tasks yet_\n\n");
            continue;
        }
        md.push('\n');
        for task in &group.tasks {
            md.push_str(&format_task_short(task));
        }
        md.push('\n');
    }

    md
}

/// One-line task entry.
pub fn format_task_short(task: &Task) -> String {
    let mut line = format!(
        "- `{}` {}: {} [{}]",
        task.id,
        task.title,
        task_effort_label(task.tokens),
        task.column
    );
    if let Some(ref agent) = task.assigned_agent_id {
        line.push_str(&format!(" @{}", agent));
    }
    line.push('\n');
    line
}

/// The kanban board: one section per column with a token footer.
pub fn format_board_markdown(columns: &[(ColumnSummary, Vec<Task>)]) -> String {
    let mut md = String::from("# Kanban Board\n\n");

    for (summary, tasks) in columns {
        md.push_str(&format!(
            "## {} ({})\n\n",
            summary.column.label(),
            summary.task_count
        ));
        if tasks.is_empty() {
            md.push_str("_No tasks_\n");
        } else {
            for task in tasks {
                md.push_str(&format!(
                    "- `{}` {}: {}\n",
                    task.id,
                    task.title,
                    task_effort_label(task.tokens)
                ));
            }
        }
        md.push_str(&format!("\n**{} tokens**\n\n", summary.total_tokens));
    }

    md
}

/// Gantt strip over the first `visible_days` days of the timeline.
///
/// Bars show `{duration}d` on their first cell and `#` on the rest. Empty
/// weekend cells render as `.`.
pub fn format_timeline_markdown(timeline: &Timeline, visible_days: usize) -> String {
    let mut md = format!("# Timeline from {}\n\n", timeline.horizon);

    if timeline.is_empty() {
        md.push_str("No approved tasks to display\n");
        md.push_str("Approve tasks on the kanban board to see them here\n");
        return md;
    }

    let days = timeline.days(visible_days);

    md.push_str("| Task |");
    for day in &days {
        md.push_str(&format!(" {} |", day.date.format("%d %b")));
    }
    md.push_str("\n|---|");
    for _ in &days {
        md.push_str("---|");
    }
    md.push('\n');

    for task in &timeline.tasks {
        md.push_str(&format!(
            "| {} ({}, {}) |",
            task.title,
            format_duration(task.tokens),
            format_tokens(task.tokens)
        ));
        for day in &days {
            let cell = if day.offset == task.start_day {
                format!("{}d", task.duration)
            } else if task.covers(day.offset) {
                "#".to_string()
            } else if day.weekend {
                ".".to_string()
            } else {
                String::new()
            };
            md.push_str(&format!(" {} |", cell));
        }
        md.push('\n');
    }

    md
}

/// Membership plans as markdown.
pub fn format_plans_markdown(plans: &[Plan]) -> String {
    let mut md = String::from("# Membership Plans\n\n");

    for plan in plans {
        let popular = if plan.popular { " (popular)" } else { "" };
        md.push_str(&format!(
            "## {}{}: {}/month\n{}\n\n",
            plan.title,
            popular,
            plan.price_label(),
            plan.description
        ));
        for feature in &plan.features {
            md.push_str(&format!("- {}\n", feature));
        }
        md.push('\n');
    }

    md
}

/// Column label used when listing a single column.
pub fn format_column_markdown(column: KanbanColumn, tasks: &[Task]) -> String {
    let mut md = format!("## {} ({})\n\n", column.label(), tasks.len());
    for task in tasks {
        md.push_str(&format_task_short(task));
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{CapacityRule, Scheduler};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn approved_task(id: &str, tokens: Tokens, minute: u32) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {}", id),
            tokens,
            parent_id: "g".to_string(),
            column: KanbanColumn::Approved,
            requested_by: "client".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 10, 12, 8, 0, 0).unwrap(),
            approved_at: Some(Utc.with_ymd_and_hms(2026, 10, 12, 9, minute, 0).unwrap()),
            assigned_agent_id: None,
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("md".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_task_effort_label() {
        assert_eq!(task_effort_label(0.0), "Free");
        assert_eq!(task_effort_label(1.0), "30 min (1 token)");
        assert_eq!(task_effort_label(3.0), "1 hr 30 min (3 tokens)");
        assert_eq!(task_effort_label(0.5), "15 min (0.5 tokens)");
    }

    #[test]
    fn test_format_task_short() {
        let mut task = approved_task("t1", 1.0, 0);
        task.title = "Logo".to_string();
        assert_eq!(format_task_short(&task), "- `t1` Logo: 30 min (1 token) [approved]\n");

        task.tokens = 0.0;
        task.assigned_agent_id = Some("sarah".to_string());
        assert_eq!(format_task_short(&task), "- `t1` Logo: Free [approved] @sarah\n");
    }

    #[test]
    fn test_empty_timeline_message() {
        let timeline = Scheduler::new(NaiveDate::from_ymd_opt(2026, 10, 12).unwrap(), CapacityRule::default())
            .build(&[]);
        let md = format_timeline_markdown(&timeline, 14);
        assert!(md.contains("No approved tasks to display"));
    }

    #[test]
    fn test_timeline_strip_marks_bar_cells() {
        // Friday horizon: a three-day task spans Fri, Mon, Tue.
        let horizon = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let timeline = Scheduler::new(horizon, CapacityRule::default())
            .build(&[approved_task("a", 10.0, 0)]);
        let md = format_timeline_markdown(&timeline, 6);
        let row = md.lines().find(|l| l.starts_with("| Task a")).unwrap();
        let cells: Vec<&str> = row.split('|').map(str::trim).collect();

        // cells[0] is empty (leading pipe), cells[1] is the label.
        assert_eq!(&cells[2..8], &["3d", "#", "#", "#", "#", ""]);
    }

    #[test]
    fn test_board_markdown_lists_columns() {
        let summary = ColumnSummary {
            column: KanbanColumn::Approved,
            task_count: 1,
            total_tokens: 2.0,
        };
        let md = format_board_markdown(&[(summary, vec![approved_task("a", 2.0, 0)])]);
        assert!(md.contains("## Approved (1)"));
        assert!(md.contains("1 hr (2 tokens)"));
        assert!(md.contains("**2 tokens**"));
    }
}

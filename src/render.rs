//! Text and JSON rendering of results, errors and traces.

use serde::Serialize;

use querylens_core::{QueryError, SourceRange, Table, TraceStep, Value};

use crate::config::OutputFormat;
use crate::session::{Outcome, SessionError};

/// Render a table as aligned text columns followed by a row count.
///
/// Nulls print as `null` and empty strings as `""` so both stay visible.
/// At most `max_rows` rows are printed.
pub fn render_table(table: &Table, max_rows: usize) -> String {
    if table.is_empty() {
        return format!("No result\n{}\n", row_count(table.row_count()));
    }

    let header: Vec<String> = table
        .fields()
        .iter()
        .map(|field| field.display_name().to_string())
        .collect();
    let shown = table.rows().iter().take(max_rows);
    let cells: Vec<Vec<(String, bool)>> = shown
        .map(|row| row.iter().map(|value| (display_cell(value), value.as_number().is_some())).collect())
        .collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(index, name)| {
            cells
                .iter()
                .map(|row| row[index].0.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header_line: Vec<String> = header
        .iter()
        .zip(&widths)
        .map(|(name, width)| pad_right(name, *width))
        .collect();
    out.push_str(header_line.join(" | ").trim_end());
    out.push('\n');

    let separator: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    out.push_str(&separator.join("-+-"));
    out.push('\n');

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|((text, numeric), width)| {
                if *numeric {
                    pad_left(text, *width)
                } else {
                    pad_right(text, *width)
                }
            })
            .collect();
        out.push_str(line.join(" | ").trim_end());
        out.push('\n');
    }

    if table.row_count() > max_rows {
        out.push_str(&format!(
            "... {} / {}\n",
            max_rows,
            row_count(table.row_count())
        ));
    } else {
        out.push_str(&row_count(table.row_count()));
        out.push('\n');
    }
    out
}

fn display_cell(value: &Value) -> String {
    match value {
        Value::String(s) if s.is_empty() => "\"\"".to_string(),
        other => other.to_string(),
    }
}

fn pad_right(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}

fn pad_left(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", " ".repeat(width.saturating_sub(len)), text)
}

pub fn row_count(count: usize) -> String {
    format!("{} row{}", count, if count == 1 { "" } else { "s" })
}

/// The line of `source` containing the error, underlined, then the message.
pub fn render_error(source: &str, error: &QueryError) -> String {
    let start = floor_char_boundary(source, error.range.start);
    let end = floor_char_boundary(source, error.range.end.max(error.range.start));

    let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = source[start..]
        .find('\n')
        .map(|i| start + i)
        .unwrap_or(source.len());
    let line = &source[line_start..line_end];

    let column = source[line_start..start].chars().count();
    let width = source[start..end.min(line_end).max(start)].chars().count().max(1);

    format!(
        "{}\n{}{} {}\n",
        line,
        " ".repeat(column),
        "^".repeat(width),
        error.message
    )
}

fn floor_char_boundary(source: &str, index: usize) -> usize {
    let mut index = index.min(source.len());
    while !source.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Render trace steps as an indented tree. Each step shows its name, the
/// source it belongs to and the row counts before and after.
pub fn render_trace(source: &str, steps: &[TraceStep]) -> String {
    let mut out = String::new();
    for step in steps {
        render_step(&mut out, source, step, 0);
    }
    out
}

fn render_step(out: &mut String, source: &str, step: &TraceStep, depth: usize) {
    let snippet = snippet(source, step.range);
    let rows = match (&step.before, &step.after) {
        (Some(before), Some(after)) => format!("{} -> {}", before.row_count(), row_count(after.row_count())),
        (None, Some(after)) => row_count(after.row_count()),
        (_, None) => "failed".to_string(),
    };
    out.push_str(&format!(
        "{}{} `{}` ({})\n",
        "  ".repeat(depth),
        step.name,
        snippet,
        rows
    ));
    for child in &step.steps {
        render_step(out, source, child, depth + 1);
    }
}

fn snippet(source: &str, range: SourceRange) -> String {
    let start = floor_char_boundary(source, range.start);
    let end = floor_char_boundary(source, range.end).max(start);
    let collapsed = source[start..end].split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > 48 {
        let short: String = collapsed.chars().take(45).collect();
        format!("{}...", short)
    } else {
        collapsed
    }
}

#[derive(Serialize)]
struct JsonTable<'t> {
    fields: Vec<&'t str>,
    rows: &'t [Vec<Value>],
}

/// A table as `{"fields": [...], "rows": [[...], ...]}`.
pub fn table_to_json(table: &Table) -> serde_json::Value {
    let json = JsonTable {
        fields: table.fields().iter().map(|field| field.display_name()).collect(),
        rows: table.rows(),
    };
    serde_json::to_value(json).unwrap_or(serde_json::Value::Null)
}

pub fn render_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|err| format!("{{\"error\": \"{}\"}}", err))
}

/// Render the outcome of a statement in the requested format.
pub fn render_outcome(source: &str, outcome: &Outcome, format: OutputFormat, max_rows: usize) -> String {
    match (outcome, format) {
        (Outcome::Table(table), OutputFormat::Table) => render_table(table, max_rows),
        (Outcome::Table(table), OutputFormat::Json) => {
            format!("{}\n", render_json(&table_to_json(table)))
        }
        (Outcome::Traced { table, steps }, OutputFormat::Table) => {
            format!("{}\n{}", render_trace(source, steps), render_table(table, max_rows))
        }
        (Outcome::Traced { table, steps }, OutputFormat::Json) => {
            let json = serde_json::json!({
                "result": table_to_json(table),
                "steps": steps,
            });
            format!("{}\n", render_json(&json))
        }
        (Outcome::Switched(name), _) => format!("Using database '{}'\n", name),
        (Outcome::Loaded(names), _) if names.is_empty() => "No databases found\n".to_string(),
        (Outcome::Loaded(names), _) => format!("Loaded {}\n", names.join(", ")),
        (Outcome::CacheCleared, _) => "Cache cleared\n".to_string(),
        (Outcome::Saved(path), _) => format!("Saved to {}\n", path.display()),
    }
}

/// Query errors are shown against their source line, other errors as text.
pub fn render_session_error(source: &str, error: &SessionError) -> String {
    match error {
        SessionError::Query(error) => render_error(source, error),
        other => format!("{}\n", other),
    }
}

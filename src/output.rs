//! Plain-text rendering of store state for the command line.

use std::fmt::Write as _;

use serde_json::{Map, Value, json};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::error_log::ErrorLog;
use crate::domain::{
    ColumnDescriptor, Filter, FilterPredicate, ForeignTableView, Row, SortOrder, TableContent,
    TableSummary,
};

const MAX_CELL_WIDTH: usize = 40;
const ELLIPSIS: char = '…';
const NULL_TEXT: &str = "NULL";

fn display_rows(rows: &[Row]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.clone().unwrap_or_else(|| NULL_TEXT.to_string()))
                .collect()
        })
        .collect()
}

/// Escapes line breaks and cuts the cell to `MAX_CELL_WIDTH` display columns.
fn cell_text(value: &str) -> String {
    let flat = value.replace('\r', "").replace('\n', "\\n");
    if flat.width() <= MAX_CELL_WIDTH {
        return flat;
    }
    let mut out = String::new();
    let mut width = 0;
    for c in flat.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > MAX_CELL_WIDTH - 1 {
            break;
        }
        width += w;
        out.push(c);
    }
    out.push(ELLIPSIS);
    out
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

/// Trailing empty cells are dropped so lines carry no dangling separators.
fn join_line(cells: &[String], widths: &[usize]) -> String {
    let used = cells
        .iter()
        .rposition(|c| !c.is_empty())
        .map_or(0, |i| i + 1);
    let line = cells[..used]
        .iter()
        .zip(widths)
        .map(|(cell, &w)| pad(cell, w))
        .collect::<Vec<_>>()
        .join(" | ");
    line.trim_end().to_string()
}

/// Aligned grid with a header separator. Widths follow display columns, so
/// CJK text lines up.
pub fn render_grid(headers: &[String], rows: &[Vec<String>]) -> String {
    let headers: Vec<String> = headers.iter().map(|h| cell_text(h)).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|c| cell_text(c)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.width());
            }
        }
    }

    let mut out = String::new();
    out.push_str(&join_line(&headers, &widths));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &rows {
        out.push('\n');
        out.push_str(&join_line(row, &widths));
    }
    out
}

fn describe_order(order: &[SortOrder]) -> String {
    order
        .iter()
        .map(|o| format!("{} {}", o.column, o.direction.as_sql()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_filter(filter: &Filter) -> String {
    let column = &filter.column;
    match &filter.predicate {
        FilterPredicate::Equals(v) => format!("{} = '{}'", column, v),
        FilterPredicate::NotEquals(v) => format!("{} != '{}'", column, v),
        FilterPredicate::Contains(v) => format!("{} contains '{}'", column, v),
        FilterPredicate::GreaterThan(v) => format!("{} > '{}'", column, v),
        FilterPredicate::LessThan(v) => format!("{} < '{}'", column, v),
        FilterPredicate::IsNull => format!("{} is null", column),
        FilterPredicate::IsNotNull => format!("{} is not null", column),
    }
}

pub fn render_tables(tables: &[&TableSummary]) -> String {
    if tables.is_empty() {
        return "(no tables)".to_string();
    }
    let rows: Vec<Vec<String>> = tables
        .iter()
        .map(|t| {
            let references = t
                .foreign_keys
                .iter()
                .map(|fk| format!("{} -> {}", fk.column, fk.target()))
                .collect::<Vec<_>>()
                .join(", ");
            vec![t.name.clone(), references]
        })
        .collect();
    render_grid(&["table".to_string(), "references".to_string()], &rows)
}

pub fn render_content(content: &TableContent, page_size: usize) -> String {
    let mut out = render_grid(&content.columns, &display_rows(&content.rows));
    let _ = write!(
        out,
        "\n\n{}: page {} of {}, {} rows",
        content.table_name,
        content.page,
        content.total_pages(page_size),
        content.total_count
    );
    if !content.order.is_empty() {
        let _ = write!(out, "\norder: {}", describe_order(&content.order));
    }
    if content.show_filter && !content.filters.is_empty() {
        let filters = content
            .filters
            .iter()
            .map(describe_filter)
            .collect::<Vec<_>>()
            .join(" and ");
        let _ = write!(out, "\nfilter: {}", filters);
    }
    out
}

fn structure_rows(structure: &[ColumnDescriptor]) -> Vec<Vec<String>> {
    structure
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.data_type.clone(),
                if c.nullable { "yes" } else { "no" }.to_string(),
                c.default.clone().unwrap_or_default(),
                if c.is_primary_key { "PK" } else { "" }.to_string(),
            ]
        })
        .collect()
}

pub fn render_structure(content: &TableContent) -> String {
    let headers = ["column", "type", "null", "default", "key"].map(str::to_string);
    let mut out = render_grid(&headers, &structure_rows(&content.structure));
    if !content.constraints.is_empty() {
        let rows: Vec<Vec<String>> = content
            .constraints
            .iter()
            .map(|c| {
                vec![
                    c.name.clone(),
                    c.kind.to_string(),
                    c.column_name.clone(),
                    c.detail.clone().unwrap_or_default(),
                ]
            })
            .collect();
        let headers = ["constraint", "kind", "column", "detail"].map(str::to_string);
        out.push_str("\n\n");
        out.push_str(&render_grid(&headers, &rows));
    }
    out
}

pub fn render_foreign_table(view: &ForeignTableView) -> String {
    let mut out = render_grid(&view.columns, &display_rows(&view.rows));
    let _ = write!(
        out,
        "\n\n{} (by {}): {} rows",
        view.table_name, view.first_column, view.total_count
    );
    out
}

pub fn render_errors(log: &ErrorLog) -> String {
    log.entries()
        .iter()
        .map(|e| format!("error: {}", e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rows as objects keyed by column name, plus paging metadata.
pub fn content_json(content: &TableContent, page_size: usize) -> Value {
    let rows: Vec<Value> = content
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = content
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| {
                    (column.clone(), value.clone().map_or(Value::Null, Value::String))
                })
                .collect();
            Value::Object(object)
        })
        .collect();
    json!({
        "table": content.table_name,
        "page": content.page,
        "total_pages": content.total_pages(page_size),
        "total_count": content.total_count,
        "order": content.order,
        "filters": content.filters,
        "rows": rows,
    })
}

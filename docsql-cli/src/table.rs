/// Table formatting for translation output using comfy-table

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use docsql_core::cache::CacheStats;
use docsql_core::BindValue;

/// Format bound parameters as a numbered table
///
/// Rows are in placeholder order, so row N binds the Nth `?`.
pub fn format_params_table(params: &[BindValue]) -> String {
    if params.is_empty() {
        return "No parameters".to_string();
    }

    let mut table = new_table();
    table.set_header(vec![Cell::new("#"), Cell::new("type"), Cell::new("value")]);

    for (i, param) in params.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(param.type_name()),
            Cell::new(format_value(param)),
        ]);
    }

    table.to_string()
}

pub fn format_stats_table(stats: &CacheStats) -> String {
    let mut table = new_table();
    table.set_header(vec!["entries", "capacity", "hits", "misses", "evictions", "hit rate"]);
    table.add_row(vec![
        Cell::new(stats.entries),
        Cell::new(stats.capacity),
        Cell::new(stats.hits),
        Cell::new(stats.misses),
        Cell::new(stats.evictions),
        Cell::new(format!("{:.1}%", stats.hit_rate() * 100.0)),
    ]);
    table.to_string()
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format a BindValue for display in a table cell
fn format_value(value: &BindValue) -> String {
    match value {
        BindValue::Null => "null".to_string(),
        BindValue::Bool(b) => b.to_string(),
        BindValue::Integer(n) => n.to_string(),
        BindValue::Real(f) => f.to_string(),
        BindValue::Text(s) => s.clone(),
        BindValue::Blob(bytes) => format!("<Binary {} bytes>", bytes.len()),
    }
}

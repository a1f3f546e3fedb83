use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use byte_unit::{Byte, UnitType};
use pretty_duration::pretty_duration;

use storage::Value;

/// Duration 的格式化输出
pub fn to_duration_pretty(duration: &Duration) -> String {
    pretty_duration(duration, None)
}

/// 字节大小 的格式化输出
pub fn to_bytes_len_pretty(len: usize) -> String {
    let byte = Byte::from_u128(len as u128).unwrap();
    let adjusted_byte = byte.get_appropriate_unit(UnitType::Decimal);

    format!("{adjusted_byte:.2}")
}

/// Renders projected rows as a simple boxed ASCII table, column
/// order taken from the first row. All rows from one statement share
/// the same projected column set.
pub fn render_table(rows: &[BTreeMap<String, Value>]) -> String {
    if rows.is_empty() {
        return "(0 rows)\n".to_string();
    }

    let columns: Vec<&String> = rows[0].keys().collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| columns.iter().map(|c| format_value(row.get(*c))).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    write_separator(&mut out, &widths);
    write_row(&mut out, &columns.iter().map(|c| c.as_str()).collect::<Vec<_>>(), &widths);
    write_separator(&mut out, &widths);
    for row in &cells {
        write_row(&mut out, &row.iter().map(|c| c.as_str()).collect::<Vec<_>>(), &widths);
    }
    write_separator(&mut out, &widths);
    let _ = writeln!(out, "({} row{})", rows.len(), if rows.len() == 1 { "" } else { "s" });
    out
}

fn format_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::Int(v)) => v.to_string(),
        Some(Value::Text(s)) => s.clone(),
        None => String::new(),
    }
}

fn write_row(out: &mut String, cells: &[&str], widths: &[usize]) {
    let _ = write!(out, "|");
    for (cell, width) in cells.iter().zip(widths) {
        let _ = write!(out, " {cell:<width$} |", width = width);
    }
    let _ = writeln!(out);
}

fn write_separator(out: &mut String, widths: &[usize]) {
    let _ = write!(out, "+");
    for width in widths {
        let _ = write!(out, "{}+", "-".repeat(width + 2));
    }
    let _ = writeln!(out);
}

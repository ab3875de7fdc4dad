use fleet::compare::classification::{ComparisonStatus, TagColor};
use nu_ansi_term::Color;
use serde::Serialize;

/// How results are printed.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Print `value` as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as left-aligned columns under `headers`.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths = headers.iter().map(|h| h.len()).collect::<Vec<_>>();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_len(cell));
        }
    }
    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let padding = width.saturating_sub(visible_len(cell));
                format!("{cell}{}", " ".repeat(padding))
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    println!("{}", line(headers.iter().map(|h| h.to_string()).collect()));
    for row in rows {
        println!("{}", line(row));
    }
}

/// Length of `text` without ANSI escape sequences.
fn visible_len(text: &str) -> usize {
    strip_ansi_escapes::strip_str(text).chars().count()
}

/// The status label, colored like its tag.
pub fn status_tag(status: ComparisonStatus) -> String {
    let label = status.label();
    match status.color() {
        TagColor::Red => Color::Red.paint(label).to_string(),
        TagColor::Orange => Color::Fixed(208).paint(label).to_string(),
        TagColor::Blue => Color::Blue.paint(label).to_string(),
        TagColor::Green => Color::Green.paint(label).to_string(),
        TagColor::Default => label.to_string(),
    }
}

/// Placeholder for absent values.
pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;
use serde_json::Value;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("Unknown output format '{}'", other)),
        }
    }
}

pub fn display_payload(payload: &Value, format: OutputFormat, show_count: bool) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(payload)?),
        OutputFormat::Csv => export_csv(payload, io::stdout())?,
        OutputFormat::Table => display_table(payload, show_count),
    }
    Ok(())
}

fn display_table(payload: &Value, show_count: bool) {
    match payload {
        Value::Array(rows) if rows.is_empty() => println!("{}", "No results found.".yellow()),
        Value::Array(rows) => {
            let (headers, body) = tabulate(rows);
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(
                headers
                    .iter()
                    .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                    .collect::<Vec<_>>(),
            );
            for row in body {
                table.add_row(row);
            }
            println!("{table}");
            if show_count {
                println!("\n{}", format!("{} rows", rows.len()).green());
            }
        }
        Value::Object(map) => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                Cell::new("field").add_attribute(Attribute::Bold),
                Cell::new("value").add_attribute(Attribute::Bold),
            ]);
            for (key, value) in map {
                table.add_row(vec![key.clone(), cell_text(value)]);
            }
            println!("{table}");
        }
        Value::Null => println!("{}", "Done.".green()),
        scalar => println!("{}", cell_text(scalar)),
    }
}

/// Column headers in first-seen order across all rows, and the cell text.
/// Non-object rows land in a single `value` column.
pub fn tabulate(rows: &[Value]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        match row {
            Value::Object(obj) => {
                for key in obj.keys() {
                    if !headers.iter().any(|h| h == key) {
                        headers.push(key.clone());
                    }
                }
            }
            _ => {
                if !headers.iter().any(|h| h == "value") {
                    headers.push("value".to_string());
                }
            }
        }
    }

    let body = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|field| match row {
                    Value::Object(obj) => obj.get(field).map(cell_text).unwrap_or_default(),
                    other if field == "value" => cell_text(other),
                    _ => String::new(),
                })
                .collect()
        })
        .collect();

    (headers, body)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "".to_string(),
        v => v.to_string(),
    }
}

pub fn export_csv<W: io::Write>(payload: &Value, writer: W) -> anyhow::Result<()> {
    let rows: Vec<Value> = match payload {
        Value::Array(rows) => rows.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    };

    let mut wtr = csv::Writer::from_writer(writer);
    let (headers, body) = tabulate(&rows);
    if headers.is_empty() {
        return Ok(());
    }
    wtr.write_record(&headers)?;
    for row in body {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

// Output formatting for CLI

use clap::ValueEnum;
use serde_json::Value;
use std::io::Write;

use crate::cli::CliResult;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON
    Json,
    /// Flattened key-value pairs
    KeyValue,
    /// Table format
    Table,
}

/// Format and output data
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Output one record, or every record of an array
    pub fn output(&self, value: &Value, writer: &mut impl Write) -> CliResult<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(writer, "{}", serde_json::to_string_pretty(value)?)?;
            }
            OutputFormat::Json => {
                writeln!(writer, "{}", serde_json::to_string(value)?)?;
            }
            OutputFormat::KeyValue | OutputFormat::Table => {
                let records: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for (i, record) in records.into_iter().enumerate() {
                    if i > 0 {
                        writeln!(writer)?;
                    }
                    let mut rows = Vec::new();
                    flatten(record, String::new(), &mut rows);
                    if self.format == OutputFormat::KeyValue {
                        self.output_key_value(&rows, writer)?;
                    } else {
                        self.output_table(&rows, writer)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Output as key-value pairs
    fn output_key_value(&self, rows: &[(String, String)], writer: &mut impl Write) -> CliResult<()> {
        for (key, value) in rows {
            writeln!(writer, "{}: {}", key, value)?;
        }
        Ok(())
    }

    /// Output as table
    fn output_table(&self, rows: &[(String, String)], writer: &mut impl Write) -> CliResult<()> {
        let max_key_len = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

        writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
        for (key, value) in rows {
            writeln!(
                writer,
                "{:<width$} {}",
                format!("{}:", key),
                value,
                width = max_key_len + 1
            )?;
        }
        writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
        Ok(())
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }
}

/// Flatten nested objects into dotted keys; arrays of scalars stay inline
fn flatten(value: &Value, prefix: String, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(obj) => {
            for (key, child) in obj {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(child, key, rows);
            }
        }
        other => rows.push((prefix, format_value(other))),
    }
}

/// Format a JSON value for display
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "(null)".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(arr) => {
            if arr.is_empty() {
                "[]".to_string()
            } else if arr.iter().all(|v| !v.is_object() && !v.is_array()) {
                let items: Vec<String> = arr.iter().map(format_value).collect();
                format!("[{}]", items.join(", "))
            } else {
                format!("[{} items]", arr.len())
            }
        }
        Value::Object(obj) => {
            if obj.is_empty() {
                "{}".to_string()
            } else {
                format!("{{{} items}}", obj.len())
            }
        }
    }
}

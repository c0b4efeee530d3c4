// Output formatting for CLI

use std::io::Write;

use serde_json::Value;

use crate::cli::config::OutputFormat;

/// Format and output data
pub struct OutputFormatter {
    format: OutputFormat,
    pub quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Output one JSON object in the selected format
    pub fn output_value(&self, value: &Value, writer: &mut dyn Write) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Pretty => writeln!(writer, "{}", serde_json::to_string_pretty(value)?)?,
            OutputFormat::Json => writeln!(writer, "{}", serde_json::to_string(value)?)?,
            OutputFormat::KeyValue => self.output_key_value(value, writer)?,
            OutputFormat::Table => self.output_table(value, writer)?,
        }
        Ok(())
    }

    fn output_key_value(&self, value: &Value, writer: &mut dyn Write) -> anyhow::Result<()> {
        for (key, value) in flatten(value) {
            writeln!(writer, "{}={}", key, value)?;
        }
        Ok(())
    }

    fn output_table(&self, value: &Value, writer: &mut dyn Write) -> anyhow::Result<()> {
        let rows = flatten(value);
        let key_width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let value_width = rows.iter().map(|(_, v)| v.chars().count()).max().unwrap_or(0);
        let rule = "-".repeat(key_width + value_width + 3);

        writeln!(writer, "{}", rule)?;
        for (key, value) in &rows {
            writeln!(writer, "{:<kw$} | {}", key, value, kw = key_width)?;
        }
        writeln!(writer, "{}", rule)?;
        Ok(())
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            println!("✓ {}", message);
        }
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

/// Scalar rendering of a JSON value; containers are summarised.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => format!("<{} item(s)>", items.len()),
        Value::Object(fields) => format!("<{} field(s)>", fields.len()),
    }
}

/// Sorted `(dotted.key, value)` rows; nested objects such as `stream` are
/// expanded, arrays are summarised.
pub fn flatten(value: &Value) -> Vec<(String, String)> {
    fn walk(prefix: &str, value: &Value, rows: &mut Vec<(String, String)>) {
        match value {
            Value::Object(fields) => {
                for (key, value) in fields {
                    let key = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    walk(&key, value, rows);
                }
            }
            other => rows.push((prefix.to_string(), format_value(other))),
        }
    }

    let mut rows = Vec::new();
    walk("", value, &mut rows);
    rows.sort();
    rows
}

/// Progress indicator for batch operations
pub struct ProgressBar {
    total: usize,
    current: usize,
    show: bool,
}

impl ProgressBar {
    pub fn new(total: usize, show: bool) -> Self {
        Self {
            total,
            current: 0,
            show,
        }
    }

    pub fn increment(&mut self, label: &str) {
        self.current += 1;
        if self.show && self.total > 0 {
            let percent = (self.current * 100) / self.total;
            eprint!("\r[{}/{}] ({}%) {}", self.current, self.total, percent, label);
            if self.current == self.total {
                eprintln!();
            }
            std::io::stderr().flush().ok();
        }
    }
}

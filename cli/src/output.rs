//! Output formatting

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Parse a saved `default_format` setting
    pub fn from_setting(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }

    /// Print structured data. Table output is handled by the caller, so
    /// here it falls back to JSON.
    pub fn print<T: Serialize>(&self, data: &T) -> Result<()> {
        match self {
            OutputFormat::Yaml => println!("{}", serde_yaml::to_string(data)?),
            OutputFormat::Json | OutputFormat::Table => println!("{}", serde_json::to_string_pretty(data)?),
        }
        Ok(())
    }
}

/// Render rows under `headers` as a text table
pub fn table<H, R>(headers: H, rows: impl IntoIterator<Item = R>) -> String
where
    H: IntoIterator,
    H::Item: Into<String>,
    R: IntoIterator,
    R::Item: Into<String>,
{
    let mut builder = Builder::default();
    builder.push_record(headers);
    for row in rows {
        builder.push_record(row);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

pub fn success(message: &str) {
    println!("{}", message.green().bold());
}

pub fn notice(message: &str) {
    eprintln!("{}", message.yellow());
}

pub fn failure(message: &str) {
    eprintln!("{}", message.red().bold());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_setting() {
        assert_eq!(OutputFormat::from_setting("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_setting("yaml"), Some(OutputFormat::Yaml));
        assert_eq!(OutputFormat::from_setting("xml"), None);
    }

    #[test]
    fn test_table_contains_cells() {
        let rendered = table(["Form", "Title"], vec![vec!["f1", "Car Insurance"]]);
        assert!(rendered.contains("Form"));
        assert!(rendered.contains("Car Insurance"));
    }
}

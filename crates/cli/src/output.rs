//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

/// Render a single item
pub fn render_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) -> anyhow::Result<String> {
    render_list(std::slice::from_ref(item), format)
}

/// Render a list of items
pub fn render_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) -> anyhow::Result<String> {
    let rendered = match format {
        OutputFormat::Table => {
            if items.is_empty() {
                return Ok("No items found.".to_string());
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }
            table.to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(items)?,
        OutputFormat::Yaml => serde_yaml::to_string(items)?,
        OutputFormat::Plain => items
            .iter()
            .map(|item| {
                T::headers()
                    .iter()
                    .zip(item.row())
                    .map(|(header, value)| format!("{}: {}", header, value))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n---\n"),
    };
    Ok(rendered)
}

/// Print a single item
pub fn print_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render_item(item, format)?);
    Ok(())
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render_list(items, format)?);
    Ok(())
}

/// Print any serializable value in a machine format; tables fall back to JSON
pub fn print_value<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        _ => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "!".yellow().bold(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "i".blue(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        name: String,
        count: usize,
    }

    impl TableDisplay for Row {
        fn headers() -> Vec<&'static str> {
            vec!["Name", "Count"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.name.clone(), self.count.to_string()]
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { name: "smoke".to_string(), count: 1 },
            Row { name: "articles".to_string(), count: 5 },
        ]
    }

    #[test]
    fn test_table_contains_headers_and_rows() {
        let out = render_list(&rows(), OutputFormat::Table).unwrap();
        assert!(out.contains("Name"));
        assert!(out.contains("articles"));
    }

    #[test]
    fn test_empty_table() {
        let out = render_list::<Row>(&[], OutputFormat::Table).unwrap();
        assert_eq!(out, "No items found.");
    }

    #[test]
    fn test_json_and_yaml() {
        let json: serde_json::Value = serde_json::from_str(&render_list(&rows(), OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json[1]["count"], 5);

        let yaml = render_item(&rows()[0], OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("name: smoke"));
    }

    #[test]
    fn test_plain_separates_items() {
        let out = render_list(&rows(), OutputFormat::Plain).unwrap();
        assert_eq!(out, "Name: smoke\nCount: 1\n---\nName: articles\nCount: 5");
    }
}

//! Output formatting for sovd-scan (table, json, csv)

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use sovd_scan::EnumeratorReport;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    /// Parse a format name from the config file
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name, true).ok()
    }
}

/// Context for output rendering
#[allow(dead_code)]
pub struct OutputContext {
    pub format: OutputFormat,
    pub no_color: bool,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self {
            format,
            no_color,
            quiet,
        }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print data in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    let table = Table::new(data).to_string();
                    println!("{}", table);
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
            OutputFormat::Csv => {
                print_csv(data);
            }
        }
    }

    /// Print key-value pairs (report summary)
    pub fn print_kv(&self, pairs: &[(&str, String)]) {
        match self.format {
            OutputFormat::Table => {
                for (key, value) in pairs {
                    println!("{}: {}", key.bold(), value);
                }
            }
            OutputFormat::Json => {
                let map: std::collections::BTreeMap<&str, &str> =
                    pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputFormat::Csv => {
                // Header
                let keys: Vec<&str> = pairs.iter().map(|(k, _)| *k).collect();
                println!("{}", keys.join(","));
                // Values
                let values: Vec<&str> = pairs.iter().map(|(_, v)| v.as_str()).collect();
                println!("{}", values.join(","));
            }
        }
    }
}

/// Print data as CSV
fn print_csv<T: Serialize>(data: &[T]) {
    if data.is_empty() {
        return;
    }

    // Get field names from the first item
    let first = serde_json::to_value(&data[0]).unwrap_or_default();
    if let serde_json::Value::Object(map) = &first {
        // Print header
        let headers: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
        println!("{}", headers.join(","));

        // Print rows
        for item in data {
            if let Ok(serde_json::Value::Object(row)) = serde_json::to_value(item) {
                let values: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        row.get(*h)
                            .map(|v| match v {
                                serde_json::Value::String(s) => escape_csv(s),
                                other => escape_csv(&other.to_string()),
                            })
                            .unwrap_or_default()
                    })
                    .collect();
                println!("{}", values.join(","));
            }
        }
    }
}

/// Escape a value for CSV output
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// =============================================================================
// Report rendering
// =============================================================================

/// Print an enumerator report
///
/// JSON output is the whole report as one document; table and CSV output
/// print one section after the other.
pub fn print_report(ctx: &OutputContext, report: &EnumeratorReport) {
    if ctx.format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
        );
        return;
    }

    let blacklist: Vec<String> = report
        .blacklist
        .iter()
        .map(|b| format!("0x{:02X} {}", b.code, b.description))
        .collect();
    ctx.print_kv(&[
        ("Enumerator", report.name.clone()),
        ("Completed", yes_no(report.completed)),
        ("Terminated", yes_no(report.terminated)),
        ("Requests", report.num_requests.to_string()),
        ("Answered", report.num_answered.to_string()),
        ("Blacklist", blacklist.join(", ")),
    ]);

    section(ctx, "Statistics");
    let statistics: Vec<StatisticsDisplayRow> = report
        .statistics
        .iter()
        .map(|row| StatisticsDisplayRow {
            data_set: row.label.clone(),
            metric: row.metric.clone(),
            value: row.value.clone(),
        })
        .collect();
    ctx.print(&statistics);

    if !report.negative_responses.is_empty() {
        section(ctx, "Negative responses");
        let details: Vec<NegativeResponseRow> = report
            .negative_responses
            .iter()
            .map(|d| NegativeResponseRow {
                code: format!("0x{:02X}", d.code),
                description: d.description.clone(),
                count: d.count,
            })
            .collect();
        ctx.print(&details);
    }

    section(
        ctx,
        if report.filtered {
            "Results (filtered)"
        } else {
            "Results"
        },
    );
    let results: Vec<ResultDisplayRow> = report
        .results
        .iter()
        .map(|r| ResultDisplayRow {
            state: r.state.clone(),
            request: r.request.clone(),
            response: r.response.clone().unwrap_or_else(|| "-".to_string()),
            label: r.label.clone(),
            latency: r
                .latency
                .map(|l| format!("{:.3}", l))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    ctx.print(&results);

    if !report.supported_responses.is_empty() {
        section(ctx, "Supported responses");
        let supported: Vec<SupportedDisplayRow> = report
            .supported_responses
            .iter()
            .map(|s| SupportedDisplayRow {
                response: s.response.clone(),
                states: s.states.join(", "),
            })
            .collect();
        ctx.print(&supported);
    }

    if !report.edges.is_empty() {
        section(ctx, "Transitions");
        for edge in &report.edges {
            ctx.info(edge);
        }
    }
}

fn section(ctx: &OutputContext, title: &str) {
    if ctx.format == OutputFormat::Table && !ctx.quiet {
        println!();
        println!("{}", title.bold());
    }
}

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}

// =============================================================================
// Display types for report sections
// =============================================================================

/// Statistics display row
#[derive(Debug, Tabled, Serialize)]
pub struct StatisticsDisplayRow {
    #[tabled(rename = "Data set")]
    pub data_set: String,
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Negative response summary row
#[derive(Debug, Tabled, Serialize)]
pub struct NegativeResponseRow {
    #[tabled(rename = "NRC")]
    pub code: String,
    #[tabled(rename = "Description")]
    pub description: String,
    #[tabled(rename = "Count")]
    pub count: usize,
}

/// Result display row
#[derive(Debug, Tabled, Serialize)]
pub struct ResultDisplayRow {
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Request")]
    pub request: String,
    #[tabled(rename = "Response")]
    pub response: String,
    #[tabled(rename = "Label")]
    pub label: String,
    #[tabled(rename = "Latency (s)")]
    pub latency: String,
}

/// Supported response display row
#[derive(Debug, Tabled, Serialize)]
pub struct SupportedDisplayRow {
    #[tabled(rename = "Response")]
    pub response: String,
    #[tabled(rename = "States")]
    pub states: String,
}

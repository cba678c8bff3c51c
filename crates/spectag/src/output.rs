//! Output formatting for command results

use crate::commands::{HistoryListing, ProcessOutcome};
use eyre::Result;
use facet::Facet;
use owo_colors::OwoColorize;
use spectag_core::ForkOrder;

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Parse an optional `--format` value
    pub fn parse(s: Option<&str>) -> Result<Self> {
        match s {
            None => Ok(Self::default()),
            Some(s) => Self::from_str(s)
                .ok_or_else(|| eyre::eyre!("Unknown output format '{s}' (expected text or json)")),
        }
    }
}

#[derive(Facet)]
struct JsonProcessReport {
    files: Vec<JsonFile>,
    tags: usize,
    updated: usize,
    errors: usize,
    check: bool,
}

#[derive(Facet)]
struct JsonFile {
    path: String,
    tags: usize,
    updated: usize,
    changed: bool,
    errors: Vec<JsonTagError>,
}

#[derive(Facet)]
struct JsonTagError {
    line: usize,
    offset: usize,
    message: String,
}

#[derive(Facet)]
struct JsonHistory {
    preset: String,
    items: Vec<JsonHistoryItem>,
}

#[derive(Facet)]
struct JsonHistoryItem {
    kind: String,
    name: String,
    forks: Vec<String>,
}

fn to_json<'a, T: Facet<'a>>(value: &T) -> Result<String> {
    facet_json::to_string_pretty(value).map_err(|e| eyre::eyre!("JSON serialization failed: {e}"))
}

/// Render the outcome of `process`
pub fn render_process(outcome: &ProcessOutcome, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_process_text(outcome)),
        OutputFormat::Json => render_process_json(outcome),
    }
}

fn render_process_text(outcome: &ProcessOutcome) -> String {
    let mut output = String::new();

    for report in outcome.changed_files() {
        let verb = if outcome.check { "Would update" } else { "Updated" };
        output.push_str(&format!(
            "{} {} {} ({} tags)\n",
            "->".blue().bold(),
            verb,
            report.path.display(),
            report.updated.to_string().green()
        ));
    }

    let errors = outcome.errors();
    if errors > 0 {
        output.push_str(&format!("\n{} {} tag errors:\n", "!".red().bold(), errors));
        for report in &outcome.reports {
            for err in &report.errors {
                output.push_str(&format!(
                    "  {} {}:{} - {}\n",
                    "-".red(),
                    report.path.display(),
                    err.line,
                    err.kind.to_string().yellow()
                ));
            }
        }
    }

    let status = if outcome.is_passing() {
        "OK".green().bold().to_string()
    } else {
        "FAIL".red().bold().to_string()
    };
    output.push_str(&format!(
        "\n{} {} files, {} tags, {} updated, {} errors\n",
        status,
        outcome.reports.len(),
        outcome.tags(),
        outcome.updated().to_string().green(),
        errors
    ));
    output
}

fn render_process_json(outcome: &ProcessOutcome) -> Result<String> {
    let report = JsonProcessReport {
        files: outcome
            .reports
            .iter()
            .map(|r| JsonFile {
                path: r.path.display().to_string(),
                tags: r.tags,
                updated: r.updated,
                changed: r.changed(),
                errors: r
                    .errors
                    .iter()
                    .map(|e| JsonTagError {
                        line: e.line,
                        offset: e.span.offset,
                        message: e.kind.to_string(),
                    })
                    .collect(),
            })
            .collect(),
        tags: outcome.tags(),
        updated: outcome.updated(),
        errors: outcome.errors(),
        check: outcome.check,
    };
    to_json(&report)
}

/// Render the result of `history`, one ready-to-paste tag per item
pub fn render_history(listing: &HistoryListing, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let items = listing
                .history
                .iter()
                .flat_map(|(kind, names)| {
                    names.iter().map(move |(name, forks)| JsonHistoryItem {
                        kind: kind.attribute().to_string(),
                        name: name.clone(),
                        forks: forks.clone(),
                    })
                })
                .collect();
            to_json(&JsonHistory {
                preset: listing.preset.clone(),
                items,
            })
        }
        OutputFormat::Text => {
            let mut output = String::new();
            for (kind, names) in &listing.history {
                output.push_str(&format!("{} {}\n", "##".bold(), kind.attribute().cyan().bold()));
                for (name, forks) in names {
                    let latest = forks.last().map(String::as_str).unwrap_or_default();
                    output.push_str(&format!(
                        "  <spec {}=\"{}\" fork=\"{}\" /> {}\n",
                        kind.attribute(),
                        name,
                        latest,
                        format!("({})", forks.join(", ")).dimmed()
                    ));
                }
                output.push('\n');
            }
            Ok(output)
        }
    }
}

/// Render the fork order
pub fn render_forks(forks: &ForkOrder, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(&forks.forks().to_vec()),
        OutputFormat::Text => {
            let mut output = String::new();
            for (i, fork) in forks.forks().iter().enumerate() {
                output.push_str(&format!("{:>3}. {}\n", i, fork));
            }
            Ok(output)
        }
    }
}

//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one value per line. Status
//! lines from the controller go to stderr so stdout stays parseable.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use ipmon_core::{MessageLevel, StatusMessage};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Status line text, colored by level.
pub fn paint_message(message: &StatusMessage, color: bool) -> String {
    if !color {
        return message.text.clone();
    }
    match message.level {
        MessageLevel::Success => message.text.green().to_string(),
        MessageLevel::Info => message.text.cyan().to_string(),
        MessageLevel::Error => message.text.red().bold().to_string(),
    }
}

/// Print a controller status line to stderr. Errors are shown even in
/// quiet mode.
pub fn print_message(message: &StatusMessage, color: bool, quiet: bool) {
    if quiet && !message.is_error() {
        return;
    }
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{}", paint_message(message, color));
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `line_fn` on each item to emit one line per item
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json_pretty(data),
        OutputFormat::JsonCompact => render_json_compact(data),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&line_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table and plain rendering use pre-formatted strings, since single-item
/// views don't use `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json_pretty(data),
        OutputFormat::JsonCompact => render_json_compact(data),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(plain_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub(crate) fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub(crate) fn render_json_pretty<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(data)?)
}

pub(crate) fn render_json_compact<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string(data)?)
}

pub(crate) fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::OperationFailed {
        message: format!("YAML serialization failed: {e}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, Tabled)]
    struct Item {
        name: &'static str,
        ip: &'static str,
    }

    fn items() -> Vec<Item> {
        vec![
            Item {
                name: "Switch",
                ip: "10.0.85.1",
            },
            Item {
                name: "AP",
                ip: "10.0.85.2",
            },
        ]
    }

    #[test]
    fn plain_emits_one_line_per_item() {
        let out = render_list(&OutputFormat::Plain, &items(), |_| Item { name: "", ip: "" }, |i| {
            i.ip.to_owned()
        })
        .unwrap();
        assert_eq!(out, "10.0.85.1\n10.0.85.2");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_list(
            &OutputFormat::JsonCompact,
            &items(),
            |_| Item { name: "", ip: "" },
            |i| i.ip.to_owned(),
        )
        .unwrap();
        assert_eq!(
            out,
            r#"[{"name":"Switch","ip":"10.0.85.1"},{"name":"AP","ip":"10.0.85.2"}]"#
        );
    }

    #[test]
    fn uncolored_message_is_plain_text() {
        let msg = StatusMessage::error("❌ Failed to save: boom");
        assert_eq!(paint_message(&msg, false), "❌ Failed to save: boom");
        assert_ne!(paint_message(&msg, true), "❌ Failed to save: boom");
    }
}

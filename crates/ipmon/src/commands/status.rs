//! Segment status handlers.

use std::io::{IsTerminal, Write};

use serde::Serialize;
use tabled::Tabled;

use ipmon_core::poller::PLACEHOLDER;
use ipmon_core::{
    DeviceCell, MonitorConfig, RefreshOutcome, StatusMessage, StatusPoller, StatusSnapshot,
    TableView,
};

use crate::cli::{GlobalOpts, OutputFormat, StatusArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

/// One grid row: three device slots side by side.
#[derive(Tabled)]
struct GridRowView {
    #[tabled(rename = "")]
    first: String,
    #[tabled(rename = "")]
    second: String,
    #[tabled(rename = "")]
    third: String,
}

fn slot(cell: Option<&DeviceCell>, color: bool) -> String {
    let Some(cell) = cell else {
        return String::new();
    };
    let indicator = if color {
        use owo_colors::OwoColorize;
        format!("{} {}", "●".red(), cell.indicator.label())
    } else {
        format!("● {}", cell.indicator.label())
    };
    format!("{}\n{}\n{indicator}", cell.description, cell.ip)
}

/// Serialized form of a refresh for json/yaml output.
#[derive(Serialize)]
struct StatusReport<'a> {
    segment: &'a str,
    fetched_at: String,
    devices: Vec<DeviceCell>,
}

impl<'a> From<&'a StatusSnapshot> for StatusReport<'a> {
    fn from(snapshot: &'a StatusSnapshot) -> Self {
        Self {
            segment: &snapshot.segment,
            fetched_at: snapshot.fetched_at.to_rfc3339(),
            devices: snapshot.records.iter().map(DeviceCell::from).collect(),
        }
    }
}

fn grid_table(snapshot: &StatusSnapshot, color: bool) -> String {
    let header = format!(
        "Segment {} · {} device(s) · updated {}",
        snapshot.segment,
        snapshot.records.len(),
        snapshot.fetched_at.format("%H:%M:%S")
    );
    if snapshot.grid.is_empty() {
        return format!("{header}\n(no devices)");
    }
    let rows: Vec<GridRowView> = snapshot
        .grid
        .rows()
        .iter()
        .map(|[a, b, c]| GridRowView {
            first: slot(a.as_ref(), color),
            second: slot(b.as_ref(), color),
            third: slot(c.as_ref(), color),
        })
        .collect();
    format!("{header}\n{}", output::render_table(&rows))
}

fn render(snapshot: &StatusSnapshot, global: &GlobalOpts) -> Result<String, CliError> {
    let color = output::should_color(&global.color);
    let report = StatusReport::from(snapshot);
    output::render_single(
        &global.output,
        &report,
        |_| grid_table(snapshot, color),
        |r| {
            r.devices
                .iter()
                .map(|d| format!("{}\t{}\t{}", d.ip, d.description, d.indicator.label()))
                .collect::<Vec<_>>()
                .join("\n")
        },
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    monitor: &MonitorConfig,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let poller = StatusPoller::from_config(monitor)?;
    let segment = args
        .segment
        .unwrap_or_else(|| monitor.default_segment.clone());

    let result = if args.watch {
        watch(&poller, &segment, global).await
    } else {
        once(&poller, &segment, monitor, global).await
    };
    poller.shutdown().await;
    result
}

async fn once(
    poller: &StatusPoller,
    segment: &str,
    monitor: &MonitorConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    poller.select_segment(segment);
    let label = format!("Refreshing segment {segment}...");
    match util::with_spinner(&label, global, poller.refresh(segment)).await {
        RefreshOutcome::Applied(snapshot) => {
            output::print_output(&render(&snapshot, global)?, global.quiet);
            Ok(())
        }
        RefreshOutcome::Failed { error, .. } => {
            Err(CliError::from_core(error, monitor.timeout.as_secs()))
        }
        RefreshOutcome::Stale { .. } | RefreshOutcome::Cancelled => Err(CliError::OperationFailed {
            message: "status refresh was interrupted".into(),
        }),
    }
}

/// Poll until Ctrl-C, redrawing whenever the table changes.
async fn watch(poller: &StatusPoller, segment: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let redraw = matches!(global.output, OutputFormat::Table) && std::io::stdout().is_terminal();
    let mut view = poller.subscribe_view();

    output::print_message(&StatusMessage::info(PLACEHOLDER), color, global.quiet);
    poller.start().await;
    if segment != poller.settings().default_segment {
        poller.select_segment(segment);
        drop(poller.refresh_now());
    }

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update().clone();
                if let TableView::Loaded(snapshot) = current {
                    if redraw {
                        let mut stdout = std::io::stdout().lock();
                        let _ = write!(stdout, "\x1B[2J\x1B[H");
                    }
                    output::print_output(&render(&snapshot, global)?, global.quiet);
                }
            }
        }
    }
    Ok(())
}

//! Config subcommand handlers.
//!
//! Each invocation rebuilds the form from the stored draft, applies the
//! requested operation, and leaves the draft behind for the next one.

use std::path::Path;

use serde::Serialize;
use tabled::Tabled;

use ipmon_core::{
    ConfigController, ConfigForm, FormField, MonitorConfig, ResetOutcome, StatusMessage,
    TestDetails, import_status,
};

use crate::cli::{ConfigArgs, ConfigCommand, DraftCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

/// A form field as shown by `config show`.
#[derive(Serialize)]
struct FieldView {
    path: &'static str,
    label: &'static str,
    kind: String,
    value: String,
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<&FormField> for FieldView {
    fn from(f: &FormField) -> Self {
        Self {
            path: f.path(),
            label: f.label(),
            kind: f.kind().to_string(),
            value: f.raw().to_owned(),
            enabled: f.is_enabled(),
            error: f.error().map(str::to_owned),
        }
    }
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    path: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "State")]
    state: String,
}

impl From<&FieldView> for FieldRow {
    fn from(v: &FieldView) -> Self {
        let state = match (&v.error, v.enabled) {
            (Some(err), _) => format!("✗ {err}"),
            (None, false) => "disabled".into(),
            (None, true) => String::new(),
        };
        Self {
            path: v.path.into(),
            label: v.label.into(),
            value: v.value.clone(),
            state,
        }
    }
}

#[derive(Tabled)]
struct DetailRow {
    #[tabled(rename = "Check")]
    check: String,
    #[tabled(rename = "Result")]
    result: String,
}

fn details_table(details: &TestDetails) -> String {
    let rows: Vec<DetailRow> = details
        .entries()
        .into_iter()
        .map(|(check, result)| DetailRow {
            check: check.into(),
            result,
        })
        .collect();
    output::render_table(&rows)
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Split `dotted.path=value` at the first `=`.
fn parse_assignment(raw: &str) -> Result<(&str, &str), CliError> {
    match raw.split_once('=') {
        Some((path, value)) if !path.trim().is_empty() => Ok((path.trim(), value)),
        _ => Err(CliError::Validation {
            field: "assignment".into(),
            reason: format!("expected PATH=VALUE, got '{raw}'"),
        }),
    }
}

/// Inline errors of the form as one validation error.
fn form_invalid(form: &ConfigForm) -> Option<CliError> {
    let errors: Vec<String> = form
        .errors()
        .map(|(path, err)| format!("{path}: {err}"))
        .collect();
    if errors.is_empty() {
        return None;
    }
    Some(CliError::Validation {
        field: "form".into(),
        reason: errors.join("; "),
    })
}

/// A status line that ends the command: errors become `CliError`, the
/// rest are printed.
fn finish(message: &StatusMessage, global: &GlobalOpts) -> Result<(), CliError> {
    if message.is_error() {
        return Err(CliError::OperationFailed {
            message: message.text.clone(),
        });
    }
    output::print_message(message, output::should_color(&global.color), global.quiet);
    Ok(())
}

fn load_file(
    controller: &ConfigController,
    form: &mut ConfigForm,
    path: &Path,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let result = controller.import(form, path);
    let message = import_status(&result);
    if let Err(e) = result {
        tracing::warn!(error = %e, path = %path.display(), "import failed");
        return Err(e.into());
    }
    output::print_message(&message, output::should_color(&global.color), global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    monitor: &MonitorConfig,
    args: ConfigArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = ConfigController::from_config(monitor)?;
    let color = output::should_color(&global.color);

    let mut form = controller.new_form();
    if let Some(message) = controller.load_draft(&mut form) {
        tracing::info!("{message}");
    }

    match args.command {
        ConfigCommand::Show => {
            form.validate_all();
            let views: Vec<FieldView> = form.fields().iter().map(FieldView::from).collect();
            let out = output::render_list(&global.output, &views, |v: &FieldView| FieldRow::from(v), |v| {
                format!("{}={}", v.path, v.value)
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { assignments } => {
            for raw in &assignments {
                let (path, value) = parse_assignment(raw)?;
                form.set_value(path, value)?;
                if let Some(notice) = form.blur(path) {
                    output::print_message(&notice, color, global.quiet);
                }
            }
            controller.on_change(&form);

            if let Some(err) = form_invalid(&form) {
                return Err(err);
            }
            finish(
                &StatusMessage::success(format!(
                    "📝 Draft updated ({} field(s))",
                    assignments.len()
                )),
                global,
            )
        }

        ConfigCommand::Save { from_file } => {
            if let Some(path) = from_file {
                load_file(&controller, &mut form, &path, global)?;
            }
            // An invalid form is a usage error, not a failed request.
            form.validate_all();
            if let Some(err) = form_invalid(&form) {
                return Err(err);
            }
            let message =
                util::with_spinner("Saving...", global, controller.save_form(&mut form)).await;
            finish(&message, global)
        }

        ConfigCommand::Test { from_file } => {
            if let Some(path) = from_file {
                load_file(&controller, &mut form, &path, global)?;
            }
            let outcome =
                util::with_spinner("Testing...", global, controller.test_form(&form)).await;
            if let Some(details) = outcome.details.as_ref().filter(|d| !d.entries().is_empty()) {
                let out = output::render_single(&global.output, details, details_table, |d| {
                    d.entries()
                        .iter()
                        .map(|(check, result)| format!("{check}\t{result}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                })?;
                output::print_output(&out, global.quiet);
            }
            finish(&outcome.message, global)
        }

        ConfigCommand::Reset => {
            // Asked up front so the spinner never covers the prompt.
            let approved = util::confirm(ipmon_core::RESET_PROMPT, global.yes)?;
            let outcome = util::with_spinner(
                "Restoring defaults...",
                global,
                controller.reset_to_defaults(|_| approved),
            )
            .await;
            match outcome {
                ResetOutcome::Cancelled => {
                    output::print_message(&StatusMessage::info("Reset cancelled"), color, global.quiet);
                    Ok(())
                }
                ResetOutcome::Failed(message) => finish(&message, global),
                ResetOutcome::Reset { message, .. } => {
                    // Nothing on screen to keep readable, so reload right away.
                    controller.reload(&mut form);
                    finish(&message, global)
                }
            }
        }

        ConfigCommand::Export { dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            let result = controller.export(&form, &dir);
            let message = ipmon_core::export_status(&result);
            let path = result?;
            output::print_message(&message, color, global.quiet);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Import { file } => load_file(&controller, &mut form, &file, global),

        ConfigCommand::Draft(draft) => match draft.command {
            DraftCommand::Show => match controller.draft() {
                Some(tree) => {
                    let out = output::render_single(
                        &global.output,
                        tree.as_map(),
                        |_| tree.to_pretty_json(),
                        |_| {
                            tree.leaves()
                                .into_iter()
                                .map(|(path, value)| format!("{path}={value}"))
                                .collect::<Vec<_>>()
                                .join("\n")
                        },
                    )?;
                    output::print_output(&out, global.quiet);
                    Ok(())
                }
                None => {
                    output::print_message(&StatusMessage::info("No draft stored"), color, global.quiet);
                    Ok(())
                }
            },
            DraftCommand::Clear => {
                controller.clear_draft();
                finish(&StatusMessage::success("🗑 Draft cleared"), global)
            }
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ipmon_core::Schema;

    use super::*;

    #[test]
    fn assignments_split_at_first_equals() {
        assert_eq!(
            parse_assignment("system_info.admin_contact=a=b@x.io").unwrap(),
            ("system_info.admin_contact", "a=b@x.io")
        );
        assert_eq!(
            parse_assignment(" ui_settings.theme =dark").unwrap(),
            ("ui_settings.theme", "dark")
        );
        assert!(parse_assignment("no-equals").is_err());
        assert!(parse_assignment("=5").is_err());
    }

    #[test]
    fn field_rows_show_errors_and_disabled_state() {
        let mut form = ConfigForm::new(&Schema::ipmonitor());
        form.set_checked(ipmon_core::AUTO_REFRESH, false).unwrap();
        form.set_value("network_settings.retry_attempts", "abc").unwrap();

        let rate = FieldRow::from(&FieldView::from(form.field(ipmon_core::REFRESH_RATE).unwrap()));
        assert_eq!(rate.state, "disabled");
        assert_eq!(rate.value, "5");

        let retries =
            FieldRow::from(&FieldView::from(form.field("network_settings.retry_attempts").unwrap()));
        assert!(retries.state.starts_with('✗'));
        assert!(form_invalid(&form).is_some());
    }
}

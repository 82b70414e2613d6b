// ── Config controller ──
//
// Binds the settings form to the backend configuration resource. Network
// operations never fail outward: each one ends in a `StatusMessage`, and
// its control stays marked busy for exactly as long as the request runs.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use ipmon_api::{IpmonClient, TestDetails};
use strum::{Display, EnumIter};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::draft::{DRAFT_KEY, DraftStore, FileDraftStore, MemoryDraftStore};
use crate::error::CoreError;
use crate::form::{ConfigForm, PopulateReport};
use crate::message::StatusMessage;
use crate::schema::Schema;
use crate::tree::ConfigTree;

/// Pause between a successful reset and reloading the form, long enough
/// to read the confirmation.
pub const RELOAD_DELAY: Duration = Duration::from_millis(1500);

/// Question asked before resetting to defaults.
pub const RESET_PROMPT: &str = "Are you sure you want to restore the default settings?";

/// Display format of the last-saved timestamp.
pub const LAST_SAVED_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// A control that triggers a network operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum Control {
    Save,
    Reset,
    Test,
}

/// How a reset request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The user declined the confirmation; nothing was sent.
    Cancelled,
    /// The backend restored its defaults. The form should be reloaded
    /// once `reload_in` has elapsed.
    Reset {
        message: StatusMessage,
        reload_in: Duration,
    },
    /// The request failed or was refused.
    Failed(StatusMessage),
}

impl ResetOutcome {
    pub fn message(&self) -> Option<&StatusMessage> {
        match self {
            Self::Cancelled => None,
            Self::Reset { message, .. } | Self::Failed(message) => Some(message),
        }
    }
}

/// Result of a dry-run test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub message: StatusMessage,
    pub details: Option<TestDetails>,
}

/// Result of importing a configuration file into the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub path: PathBuf,
    pub applied: usize,
    /// Dotted paths in the file that match no form field.
    pub ignored: Vec<String>,
}

impl ImportReport {
    pub fn message(&self) -> StatusMessage {
        if self.ignored.is_empty() {
            StatusMessage::success("📁 Configuration imported successfully!")
        } else {
            StatusMessage::success(format!(
                "📁 Configuration imported successfully! ({} unknown field(s) ignored)",
                self.ignored.len()
            ))
        }
    }
}

/// Status line for an import attempt.
pub fn import_status(result: &Result<ImportReport, CoreError>) -> StatusMessage {
    match result {
        Ok(report) => report.message(),
        Err(_) => StatusMessage::error("❌ Error importing configuration: invalid file"),
    }
}

/// Status line for an export attempt.
pub fn export_status(result: &Result<PathBuf, CoreError>) -> StatusMessage {
    match result {
        Ok(path) => StatusMessage::success(format!("💾 Configuration exported to {}", path.display())),
        Err(e) => StatusMessage::error(format!("❌ Error exporting configuration: {e}")),
    }
}

/// `ipmonitor_config_YYYY-MM-DD.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("ipmonitor_config_{}.json", date.format("%Y-%m-%d"))
}

/// Text shown after a failed operation: the backend's own message when it
/// sent one, the generic text for other HTTP failures, and the transport
/// error otherwise.
fn failure_text(err: &CoreError, generic: &str) -> String {
    match err {
        CoreError::Api { .. } => err.server_message().unwrap_or(generic).to_owned(),
        other => other.to_string(),
    }
}

// ── Controller ───────────────────────────────────────────────────────

/// Settings form driver. Cheaply cloneable; clones share state.
#[derive(Debug, Clone)]
pub struct ConfigController {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    client: IpmonClient,
    drafts: Arc<dyn DraftStore>,
    schema: Schema,
    busy: watch::Sender<BTreeSet<Control>>,
    last_saved: watch::Sender<Option<DateTime<Local>>>,
}

/// Marks a control busy until dropped.
struct BusyGuard {
    inner: Arc<Inner>,
    control: Control,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let control = self.control;
        self.inner.busy.send_modify(|set| {
            set.remove(&control);
        });
    }
}

impl ConfigController {
    pub fn new(client: IpmonClient, drafts: Arc<dyn DraftStore>) -> Self {
        Self::with_schema(client, drafts, Schema::ipmonitor())
    }

    pub fn with_schema(client: IpmonClient, drafts: Arc<dyn DraftStore>, schema: Schema) -> Self {
        let (busy, _) = watch::channel(BTreeSet::new());
        let (last_saved, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                client,
                drafts,
                schema,
                busy,
                last_saved,
            }),
        }
    }

    /// Build a controller for a server, with file drafts when the config
    /// names a draft path.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, CoreError> {
        let client = config.client()?;
        let drafts: Arc<dyn DraftStore> = match &config.draft_path {
            Some(path) => Arc::new(FileDraftStore::new(path)),
            None => Arc::new(MemoryDraftStore::new()),
        };
        Ok(Self::new(client, drafts))
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// A fresh form showing the schema defaults.
    pub fn new_form(&self) -> ConfigForm {
        ConfigForm::new(&self.inner.schema)
    }

    // ── Busy controls ────────────────────────────────────────────────

    fn begin(&self, control: Control) -> Result<BusyGuard, StatusMessage> {
        let mut acquired = false;
        self.inner.busy.send_if_modified(|set| {
            acquired = set.insert(control);
            acquired
        });
        if acquired {
            Ok(BusyGuard {
                inner: Arc::clone(&self.inner),
                control,
            })
        } else {
            Err(StatusMessage::info(format!("{control} already in progress")))
        }
    }

    pub fn is_busy(&self, control: Control) -> bool {
        self.inner.busy.borrow().contains(&control)
    }

    pub fn subscribe_busy(&self) -> watch::Receiver<BTreeSet<Control>> {
        self.inner.busy.subscribe()
    }

    // ── Last-saved timestamp ─────────────────────────────────────────

    pub fn last_saved(&self) -> Option<DateTime<Local>> {
        *self.inner.last_saved.borrow()
    }

    /// Timestamp as displayed next to the form, `-` before the first save.
    pub fn last_saved_label(&self) -> String {
        self.last_saved()
            .map_or_else(|| "-".into(), |t| t.format(LAST_SAVED_FORMAT).to_string())
    }

    pub fn subscribe_last_saved(&self) -> watch::Receiver<Option<DateTime<Local>>> {
        self.inner.last_saved.subscribe()
    }

    // ── Network operations ───────────────────────────────────────────

    /// Send a configuration tree to the save endpoint.
    ///
    /// On success the draft is cleared and the last-saved time updated; on
    /// failure the draft is left alone.
    pub async fn save(&self, tree: &ConfigTree) -> StatusMessage {
        let _busy = match self.begin(Control::Save) {
            Ok(guard) => guard,
            Err(refused) => return refused,
        };
        info!("saving configuration");

        match self.inner.client.save_config(tree).await {
            Ok(_) => {
                self.clear_draft();
                self.inner.last_saved.send_replace(Some(Local::now()));
                StatusMessage::success("✅ Configuration saved successfully!")
            }
            Err(e) => {
                let err = CoreError::from(e);
                warn!(error = %err, "save failed");
                StatusMessage::error(format!(
                    "❌ Failed to save: {}",
                    failure_text(&err, "Error saving configuration")
                ))
            }
        }
    }

    /// Validate the form and save it. An invalid form is not sent.
    pub async fn save_form(&self, form: &mut ConfigForm) -> StatusMessage {
        match form.submission() {
            Ok(tree) => self.save(&tree).await,
            Err(e) => StatusMessage::error(format!("❌ Failed to save: {e}")),
        }
    }

    /// Ask the backend to restore its defaults.
    ///
    /// `confirm` receives [`RESET_PROMPT`] and decides whether to go ahead.
    pub async fn reset_to_defaults(&self, confirm: impl FnOnce(&str) -> bool) -> ResetOutcome {
        if !confirm(RESET_PROMPT) {
            debug!("reset declined");
            return ResetOutcome::Cancelled;
        }
        let _busy = match self.begin(Control::Reset) {
            Ok(guard) => guard,
            Err(refused) => return ResetOutcome::Failed(refused),
        };
        info!("resetting configuration to defaults");

        match self.inner.client.reset_config().await {
            Ok(_) => ResetOutcome::Reset {
                message: StatusMessage::success("🔄 Configuration restored to default values!"),
                reload_in: RELOAD_DELAY,
            },
            Err(e) => {
                let err = CoreError::from(e);
                warn!(error = %err, "reset failed");
                ResetOutcome::Failed(StatusMessage::error(format!(
                    "❌ Failed to restore: {}",
                    failure_text(&err, "Error restoring configuration")
                )))
            }
        }
    }

    /// Reload after a reset: the form goes back to defaults and the draft
    /// is dropped so it cannot resurrect the old values.
    pub fn reload(&self, form: &mut ConfigForm) {
        form.reset();
        self.clear_draft();
        info!("form reloaded with defaults");
    }

    /// Reset, wait out the reload delay, then reload the form.
    pub async fn reset_and_reload(
        &self,
        form: &mut ConfigForm,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Option<StatusMessage> {
        match self.reset_to_defaults(confirm).await {
            ResetOutcome::Cancelled => None,
            ResetOutcome::Failed(message) => Some(message),
            ResetOutcome::Reset { message, reload_in } => {
                tokio::time::sleep(reload_in).await;
                self.reload(form);
                Some(message)
            }
        }
    }

    /// Dry-run a configuration tree; nothing is persisted.
    pub async fn test(&self, tree: &ConfigTree) -> TestOutcome {
        let _busy = match self.begin(Control::Test) {
            Ok(guard) => guard,
            Err(refused) => {
                return TestOutcome {
                    message: refused,
                    details: None,
                };
            }
        };
        info!("testing configuration");

        match self.inner.client.test_config(tree).await {
            Ok(reply) => TestOutcome {
                message: StatusMessage::info(format!(
                    "🧪 Test complete: {}",
                    reply.server_message().unwrap_or("no message")
                )),
                details: reply.test_details(),
            },
            Err(e) => {
                let err = CoreError::from(e);
                warn!(error = %err, "test failed");
                TestOutcome {
                    message: StatusMessage::error(format!(
                        "❌ Test failed: {}",
                        failure_text(&err, "Error testing configuration")
                    )),
                    details: None,
                }
            }
        }
    }

    /// Test the form as it stands. Range errors are left for the backend
    /// to report; input that does not fit its kind is not sent.
    pub async fn test_form(&self, form: &ConfigForm) -> TestOutcome {
        match form.to_tree() {
            Ok(tree) => self.test(&tree).await,
            Err(e) => TestOutcome {
                message: StatusMessage::error(format!("❌ Test failed: {e}")),
                details: None,
            },
        }
    }

    // ── Drafts ───────────────────────────────────────────────────────

    /// Change event: persist the form as the draft. Best effort.
    pub fn on_change(&self, form: &ConfigForm) {
        let json = form.snapshot().into_value().to_string();
        if let Err(e) = self.inner.drafts.store(DRAFT_KEY, &json) {
            warn!(error = %e, "failed to save draft");
        }
    }

    /// The stored draft, if one exists and parses.
    pub fn draft(&self) -> Option<ConfigTree> {
        let text = match self.inner.drafts.load(DRAFT_KEY) {
            Ok(text) => text?,
            Err(e) => {
                warn!(error = %e, "failed to read draft");
                return None;
            }
        };
        match ConfigTree::from_json_str(&text) {
            Ok(tree) => Some(tree),
            Err(e) => {
                warn!(error = %e, "failed to parse draft");
                None
            }
        }
    }

    /// Populate the form from the stored draft, if any.
    pub fn load_draft(&self, form: &mut ConfigForm) -> Option<StatusMessage> {
        let tree = self.draft()?;
        let PopulateReport { applied, ignored } = form.populate(&tree);
        debug!(applied, ignored = ignored.len(), "draft loaded");
        Some(StatusMessage::info("📝 Draft loaded automatically"))
    }

    pub fn clear_draft(&self) {
        if let Err(e) = self.inner.drafts.remove(DRAFT_KEY) {
            warn!(error = %e, "failed to clear draft");
        }
    }

    // ── Files ────────────────────────────────────────────────────────

    /// Write the form as pretty JSON to `dir`, named with today's date.
    pub fn export(&self, form: &ConfigForm, dir: &Path) -> Result<PathBuf, CoreError> {
        let path = dir.join(export_file_name(Utc::now().date_naive()));
        std::fs::write(&path, form.snapshot().to_pretty_json()).map_err(|source| {
            CoreError::Io {
                path: path.clone(),
                source,
            }
        })?;
        info!(path = %path.display(), "configuration exported");
        Ok(path)
    }

    /// Read a JSON file into the form. The new form state becomes the
    /// draft.
    pub fn import(&self, form: &mut ConfigForm, path: &Path) -> Result<ImportReport, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_owned(),
            source,
        })?;
        let tree = ConfigTree::from_json_str(&text)?;
        let PopulateReport { applied, ignored } = form.populate(&tree);
        if !ignored.is_empty() {
            warn!(fields = ?ignored, "imported file has unknown fields");
        }
        self.on_change(form);
        info!(path = %path.display(), applied, "configuration imported");
        Ok(ImportReport {
            path: path.to_owned(),
            applied,
            ignored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_name_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap_or_default();
        assert_eq!(export_file_name(date), "ipmonitor_config_2024-03-07.json");
    }

    #[test]
    fn failure_text_prefers_server_message() {
        let with_msg = CoreError::Api {
            message: "x".into(),
            server_message: Some("Intervalo inválido".into()),
            status: Some(400),
        };
        let bare = CoreError::Api {
            message: "HTTP 500".into(),
            server_message: None,
            status: Some(500),
        };
        assert_eq!(failure_text(&with_msg, "generic"), "Intervalo inválido");
        assert_eq!(failure_text(&bare, "generic"), "generic");
        assert_eq!(
            failure_text(&CoreError::Timeout, "generic"),
            "Request to the IP monitor timed out"
        );
    }
}

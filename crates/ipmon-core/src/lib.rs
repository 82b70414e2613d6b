//! Front-end logic for the IP monitor, shared by the CLI and the TUI.
//!
//! - **[`ConfigController`]**: Drives the settings form against the
//!   backend: [`save`](ConfigController::save),
//!   [`reset_to_defaults`](ConfigController::reset_to_defaults) and
//!   [`test`](ConfigController::test), plus draft persistence and
//!   import/export. Every operation reports through a [`StatusMessage`].
//!
//! - **[`ConfigForm`]**: Field state (raw input, enabled flag, inline
//!   error) built from a declared [`Schema`]. Serializes to a
//!   [`ConfigTree`], the nested JSON document the backend stores.
//!
//! - **[`StatusPoller`]**: Periodic and on-demand refresh of a segment's
//!   device list, published through `tokio::sync::watch` channels as a
//!   [`TableView`]. Stale responses are dropped by sequence number and
//!   failed refreshes get a single cancellable retry.
//!
//! - **[`StatusGrid`]**: Fixed-width row chunking of device records for
//!   rendering.

pub mod config;
pub mod controller;
pub mod draft;
pub mod error;
pub mod form;
pub mod message;
pub mod poller;
pub mod schema;
pub mod table;
pub mod tree;
pub mod value;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    DEFAULT_PRODUCTION_HOST, DEFAULT_SEGMENT, KNOWN_SEGMENTS, MonitorConfig, TlsVerification,
};
pub use controller::{
    ConfigController, Control, ImportReport, RELOAD_DELAY, RESET_PROMPT, ResetOutcome, TestOutcome,
    export_status, import_status,
};
pub use draft::{DRAFT_KEY, DraftStore, FileDraftStore, MemoryDraftStore};
pub use error::CoreError;
pub use form::{ConfigForm, FormError, FormField, PopulateReport};
pub use message::{MessageLevel, StatusMessage};
pub use poller::{
    PollState, PollerSettings, RefreshOutcome, StatusPoller, StatusSnapshot, TableView,
};
pub use schema::{AUTO_REFRESH, FieldKind, FieldSpec, REFRESH_RATE, Schema};
pub use table::{DeviceCell, ITEMS_PER_ROW, Reachability, StatusGrid};
pub use tree::ConfigTree;
pub use value::Scalar;

// Wire types that surface through the public API.
pub use ipmon_api::{DeviceRecord, IpmonClient, TestDetails};

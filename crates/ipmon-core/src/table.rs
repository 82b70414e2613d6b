// Row chunking for the segment status view.

use ipmon_api::DeviceRecord;
use serde::Serialize;
use strum::Display;

/// Devices shown per table row.
pub const ITEMS_PER_ROW: usize = 3;

/// Indicator drawn next to each device.
///
/// Every device is drawn as unknown/unreachable whatever the backend
/// reported; the reported value is kept in [`DeviceCell::reported_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    #[default]
    Unknown,
}

impl Reachability {
    /// Caption of the indicator.
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unreachable",
        }
    }
}

/// One filled slot of a row: description, IP and indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceCell {
    pub description: String,
    pub ip: String,
    pub indicator: Reachability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl From<&DeviceRecord> for DeviceCell {
    fn from(rec: &DeviceRecord) -> Self {
        Self {
            description: rec.description.clone(),
            ip: rec.ip.clone(),
            indicator: Reachability::Unknown,
            reported_status: rec.status.clone(),
            kind: rec.kind.clone(),
        }
    }
}

/// A row of [`ITEMS_PER_ROW`] slots; trailing slots of the last row may
/// be empty.
pub type GridRow = [Option<DeviceCell>; ITEMS_PER_ROW];

/// Devices laid out [`ITEMS_PER_ROW`] to a row, in backend order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusGrid {
    rows: Vec<GridRow>,
}

impl StatusGrid {
    pub fn from_records(records: &[DeviceRecord]) -> Self {
        let rows = records
            .chunks(ITEMS_PER_ROW)
            .map(|chunk| std::array::from_fn(|i| chunk.get(i).map(DeviceCell::from)))
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Filled slots across all rows.
    pub fn device_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.iter().filter(|slot| slot.is_some()).count())
            .sum()
    }
}

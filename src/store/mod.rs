//! Spreadsheet persistence.
//!
//! The sheet is the source of work and the only durable output: one row per
//! email, a status marker column, and one column per extracted contact
//! field. Results are written through record by record so an interrupted run
//! loses at most the record in flight.

pub mod csv;

pub use csv::CsvStore;

use crate::core::error::Result;
use crate::core::models::{ContactInfo, EmailRecord, Status};

/// Column order for the contact fields, after Email and Status.
pub const CONTACT_COLUMNS: [&str; 8] = [
    "Name",
    "PersonalEmail",
    "Phone",
    "SIP",
    "Address",
    "Department",
    "Company",
    "OfficeLocation",
];

/// Abstract row store the orchestrator reads work from and writes results to.
pub trait SpreadsheetStore: Send {
    /// All rows still awaiting processing, in sheet order. Rows with a
    /// non-empty status marker or an implausible email are skipped.
    fn read_pending(&mut self) -> Result<Vec<EmailRecord>>;

    /// Persists one record's terminal status and extracted fields. Must be
    /// durable on return.
    fn write_result(&mut self, record: &EmailRecord) -> Result<()>;
}

/// Serializes a record's contact fields in [`CONTACT_COLUMNS`] order.
pub(crate) fn contact_cells(data: Option<&ContactInfo>) -> [String; 8] {
    let info = data.cloned().unwrap_or_default();
    [
        info.name,
        info.personal_email,
        info.phone,
        info.sip,
        info.address,
        info.department,
        info.company,
        info.office_location,
    ]
    .map(|field| field.unwrap_or_default())
}

/// In-memory store used by orchestrator tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub records: Vec<EmailRecord>,
    pub writes: Vec<EmailRecord>,
}

impl MemoryStore {
    pub fn with_pending(emails: &[&str]) -> Self {
        Self {
            records: emails
                .iter()
                .enumerate()
                .map(|(i, email)| EmailRecord::pending(*email, i as u32 + 2))
                .collect(),
            writes: Vec::new(),
        }
    }
}

impl SpreadsheetStore for MemoryStore {
    fn read_pending(&mut self) -> Result<Vec<EmailRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.status == Status::Pending && r.email.contains('@'))
            .cloned()
            .collect())
    }

    fn write_result(&mut self, record: &EmailRecord) -> Result<()> {
        if let Some(existing) = self.records.iter_mut().find(|r| r.row == record.row) {
            *existing = record.clone();
        }
        self.writes.push(record.clone());
        Ok(())
    }
}

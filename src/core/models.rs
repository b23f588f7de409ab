//! Core data model: records read from the spreadsheet, extracted contact
//! data, and run-level aggregates.

use serde::{Deserialize, Serialize};

/// Processing status of one email record. Write-once per run: a record starts
/// PENDING and ends in exactly one terminal state. A later run only picks up
/// rows whose persisted marker is still empty — terminal states are never
/// auto-retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Pending,
    Success,
    NotFound,
    Error,
}

impl Status {
    /// Literal marker written to / read from the spreadsheet Status column.
    pub fn as_marker(&self) -> &'static str {
        match self {
            Status::Pending => "",
            Status::Success => "OK",
            Status::NotFound => "NO EXISTE",
            Status::Error => "ERROR",
        }
    }

    pub fn from_marker(marker: &str) -> Status {
        match marker.trim() {
            "" => Status::Pending,
            "OK" => Status::Success,
            "NO EXISTE" => Status::NotFound,
            _ => Status::Error,
        }
    }
}

/// One email address to look up, tied to its source spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRecord {
    pub email: String,
    /// 1-based row in the source sheet; opaque to everything but the store.
    pub row: u32,
    pub status: Status,
    pub data: Option<ContactInfo>,
}

impl EmailRecord {
    pub fn pending(email: impl Into<String>, row: u32) -> Self {
        Self {
            email: email.into(),
            row,
            status: Status::Pending,
            data: None,
        }
    }
}

/// Structured contact details extracted from one contact card. All fields are
/// optional; extraction is tolerant of partial/missing data. Immutable once
/// produced and attached to exactly one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: Option<String>,
    pub personal_email: Option<String>,
    pub phone: Option<String>,
    pub sip: Option<String>,
    pub address: Option<String>,
    pub department: Option<String>,
    pub company: Option<String>,
    pub office_location: Option<String>,
}

impl ContactInfo {
    /// True when extraction produced at least one field.
    pub fn has_any_field(&self) -> bool {
        self.name.is_some()
            || self.personal_email.is_some()
            || self.phone.is_some()
            || self.sip.is_some()
            || self.address.is_some()
            || self.department.is_some()
            || self.company.is_some()
            || self.office_location.is_some()
    }
}

/// Counters for one processed batch.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub batch_number: usize,
    pub total: usize,
    pub successful: usize,
    pub not_found: usize,
    pub errors: usize,
}

/// Aggregate counters for a whole run. Derived, never persisted; recomputed
/// each run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    pub total_batches: usize,
    pub total_emails: usize,
    pub successful: usize,
    pub not_found: usize,
    pub errors: usize,
    pub duration_seconds: f64,
}

impl ProcessingStats {
    pub fn absorb(&mut self, batch: &BatchResult) {
        self.total_batches += 1;
        self.total_emails += batch.total;
        self.successful += batch.successful;
        self.not_found += batch.not_found;
        self.errors += batch.errors;
    }
}

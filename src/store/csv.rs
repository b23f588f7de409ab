//! CSV-backed spreadsheet store.
//!
//! The whole sheet is held in memory and rewritten on every result write.
//! Sheets here are small (hundreds to low thousands of rows) and the
//! rewrite keeps the on-disk file consistent at every point, which matters
//! more than write amplification for a tool that is routinely interrupted.

use super::{contact_cells, SpreadsheetStore, CONTACT_COLUMNS};
use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::{EmailRecord, Status};
use std::path::PathBuf;

pub struct CsvStore {
    path: PathBuf,
    email_col: usize,
    status_col: usize,
    contact_base: usize,
    start_row: u32,
    rows: Vec<Vec<String>>,
}

impl CsvStore {
    /// Opens the configured sheet, creating it with a fresh header when it
    /// does not exist yet. Rows shorter than the full column set are padded
    /// so later writes can address any cell.
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.sheet_file.clone();
        let email_col = config.email_column as usize - 1;
        let status_col = config.status_column as usize - 1;
        // Contact cells start right after the configured columns so a
        // non-default email or status position is never overwritten.
        let contact_base = email_col.max(status_col) + 1;
        let width = contact_base + CONTACT_COLUMNS.len();

        let rows = if path.exists() {
            let mut reader = ::csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_path(&path)
                .map_err(|e| AppError::Store(format!("cannot open '{}': {}", path.display(), e)))?;
            let mut rows = Vec::new();
            for record in reader.records() {
                let record = record
                    .map_err(|e| AppError::Store(format!("bad row in '{}': {}", path.display(), e)))?;
                let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
                if row.len() < width {
                    row.resize(width, String::new());
                }
                rows.push(row);
            }
            rows
        } else {
            tracing::info!(target: "store", "Sheet '{}' not found; creating it", path.display());
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            vec![default_header()]
        };

        let mut store = Self {
            path,
            email_col,
            status_col,
            contact_base,
            start_row: config.start_row,
            rows,
        };
        store.flush()?;
        Ok(store)
    }

    fn flush(&mut self) -> Result<()> {
        let mut writer = ::csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| {
                AppError::Store(format!("cannot write '{}': {}", self.path.display(), e))
            })?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| AppError::Store(format!("write failed: {}", e)))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::Store(format!("flush failed: {}", e)))?;
        Ok(())
    }

    fn cell(&self, row_idx: usize, col: usize) -> &str {
        self.rows
            .get(row_idx)
            .and_then(|row| row.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

impl SpreadsheetStore for CsvStore {
    fn read_pending(&mut self) -> Result<Vec<EmailRecord>> {
        let mut pending = Vec::new();
        for (idx, _) in self.rows.iter().enumerate() {
            let sheet_row = idx as u32 + 1;
            if sheet_row < self.start_row {
                continue;
            }
            let email = self.cell(idx, self.email_col).trim().to_string();
            let status = Status::from_marker(self.cell(idx, self.status_col));

            if status != Status::Pending {
                continue;
            }
            if !email.contains('@') {
                if !email.is_empty() {
                    tracing::debug!(target: "store", "Row {}: skipping non-address '{}'", sheet_row, email);
                }
                continue;
            }
            pending.push(EmailRecord::pending(email, sheet_row));
        }
        Ok(pending)
    }

    fn write_result(&mut self, record: &EmailRecord) -> Result<()> {
        let idx = record.row as usize - 1;
        if idx >= self.rows.len() {
            return Err(AppError::Store(format!(
                "row {} is outside the sheet ({} rows)",
                record.row,
                self.rows.len()
            )));
        }

        self.rows[idx][self.status_col] = record.status.as_marker().to_string();
        for (offset, cell) in contact_cells(record.data.as_ref()).into_iter().enumerate() {
            self.rows[idx][self.contact_base + offset] = cell;
        }
        self.flush()
    }
}

fn default_header() -> Vec<String> {
    let mut header = vec!["Email".to_string(), "Status".to_string()];
    header.extend(CONTACT_COLUMNS.iter().map(|c| c.to_string()));
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ContactInfo;
    use std::io::Write;

    fn config_for(path: &std::path::Path) -> Config {
        Config {
            sheet_file: path.to_path_buf(),
            ..Default::default()
        }
    }

    fn seeded_sheet(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("correos.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn creates_sheet_with_header_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.csv");
        CsvStore::open(&config_for(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Email,Status,Name,PersonalEmail,Phone,SIP"));
    }

    #[test]
    fn reads_only_pending_rows_with_plausible_emails() {
        let (_dir, path) = seeded_sheet(
            "Email,Status\n\
             a@madrid.org,\n\
             b@madrid.org,OK\n\
             not-an-email,\n\
             c@madrid.org,ERROR\n\
             d@madrid.org,\n",
        );
        let mut store = CsvStore::open(&config_for(&path)).unwrap();
        let pending = store.read_pending().unwrap();

        let emails: Vec<&str> = pending.iter().map(|r| r.email.as_str()).collect();
        assert_eq!(emails, vec!["a@madrid.org", "d@madrid.org"]);
        assert_eq!(pending[0].row, 2);
        assert_eq!(pending[1].row, 6);
    }

    #[test]
    fn write_result_is_durable_per_record() {
        let (_dir, path) = seeded_sheet("Email,Status\na@madrid.org,\n");
        let mut store = CsvStore::open(&config_for(&path)).unwrap();

        let mut record = store.read_pending().unwrap().remove(0);
        record.status = Status::Success;
        record.data = Some(ContactInfo {
            name: Some("GARCIA, MARIA".into()),
            sip: Some("sip:mgarcia@madrid.org".into()),
            ..Default::default()
        });
        store.write_result(&record).unwrap();

        // Reopen from disk: the write must have hit the file already.
        let mut reopened = CsvStore::open(&config_for(&path)).unwrap();
        assert!(reopened.read_pending().unwrap().is_empty());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("a@madrid.org,OK,\"GARCIA, MARIA\""));
        assert!(content.contains("sip:mgarcia@madrid.org"));
    }

    #[test]
    fn not_found_marker_round_trips() {
        let (_dir, path) = seeded_sheet("Email,Status\na@madrid.org,\n");
        let mut store = CsvStore::open(&config_for(&path)).unwrap();

        let mut record = store.read_pending().unwrap().remove(0);
        record.status = Status::NotFound;
        store.write_result(&record).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("a@madrid.org,NO EXISTE"));
    }

    #[test]
    fn write_outside_sheet_is_an_error() {
        let (_dir, path) = seeded_sheet("Email,Status\n");
        let mut store = CsvStore::open(&config_for(&path)).unwrap();
        let record = EmailRecord::pending("x@madrid.org", 99);
        assert!(store.write_result(&record).is_err());
    }

    #[test]
    fn custom_status_column_is_not_clobbered_by_contact_cells() {
        let (_dir, path) = seeded_sheet("a@madrid.org,interno,\n");
        let mut config = config_for(&path);
        config.status_column = 3;
        let mut store = CsvStore::open(&config).unwrap();

        let mut record = store.read_pending().unwrap().remove(0);
        record.status = Status::Success;
        record.data = Some(ContactInfo {
            phone: Some("912345678".into()),
            ..Default::default()
        });
        store.write_result(&record).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let first_line = content.lines().next().unwrap();
        let cells: Vec<&str> = first_line.split(',').collect();
        assert_eq!(cells[0], "a@madrid.org");
        assert_eq!(cells[1], "interno");
        assert_eq!(cells[2], "OK");
        // Phone lands in its slot after the configured columns.
        assert_eq!(cells[5], "912345678");
    }

    #[test]
    fn start_row_skips_leading_rows() {
        let (_dir, path) = seeded_sheet("a@madrid.org,\nb@madrid.org,\n");
        let mut config = config_for(&path);
        config.start_row = 2;
        let mut store = CsvStore::open(&config).unwrap();
        let pending = store.read_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].email, "b@madrid.org");
    }
}

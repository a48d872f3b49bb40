//! The identity sheet: load-or-create, append, whole-file save.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::identity::{Record, HEADER};

use super::error::StorageError;
use super::temp_path;
use super::workbook::{self, Cell, SheetData};

/// In-memory image of the workbook with one target sheet receiving rows.
///
/// Rows already present are never modified; `append_records` only adds to the
/// end of the target sheet. Other sheets are carried through saves unchanged,
/// and loaded cells keep their type (number, boolean, date) across saves.
#[derive(Debug)]
pub struct StorageSheet {
    path: PathBuf,
    sheets: Arc<Vec<SheetData>>,
    target: usize,
    unsaved: bool,
}

impl StorageSheet {
    /// Open the workbook at `path`, or start a new one.
    ///
    /// - file absent: new workbook with `sheet_name` and the header row;
    /// - file present: every sheet is loaded; a missing `sheet_name` is added with the header;
    /// - anything else (unreadable, not a workbook) is an error.
    pub fn open_or_create(path: &Path, sheet_name: &str) -> Result<Self, StorageError> {
        let mut sheets = match fs::metadata(path) {
            Ok(_) => {
                tracing::info!(path = %path.display(), "workbook exists, loading");
                workbook::load(path)?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "workbook does not exist, creating a new one");
                Vec::new()
            }
            Err(source) => {
                return Err(StorageError::Access {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let target = match sheets.iter().position(|s| s.name == sheet_name) {
            Some(i) => i,
            None => {
                sheets.push(SheetData {
                    name: sheet_name.to_string(),
                    rows: Vec::new(),
                });
                sheets.len() - 1
            }
        };
        if sheets[target].rows.is_empty() {
            sheets[target].rows.push(header_row());
        }

        let sheet = Self {
            path: path.to_path_buf(),
            sheets: Arc::new(sheets),
            target,
            unsaved: false,
        };
        tracing::debug!(
            path = %sheet.path.display(),
            sheet = sheet_name,
            data_rows = sheet.data_row_count(),
            "storage sheet ready"
        );
        Ok(sheet)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheets[self.target].name
    }

    /// All rows of the target sheet, header included.
    pub fn row_count(&self) -> usize {
        self.sheets[self.target].rows.len()
    }

    /// Rows below the header.
    pub fn data_row_count(&self) -> usize {
        self.row_count().saturating_sub(1)
    }

    /// Rows of the target sheet (header first).
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.sheets[self.target].rows
    }

    /// True when appended records have not reached the file yet. A header-only
    /// image does not count: there is nothing worth writing.
    pub fn has_unsaved_rows(&self) -> bool {
        self.unsaved
    }

    pub fn append_records(&mut self, records: &[Record]) {
        if records.is_empty() {
            return;
        }
        let target = self.target;
        let rows = &mut Arc::make_mut(&mut self.sheets)[target].rows;
        rows.extend(
            records
                .iter()
                .map(|r| r.to_row().iter().map(|c| Cell::from(*c)).collect()),
        );
        self.unsaved = true;
    }

    /// Frozen copy of the current image, writable off the async runtime.
    /// The sheet itself stays intact whatever happens to the snapshot.
    pub fn snapshot(&self) -> SheetSnapshot {
        SheetSnapshot {
            path: self.path.clone(),
            sheets: Arc::clone(&self.sheets),
        }
    }

    /// Record that a snapshot taken since the last append reached the file.
    pub fn mark_saved(&mut self) {
        self.unsaved = false;
    }

    /// Write the whole workbook: `<path>.part` first, then rename over `<path>`.
    pub fn save(&mut self) -> Result<(), StorageError> {
        self.snapshot().write()?;
        self.mark_saved();
        Ok(())
    }
}

/// Shared, read-only view of a workbook image at one point in time.
#[derive(Debug, Clone)]
pub struct SheetSnapshot {
    path: PathBuf,
    sheets: Arc<Vec<SheetData>>,
}

impl SheetSnapshot {
    pub fn write(&self) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StorageError::Access {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let tmp = temp_path(&self.path);
        workbook::save(&tmp, &self.sheets)?;
        fs::rename(&tmp, &self.path).map_err(|source| StorageError::Rename {
            from: tmp.clone(),
            to: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

fn header_row() -> Vec<Cell> {
    HEADER.iter().map(|h| Cell::from(*h)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Record;

    fn record(first: &str) -> Record {
        Record {
            country: "Germany".into(),
            first_name: first.into(),
            last_name: "Muster".into(),
            city: "Berlin".into(),
            address: "Hauptstr. 1".into(),
            zip_code: "10115".into(),
            date_of_birth: "1990-01-01".into(),
            phone: "+49".into(),
            bank_iban: "DE00".into(),
            credit_card_number: "4111".into(),
            credit_card_expiration_date: "01/30".into(),
            credit_card_cvv2: "999".into(),
        }
    }

    #[test]
    fn fresh_file_gets_header_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.xlsx");
        let mut sheet = StorageSheet::open_or_create(&path, "User Data").unwrap();
        assert_eq!(sheet.row_count(), 1);
        assert!(!sheet.has_unsaved_rows());
        assert!(!path.exists());

        sheet.append_records(&[record("a"), record("b")]);
        sheet.save().unwrap();
        assert!(!sheet.has_unsaved_rows());
        assert!(!temp_path(&path).exists());

        let reopened = StorageSheet::open_or_create(&path, "User Data").unwrap();
        assert_eq!(reopened.data_row_count(), 2);
        assert!(!reopened.has_unsaved_rows());
        assert_eq!(reopened.rows()[0][0], "Country");
        assert_eq!(reopened.rows()[0][11], "Credit Card CVV2");
        assert_eq!(reopened.rows()[2][1], "b");
    }

    #[test]
    fn reopen_appends_after_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.xlsx");
        let mut sheet = StorageSheet::open_or_create(&path, "User Data").unwrap();
        sheet.append_records(&[record("first")]);
        sheet.save().unwrap();

        let mut sheet = StorageSheet::open_or_create(&path, "User Data").unwrap();
        sheet.append_records(&[record("second")]);
        sheet.save().unwrap();

        let sheet = StorageSheet::open_or_create(&path, "User Data").unwrap();
        assert_eq!(sheet.data_row_count(), 2);
        assert_eq!(sheet.rows()[1][1], "first");
        assert_eq!(sheet.rows()[2][1], "second");
    }

    #[test]
    fn missing_sheet_is_added_and_other_sheets_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.xlsx");
        let mut other = StorageSheet::open_or_create(&path, "Notes").unwrap();
        other.save().unwrap();

        let mut sheet = StorageSheet::open_or_create(&path, "User Data").unwrap();
        assert_eq!(sheet.sheet_name(), "User Data");
        assert_eq!(sheet.data_row_count(), 0);
        sheet.append_records(&[record("x")]);
        assert!(sheet.has_unsaved_rows());
        sheet.save().unwrap();

        let notes = StorageSheet::open_or_create(&path, "Notes").unwrap();
        assert_eq!(notes.row_count(), 1);
        let data = StorageSheet::open_or_create(&path, "User Data").unwrap();
        assert_eq!(data.data_row_count(), 1);
    }

    #[test]
    fn corrupt_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        fs::write(&path, b"definitely not a zip archive").unwrap();
        let err = StorageSheet::open_or_create(&path, "User Data").unwrap_err();
        assert!(matches!(err, StorageError::Read { .. }), "got {err:?}");
    }

    #[test]
    fn path_below_a_regular_file_is_an_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let err = StorageSheet::open_or_create(&blocker.join("out.xlsx"), "User Data").unwrap_err();
        assert!(matches!(err, StorageError::Access { .. }), "got {err:?}");
    }

    #[test]
    fn existing_cells_keep_their_types_across_saves() {
        use calamine::{open_workbook, Data, Reader, Xlsx};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typed.xlsx");
        {
            let mut wb = rust_xlsxwriter::Workbook::new();
            let ws = wb.add_worksheet();
            ws.set_name("User Data").unwrap();
            for (c, title) in HEADER.iter().enumerate() {
                ws.write_string(0, c as u16, *title).unwrap();
            }
            ws.write_string(1, 0, "Germany").unwrap();
            ws.write_number(1, 5, 10115.0).unwrap();
            ws.write_boolean(1, 7, true).unwrap();
            let date = rust_xlsxwriter::Format::new().set_num_format("yyyy-mm-dd");
            ws.write_number_with_format(1, 6, 32874.0, &date).unwrap();
            wb.save(&path).unwrap();
        }

        let mut sheet = StorageSheet::open_or_create(&path, "User Data").unwrap();
        assert_eq!(sheet.rows()[1][5], Cell::Number(10115.0));
        assert_eq!(sheet.rows()[1][7], Cell::Bool(true));
        sheet.append_records(&[record("new")]);
        sheet.save().unwrap();

        let mut wb: Xlsx<_> = open_workbook(&path).unwrap();
        let range = wb.worksheet_range("User Data").unwrap();
        assert_eq!(range.height(), 3);
        assert!(
            matches!(range.get_value((1, 5)), Some(Data::Float(f)) if *f == 10115.0)
                || matches!(range.get_value((1, 5)), Some(Data::Int(10115))),
            "zip cell became {:?}",
            range.get_value((1, 5))
        );
        assert_eq!(range.get_value((1, 7)), Some(&Data::Bool(true)));
        match range.get_value((1, 6)) {
            Some(Data::DateTime(dt)) => assert_eq!(dt.as_f64(), 32874.0),
            other => panic!("date cell became {:?}", other),
        }
        // Appended record cells are text.
        assert_eq!(range.get_value((2, 5)), Some(&Data::String("10115".into())));
    }

    #[test]
    fn dropped_snapshot_leaves_sheet_usable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.xlsx");
        let mut sheet = StorageSheet::open_or_create(&path, "User Data").unwrap();
        sheet.append_records(&[record("a")]);
        drop(sheet.snapshot());

        assert!(sheet.has_unsaved_rows());
        assert_eq!(sheet.data_row_count(), 1);
        sheet.append_records(&[record("b")]);
        sheet.save().unwrap();
        assert_eq!(
            StorageSheet::open_or_create(&path, "User Data")
                .unwrap()
                .data_row_count(),
            2
        );
    }

    #[test]
    fn snapshot_is_frozen_at_capture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.xlsx");
        let mut sheet = StorageSheet::open_or_create(&path, "User Data").unwrap();
        sheet.append_records(&[record("a")]);
        let snap = sheet.snapshot();
        sheet.append_records(&[record("b")]);
        snap.write().unwrap();
        let on_disk = StorageSheet::open_or_create(&path, "User Data").unwrap();
        assert_eq!(on_disk.data_row_count(), 1);
        assert_eq!(sheet.data_row_count(), 2);
    }

    #[test]
    fn save_creates_missing_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/people.xlsx");
        let mut sheet = StorageSheet::open_or_create(&path, "User Data").unwrap();
        sheet.save().unwrap();
        assert!(path.exists());
    }
}

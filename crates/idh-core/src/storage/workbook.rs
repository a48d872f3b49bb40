//! Whole-workbook load (calamine) and save (rust_xlsxwriter), keeping cell types.

use std::fmt;
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use super::error::StorageError;

const DATE_TIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const DURATION_FORMAT: &str = "[h]:mm:ss";

/// One cell value as read from or written to a workbook.
///
/// Dates are kept as Excel serial numbers so an existing row goes back to
/// disk with the value it came in with.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(f64),
    Duration(f64),
}

impl Cell {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) if dt.is_duration() => Cell::Duration(dt.as_f64()),
            Data::DateTime(dt) => Cell::DateTime(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Text(e.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) | Cell::DateTime(n) | Cell::Duration(n) => write!(f, "{}", n),
            Cell::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl PartialEq<str> for Cell {
    fn eq(&self, other: &str) -> bool {
        matches!(self, Cell::Text(s) if s == other)
    }
}

impl PartialEq<&str> for Cell {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

/// One worksheet as rows of cells, anchored at A1.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SheetData {
    pub(crate) name: String,
    pub(crate) rows: Vec<Vec<Cell>>,
}

/// Read every worksheet of an existing `.xlsx` file, in workbook order.
pub(crate) fn load(path: &Path) -> Result<Vec<SheetData>, StorageError> {
    let read_err = |source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut wb: Xlsx<_> = open_workbook(path).map_err(read_err)?;

    let mut sheets = Vec::new();
    for name in wb.sheet_names() {
        let range = wb.worksheet_range(&name).map_err(read_err)?;
        // calamine trims leading empty rows/columns; pad back to A1.
        let (row_off, col_off) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_off];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; col_off];
            cells.extend(row.iter().map(Cell::from_data));
            rows.push(cells);
        }
        sheets.push(SheetData { name, rows });
    }
    Ok(sheets)
}

/// Serialize all sheets into a fresh workbook at `path` (overwrites).
pub(crate) fn save(path: &Path, sheets: &[SheetData]) -> Result<(), StorageError> {
    let write_err = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };
    let date_time = Format::new().set_num_format(DATE_TIME_FORMAT);
    let duration = Format::new().set_num_format(DURATION_FORMAT);

    let mut workbook = Workbook::new();
    for sheet in sheets {
        let ws = workbook.add_worksheet();
        ws.set_name(sheet.name.as_str()).map_err(write_err)?;
        for (r, row) in sheet.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                write_cell(ws, r as u32, c as u16, cell, &date_time, &duration)
                    .map_err(write_err)?;
            }
        }
    }
    workbook.save(path).map_err(write_err)
}

fn write_cell(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    date_time: &Format,
    duration: &Format,
) -> Result<(), XlsxError> {
    match cell {
        Cell::Empty => {}
        Cell::Text(s) if s.is_empty() => {}
        Cell::Text(s) => {
            ws.write_string(row, col, s.as_str())?;
        }
        Cell::Number(n) => {
            ws.write_number(row, col, *n)?;
        }
        Cell::Bool(b) => {
            ws.write_boolean(row, col, *b)?;
        }
        Cell::DateTime(serial) => {
            ws.write_number_with_format(row, col, *serial, date_time)?;
        }
        Cell::Duration(serial) => {
            ws.write_number_with_format(row, col, *serial, duration)?;
        }
    }
    Ok(())
}

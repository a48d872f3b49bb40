//! Durable spreadsheet storage.
//!
//! The workbook is loaded once (or created with a header row), rows are
//! appended in memory, and every save serializes the whole file to a `.part`
//! sibling before an atomic rename over the real path.

mod error;
mod sheet;
mod workbook;

pub use error::StorageError;
pub use sheet::{SheetSnapshot, StorageSheet};
pub use workbook::Cell;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `data.xlsx` → `data.xlsx.part`).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}

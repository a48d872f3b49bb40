//! `idh inspect` – count rows in an existing workbook.

use anyhow::{Context, Result};
use idh_core::storage::StorageSheet;
use std::path::Path;

pub fn run_inspect(path: &Path, sheet_name: &str) -> Result<()> {
    if !path.exists() {
        println!("No workbook at {}.", path.display());
        return Ok(());
    }
    let sheet = StorageSheet::open_or_create(path, sheet_name)
        .with_context(|| format!("inspect {}", path.display()))?;
    println!(
        "{}: sheet \"{}\" has {} data row(s)",
        path.display(),
        sheet.sheet_name(),
        sheet.data_row_count()
    );
    Ok(())
}

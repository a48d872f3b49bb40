use std::path::PathBuf;

/// Failure to load or persist the workbook.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The file exists but could not be inspected (permissions, broken mount, ...).
    #[error("cannot access {}: {source}", path.display())]
    Access {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file is not a readable workbook.
    #[error("cannot read workbook {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: calamine::XlsxError,
    },
    #[error("cannot write workbook {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: rust_xlsxwriter::XlsxError,
    },
    #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    /// The blocking save task panicked.
    #[error("workbook save task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

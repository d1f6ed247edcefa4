use thiserror::Error;

/// Why a source file could not be turned into a dataset.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("spreadsheet read error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("sheet '{sheet}' not found (available: {available:?})")]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("source has no header row")]
    MissingHeader,
}

//! Asynchronous loading of the source and target files

use anyhow::Context;
use std::path::Path;
use tokio::task;

use crate::error::{FileRole, Result, SheetCopyError};
use crate::headers::WorkbookHeaders;
use crate::reader::{self, SpreadsheetFormat, Workbook};

/// A decoded input file together with its selection options
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub role: FileRole,
    pub file_name: String,
    pub workbook: Workbook,
    pub headers: WorkbookHeaders,
}

/// Read and decode one input file. Decoding runs on the blocking pool.
pub async fn load_file(role: FileRole, path: impl AsRef<Path>) -> Result<LoadedFile> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if SpreadsheetFormat::from_path(path).is_none() {
        return Err(SheetCopyError::Decode {
            role,
            message: format!(
                "Unsupported file extension: {} (expected .xlsx, .xlsm or .xls)",
                file_name
            ),
        });
    }

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to open file: {}", path.display()))
        .map_err(|e| SheetCopyError::decode(role, e))?;

    load_bytes(role, file_name, bytes).await
}

/// Decode bytes already in memory, e.g. handed over by a file picker
pub async fn load_bytes(role: FileRole, file_name: String, bytes: Vec<u8>) -> Result<LoadedFile> {
    let workbook = task::spawn_blocking(move || reader::decode(&bytes))
        .await
        .map_err(|e| SheetCopyError::Task(e.to_string()))?
        .map_err(|e| SheetCopyError::decode(role, e))?;

    let headers = WorkbookHeaders::from_workbook(&workbook);
    tracing::info!(
        %role,
        file = %file_name,
        format = %workbook.format,
        sheets = workbook.sheets.len(),
        "loaded workbook"
    );

    Ok(LoadedFile {
        role,
        file_name,
        workbook,
        headers,
    })
}

/// Load both files concurrently and wait for both to finish.
/// When both fail, the source error is reported.
pub async fn load_pair(
    source: impl AsRef<Path>,
    target: impl AsRef<Path>,
) -> Result<(LoadedFile, LoadedFile)> {
    let (source, target) = tokio::join!(
        load_file(FileRole::Source, source),
        load_file(FileRole::Target, target)
    );
    Ok((source?, target?))
}

//! Output formatters for workbook headers and copy results

use anyhow::Result;
use colored::*;
use sheetcopy_core::{ProcessedFile, WorkbookHeaders};
use std::path::Path;

/// Print sheets and their column labels in human-readable format
pub fn print_headers_human(file_path: &Path, headers: &WorkbookHeaders) {
    println!("{}", format!("Workbook: {}", file_path.display()).bold());
    println!();

    if headers.sheets.is_empty() {
        println!("{}", "No sheets found".yellow().bold());
        return;
    }

    for sheet in &headers.sheets {
        println!("{} {}", "Sheet:".bold(), sheet.sheet.cyan().bold());
        for (i, label) in sheet.labels.iter().enumerate() {
            println!(
                "  {} {}",
                sheetcopy_core::reader::parser_utils::column_code(i as u32).bright_black(),
                label
            );
        }
        println!();
    }
}

/// Print sheets and their column labels in JSON format
pub fn print_headers_json(file_path: &Path, headers: &WorkbookHeaders) -> Result<()> {
    let output = serde_json::json!({
        "file": file_path.display().to_string(),
        "sheets": headers.sheets,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Print the outcome of a copy
pub fn print_copy_human(file: &ProcessedFile, output: &Path, dry_run: bool) {
    if dry_run {
        println!("[DRY RUN] {}", file.message);
        println!("\nOutput would be: {}", output.display());
    } else {
        println!("{} {}", "✓".green().bold(), file.message);
        println!("Output: {}", output.display());
    }
}

/// Print the outcome of a copy in JSON format
pub fn print_copy_json(file: &ProcessedFile, output: &Path, dry_run: bool) -> Result<()> {
    let report = serde_json::json!({
        "message": file.message,
        "copied_rows": file.copied_rows,
        "output": output.display().to_string(),
        "bytes": file.bytes.len(),
        "dry_run": dry_run,
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

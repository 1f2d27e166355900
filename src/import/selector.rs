use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::api::SpreadsheetFile;
use crate::error::ImportError;

const SPREADSHEET_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// True for names ending in `.xlsx` or `.xls`, ignoring case.
pub fn is_spreadsheet(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn check_name(name: &str) -> Result<(), ImportError> {
    if is_spreadsheet(name) {
        Ok(())
    } else {
        debug!(%name, "rejected non-spreadsheet file");
        Err(ImportError::UnsupportedExtension { name: name.to_string() })
    }
}

/// Reads a user-chosen file, rejecting anything that is not a spreadsheet
/// before touching its contents.
pub fn load(path: &Path) -> Result<SpreadsheetFile, ImportError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    check_name(&name)?;

    let bytes = fs::read(path)?;
    info!(%name, size = bytes.len(), "spreadsheet selected");
    Ok(SpreadsheetFile { name, bytes })
}

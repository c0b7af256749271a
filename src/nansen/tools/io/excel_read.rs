use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use tracing::debug;

use crate::nansen::tools::error::{Result, ToolError};
use crate::nansen::tools::io::excel_write::{DATA_SHEET, PARAMETER_ROW};

/// Recovers the Data sheet's column → field mapping from the hidden parameter
/// row of a workbook produced by the [`excel_write`](crate::io::excel_write)
/// module. Keys are returned in column order; reading stops at the first
/// empty parameter cell.
pub fn read_layout(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = read_required_sheet(&mut workbook, DATA_SHEET)?;

    let mut fields = Vec::new();
    let last_column = range.end().map(|(_, column)| column).unwrap_or(0);
    for column in 0..=last_column {
        let key = cell_to_string(range.get_value((PARAMETER_ROW, column)));
        if key.is_empty() {
            break;
        }
        fields.push(key);
    }

    debug!(field_count = fields.len(), "layout read from parameter row");
    Ok(fields)
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(ToolError::from)?;
    Ok(range)
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.trim().to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

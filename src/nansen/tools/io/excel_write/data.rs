use rust_xlsxwriter::{ExcelDateTime, Format, Worksheet, XlsxError};
use tracing::{debug, warn};

use super::variables::VariableSheet;
use super::{
    CELL_TEXT_LIMIT, InstalledValidation, MAX_ROW, RenderReport, SkipReason, SkippedColumn,
    column_index, resolve_validation, to_data_validation,
};
use crate::nansen::tools::catalog::{CellFormat, FieldCatalog};
use crate::nansen::tools::error::{Result, ToolError};
use crate::nansen::tools::model::{CellValue, DataTable, FileDefinition};

pub const DATA_SHEET: &str = "Data";

/// Row holding the display names.
pub const TITLE_ROW: u32 = 1;
/// Hidden row holding the internal field keys.
pub const PARAMETER_ROW: u32 = TITLE_ROW + 1;
/// First row of data entry.
pub const START_ROW: u32 = TITLE_ROW + 2;
/// Last row validation rules are applied to.
pub const END_ROW: u32 = 20_000;

/// Columns written with a date display format.
pub const DATE_FIELDS: [&str; 3] = ["eventDate", "start_date", "end_date"];
/// Columns written with a time display format.
pub const TIME_FIELDS: [&str; 3] = ["eventTime", "start_time", "end_time"];

pub const PASTE_HINT: &str =
    "When pasting only use 'paste special' / 'paste only', selecting numbers and/or text ";

const HINT_FIRST_COLUMN: u16 = 1;
const HINT_LAST_COLUMN: u16 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Date,
    Time,
    Plain,
}

impl ColumnKind {
    fn for_field(name: &str) -> Self {
        if DATE_FIELDS.contains(&name) {
            ColumnKind::Date
        } else if TIME_FIELDS.contains(&name) {
            ColumnKind::Time
        } else {
            ColumnKind::Plain
        }
    }
}

#[derive(Clone)]
enum PreparedCell {
    Blank,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(ExcelDateTime),
}

// `ExcelDateTime` does not implement `Debug`, so the derive is written out.
impl std::fmt::Debug for PreparedCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreparedCell::Blank => f.write_str("Blank"),
            PreparedCell::Text(text) => f.debug_tuple("Text").field(text).finish(),
            PreparedCell::Number(number) => f.debug_tuple("Number").field(number).finish(),
            PreparedCell::Bool(flag) => f.debug_tuple("Bool").field(flag).finish(),
            PreparedCell::DateTime(_) => f.debug_tuple("DateTime").finish_non_exhaustive(),
        }
    }
}

/// Builds the Data sheet: banner row, display names, the hidden parameter
/// row, per-column width/format/validation, supplied data and the freeze
/// pane below the parameter row.
pub(crate) fn write_data_sheet(
    file_def: &FileDefinition,
    catalog: &FieldCatalog,
    data: Option<&DataTable>,
    variables: &mut VariableSheet,
    report: &mut RenderReport,
) -> Result<Worksheet> {
    let mut worksheet = Worksheet::new();
    worksheet.set_name(DATA_SHEET)?;

    let header_format = CellFormat {
        font_color: Some(0xFF0000),
        bold: Some(false),
        text_wrap: Some(false),
        valign: Some("vcenter".to_string()),
        font_size: Some(12.0),
        ..Default::default()
    }
    .with_default_font()
    .to_format();
    let field_format = CellFormat {
        bottom: Some(1),
        right: Some(1),
        bold: Some(false),
        text_wrap: Some(true),
        valign: Some("vcenter".to_string()),
        font_size: Some(11.0),
        bg_color: Some(0xB9F6F5),
        ..Default::default()
    }
    .with_default_font()
    .to_format();

    for (position, name) in file_def.fields.iter().enumerate() {
        if file_def.fields[..position].contains(name) {
            return Err(ToolError::InvalidWorkbook(format!(
                "field '{name}' appears more than once in '{}'",
                file_def.name
            )));
        }
        let column = column_index(position)?;
        let field = catalog.require(name)?;

        worksheet.write_string_with_format(TITLE_ROW, column, field.disp_name(), &field_format)?;
        worksheet.write_string(PARAMETER_ROW, column, field.name())?;

        if let Some(validation) = field.validation() {
            debug!(field = field.name(), "writing validation");
            let resolved = resolve_validation(field, validation, variables)?;
            worksheet.add_data_validation(
                START_ROW,
                column,
                END_ROW,
                column,
                &to_data_validation(field.name(), &resolved)?,
            )?;
            report.validations.push(InstalledValidation {
                sheet: DATA_SHEET.to_string(),
                field: field.name().to_string(),
                column,
                first_row: START_ROW,
                last_row: END_ROW,
                validation: resolved,
            });
        }

        worksheet.set_column_width(column, field.width())?;
        worksheet.set_column_format(column, &field.cell_format().with_default_font().to_format())?;
        report.columns.push(field.name().to_string());
    }

    if let Some(data) = data {
        write_data(&mut worksheet, file_def, data, report);
    }

    worksheet.write_string_with_format(0, 0, &file_def.disp_name, &header_format)?;
    worksheet.merge_range(0, HINT_FIRST_COLUMN, 0, HINT_LAST_COLUMN, PASTE_HINT, &header_format)?;
    worksheet.set_row_height(0, 24)?;

    worksheet.set_freeze_panes(START_ROW, 0)?;
    worksheet.set_row_hidden(PARAMETER_ROW)?;

    Ok(worksheet)
}

/// Writes each supplied column under the layout column with the same key.
/// Columns that cannot be written are recorded in the report and skipped.
fn write_data(
    worksheet: &mut Worksheet,
    file_def: &FileDefinition,
    data: &DataTable,
    report: &mut RenderReport,
) {
    let date_format = temporal_format("dd/mm/yy");
    let time_format = temporal_format("hh:mm:ss");

    for (index, name) in data.columns.iter().enumerate() {
        let Some(position) = file_def.fields.iter().position(|field| field == name) else {
            skip(report, name, SkipReason::NotInLayout);
            continue;
        };
        // Layout positions were range-checked while writing the headers.
        let column = position as u16;

        let kind = ColumnKind::for_field(name);
        let cells = match prepare_column(data, index, kind) {
            Ok(cells) => cells,
            Err(reason) => {
                skip(report, name, reason);
                continue;
            }
        };

        let format = match kind {
            ColumnKind::Date => Some(&date_format),
            ColumnKind::Time => Some(&time_format),
            ColumnKind::Plain => None,
        };
        if let Err(error) = write_cells(worksheet, column, &cells, format) {
            skip(report, name, SkipReason::Writer(error.to_string()));
            continue;
        }
        report.data_rows = report.data_rows.max(cells.len());
    }
}

fn temporal_format(num_format: &str) -> Format {
    CellFormat {
        bold: Some(false),
        text_wrap: Some(false),
        valign: Some("vcenter".to_string()),
        num_format: Some(num_format.to_string()),
        ..Default::default()
    }
    .with_default_font()
    .to_format()
}

fn skip(report: &mut RenderReport, column: &str, reason: SkipReason) {
    warn!(column, ?reason, "column data not written");
    report.skipped_columns.push(SkippedColumn {
        column: column.to_string(),
        reason,
    });
}

/// Converts a whole column before anything is written, so a column is either
/// written completely or not at all.
fn prepare_column(
    data: &DataTable,
    index: usize,
    kind: ColumnKind,
) -> std::result::Result<Vec<PreparedCell>, SkipReason> {
    let capacity = (MAX_ROW - START_ROW + 1) as usize;
    if data.rows.len() > capacity {
        return Err(SkipReason::TooManyRows {
            rows: data.rows.len(),
        });
    }
    data.column_values(index)
        .enumerate()
        .map(|(row, value)| prepare_cell(value, kind, row))
        .collect()
}

fn prepare_cell(
    value: &CellValue,
    kind: ColumnKind,
    row: usize,
) -> std::result::Result<PreparedCell, SkipReason> {
    let unparseable = || SkipReason::UnparseableValue {
        row,
        value: value.to_text(),
    };

    Ok(match (value, kind) {
        (CellValue::Empty, _) => PreparedCell::Blank,
        (CellValue::Text(text), _) if text.trim().is_empty() => PreparedCell::Blank,
        (CellValue::Text(text), ColumnKind::Date | ColumnKind::Time) => {
            let parsed = ExcelDateTime::parse_from_str(text.trim()).map_err(|_| unparseable())?;
            PreparedCell::DateTime(parsed)
        }
        (CellValue::Bool(_), ColumnKind::Date | ColumnKind::Time) => return Err(unparseable()),
        (CellValue::Text(text), ColumnKind::Plain) => {
            let length = text.chars().count();
            if length > CELL_TEXT_LIMIT {
                return Err(SkipReason::TooLong { row, length });
            }
            PreparedCell::Text(text.clone())
        }
        (CellValue::Number(number), _) => PreparedCell::Number(*number),
        (CellValue::Bool(flag), ColumnKind::Plain) => PreparedCell::Bool(*flag),
    })
}

fn write_cells(
    worksheet: &mut Worksheet,
    column: u16,
    cells: &[PreparedCell],
    format: Option<&Format>,
) -> std::result::Result<(), XlsxError> {
    for (offset, cell) in cells.iter().enumerate() {
        let row = u32::try_from(offset)
            .ok()
            .and_then(|offset| offset.checked_add(START_ROW))
            .ok_or(XlsxError::RowColumnLimitError)?;
        match (cell, format) {
            (PreparedCell::Blank, _) => {}
            (PreparedCell::Text(text), _) => {
                worksheet.write_string(row, column, text)?;
            }
            (PreparedCell::Number(number), Some(format)) => {
                worksheet.write_number_with_format(row, column, *number, format)?;
            }
            (PreparedCell::Number(number), None) => {
                worksheet.write_number(row, column, *number)?;
            }
            (PreparedCell::Bool(flag), _) => {
                worksheet.write_boolean(row, column, *flag)?;
            }
            (PreparedCell::DateTime(datetime), Some(format)) => {
                worksheet.write_datetime_with_format(row, column, datetime, format)?;
            }
            (PreparedCell::DateTime(datetime), None) => {
                worksheet.write_datetime(row, column, datetime)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_kind_follows_fixed_name_sets() {
        assert_eq!(ColumnKind::for_field("eventDate"), ColumnKind::Date);
        assert_eq!(ColumnKind::for_field("end_date"), ColumnKind::Date);
        assert_eq!(ColumnKind::for_field("start_time"), ColumnKind::Time);
        assert_eq!(ColumnKind::for_field("eventdate"), ColumnKind::Plain);
    }

    #[test]
    fn dates_and_times_are_parsed() {
        let date = prepare_cell(&"2022-07-22".into(), ColumnKind::Date, 0).unwrap();
        let time = prepare_cell(&"13:45:10".into(), ColumnKind::Time, 0).unwrap();
        assert!(matches!(date, PreparedCell::DateTime(_)));
        assert!(matches!(time, PreparedCell::DateTime(_)));
    }

    #[test]
    fn unparseable_date_reports_row_and_value() {
        let mut table = DataTable::new(["eventDate"]);
        table.push_row(vec!["2022-07-22".into()]);
        table.push_row(vec!["yesterday".into()]);

        let reason = prepare_column(&table, 0, ColumnKind::Date).unwrap_err();
        assert_eq!(
            reason,
            SkipReason::UnparseableValue {
                row: 1,
                value: "yesterday".to_string()
            }
        );
    }

    #[test]
    fn overlong_text_rejects_column_before_writing() {
        let mut table = DataTable::new(["eventRemarks"]);
        table.push_row(vec!["first ok".into()]);
        table.push_row(vec!["x".repeat(40_000).into()]);

        let reason = prepare_column(&table, 0, ColumnKind::Plain).unwrap_err();
        assert_eq!(
            reason,
            SkipReason::TooLong {
                row: 1,
                length: 40_000
            }
        );
    }

    #[test]
    fn text_at_cell_limit_is_kept() {
        let text = "y".repeat(CELL_TEXT_LIMIT);
        assert!(matches!(
            prepare_cell(&text.as_str().into(), ColumnKind::Plain, 0),
            Ok(PreparedCell::Text(kept)) if kept.len() == CELL_TEXT_LIMIT
        ));
    }

    #[test]
    fn blanks_and_plain_values_pass_through() {
        let number = 78.2;
        assert!(matches!(
            prepare_cell(&CellValue::Empty, ColumnKind::Date, 0),
            Ok(PreparedCell::Blank)
        ));
        assert!(matches!(
            prepare_cell(&CellValue::Bool(true), ColumnKind::Plain, 0),
            Ok(PreparedCell::Bool(true))
        ));
        assert!(matches!(
            prepare_cell(&CellValue::Number(number), ColumnKind::Plain, 0),
            Ok(PreparedCell::Number(written)) if written == number
        ));
        assert!(matches!(
            prepare_cell(&CellValue::Bool(false), ColumnKind::Time, 3),
            Err(SkipReason::UnparseableValue { row: 3, .. })
        ));
    }
}

use rust_xlsxwriter::Worksheet;

use super::variables::VariableSheet;
use super::{
    InstalledValidation, RenderReport, fit_cell_text, resolve_validation, to_data_validation,
};
use crate::nansen::tools::catalog::{CellFormat, FieldCatalog};
use crate::nansen::tools::error::Result;
use crate::nansen::tools::model::{CellValue, DataTable};

pub const METADATA_SHEET: &str = "Metadata";

/// Keys listed on the Metadata sheet, top to bottom.
pub const METADATA_FIELDS: [&str; 10] = [
    "title",
    "abstract",
    "pi_name",
    "pi_email",
    "pi_institution",
    "pi_address",
    "recordedBy",
    "projectID",
    "cruiseNumber",
    "vesselName",
];

const LABEL_COLUMN: u16 = 0;
const KEY_COLUMN: u16 = 1;
const VALUE_COLUMN: u16 = 2;

fn row_height(row: u32) -> f64 {
    match row {
        0 => 30.0,
        // Room for a free-text abstract.
        1 => 150.0,
        _ => 15.0,
    }
}

/// Builds the Metadata sheet: label, hidden key and value cell per row. Values
/// come from the first row of `metadata` when present and non-blank.
pub(crate) fn write_metadata_sheet(
    catalog: &FieldCatalog,
    metadata: Option<&DataTable>,
    variables: &mut VariableSheet,
    report: &mut RenderReport,
) -> Result<Worksheet> {
    let mut worksheet = Worksheet::new();
    worksheet.set_name(METADATA_SHEET)?;

    let parameter_format = CellFormat {
        right: Some(1),
        bottom: Some(1),
        bold: Some(false),
        text_wrap: Some(true),
        font_size: Some(12.0),
        bg_color: Some(0xB9F6F5),
        ..Default::default()
    }
    .with_default_font();
    let input_format = CellFormat {
        bold: Some(false),
        text_wrap: Some(true),
        ..Default::default()
    }
    .with_default_font();
    let parameter_format = parameter_format.to_format();

    worksheet.set_column_width(LABEL_COLUMN, 30)?;
    worksheet.set_column_width(VALUE_COLUMN, 50)?;
    worksheet.set_column_hidden(KEY_COLUMN)?;

    for (row, key) in METADATA_FIELDS.iter().enumerate() {
        let row = row as u32;
        let field = catalog.require(key)?;

        worksheet.write_string_with_format(
            row,
            LABEL_COLUMN,
            field.disp_name(),
            &parameter_format,
        )?;
        worksheet.write_string_with_format(row, KEY_COLUMN, field.name(), &parameter_format)?;

        let value_format = input_format.merge(field.cell_format()).to_format();
        let value = metadata
            .and_then(|table| table.value(key, 0))
            .filter(|value| !value.is_blank());
        let written = match value {
            Some(CellValue::Number(number)) => {
                worksheet.write_number_with_format(row, VALUE_COLUMN, *number, &value_format)?;
                number.to_string()
            }
            Some(CellValue::Bool(flag)) => {
                worksheet.write_boolean_with_format(row, VALUE_COLUMN, *flag, &value_format)?;
                flag.to_string()
            }
            Some(other) => {
                let text = fit_cell_text(&other.to_text());
                worksheet.write_string_with_format(row, VALUE_COLUMN, &text, &value_format)?;
                text
            }
            None => {
                worksheet.write_string_with_format(row, VALUE_COLUMN, "", &value_format)?;
                String::new()
            }
        };
        report.metadata_values.push((key.to_string(), written));

        if let Some(validation) = field.validation() {
            let resolved = resolve_validation(field, validation, variables)?;
            worksheet.add_data_validation(
                row,
                VALUE_COLUMN,
                row,
                VALUE_COLUMN,
                &to_data_validation(field.name(), &resolved)?,
            )?;
            report.validations.push(InstalledValidation {
                sheet: METADATA_SHEET.to_string(),
                field: field.name().to_string(),
                column: VALUE_COLUMN,
                first_row: row,
                last_row: row,
                validation: resolved,
            });
        }

        worksheet.set_row_height(row, row_height(row))?;
    }

    Ok(worksheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abstract_row_is_tallest() {
        assert_eq!(row_height(0), 30.0);
        assert_eq!(row_height(1), 150.0);
        assert!((2..10).all(|row| row_height(row) == 15.0));
    }
}

use rust_xlsxwriter::Worksheet;

use crate::nansen::tools::catalog::CellFormat;
use crate::nansen::tools::error::Result;

pub const CONVERSION_SHEET: &str = "Conversion";

/// Builds the coordinate conversion helper: a degrees/minutes/seconds block
/// and a degrees/decimal-minutes block, each with a live formula computing
/// decimal degrees from the cells beside the labels.
pub(crate) fn write_conversion_sheet() -> Result<Worksheet> {
    let mut worksheet = Worksheet::new();
    worksheet.set_name(CONVERSION_SHEET)?;

    let base = CellFormat {
        right: Some(1),
        bottom: Some(1),
        bold: Some(false),
        text_wrap: Some(true),
        font_size: Some(12.0),
        ..Default::default()
    }
    .with_default_font();
    let parameter_format = base
        .with_(CellFormat {
            bg_color: Some(0xB9F6F5),
            ..Default::default()
        })
        .to_format();
    let center_format = base
        .with_(CellFormat {
            valign: Some("vcenter".to_string()),
            bg_color: Some(0x23EEFF),
            ..Default::default()
        })
        .to_format();
    let output_format = base
        .with_(CellFormat {
            bg_color: Some(0xFF94E8),
            ..Default::default()
        })
        .to_format();

    for column in 0..=2 {
        worksheet.set_column_width(column, 30)?;
    }

    worksheet.write_string_with_format(1, 0, "Coordinate conversion", &parameter_format)?;

    worksheet.merge_range(2, 0, 2, 1, "Degree Minutes Seconds", &center_format)?;
    worksheet.write_string_with_format(3, 0, "Degrees", &parameter_format)?;
    worksheet.write_string_with_format(4, 0, "Minutes", &parameter_format)?;
    worksheet.write_string_with_format(5, 0, "Seconds", &parameter_format)?;
    worksheet.write_string_with_format(6, 0, "Decimal degrees", &output_format)?;
    worksheet.write_formula_with_format(6, 1, "=B4+B5/60+B6/3600", &output_format)?;

    worksheet.merge_range(7, 0, 7, 1, "Degree decimal minutes", &center_format)?;
    worksheet.write_string_with_format(8, 0, "Degrees", &parameter_format)?;
    worksheet.write_string_with_format(9, 0, "Decimal minutes", &parameter_format)?;
    worksheet.write_string_with_format(10, 0, "Decimal degrees", &output_format)?;
    worksheet.write_formula_with_format(10, 1, "=B9+B10/60", &output_format)?;

    Ok(worksheet)
}

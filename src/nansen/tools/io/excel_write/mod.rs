//! Workbook assembler.
//!
//! Renders one activity-log workbook from a [`FileDefinition`], a
//! [`FieldCatalog`] and optional tabular data and metadata. Sheets are built
//! as standalone [`Worksheet`]s and pushed into the workbook in their final
//! order: `Metadata`, `Data`, `Variables`, `Conversion`.

mod conversion;
mod data;
mod metadata;
mod variables;

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{
    DataValidation, DataValidationErrorStyle, DataValidationRule, ExcelDateTime, Formula,
    IntoDataValidationValue, Workbook,
};
use tracing::{debug, info, instrument};

use crate::nansen::tools::catalog::{
    Criterion, ErrorStyle, FieldCatalog, FieldSpec, Validation, ValidationKind,
};
use crate::nansen::tools::error::{Result, ToolError};
use crate::nansen::tools::model::{DataTable, FileDefinition};

pub use conversion::CONVERSION_SHEET;
pub use data::{
    DATA_SHEET, DATE_FIELDS, END_ROW, PARAMETER_ROW, PASTE_HINT, START_ROW, TIME_FIELDS, TITLE_ROW,
};
pub use metadata::{METADATA_FIELDS, METADATA_SHEET};
pub use variables::{VARIABLES_SHEET, table_name};

/// Excel limit on the title of a validation prompt or error box.
pub const TITLE_LIMIT: usize = 32;
/// Excel limit on the body of a validation prompt or error box.
pub const MESSAGE_LIMIT: usize = 255;
/// Excel limit on an inline list source, counted over the comma-joined values
/// with embedded quotes doubled.
pub const INLINE_LIST_LIMIT: usize = 255;
/// Excel limit on the text held by one cell.
pub const CELL_TEXT_LIMIT: usize = 32_767;
/// Last zero-based worksheet row.
pub const MAX_ROW: u32 = 1_048_575;

const MAX_COLUMNS: usize = 16_384;

/// Which optional sheets to include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub include_metadata: bool,
    pub include_conversions: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
            include_conversions: true,
        }
    }
}

/// A validation rule as it was installed in the workbook, after long lists
/// were relocated and texts fitted to Excel's limits.
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledValidation {
    pub sheet: String,
    pub field: String,
    pub column: u16,
    pub first_row: u32,
    pub last_row: u32,
    pub validation: Validation,
}

/// A validation list moved to the Variables sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct LongList {
    pub field: String,
    pub table_name: String,
    pub column: u16,
    /// Values in the order they were written, sorted case-insensitively.
    pub values: Vec<String>,
}

/// Why supplied data for a column did not make it into the Data sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The data has a column the layout does not include.
    NotInLayout,
    /// A value could not be converted to the column's date or time type.
    UnparseableValue { row: usize, value: String },
    /// A text value is longer than a cell can hold.
    TooLong { row: usize, length: usize },
    /// The data has more rows than fit below the parameter row.
    TooManyRows { rows: usize },
    /// The writer rejected a cell.
    Writer(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedColumn {
    pub column: String,
    pub reason: SkipReason,
}

/// Everything a render produced, for callers and tests to inspect.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub path: PathBuf,
    /// Sheet names in workbook order.
    pub sheets: Vec<String>,
    /// Data sheet field keys in column order.
    pub columns: Vec<String>,
    pub validations: Vec<InstalledValidation>,
    pub long_lists: Vec<LongList>,
    pub skipped_columns: Vec<SkippedColumn>,
    /// Metadata keys and the text written to their value cell.
    pub metadata_values: Vec<(String, String)>,
    /// Number of data rows written below the parameter row.
    pub data_rows: usize,
}

impl RenderReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            sheets: Vec::new(),
            columns: Vec::new(),
            validations: Vec::new(),
            long_lists: Vec::new(),
            skipped_columns: Vec::new(),
            metadata_values: Vec::new(),
            data_rows: 0,
        }
    }

    /// Validation installed on the given sheet for the given field.
    pub fn validation_for(&self, sheet: &str, field: &str) -> Option<&InstalledValidation> {
        self.validations
            .iter()
            .find(|installed| installed.sheet == sheet && installed.field == field)
    }

    pub fn long_list_for(&self, field: &str) -> Option<&LongList> {
        self.long_lists.iter().find(|list| list.field == field)
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata_values
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Renders the workbook described by `file_def` to `path`.
///
/// Unknown field names are configuration errors and abort the render before
/// anything is written. Data columns that cannot be written are skipped and
/// listed in [`RenderReport::skipped_columns`].
#[instrument(
    level = "info",
    skip_all,
    fields(output = %path.display(), columns = file_def.fields.len())
)]
pub fn render(
    path: &Path,
    file_def: &FileDefinition,
    catalog: &FieldCatalog,
    options: &RenderOptions,
    data: Option<&DataTable>,
    metadata: Option<&DataTable>,
) -> Result<RenderReport> {
    let mut report = RenderReport::new(path);
    let mut variables = variables::VariableSheet::new();

    let metadata_sheet = if options.include_metadata {
        Some(metadata::write_metadata_sheet(
            catalog,
            metadata,
            &mut variables,
            &mut report,
        )?)
    } else {
        None
    };
    let data_sheet = data::write_data_sheet(file_def, catalog, data, &mut variables, &mut report)?;
    let conversion_sheet = if options.include_conversions {
        Some(conversion::write_conversion_sheet()?)
    } else {
        None
    };

    let mut workbook = Workbook::new();
    let sheets = [
        metadata_sheet.map(|sheet| (METADATA_SHEET, sheet)),
        Some((DATA_SHEET, data_sheet)),
        variables
            .into_worksheet(&mut report)?
            .map(|sheet| (VARIABLES_SHEET, sheet)),
        conversion_sheet.map(|sheet| (CONVERSION_SHEET, sheet)),
    ];
    for (name, sheet) in sheets.into_iter().flatten() {
        report.sheets.push(name.to_string());
        workbook.push_worksheet(sheet);
    }

    workbook.save(path)?;
    info!(
        sheets = report.sheets.len(),
        data_rows = report.data_rows,
        skipped = report.skipped_columns.len(),
        "workbook written"
    );
    Ok(report)
}

/// Writes a workbook for `fields`, deriving the file definition from the
/// output path: the name is the file stem and the display title is empty.
pub fn write_file(
    path: &Path,
    fields: &[String],
    catalog: &FieldCatalog,
    options: &RenderOptions,
    data: Option<&DataTable>,
    metadata: Option<&DataTable>,
) -> Result<RenderReport> {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_def = FileDefinition::new(name, "", fields.iter().cloned());
    render(path, &file_def, catalog, options, data, metadata)
}

/// Converts a zero-based position into a worksheet column.
pub(crate) fn column_index(position: usize) -> Result<u16> {
    if position >= MAX_COLUMNS {
        return Err(ToolError::InvalidWorkbook(format!(
            "column {position} exceeds Excel's {MAX_COLUMNS} column limit"
        )));
    }
    Ok(position as u16)
}

/// Truncates a prompt or error body to Excel's limit, marking the cut with an
/// ellipsis.
pub fn fit_message(text: &str) -> String {
    truncate_with_ellipsis(text, MESSAGE_LIMIT)
}

/// Truncates cell text to Excel's limit, marking the cut with an ellipsis.
pub fn fit_cell_text(text: &str) -> String {
    truncate_with_ellipsis(text, CELL_TEXT_LIMIT)
}

fn truncate_with_ellipsis(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let mut fitted: String = text.chars().take(limit - 3).collect();
        fitted.push_str("...");
        fitted
    } else {
        text.to_string()
    }
}

/// Truncates a prompt or error title to Excel's limit.
pub fn fit_title(text: &str) -> String {
    text.chars().take(TITLE_LIMIT).collect()
}

fn fit_texts(validation: &Validation) -> Validation {
    Validation {
        input_title: validation.input_title.as_deref().map(fit_title),
        input_message: validation.input_message.as_deref().map(fit_message),
        error_title: validation.error_title.as_deref().map(fit_title),
        error_message: validation.error_message.as_deref().map(fit_message),
        ..validation.clone()
    }
}

/// Whether an inline list is too long for Excel to hold in the rule itself.
/// Quotes count twice since the writer escapes them by doubling.
fn exceeds_inline_limit(values: &[String]) -> bool {
    let joined: usize = values
        .iter()
        .flat_map(|value| value.chars())
        .map(|ch| if ch == '"' { 2 } else { 1 })
        .sum::<usize>()
        + values.len().saturating_sub(1);
    joined > INLINE_LIST_LIMIT
}

/// Resolves the rule a field installs: long lists (flagged, or too long to
/// inline) move to the Variables sheet and are referenced by table name.
pub(crate) fn resolve_validation(
    field: &FieldSpec,
    validation: &Validation,
    variables: &mut variables::VariableSheet,
) -> Result<Validation> {
    let mut resolved = fit_texts(validation);
    if let ValidationKind::InlineList(values) = &validation.kind
        && (field.long_list() || exceeds_inline_limit(values))
    {
        let reference = variables.add_list(field.name(), values)?;
        debug!(field = field.name(), %reference, "validation list moved to variables sheet");
        resolved.kind = ValidationKind::NamedRangeList(reference);
    }
    Ok(resolved)
}

fn criterion_rule<T: IntoDataValidationValue>(criterion: Criterion<T>) -> DataValidationRule<T> {
    match criterion {
        Criterion::Between(low, high) => DataValidationRule::Between(low, high),
        Criterion::NotBetween(low, high) => DataValidationRule::NotBetween(low, high),
        Criterion::EqualTo(value) => DataValidationRule::EqualTo(value),
        Criterion::NotEqualTo(value) => DataValidationRule::NotEqualTo(value),
        Criterion::GreaterThan(value) => DataValidationRule::GreaterThan(value),
        Criterion::LessThan(value) => DataValidationRule::LessThan(value),
        Criterion::GreaterThanOrEqualTo(value) => DataValidationRule::GreaterThanOrEqualTo(value),
        Criterion::LessThanOrEqualTo(value) => DataValidationRule::LessThanOrEqualTo(value),
    }
}

fn datetime_rule(
    field: &str,
    criterion: &Criterion<String>,
) -> Result<DataValidationRule<ExcelDateTime>> {
    let converted = criterion.clone().try_map(|text| {
        ExcelDateTime::parse_from_str(&text).map_err(|error| {
            ToolError::InvalidField(format!(
                "field '{field}': bad date/time operand '{text}': {error}"
            ))
        })
    })?;
    Ok(criterion_rule(converted))
}

/// Builds the writer's validation object from a resolved rule.
pub(crate) fn to_data_validation(field: &str, validation: &Validation) -> Result<DataValidation> {
    let mut rule = match &validation.kind {
        ValidationKind::Any => DataValidation::new().allow_any_value(),
        ValidationKind::InlineList(values) => {
            DataValidation::new().allow_list_strings(values.as_slice())?
        }
        ValidationKind::NamedRangeList(reference) => {
            DataValidation::new().allow_list_formula(Formula::new(reference))
        }
        ValidationKind::WholeNumber(criterion) => {
            DataValidation::new().allow_whole_number(criterion_rule(criterion.clone()))
        }
        ValidationKind::Decimal(criterion) => {
            DataValidation::new().allow_decimal_number(criterion_rule(criterion.clone()))
        }
        ValidationKind::Date(criterion) => {
            DataValidation::new().allow_date(datetime_rule(field, criterion)?)
        }
        ValidationKind::Time(criterion) => {
            DataValidation::new().allow_time(datetime_rule(field, criterion)?)
        }
        ValidationKind::TextLength(criterion) => {
            DataValidation::new().allow_text_length(criterion_rule(criterion.clone()))
        }
        ValidationKind::Custom(formula) => {
            DataValidation::new().allow_custom(Formula::new(formula))
        }
    };

    if let Some(title) = &validation.input_title {
        rule = rule.set_input_title(title)?;
    }
    if let Some(message) = &validation.input_message {
        rule = rule.set_input_message(message)?;
    }
    if let Some(title) = &validation.error_title {
        rule = rule.set_error_title(title)?;
    }
    if let Some(message) = &validation.error_message {
        rule = rule.set_error_message(message)?;
    }

    let style = match validation.error_style {
        ErrorStyle::Stop => DataValidationErrorStyle::Stop,
        ErrorStyle::Warning => DataValidationErrorStyle::Warning,
        ErrorStyle::Information => DataValidationErrorStyle::Information,
    };
    Ok(rule.set_error_style(style).ignore_blank(validation.ignore_blank))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_messages_are_cut_with_ellipsis() {
        let message = "x".repeat(300);
        let fitted = fit_message(&message);
        assert_eq!(fitted.chars().count(), 255);
        assert!(fitted.ends_with("..."));
        assert_eq!(&fitted[..252], &message[..252]);

        assert_eq!(fit_message(&"y".repeat(255)), "y".repeat(255));
    }

    #[test]
    fn titles_are_cut_without_ellipsis() {
        assert_eq!(fit_title(&"t".repeat(40)), "t".repeat(32));
        assert_eq!(fit_title("Gear Type"), "Gear Type");
    }

    #[test]
    fn inline_limit_counts_separators() {
        let fits: Vec<String> = vec!["a".repeat(127), "b".repeat(127)];
        let too_long: Vec<String> = vec!["a".repeat(128), "b".repeat(127)];
        assert!(!exceeds_inline_limit(&fits));
        assert!(exceeds_inline_limit(&too_long));
    }

    #[test]
    fn inline_limit_counts_escaped_quotes() {
        // 254 characters raw, 304 once the writer doubles the quotes.
        let quoted: Vec<String> = (0..5)
            .map(|_| format!("{}{}", "\"".repeat(10), "a".repeat(40)))
            .collect();
        assert!(exceeds_inline_limit(&quoted));

        let plain: Vec<String> = (0..5).map(|_| "a".repeat(50)).collect();
        assert!(!exceeds_inline_limit(&plain));
    }

    #[test]
    fn quoted_list_is_relocated_and_accepted_by_writer() {
        let values: Vec<String> = (0..5)
            .map(|index| format!("{}{index:0>40}", "\"".repeat(10)))
            .collect();
        let field = FieldSpec::builder("remark", "Remark")
            .validation(Validation::new(ValidationKind::InlineList(values.clone())))
            .build();
        let mut variables = variables::VariableSheet::new();

        let resolved =
            resolve_validation(&field, field.validation().unwrap(), &mut variables).unwrap();
        assert_eq!(
            resolved.kind,
            ValidationKind::NamedRangeList("=INDIRECT(\"Table_Remark\")".to_string())
        );
        assert!(to_data_validation("remark", &resolved).is_ok());
    }

    #[test]
    fn cell_text_is_cut_to_cell_limit() {
        let fitted = fit_cell_text(&"z".repeat(40_000));
        assert_eq!(fitted.chars().count(), CELL_TEXT_LIMIT);
        assert!(fitted.ends_with("..."));
        assert_eq!(fit_cell_text("short"), "short");
    }

    #[test]
    fn every_rule_kind_converts() {
        let kinds = [
            ValidationKind::Any,
            ValidationKind::InlineList(vec!["a".into(), "b".into()]),
            ValidationKind::NamedRangeList("=INDIRECT(\"Table_Gear\")".into()),
            ValidationKind::WholeNumber(Criterion::GreaterThan(0)),
            ValidationKind::Decimal(Criterion::Between(-90.0, 90.0)),
            ValidationKind::Date(Criterion::Between("2000-01-01".into(), "2099-12-31".into())),
            ValidationKind::Time(Criterion::LessThan("23:59:59".into())),
            ValidationKind::TextLength(Criterion::LessThanOrEqualTo(10)),
            ValidationKind::Custom("=ISNUMBER(A4)".into()),
        ];
        for kind in kinds {
            let validation = Validation::new(kind).with_input("Title", "Message");
            assert!(to_data_validation("test", &validation).is_ok());
        }
    }

    #[test]
    fn bad_date_operand_names_the_field() {
        let validation = Validation::new(ValidationKind::Date(Criterion::EqualTo("soon".into())));
        let error = to_data_validation("eventDate", &validation)
            .err()
            .expect("expected an error");
        assert!(matches!(error, ToolError::InvalidField(message) if message.contains("eventDate")));
    }
}

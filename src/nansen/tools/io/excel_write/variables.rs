use std::collections::HashSet;

use rust_xlsxwriter::{Table, Worksheet};

use super::{LongList, RenderReport, column_index};
use crate::nansen::tools::error::Result;

pub const VARIABLES_SHEET: &str = "Variables";

/// Name of the table backing a variable's validation list: `Table_` plus the
/// capitalised key, with anything that is not a letter, digit, `_` or `.`
/// (spaces included) replaced by `_`.
pub fn table_name(variable: &str) -> String {
    let sanitized: String = variable
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                ch
            } else {
                '_'
            }
        })
        .collect();

    let mut chars = sanitized.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    };
    format!("Table_{capitalized}")
}

/// The hidden sheet holding one column per long validation list. Each column
/// has the variable name in row 0 and its sorted values below, wrapped in a
/// header-less table that validation rules reference by name.
pub(crate) struct VariableSheet {
    worksheet: Worksheet,
    current_column: usize,
    used_names: HashSet<String>,
    lists: Vec<LongList>,
}

impl VariableSheet {
    pub(crate) fn new() -> Self {
        Self {
            worksheet: Worksheet::new(),
            current_column: 0,
            used_names: HashSet::new(),
            lists: Vec::new(),
        }
    }

    /// Writes `values` into the next free column and returns the formula
    /// that references them, e.g. `=INDIRECT("Table_Geartype")`.
    pub(crate) fn add_list(&mut self, variable: &str, values: &[String]) -> Result<String> {
        let column = column_index(self.current_column)?;

        let mut name = table_name(variable);
        if self.used_names.contains(&name) {
            let base = name.clone();
            let mut suffix = 2;
            while self.used_names.contains(&name) {
                name = format!("{base}_{suffix}");
                suffix += 1;
            }
        }
        self.used_names.insert(name.clone());

        let mut sorted = values.to_vec();
        sorted.sort_by_key(|value| value.to_lowercase());

        self.worksheet.write_string(0, column, variable)?;
        for (offset, value) in sorted.iter().enumerate() {
            self.worksheet
                .write_string(1 + offset as u32, column, value)?;
        }

        let table = Table::new()
            .set_name(&name)
            .set_header_row(false)
            .set_autofilter(false);
        self.worksheet
            .add_table(1, column, sorted.len() as u32, column, &table)?;

        self.current_column += 1;
        self.lists.push(LongList {
            field: variable.to_string(),
            table_name: name.clone(),
            column,
            values: sorted,
        });

        Ok(format!("=INDIRECT(\"{name}\")"))
    }

    /// Finishes the sheet. Returns `None` when no list was registered, in
    /// which case the workbook gets no Variables sheet at all.
    pub(crate) fn into_worksheet(mut self, report: &mut RenderReport) -> Result<Option<Worksheet>> {
        if self.lists.is_empty() {
            return Ok(None);
        }
        self.worksheet.set_name(VARIABLES_SHEET)?;
        self.worksheet.set_hidden(true);
        report.long_lists.append(&mut self.lists);
        Ok(Some(self.worksheet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_follow_capitalisation_rules() {
        assert_eq!(table_name("habitat"), "Table_Habitat");
        assert_eq!(table_name("gearType"), "Table_Geartype");
        assert_eq!(table_name("sample type"), "Table_Sample_type");
        assert_eq!(table_name("pH/level"), "Table_Ph_level");
    }

    #[test]
    fn lists_are_sorted_case_insensitively_into_successive_columns() {
        let mut sheet = VariableSheet::new();
        let first = sheet
            .add_list("habitat", &["sea ice".into(), "Benthic".into(), "pelagic".into()])
            .unwrap();
        let second = sheet.add_list("gear", &["b".into(), "A".into()]).unwrap();

        assert_eq!(first, "=INDIRECT(\"Table_Habitat\")");
        assert_eq!(second, "=INDIRECT(\"Table_Gear\")");
        assert_eq!(sheet.lists[0].values, vec!["Benthic", "pelagic", "sea ice"]);
        assert_eq!(sheet.lists[0].column, 0);
        assert_eq!(sheet.lists[1].values, vec!["A", "b"]);
        assert_eq!(sheet.lists[1].column, 1);
    }

    #[test]
    fn colliding_names_get_a_suffix() {
        let mut sheet = VariableSheet::new();
        sheet.add_list("gear type", &["a".into()]).unwrap();
        let reference = sheet.add_list("gear_type", &["b".into()]).unwrap();
        assert_eq!(reference, "=INDIRECT(\"Table_Gear_type_2\")");
    }

    #[test]
    fn empty_sheet_is_dropped() {
        let mut report = RenderReport::new(std::path::Path::new("unused.xlsx"));
        let sheet = VariableSheet::new();
        assert!(sheet.into_worksheet(&mut report).unwrap().is_none());
        assert!(report.long_lists.is_empty());
    }
}

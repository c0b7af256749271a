use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single cell of tabular input data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    /// Missing value; nothing is written for it.
    Empty,
    /// Plain text.
    Text(String),
    /// Floating point number.
    Number(f64),
    /// Boolean literal.
    Bool(bool),
}

impl CellValue {
    /// Converts a JSON scalar into a cell. Nested arrays and objects are kept
    /// as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(value) => CellValue::Bool(*value),
            Value::Number(number) => number
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or_else(|| CellValue::Text(number.to_string())),
            Value::String(value) => CellValue::Text(value.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    /// Returns true when the cell carries no usable content.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(value) => value.trim().is_empty(),
            _ => false,
        }
    }

    /// Renders the cell as text, the way it would appear in a metadata value
    /// cell.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(value) => value.clone(),
            CellValue::Number(value) => value.to_string(),
            CellValue::Bool(value) => value.to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// Column-named tabular data, e.g. the flattened activity log or the single
/// cruise metadata record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl DataTable {
    /// Creates an empty table with the given column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row. Short rows are padded with empty cells and long rows
    /// truncated to the column count.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Iterates over the values of one column, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> {
        self.rows
            .iter()
            .map(move |row| row.get(index).unwrap_or(&CellValue::Empty))
    }

    /// Returns the value of `column` in the given row, if present.
    pub fn value(&self, column: &str, row: usize) -> Option<&CellValue> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|cells| cells.get(index))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Describes one output workbook: its name, the title shown on the Data
/// sheet, and the ordered field keys that become the Data sheet columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDefinition {
    pub name: String,
    pub disp_name: String,
    pub fields: Vec<String>,
}

impl FileDefinition {
    pub fn new<I, S>(name: impl Into<String>, disp_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            disp_name: disp_name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_rows_are_padded() {
        let mut table = DataTable::new(["a", "b", "c"]);
        table.push_row(vec!["x".into()]);
        assert_eq!(
            table.rows[0],
            vec![CellValue::from("x"), CellValue::Empty, CellValue::Empty]
        );
        assert_eq!(table.value("c", 0), Some(&CellValue::Empty));
        assert_eq!(table.value("missing", 0), None);
    }

    #[test]
    fn json_scalars_map_to_cells() {
        assert_eq!(CellValue::from_json(&Value::Null), CellValue::Empty);
        assert_eq!(
            CellValue::from_json(&serde_json::json!(78.5)),
            CellValue::Number(78.5)
        );
        assert_eq!(
            CellValue::from_json(&serde_json::json!([1, 2])),
            CellValue::Text("[1,2]".to_string())
        );
        assert!(CellValue::from("  ").is_blank());
    }
}

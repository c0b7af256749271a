//! Validation rules attached to catalog fields.
//!
//! Rules are read from the xlsxwriter `data_validation` option vocabulary
//! (`validate`, `criteria`, `value`, `minimum`, `maximum`, `source`, ...)
//! and kept independent of the writer until a workbook is rendered.

use serde_json::{Map, Value};

use crate::nansen::tools::error::{Result, ToolError};

/// Comparison applied by numeric, date, time and length rules.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion<T> {
    Between(T, T),
    NotBetween(T, T),
    EqualTo(T),
    NotEqualTo(T),
    GreaterThan(T),
    LessThan(T),
    GreaterThanOrEqualTo(T),
    LessThanOrEqualTo(T),
}

impl<T> Criterion<T> {
    /// Converts the operands, keeping the comparison.
    pub fn try_map<U, E>(
        self,
        mut convert: impl FnMut(T) -> std::result::Result<U, E>,
    ) -> std::result::Result<Criterion<U>, E> {
        Ok(match self {
            Criterion::Between(low, high) => Criterion::Between(convert(low)?, convert(high)?),
            Criterion::NotBetween(low, high) => {
                Criterion::NotBetween(convert(low)?, convert(high)?)
            }
            Criterion::EqualTo(value) => Criterion::EqualTo(convert(value)?),
            Criterion::NotEqualTo(value) => Criterion::NotEqualTo(convert(value)?),
            Criterion::GreaterThan(value) => Criterion::GreaterThan(convert(value)?),
            Criterion::LessThan(value) => Criterion::LessThan(convert(value)?),
            Criterion::GreaterThanOrEqualTo(value) => {
                Criterion::GreaterThanOrEqualTo(convert(value)?)
            }
            Criterion::LessThanOrEqualTo(value) => Criterion::LessThanOrEqualTo(convert(value)?),
        })
    }
}

/// What a cell is allowed to contain.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationKind {
    Any,
    /// Dropdown backed by a list embedded in the rule itself.
    InlineList(Vec<String>),
    /// Dropdown backed by a formula reference, e.g. `=INDIRECT("Table_Gear")`.
    NamedRangeList(String),
    WholeNumber(Criterion<i32>),
    Decimal(Criterion<f64>),
    /// Operands are ISO dates (`yyyy-mm-dd`).
    Date(Criterion<String>),
    /// Operands are ISO times (`hh:mm[:ss]`).
    Time(Criterion<String>),
    TextLength(Criterion<u32>),
    Custom(String),
}

/// How Excel reacts to a value that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorStyle {
    #[default]
    Stop,
    Warning,
    Information,
}

/// A complete validation rule: what is allowed plus the prompt and error
/// texts shown by Excel.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub kind: ValidationKind,
    pub input_title: Option<String>,
    pub input_message: Option<String>,
    pub error_title: Option<String>,
    pub error_message: Option<String>,
    pub error_style: ErrorStyle,
    pub ignore_blank: bool,
}

impl Validation {
    pub fn new(kind: ValidationKind) -> Self {
        Self {
            kind,
            input_title: None,
            input_message: None,
            error_title: None,
            error_message: None,
            error_style: ErrorStyle::default(),
            ignore_blank: true,
        }
    }

    pub fn with_input(mut self, title: impl Into<String>, message: impl Into<String>) -> Self {
        self.input_title = Some(title.into());
        self.input_message = Some(message.into());
        self
    }

    pub fn with_error(mut self, title: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_title = Some(title.into());
        self.error_message = Some(message.into());
        self
    }

    /// Values of an inline list rule, if this is one.
    pub fn list_source(&self) -> Option<&[String]> {
        match &self.kind {
            ValidationKind::InlineList(values) => Some(values),
            _ => None,
        }
    }

    /// Parses an xlsxwriter-style `data_validation` options object.
    pub fn from_json(field: &str, object: &Map<String, Value>) -> Result<Self> {
        let invalid =
            |message: String| ToolError::InvalidField(format!("field '{field}': {message}"));

        let validate = optional_str(object, "validate")
            .ok_or_else(|| invalid("validation is missing 'validate'".to_string()))?;

        let kind = match validate {
            "any" => ValidationKind::Any,
            "list" => {
                let source = object
                    .get("source")
                    .and_then(Value::as_array)
                    .ok_or_else(|| invalid("list validation needs a 'source' array".to_string()))?;
                if source.is_empty() {
                    return Err(invalid("list validation has an empty 'source'".to_string()));
                }
                let values = source
                    .iter()
                    .map(|item| match item {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                ValidationKind::InlineList(values)
            }
            "integer" => ValidationKind::WholeNumber(parse_criterion(object, |value| {
                value
                    .as_i64()
                    .and_then(|number| i32::try_from(number).ok())
            })
            .map_err(&invalid)?),
            "decimal" => {
                ValidationKind::Decimal(parse_criterion(object, Value::as_f64).map_err(&invalid)?)
            }
            "date" => ValidationKind::Date(parse_criterion(object, owned_str).map_err(&invalid)?),
            "time" => ValidationKind::Time(parse_criterion(object, owned_str).map_err(&invalid)?),
            "length" => ValidationKind::TextLength(parse_criterion(object, |value| {
                value
                    .as_u64()
                    .and_then(|number| u32::try_from(number).ok())
            })
            .map_err(&invalid)?),
            "custom" => {
                let formula = optional_str(object, "value").ok_or_else(|| {
                    invalid("custom validation needs a formula 'value'".to_string())
                })?;
                ValidationKind::Custom(formula.to_string())
            }
            other => return Err(invalid(format!("unsupported validate type '{other}'"))),
        };

        let error_style = match optional_str(object, "error_type") {
            None | Some("stop") => ErrorStyle::Stop,
            Some("warning") => ErrorStyle::Warning,
            Some("information") => ErrorStyle::Information,
            Some(other) => return Err(invalid(format!("unsupported error_type '{other}'"))),
        };

        Ok(Validation {
            kind,
            input_title: optional_str(object, "input_title").map(str::to_string),
            input_message: optional_str(object, "input_message").map(str::to_string),
            error_title: optional_str(object, "error_title").map(str::to_string),
            error_message: optional_str(object, "error_message").map(str::to_string),
            error_style,
            ignore_blank: object
                .get("ignore_blank")
                .and_then(Value::as_bool)
                .unwrap_or(true),
        })
    }
}

fn optional_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

fn owned_str(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn parse_criterion<T>(
    object: &Map<String, Value>,
    operand: impl Fn(&Value) -> Option<T>,
) -> std::result::Result<Criterion<T>, String> {
    let criteria = optional_str(object, "criteria").unwrap_or("between");

    let read = |key: &str| -> std::result::Result<T, String> {
        let value = object
            .get(key)
            .ok_or_else(|| format!("criteria '{criteria}' needs '{key}'"))?;
        operand(value).ok_or_else(|| format!("'{key}' has unsupported value {value}"))
    };

    Ok(match criteria {
        "between" => Criterion::Between(read("minimum")?, read("maximum")?),
        "not between" => Criterion::NotBetween(read("minimum")?, read("maximum")?),
        "==" | "equal to" => Criterion::EqualTo(read("value")?),
        "!=" | "not equal to" => Criterion::NotEqualTo(read("value")?),
        ">" | "greater than" => Criterion::GreaterThan(read("value")?),
        "<" | "less than" => Criterion::LessThan(read("value")?),
        ">=" | "greater than or equal to" => Criterion::GreaterThanOrEqualTo(read("value")?),
        "<=" | "less than or equal to" => Criterion::LessThanOrEqualTo(read("value")?),
        other => return Err(format!("unsupported criteria '{other}'")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<Validation> {
        let object = value.as_object().cloned().unwrap_or_default();
        Validation::from_json("test", &object)
    }

    #[test]
    fn decimal_between_with_prompts() {
        let validation = parse(json!({
            "validate": "decimal",
            "criteria": "between",
            "minimum": -90,
            "maximum": 90,
            "input_title": "Decimal Latitude",
            "input_message": "Latitude in degrees north",
            "error_type": "warning"
        }))
        .unwrap();

        assert_eq!(
            validation.kind,
            ValidationKind::Decimal(Criterion::Between(-90.0, 90.0))
        );
        assert_eq!(validation.input_title.as_deref(), Some("Decimal Latitude"));
        assert_eq!(validation.error_style, ErrorStyle::Warning);
        assert!(validation.ignore_blank);
    }

    #[test]
    fn list_keeps_source_order() {
        let validation = parse(json!({"validate": "list", "source": ["b", "A", 3]})).unwrap();
        assert_eq!(
            validation.list_source(),
            Some(&["b".to_string(), "A".to_string(), "3".to_string()][..])
        );
    }

    #[test]
    fn single_operand_criteria_use_value() {
        let validation =
            parse(json!({"validate": "length", "criteria": "<=", "value": 200})).unwrap();
        assert_eq!(
            validation.kind,
            ValidationKind::TextLength(Criterion::LessThanOrEqualTo(200))
        );
    }

    #[test]
    fn malformed_rules_are_configuration_errors() {
        for value in [
            json!({"source": ["a"]}),
            json!({"validate": "list", "source": []}),
            json!({"validate": "integer", "criteria": "between", "minimum": 1}),
            json!({"validate": "integer", "criteria": "roughly", "value": 1}),
            json!({"validate": "colour"}),
        ] {
            assert!(matches!(parse(value), Err(ToolError::InvalidField(_))));
        }
    }

    #[test]
    fn criterion_map_keeps_comparison() {
        let mapped: std::result::Result<Criterion<usize>, ()> =
            Criterion::Between("ab", "abcd").try_map(|text| Ok(text.len()));
        assert_eq!(mapped, Ok(Criterion::Between(2, 4)));
    }
}

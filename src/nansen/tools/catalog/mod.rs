//! Field catalog: the column definitions every generated workbook draws from.
//!
//! Raw descriptors are loosely typed JSON objects (`name`, `disp_name` and
//! optionally `valid`, `cell_format`, `width`, `long_list`). They are turned
//! into immutable [`FieldSpec`]s through [`FieldSpecBuilder`] with explicit
//! presence checks, then indexed by name in a [`FieldCatalog`].

pub mod format;
pub mod validation;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::nansen::tools::error::{Result, ToolError};

pub use format::CellFormat;
pub use validation::{Criterion, ErrorStyle, Validation, ValidationKind};

/// Catalog shipped with the binary.
const DEFAULT_CATALOG: &str = include_str!("fields.json");

/// Presentation and validation rules for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    name: String,
    disp_name: String,
    validation: Option<Validation>,
    cell_format: CellFormat,
    width: f64,
    long_list: bool,
}

impl FieldSpec {
    pub fn builder(name: impl Into<String>, disp_name: impl Into<String>) -> FieldSpecBuilder {
        FieldSpecBuilder::new(name, disp_name)
    }

    /// Internal key, written to the hidden parameter row.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column title shown to the user.
    pub fn disp_name(&self) -> &str {
        &self.disp_name
    }

    pub fn validation(&self) -> Option<&Validation> {
        self.validation.as_ref()
    }

    pub fn cell_format(&self) -> &CellFormat {
        &self.cell_format
    }

    /// Column width in Excel character units.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Whether the validation list lives on the Variables sheet.
    pub fn long_list(&self) -> bool {
        self.long_list
    }
}

/// Assembles a [`FieldSpec`]. Unset attributes keep their defaults: no
/// validation, an empty format, a width equal to the display name length and
/// `long_list = false`.
#[derive(Debug, Clone)]
pub struct FieldSpecBuilder {
    name: String,
    disp_name: String,
    validation: Option<Validation>,
    cell_format: CellFormat,
    width: Option<f64>,
    long_list: bool,
}

impl FieldSpecBuilder {
    pub fn new(name: impl Into<String>, disp_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            disp_name: disp_name.into(),
            validation: None,
            cell_format: CellFormat::default(),
            width: None,
            long_list: false,
        }
    }

    pub fn validation(mut self, validation: Validation) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn cell_format(mut self, cell_format: CellFormat) -> Self {
        self.cell_format = cell_format;
        self
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn long_list(mut self, long_list: bool) -> Self {
        self.long_list = long_list;
        self
    }

    pub fn build(self) -> FieldSpec {
        let width = self
            .width
            .unwrap_or_else(|| self.disp_name.chars().count() as f64);
        FieldSpec {
            name: self.name,
            disp_name: self.disp_name,
            validation: self.validation,
            cell_format: self.cell_format,
            width,
            long_list: self.long_list,
        }
    }

    /// Populates a builder from one raw descriptor object.
    pub fn from_descriptor(descriptor: &Value) -> Result<Self> {
        let object = descriptor.as_object().ok_or_else(|| {
            ToolError::InvalidField(format!("descriptor is not an object: {descriptor}"))
        })?;

        let name = required_str(object, "name", "<unnamed>")?;
        let disp_name = required_str(object, "disp_name", name)?;
        let mut builder = FieldSpecBuilder::new(name, disp_name);

        if let Some(valid) = object.get("valid") {
            let valid = valid.as_object().ok_or_else(|| {
                ToolError::InvalidField(format!("field '{name}': 'valid' must be an object"))
            })?;
            builder = builder.validation(Validation::from_json(name, valid)?);
        }
        if let Some(cell_format) = object.get("cell_format") {
            let cell_format = cell_format.as_object().ok_or_else(|| {
                ToolError::InvalidField(format!("field '{name}': 'cell_format' must be an object"))
            })?;
            builder = builder.cell_format(CellFormat::from_json(name, cell_format)?);
        }
        if let Some(width) = object.get("width") {
            let width = width
                .as_f64()
                .filter(|width| *width >= 0.0)
                .ok_or_else(|| {
                    ToolError::InvalidField(format!("field '{name}': 'width' must be a number"))
                })?;
            builder = builder.width(width);
        }
        if let Some(long_list) = object.get("long_list") {
            let long_list = long_list.as_bool().ok_or_else(|| {
                ToolError::InvalidField(format!("field '{name}': 'long_list' must be a boolean"))
            })?;
            builder = builder.long_list(long_list);
        }

        Ok(builder)
    }
}

fn required_str<'a>(object: &'a Map<String, Value>, key: &str, field: &str) -> Result<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidField(format!("field '{field}' is missing '{key}'")))
}

/// Field specifications indexed by name, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: Vec<FieldSpec>,
    index: HashMap<String, usize>,
}

impl FieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from raw descriptors, failing on the first malformed
    /// entry or repeated name.
    pub fn from_descriptors(descriptors: &[Value]) -> Result<Self> {
        let mut catalog = FieldCatalog::new();
        for descriptor in descriptors {
            catalog.insert(FieldSpecBuilder::from_descriptor(descriptor)?.build())?;
        }
        debug!(field_count = catalog.len(), "field catalog built");
        Ok(catalog)
    }

    /// Parses a JSON array of descriptors.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let json: Value = serde_json::from_str(source)?;
        let descriptors = json.as_array().ok_or_else(|| {
            ToolError::InvalidField("field catalog must be a JSON array".to_string())
        })?;
        Self::from_descriptors(descriptors)
    }

    /// Loads a catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.to_path_buf()));
        }
        let source = fs::read_to_string(path)?;
        Self::from_json_str(&source)
    }

    /// The catalog embedded in the binary. It covers the metadata sheet keys
    /// and every column the toktlogger client produces.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(DEFAULT_CATALOG)
    }

    pub fn insert(&mut self, spec: FieldSpec) -> Result<()> {
        if self.index.contains_key(spec.name()) {
            return Err(ToolError::DuplicateField(spec.name().to_string()));
        }
        self.index.insert(spec.name().to_string(), self.fields.len());
        self.fields.push(spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.index.get(name).map(|position| &self.fields[*position])
    }

    /// Looks up a field that a layout depends on.
    pub fn require(&self, name: &str) -> Result<&FieldSpec> {
        self.get(name)
            .ok_or_else(|| ToolError::UnknownField(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn width_defaults_to_display_name_length() {
        let catalog = FieldCatalog::from_descriptors(&[
            json!({"name": "eventDate", "disp_name": "Event Date"}),
            json!({"name": "stationName", "disp_name": "Station Name", "width": 25}),
            json!({"name": "sst", "disp_name": "Temperatur (°C)"}),
        ])
        .unwrap();

        assert_eq!(catalog.require("eventDate").unwrap().width(), 10.0);
        assert_eq!(catalog.require("stationName").unwrap().width(), 25.0);
        assert_eq!(catalog.require("sst").unwrap().width(), 15.0);
    }

    #[test]
    fn optional_keys_keep_defaults() {
        let catalog =
            FieldCatalog::from_descriptors(&[json!({"name": "comment", "disp_name": "Comment"})])
                .unwrap();
        let field = catalog.require("comment").unwrap();

        assert!(field.validation().is_none());
        assert!(field.cell_format().is_empty());
        assert!(!field.long_list());
    }

    #[test]
    fn full_descriptor_is_read() {
        let catalog = FieldCatalog::from_descriptors(&[json!({
            "name": "gearType",
            "disp_name": "Gear Type",
            "valid": {"validate": "list", "source": ["CTD", "Box corer"]},
            "cell_format": {"bold": true},
            "long_list": true
        })])
        .unwrap();
        let field = catalog.require("gearType").unwrap();

        assert!(field.long_list());
        assert_eq!(field.cell_format().bold, Some(true));
        assert_eq!(
            field.validation().and_then(Validation::list_source).map(<[String]>::len),
            Some(2)
        );
    }

    #[test]
    fn missing_name_or_display_name_fails() {
        let missing_name = FieldCatalog::from_descriptors(&[json!({"disp_name": "Event Date"})]);
        let missing_disp = FieldCatalog::from_descriptors(&[json!({"name": "eventDate"})]);
        let not_object = FieldCatalog::from_descriptors(&[json!("eventDate")]);

        assert!(matches!(missing_name, Err(ToolError::InvalidField(_))));
        assert!(matches!(missing_disp, Err(ToolError::InvalidField(_))));
        assert!(matches!(not_object, Err(ToolError::InvalidField(_))));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = FieldCatalog::from_descriptors(&[
            json!({"name": "a", "disp_name": "A"}),
            json!({"name": "a", "disp_name": "Again"}),
        ]);
        assert!(matches!(result, Err(ToolError::DuplicateField(name)) if name == "a"));
    }

    #[test]
    fn unknown_lookup_is_reported() {
        let catalog = FieldCatalog::new();
        assert!(matches!(catalog.require("nope"), Err(ToolError::UnknownField(_))));
    }

    #[test]
    fn builtin_catalog_loads() {
        let catalog = FieldCatalog::builtin().unwrap();
        for name in ["title", "abstract", "vesselName", "eventDate", "gearType"] {
            assert!(catalog.contains(name), "missing {name}");
        }
    }
}

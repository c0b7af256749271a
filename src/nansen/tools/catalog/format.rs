//! Cell format attributes carried by catalog fields.
//!
//! The attributes follow the xlsxwriter format vocabulary so catalog files
//! stay interchangeable with the ones used by the rest of the logging system.

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder};
use serde_json::{Map, Value};

use crate::nansen::tools::error::{Result, ToolError};

/// Font applied to every format the workbook writes.
pub const DEFAULT_FONT: &str = "Calibri";
/// Font size applied to every format the workbook writes.
pub const DEFAULT_SIZE: f64 = 10.0;

/// Optional style attributes. Absent attributes fall back to whatever the
/// format is merged onto.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellFormat {
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub text_wrap: Option<bool>,

    /// Horizontal alignment keyword (`left`, `center`, ...).
    pub align: Option<String>,
    /// Vertical alignment keyword (`top`, `vcenter`, ...).
    pub valign: Option<String>,

    pub num_format: Option<String>,
    /// Background fill as `0xRRGGBB`.
    pub bg_color: Option<u32>,
    /// Font colour as `0xRRGGBB`.
    pub font_color: Option<u32>,

    /// Border style index for all sides.
    pub border: Option<u8>,
    pub top: Option<u8>,
    pub bottom: Option<u8>,
    pub left: Option<u8>,
    pub right: Option<u8>,
}

impl CellFormat {
    /// Parses an xlsxwriter-style format object. Unknown keys are ignored.
    pub fn from_json(field: &str, object: &Map<String, Value>) -> Result<Self> {
        let invalid = |key: &str, value: &Value| {
            ToolError::InvalidField(format!(
                "field '{field}': cell_format.{key} has unsupported value {value}"
            ))
        };

        let mut format = CellFormat::default();
        for (key, value) in object {
            let bad = || invalid(key, value);
            let text = || value.as_str().map(str::to_string).ok_or_else(bad);
            match key.as_str() {
                "font_name" => format.font_name = Some(text()?),
                "font_size" => format.font_size = Some(value.as_f64().ok_or_else(bad)?),
                "bold" => format.bold = Some(flag(value).ok_or_else(bad)?),
                "italic" => format.italic = Some(flag(value).ok_or_else(bad)?),
                "text_wrap" => format.text_wrap = Some(flag(value).ok_or_else(bad)?),
                "align" => format.align = Some(text()?),
                "valign" => format.valign = Some(text()?),
                "num_format" => format.num_format = Some(text()?),
                "bg_color" => format.bg_color = Some(parse_color(value).ok_or_else(bad)?),
                "font_color" => format.font_color = Some(parse_color(value).ok_or_else(bad)?),
                "border" => format.border = Some(border_index(value).ok_or_else(bad)?),
                "top" => format.top = Some(border_index(value).ok_or_else(bad)?),
                "bottom" => format.bottom = Some(border_index(value).ok_or_else(bad)?),
                "left" => format.left = Some(border_index(value).ok_or_else(bad)?),
                "right" => format.right = Some(border_index(value).ok_or_else(bad)?),
                _ => {}
            }
        }
        Ok(format)
    }

    pub fn is_empty(&self) -> bool {
        *self == CellFormat::default()
    }

    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: CellFormat) -> CellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &CellFormat) -> CellFormat {
        CellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            text_wrap: other.text_wrap.or(self.text_wrap),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.or(self.bg_color),
            font_color: other.font_color.or(self.font_color),
            border: other.border.or(self.border),
            top: other.top.or(self.top),
            bottom: other.bottom.or(self.bottom),
            left: other.left.or(self.left),
            right: other.right.or(self.right),
        }
    }

    /// Fills in the default font name and size when the format has none.
    pub fn with_default_font(&self) -> CellFormat {
        CellFormat {
            font_name: Some(DEFAULT_FONT.to_string()),
            font_size: Some(DEFAULT_SIZE),
            ..Default::default()
        }
        .merge(self)
    }

    /// Builds the writer format.
    pub fn to_format(&self) -> Format {
        let mut format = Format::new();

        if let Some(name) = &self.font_name {
            format = format.set_font_name(name);
        }
        if let Some(size) = self.font_size {
            format = format.set_font_size(size);
        }
        if self.bold == Some(true) {
            format = format.set_bold();
        }
        if self.italic == Some(true) {
            format = format.set_italic();
        }
        if self.text_wrap == Some(true) {
            format = format.set_text_wrap();
        }
        if let Some(align) = self.align.as_deref().and_then(horizontal_align) {
            format = format.set_align(align);
        }
        if let Some(align) = self.valign.as_deref().and_then(vertical_align) {
            format = format.set_align(align);
        }
        if let Some(num_format) = &self.num_format {
            format = format.set_num_format(num_format);
        }
        if let Some(rgb) = self.bg_color {
            format = format.set_background_color(Color::RGB(rgb));
        }
        if let Some(rgb) = self.font_color {
            format = format.set_font_color(Color::RGB(rgb));
        }
        if let Some(index) = self.border {
            format = format.set_border(border_style(index));
        }
        if let Some(index) = self.top {
            format = format.set_border_top(border_style(index));
        }
        if let Some(index) = self.bottom {
            format = format.set_border_bottom(border_style(index));
        }
        if let Some(index) = self.left {
            format = format.set_border_left(border_style(index));
        }
        if let Some(index) = self.right {
            format = format.set_border_right(border_style(index));
        }

        format
    }
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_i64().map(|n| n != 0),
        _ => None,
    }
}

// xlsxwriter accepts `true` as shorthand for a thin border.
fn border_index(value: &Value) -> Option<u8> {
    match value {
        Value::Bool(true) => Some(1),
        Value::Bool(false) => Some(0),
        Value::Number(number) => number
            .as_u64()
            .filter(|index| *index <= 13)
            .map(|index| index as u8),
        _ => None,
    }
}

fn parse_color(value: &Value) -> Option<u32> {
    let text = value.as_str()?.trim();
    if let Some(hex) = text.strip_prefix('#') {
        return (hex.len() == 6)
            .then(|| u32::from_str_radix(hex, 16).ok())
            .flatten();
    }
    let rgb = match text.to_ascii_lowercase().as_str() {
        "black" => 0x000000,
        "blue" => 0x0000FF,
        "brown" => 0x800000,
        "cyan" => 0x00FFFF,
        "gray" | "grey" => 0x808080,
        "green" => 0x008000,
        "lime" => 0x00FF00,
        "magenta" => 0xFF00FF,
        "navy" => 0x000080,
        "orange" => 0xFF6600,
        "pink" => 0xFF00FF,
        "purple" => 0x800080,
        "red" => 0xFF0000,
        "silver" => 0xC0C0C0,
        "white" => 0xFFFFFF,
        "yellow" => 0xFFFF00,
        _ => return None,
    };
    Some(rgb)
}

fn horizontal_align(keyword: &str) -> Option<FormatAlign> {
    Some(match keyword {
        "left" => FormatAlign::Left,
        "center" | "centre" => FormatAlign::Center,
        "right" => FormatAlign::Right,
        "fill" => FormatAlign::Fill,
        "justify" => FormatAlign::Justify,
        "center_across" | "centre_across" => FormatAlign::CenterAcross,
        "distributed" => FormatAlign::Distributed,
        _ => return None,
    })
}

fn vertical_align(keyword: &str) -> Option<FormatAlign> {
    Some(match keyword {
        "top" => FormatAlign::Top,
        "vcenter" | "vcentre" => FormatAlign::VerticalCenter,
        "bottom" => FormatAlign::Bottom,
        "vjustify" => FormatAlign::VerticalJustify,
        "vdistributed" => FormatAlign::VerticalDistributed,
        _ => return None,
    })
}

fn border_style(index: u8) -> FormatBorder {
    match index {
        0 => FormatBorder::None,
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        8 => FormatBorder::MediumDashed,
        9 => FormatBorder::DashDot,
        10 => FormatBorder::MediumDashDot,
        11 => FormatBorder::DashDotDot,
        12 => FormatBorder::MediumDashDotDot,
        _ => FormatBorder::SlantDashDot,
    }
}

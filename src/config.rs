use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::Error;

pub const DEFAULT_FOOTER_TEXT: &str = "This is a computer-generated report.";

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CellMargins {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

impl Default for CellMargins {
    fn default() -> Self {
        Self {
            top: 2.0,
            left: 5.4,
            bottom: 2.0,
            right: 5.4,
        }
    }
}

/// Typography and fixed spacing of the printed report. Everything that
/// influences a measured height lives here, so measuring and drawing can't
/// disagree.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportStyle {
    /// Font family candidates separated by ';', first available wins.
    pub font_family: String,
    pub body_size: f32,
    pub table_header_size: f32,
    pub department_size: f32,
    pub patient_info_size: f32,
    pub remarks_size: f32,
    pub footer_size: f32,
    pub line_spacing: f32, // multiplier on the font's natural line height
    pub cell_margins: CellMargins,
    /// Width share of Test Name / Result / Unit / Reference Range.
    pub column_fractions: [f32; 4],
    pub department_gap: f32, // below the department label
    pub department_spacer: f32,
    pub footer_space_before: f32,
    pub footer_text: String,
    pub report_title: String,
    /// Share of the content width used by the patient header box.
    pub patient_header_fraction: f32,
    pub repeat_patient_header: bool,
    pub page_numbers: bool,
}

impl Default for ReportStyle {
    fn default() -> Self {
        Self {
            font_family: "Liberation Sans;Arial;Helvetica;DejaVu Sans".to_string(),
            body_size: 9.0,
            table_header_size: 9.0,
            department_size: 11.0,
            patient_info_size: 8.5,
            remarks_size: 7.5,
            footer_size: 8.0,
            line_spacing: 1.0,
            cell_margins: CellMargins::default(),
            column_fractions: [0.36, 0.18, 0.16, 0.30],
            department_gap: 3.0,
            department_spacer: 12.0,
            footer_space_before: 10.0,
            footer_text: DEFAULT_FOOTER_TEXT.to_string(),
            report_title: "LABORATORY REPORT".to_string(),
            patient_header_fraction: 0.55,
            repeat_patient_header: false,
            page_numbers: true,
        }
    }
}

/// Read and deserialize a JSON file, naming the path in I/O errors.
pub(crate) fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())))
    })?;
    Ok(serde_json::from_str(&text)?)
}

impl ReportStyle {
    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let style: ReportStyle = read_json_file(path)?;
        style.validate()?;
        Ok(style)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let sum: f32 = self.column_fractions.iter().sum();
        if self.column_fractions.iter().any(|f| *f <= 0.0) || (sum - 1.0).abs() > 0.01 {
            return Err(Error::InvalidInput(format!(
                "column_fractions must be positive and sum to 1 (got {sum:.3})"
            )));
        }
        let sizes = [
            self.body_size,
            self.table_header_size,
            self.department_size,
            self.patient_info_size,
            self.remarks_size,
            self.footer_size,
        ];
        if sizes.iter().any(|s| *s <= 0.0) || self.line_spacing <= 0.0 {
            return Err(Error::InvalidInput("font sizes and line spacing must be positive".into()));
        }
        Ok(())
    }

    /// Column widths for a table spanning `content_width`.
    pub fn column_widths(&self, content_width: f32) -> [f32; 4] {
        self.column_fractions.map(|f| f * content_width)
    }
}

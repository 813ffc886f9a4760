use crate::config::ReportStyle;
use crate::content::{ContentBlock, PatientInfo, ResultRow, TABLE_CAPTIONS};
use crate::fonts::FontSet;

use super::Measure;
use super::wrap::{TextLine, wrap_text};

const REPRINT_MARK: &str = "REPRINT";

pub struct CellLayout {
    pub lines: Vec<TextLine>,
    pub bold: bool,
    pub font_size: f32,
    pub line_h: f32,
    /// Smaller text under the main lines (result remarks).
    pub notes: Vec<TextLine>,
    pub notes_size: f32,
    pub notes_line_h: f32,
}

impl CellLayout {
    fn content_height(&self) -> f32 {
        self.lines.len() as f32 * self.line_h + self.notes.len() as f32 * self.notes_line_h
    }
}

pub struct RowLayout {
    pub height: f32,
    pub col_widths: [f32; 4],
    pub cells: Vec<CellLayout>,
}

pub struct TextBlockLayout {
    pub lines: Vec<TextLine>,
    pub bold: bool,
    pub font_size: f32,
    pub line_h: f32,
    pub space_before: f32,
    pub space_after: f32,
}

impl TextBlockLayout {
    pub fn height(&self) -> f32 {
        self.space_before + self.lines.len() as f32 * self.line_h + self.space_after
    }
}

pub struct PatientInfoLayout {
    pub title: String,
    pub title_size: f32,
    pub font_size: f32,
    pub line_h: f32,
    pub label_width: f32,
    pub pairs: Vec<(&'static str, Vec<TextLine>)>,
}

impl PatientInfoLayout {
    pub fn height(&self) -> f32 {
        let rows: usize = self.pairs.iter().map(|(_, lines)| lines.len()).sum();
        self.line_h * (self.title_size / self.font_size) + rows as f32 * self.line_h
    }
}

/// Measures content from real font metrics. The PDF printer draws from the
/// very same layouts, so a measured height is the printed height.
pub struct TextMeasurer<'a> {
    fonts: &'a FontSet,
    style: &'a ReportStyle,
}

impl<'a> TextMeasurer<'a> {
    pub fn new(fonts: &'a FontSet, style: &'a ReportStyle) -> Self {
        Self { fonts, style }
    }

    pub fn fonts(&self) -> &FontSet {
        self.fonts
    }

    pub fn style(&self) -> &ReportStyle {
        self.style
    }

    fn cell(&self, text: &str, bold: bool, font_size: f32, width: f32) -> CellLayout {
        let cm = &self.style.cell_margins;
        let text_w = (width - cm.left - cm.right).max(1.0);
        let face = self.fonts.face(bold);
        CellLayout {
            lines: wrap_text(text, face, font_size, text_w),
            bold,
            font_size,
            line_h: face.line_height(font_size, self.style.line_spacing),
            notes: Vec::new(),
            notes_size: self.style.remarks_size,
            notes_line_h: self
                .fonts
                .regular
                .line_height(self.style.remarks_size, self.style.line_spacing),
        }
    }

    fn row(&self, cells: Vec<CellLayout>, col_widths: [f32; 4]) -> RowLayout {
        let cm = &self.style.cell_margins;
        let content_h = cells.iter().map(CellLayout::content_height).fold(0.0, f32::max);
        RowLayout {
            height: content_h + cm.top + cm.bottom,
            col_widths,
            cells,
        }
    }

    pub fn table_header(&self, width: f32) -> RowLayout {
        let col_widths = self.style.column_widths(width);
        let cells = TABLE_CAPTIONS
            .iter()
            .zip(col_widths)
            .map(|(caption, w)| self.cell(caption, true, self.style.table_header_size, w))
            .collect();
        self.row(cells, col_widths)
    }

    pub fn table_row(&self, row: &ResultRow, width: f32) -> RowLayout {
        let col_widths = self.style.column_widths(width);
        let mut cells: Vec<CellLayout> = row
            .cells()
            .iter()
            .zip(col_widths)
            .enumerate()
            .map(|(i, (text, w))| {
                // Abnormal results bold the name and value only
                let bold = row.abnormal && i < 2;
                self.cell(text, bold, self.style.body_size, w)
            })
            .collect();

        if let Some(remarks) = &row.remarks {
            let cm = &self.style.cell_margins;
            let text_w = (col_widths[0] - cm.left - cm.right).max(1.0);
            cells[0].notes = wrap_text(remarks, &self.fonts.regular, self.style.remarks_size, text_w);
        }
        self.row(cells, col_widths)
    }

    pub fn department_label(&self, name: &str, width: f32) -> TextBlockLayout {
        let size = self.style.department_size;
        TextBlockLayout {
            lines: wrap_text(name, &self.fonts.bold, size, width),
            bold: true,
            font_size: size,
            line_h: self.fonts.bold.line_height(size, self.style.line_spacing),
            space_before: 0.0,
            space_after: self.style.department_gap,
        }
    }

    pub fn footer(&self, text: &str, width: f32) -> TextBlockLayout {
        let size = self.style.footer_size;
        TextBlockLayout {
            lines: wrap_text(text, &self.fonts.regular, size, width),
            bold: false,
            font_size: size,
            line_h: self.fonts.regular.line_height(size, self.style.line_spacing),
            space_before: self.style.footer_space_before,
            space_after: 0.0,
        }
    }

    pub fn patient_info(&self, info: &PatientInfo, width: f32) -> PatientInfoLayout {
        let size = self.style.patient_info_size;
        let label_face = &self.fonts.bold;
        let pairs = info.label_pairs();
        let label_width = pairs
            .iter()
            .map(|(label, _)| label_face.text_width(&format!("{label}:"), size))
            .fold(0.0, f32::max)
            + label_face.space_width(size) * 2.0;
        let value_w = (width - label_width).max(1.0);

        let title = if info.reprint {
            format!("{} ({REPRINT_MARK})", self.style.report_title)
        } else {
            self.style.report_title.clone()
        };

        PatientInfoLayout {
            title,
            title_size: size * 1.2,
            font_size: size,
            line_h: self.fonts.regular.line_height(size, self.style.line_spacing),
            label_width,
            pairs: pairs
                .into_iter()
                .map(|(label, value)| (label, wrap_text(&value, &self.fonts.regular, size, value_w)))
                .collect(),
        }
    }

    /// Width of the patient header box for a given content width.
    pub fn patient_header_width(&self, content_width: f32) -> f32 {
        content_width * self.style.patient_header_fraction
    }
}

impl Measure for TextMeasurer<'_> {
    fn measure(&self, block: &ContentBlock, width: f32) -> f32 {
        match block {
            ContentBlock::PatientInfo(info) => self.patient_info(info, width).height(),
            ContentBlock::DepartmentLabel(name) => self.department_label(name, width).height(),
            ContentBlock::ResultsTableHeader => self.table_header(width).height,
            ContentBlock::ResultsTableRow(row) => self.table_row(row, width).height,
            ContentBlock::Spacer(h) => *h,
            ContentBlock::Footer(text) => self.footer(text, width).height(),
        }
    }
}

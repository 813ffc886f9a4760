#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use labprint::{
    ContentBlock, Gender, LabOrder, LabResult, Measure, Page, Patient, PrintContext, PrintKind,
    TestDefinition,
};

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid date")
}

pub fn test_def(id: u64, name: &str, department: Option<&str>) -> TestDefinition {
    TestDefinition {
        id,
        test_name: name.to_string(),
        unit: Some("mg/dL".to_string()),
        department_name: department.map(str::to_string),
        min_range: Some(1.0),
        max_range: Some(10.0),
    }
}

pub fn result(id: u64, name: &str, department: Option<&str>) -> LabResult {
    LabResult {
        test: Some(test_def(id, name, department)),
        result_value: Some("5".to_string()),
        is_abnormal: false,
        remarks: None,
    }
}

pub fn order(results: Vec<LabResult>) -> LabOrder {
    LabOrder {
        id: 1001,
        patient: Patient {
            id: 1,
            full_name: "Jane Roe".to_string(),
            mrn: "MRN-0042".to_string(),
            age: Some(30),
            gender: Some(Gender::Female),
        },
        referring_doctor: None,
        ordered_at: at(9, 8),
        results,
    }
}

pub fn context() -> PrintContext {
    PrintContext {
        printed_at: at(10, 12),
        kind: PrintKind::Original,
        operator: None,
    }
}

/// Fixed block heights, independent of width and fonts.
pub struct FixedMeasure {
    pub heading: f32,
    pub row: f32,
}

impl Measure for FixedMeasure {
    fn measure(&self, block: &ContentBlock, _width: f32) -> f32 {
        match block {
            ContentBlock::PatientInfo(_) => 60.0,
            ContentBlock::DepartmentLabel(_) | ContentBlock::ResultsTableHeader => self.heading,
            ContentBlock::ResultsTableRow(_) => self.row,
            ContentBlock::Spacer(h) => *h,
            ContentBlock::Footer(_) => 10.0,
        }
    }
}

/// Test names of the rows on each page.
pub fn page_rows(pages: &[Page]) -> Vec<Vec<String>> {
    pages
        .iter()
        .map(|p| p.rows().map(|r| r.test_name.clone()).collect())
        .collect()
}

pub fn kinds(page: &Page) -> Vec<&'static str> {
    page.blocks.iter().map(|b| b.block.kind()).collect()
}

/// Every row must follow a table header and the label of its own department,
/// where `department_for` maps a row's test name to its department.
pub fn assert_self_describing(pages: &[Page], department_for: impl Fn(&str) -> String) {
    for page in pages {
        let mut label: Option<&str> = None;
        let mut header_seen = false;
        for placed in &page.blocks {
            match &placed.block {
                ContentBlock::DepartmentLabel(name) => {
                    label = Some(name);
                    header_seen = false;
                }
                ContentBlock::ResultsTableHeader => header_seen = true,
                ContentBlock::ResultsTableRow(row) => {
                    assert!(header_seen, "page {}: row without table header", page.number);
                    assert_eq!(
                        label.map(str::to_string),
                        Some(department_for(&row.test_name)),
                        "page {}: row '{}' under wrong label",
                        page.number,
                        row.test_name
                    );
                }
                _ => {}
            }
        }
    }
}

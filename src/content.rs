//! Semantic content of one patient report, independent of page geometry.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::config::ReportStyle;
use crate::format::Formatter;
use crate::model::{LabOrder, LabResult};
use crate::reference::{DisplaySite, RangeSource, range_text, resolve};

pub const TABLE_CAPTIONS: [&str; 4] = ["Test Name", "Result", "Unit", "Reference Range"];
pub const OTHER_DEPARTMENT: &str = "Other";

const UNKNOWN_TEST: &str = "Unknown Test";
const PENDING: &str = "Pending";
const NOT_GIVEN: &str = "-";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PrintKind {
    Original,
    Reprint,
}

/// Who prints, when, and whether it is a reprint. Passed explicitly instead
/// of being read from application-wide session state.
#[derive(Clone, Debug)]
pub struct PrintContext {
    pub printed_at: NaiveDateTime,
    pub kind: PrintKind,
    pub operator: Option<String>,
}

impl PrintContext {
    pub fn now(kind: PrintKind) -> Self {
        Self {
            printed_at: chrono::Local::now().naive_local(),
            kind,
            operator: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatientInfo {
    pub patient_name: String,
    pub mrn: String,
    pub age: String,
    pub gender: String,
    pub order_id: String,
    pub ordered_at: String,
    pub printed_at: String,
    pub doctor: String,
    pub printed_by: Option<String>,
    pub reprint: bool,
}

impl PatientInfo {
    /// Label/value pairs in display order.
    pub fn label_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("Patient", self.patient_name.clone()),
            ("MRN", self.mrn.clone()),
            ("Age / Gender", format!("{} / {}", self.age, self.gender)),
            ("Order No.", self.order_id.clone()),
            ("Referred by", self.doctor.clone()),
            ("Ordered", self.ordered_at.clone()),
            ("Printed", self.printed_at.clone()),
        ];
        if let Some(op) = &self.printed_by {
            pairs.push(("Printed by", op.clone()));
        }
        pairs
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultRow {
    pub test_name: String,
    pub value: String,
    pub unit: String,
    pub reference_range: String,
    pub abnormal: bool,
    pub remarks: Option<String>,
}

impl ResultRow {
    pub fn cells(&self) -> [&str; 4] {
        [
            self.test_name.as_str(),
            self.value.as_str(),
            self.unit.as_str(),
            self.reference_range.as_str(),
        ]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ContentBlock {
    PatientInfo(PatientInfo),
    DepartmentLabel(String),
    ResultsTableHeader,
    ResultsTableRow(ResultRow),
    Spacer(f32),
    Footer(String),
}

impl ContentBlock {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::PatientInfo(_) => "patient-info",
            ContentBlock::DepartmentLabel(_) => "department",
            ContentBlock::ResultsTableHeader => "table-header",
            ContentBlock::ResultsTableRow(_) => "row",
            ContentBlock::Spacer(_) => "spacer",
            ContentBlock::Footer(_) => "footer",
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

pub fn department_of(result: &LabResult) -> &str {
    non_blank(result.test.as_ref().and_then(|t| t.department_name.as_deref()))
        .unwrap_or(OTHER_DEPARTMENT)
}

pub struct ReportContentBuilder<'a> {
    style: &'a ReportStyle,
    fmt: &'a dyn Formatter,
    ctx: &'a PrintContext,
}

impl<'a> ReportContentBuilder<'a> {
    pub fn new(style: &'a ReportStyle, fmt: &'a dyn Formatter, ctx: &'a PrintContext) -> Self {
        Self { style, fmt, ctx }
    }

    pub fn build<R: RangeSource + ?Sized>(&self, order: &LabOrder, ranges: &R) -> Vec<ContentBlock> {
        let mut blocks = vec![ContentBlock::PatientInfo(self.patient_info(order))];

        // (case-folded name, name) keeps "hematology" next to "Hematology"
        // while still ordering deterministically
        let mut departments: BTreeMap<(String, String), Vec<&LabResult>> = BTreeMap::new();
        for result in &order.results {
            let dept = department_of(result);
            departments
                .entry((dept.to_lowercase(), dept.to_string()))
                .or_default()
                .push(result);
        }

        for ((_, dept), results) in &departments {
            let mut rows: Vec<ResultRow> =
                results.iter().map(|r| self.result_row(order, r, ranges)).collect();
            rows.sort_by_cached_key(|row| row.test_name.to_lowercase());

            blocks.push(ContentBlock::DepartmentLabel(dept.clone()));
            blocks.push(ContentBlock::ResultsTableHeader);
            blocks.extend(rows.into_iter().map(ContentBlock::ResultsTableRow));
            blocks.push(ContentBlock::Spacer(self.style.department_spacer));
        }

        blocks.push(ContentBlock::Footer(self.style.footer_text.clone()));

        log::debug!(
            "Built report content for order {}: {} results in {} departments, {} blocks",
            order.id,
            order.results.len(),
            departments.len(),
            blocks.len(),
        );
        blocks
    }

    fn patient_info(&self, order: &LabOrder) -> PatientInfo {
        let p = &order.patient;
        let age = p.age.map_or(NOT_GIVEN.to_string(), |a| format!("{a} Y"));
        let gender = p.gender.map_or(NOT_GIVEN, |g| g.label());
        PatientInfo {
            patient_name: p.full_name.clone(),
            mrn: p.mrn.clone(),
            age,
            gender: gender.to_string(),
            order_id: order.id.to_string(),
            ordered_at: self.fmt.format_date_time(&order.ordered_at),
            printed_at: self.fmt.format_date_time(&self.ctx.printed_at),
            doctor: order
                .referring_doctor
                .as_ref()
                .and_then(|d| non_blank(Some(&d.full_name)))
                .unwrap_or(NOT_GIVEN)
                .to_string(),
            printed_by: self.ctx.operator.clone(),
            reprint: self.ctx.kind == PrintKind::Reprint,
        }
    }

    fn result_row<R: RangeSource + ?Sized>(
        &self,
        order: &LabOrder,
        result: &LabResult,
        ranges: &R,
    ) -> ResultRow {
        let value = non_blank(result.result_value.as_deref())
            .unwrap_or(PENDING)
            .to_string();
        let remarks = non_blank(result.remarks.as_deref()).map(str::to_string);

        let Some(test) = result.test.as_ref() else {
            log::warn!("Order {}: result without a test definition, printing blank", order.id);
            return ResultRow {
                test_name: String::new(),
                value,
                unit: String::new(),
                reference_range: range_text(None, None, DisplaySite::Report, self.fmt),
                abnormal: result.is_abnormal,
                remarks,
            };
        };

        let candidates = ranges.ranges_for(test.id);
        let resolved = resolve(&candidates, order.patient.age, order.patient.gender);
        ResultRow {
            test_name: non_blank(Some(&test.test_name)).unwrap_or(UNKNOWN_TEST).to_string(),
            value,
            unit: non_blank(test.unit.as_deref()).unwrap_or(NOT_GIVEN).to_string(),
            reference_range: range_text(resolved, Some(test), DisplaySite::Report, self.fmt),
            abnormal: result.is_abnormal,
            remarks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::DefaultFormatter;
    use crate::model::{Doctor, Gender, Patient, RangeGender, ReferenceRange, TestDefinition};
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .and_then(|d| d.and_hms_opt(h, 0, 0))
            .unwrap()
    }

    fn result(id: u64, name: &str, dept: Option<&str>, value: Option<&str>) -> LabResult {
        LabResult {
            test: Some(TestDefinition {
                id,
                test_name: name.into(),
                unit: Some("g/dL".into()),
                department_name: dept.map(Into::into),
                min_range: None,
                max_range: None,
            }),
            result_value: value.map(Into::into),
            is_abnormal: false,
            remarks: None,
        }
    }

    fn order(results: Vec<LabResult>) -> LabOrder {
        LabOrder {
            id: 77,
            patient: Patient {
                id: 1,
                full_name: "Jane Roe".into(),
                mrn: "MRN-0042".into(),
                age: Some(30),
                gender: Some(Gender::Female),
            },
            referring_doctor: None,
            ordered_at: at(8),
            results,
        }
    }

    fn build(order: &LabOrder, ranges: &[ReferenceRange]) -> Vec<ContentBlock> {
        let style = ReportStyle::default();
        let fmt = DefaultFormatter::default();
        let ctx = PrintContext {
            printed_at: at(12),
            kind: PrintKind::Original,
            operator: None,
        };
        ReportContentBuilder::new(&style, &fmt, &ctx).build(order, ranges)
    }

    #[test]
    fn groups_sorted_with_other_for_missing_department() {
        let o = order(vec![
            result(1, "platelets", Some("Hematology"), Some("250")),
            result(2, "Glucose", Some("Biochemistry"), Some("90")),
            result(3, "Hemoglobin", Some("Hematology"), Some("13")),
            result(4, "Urine pH", None, Some("6")),
            result(5, "Urea", Some("  "), Some("20")),
        ]);
        let blocks = build(&o, &[]);
        let labels: Vec<&str> = blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::DepartmentLabel(d) => Some(d.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, ["Biochemistry", "Hematology", "Other"]);

        let hema_rows: Vec<&str> = blocks
            .iter()
            .skip_while(|b| **b != ContentBlock::DepartmentLabel("Hematology".into()))
            .take_while(|b| !matches!(b, ContentBlock::Spacer(_)))
            .filter_map(|b| match b {
                ContentBlock::ResultsTableRow(r) => Some(r.test_name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(hema_rows, ["Hemoglobin", "platelets"]);
    }

    #[test]
    fn sequence_shape() {
        let blocks = build(&order(vec![result(1, "ALT", Some("Biochemistry"), Some("30"))]), &[]);
        let kinds: Vec<&str> = blocks.iter().map(ContentBlock::kind).collect();
        assert_eq!(
            kinds,
            ["patient-info", "department", "table-header", "row", "spacer", "footer"]
        );
        assert_eq!(
            blocks.last(),
            Some(&ContentBlock::Footer("This is a computer-generated report.".into()))
        );
    }

    #[test]
    fn placeholders_for_missing_data() {
        let mut orphan = result(9, "x", None, None);
        orphan.test = None;
        let mut unnamed = result(8, "", Some("Serology"), Some(" "));
        if let Some(t) = unnamed.test.as_mut() {
            t.unit = None;
        }
        let blocks = build(&order(vec![orphan, unnamed]), &[]);
        let rows: Vec<&ResultRow> = blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ResultsTableRow(r) => Some(r),
                _ => None,
            })
            .collect();
        // "Other" sorts before "Serology"
        assert_eq!(rows[0].test_name, "");
        assert_eq!(rows[0].unit, "");
        assert_eq!(rows[0].value, "Pending");
        assert_eq!(rows[0].reference_range, "-");
        assert_eq!(rows[1].test_name, "Unknown Test");
        assert_eq!(rows[1].value, "Pending");
        assert_eq!(rows[1].unit, "-");
    }

    #[test]
    fn rows_use_patient_specific_range() {
        let ranges = vec![
            ReferenceRange {
                test_id: 3,
                gender: Some(RangeGender::Male),
                min_age: None,
                max_age: None,
                min_val: Some(13.5),
                max_val: Some(17.5),
            },
            ReferenceRange {
                test_id: 3,
                gender: Some(RangeGender::Female),
                min_age: None,
                max_age: None,
                min_val: Some(12.0),
                max_val: Some(15.5),
            },
        ];
        let blocks = build(&order(vec![result(3, "Hemoglobin", Some("Hematology"), Some("13"))]), &ranges);
        let row = blocks.iter().find_map(|b| match b {
            ContentBlock::ResultsTableRow(r) => Some(r),
            _ => None,
        });
        assert_eq!(row.map(|r| r.reference_range.as_str()), Some("12 - 15.5"));
    }

    #[test]
    fn patient_info_fields() {
        let mut o = order(vec![]);
        o.referring_doctor = Some(Doctor {
            id: 5,
            full_name: "Dr. Adeyemi".into(),
        });
        let blocks = build(&o, &[]);
        let ContentBlock::PatientInfo(info) = &blocks[0] else {
            panic!("patient info must come first");
        };
        assert_eq!(info.doctor, "Dr. Adeyemi");
        assert_eq!(info.age, "30 Y");
        assert!(info.label_pairs().contains(&("Age / Gender", "30 Y / Female".to_string())));
        assert_eq!(info.printed_at, "02 May 2024 12:00");
        assert!(!info.reprint);
        assert_eq!(blocks.len(), 2);
    }
}

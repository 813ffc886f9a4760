//! Reference-range resolution: picks the one normal range that applies to a
//! patient out of the (possibly overlapping) ranges defined for a test.

use std::collections::HashMap;

use crate::format::Formatter;
use crate::model::{Gender, RangeGender, ReferenceRange, TestDefinition};

/// Where a range is displayed. The two call sites use different placeholders
/// when no bound is known at all.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DisplaySite {
    Report,
    ResultEntry,
}

impl DisplaySite {
    fn placeholder(self) -> &'static str {
        match self {
            DisplaySite::Report => "-",
            DisplaySite::ResultEntry => "N/A",
        }
    }
}

/// Candidate ranges, queried per test.
pub trait RangeSource {
    fn ranges_for(&self, test_id: u64) -> Vec<ReferenceRange>;
}

impl RangeSource for [ReferenceRange] {
    fn ranges_for(&self, test_id: u64) -> Vec<ReferenceRange> {
        self.iter().filter(|r| r.test_id == test_id).cloned().collect()
    }
}

impl RangeSource for Vec<ReferenceRange> {
    fn ranges_for(&self, test_id: u64) -> Vec<ReferenceRange> {
        self.as_slice().ranges_for(test_id)
    }
}

impl RangeSource for HashMap<u64, Vec<ReferenceRange>> {
    fn ranges_for(&self, test_id: u64) -> Vec<ReferenceRange> {
        self.get(&test_id).cloned().unwrap_or_default()
    }
}

fn gender_eligible(range: &ReferenceRange, gender: Option<Gender>) -> bool {
    match (range.gender, gender) {
        (None | Some(RangeGender::Both), _) | (_, None) => true,
        (Some(rg), Some(g)) => rg.matches(g),
    }
}

fn age_eligible(range: &ReferenceRange, age: Option<u32>) -> bool {
    let Some(age) = age else {
        return true;
    };
    range.min_age.is_none_or(|min| age >= min) && range.max_age.is_none_or(|max| age <= max)
}

fn gender_score(range: &ReferenceRange, gender: Option<Gender>) -> u8 {
    match (range.gender, gender) {
        (None | Some(RangeGender::Both), _) => 1,
        (Some(rg), Some(g)) if rg.matches(g) => 2,
        _ => 0,
    }
}

/// Select the applicable range for a patient, most specific first: exact
/// gender beats `Both`, then the lowest `min_age` wins with an unset
/// `min_age` ranked last. Remaining ties keep input order.
pub fn resolve<'a>(
    candidates: &'a [ReferenceRange],
    age: Option<u32>,
    gender: Option<Gender>,
) -> Option<&'a ReferenceRange> {
    let mut eligible: Vec<&ReferenceRange> = candidates
        .iter()
        .filter(|r| gender_eligible(r, gender) && age_eligible(r, age))
        .collect();

    eligible.sort_by(|a, b| {
        gender_score(b, gender)
            .cmp(&gender_score(a, gender))
            .then_with(|| {
                (a.min_age.is_none(), a.min_age.unwrap_or(0))
                    .cmp(&(b.min_age.is_none(), b.min_age.unwrap_or(0)))
            })
    });

    eligible.first().copied()
}

/// Text shown in the reference-range column. Falls back to the test's static
/// bounds when nothing resolved.
pub fn range_text(
    resolved: Option<&ReferenceRange>,
    test: Option<&TestDefinition>,
    site: DisplaySite,
    fmt: &dyn Formatter,
) -> String {
    let (min, max) = match resolved {
        Some(r) => (r.min_val, r.max_val),
        None => test.map_or((None, None), |t| (t.min_range, t.max_range)),
    };
    match (min, max) {
        (Some(lo), Some(hi)) => format!("{} - {}", fmt.format_number(lo), fmt.format_number(hi)),
        (Some(lo), None) => format!("≥ {}", fmt.format_number(lo)),
        (None, Some(hi)) => format!("≤ {}", fmt.format_number(hi)),
        (None, None) => site.placeholder().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::DefaultFormatter;

    fn range(gender: Option<RangeGender>, ages: (Option<u32>, Option<u32>), vals: (f64, f64)) -> ReferenceRange {
        ReferenceRange {
            test_id: 1,
            gender,
            min_age: ages.0,
            max_age: ages.1,
            min_val: Some(vals.0),
            max_val: Some(vals.1),
        }
    }

    #[test]
    fn exact_gender_beats_both() {
        let candidates = vec![
            range(Some(RangeGender::Both), (Some(0), Some(120)), (1.0, 10.0)),
            range(Some(RangeGender::Female), (Some(0), Some(120)), (2.0, 8.0)),
        ];
        let r = resolve(&candidates, Some(30), Some(Gender::Female)).unwrap();
        assert_eq!((r.min_val, r.max_val), (Some(2.0), Some(8.0)));
    }

    #[test]
    fn age_filter_precedes_ordering() {
        let candidates = vec![
            range(Some(RangeGender::Both), (Some(0), Some(17)), (1.0, 2.0)),
            range(Some(RangeGender::Both), (Some(18), Some(120)), (3.0, 4.0)),
        ];
        let r = resolve(&candidates, Some(25), Some(Gender::Male)).unwrap();
        assert_eq!(r.min_age, Some(18));
    }

    #[test]
    fn opposite_gender_is_ineligible() {
        let candidates = vec![range(Some(RangeGender::Male), (None, None), (1.0, 2.0))];
        assert!(resolve(&candidates, Some(40), Some(Gender::Female)).is_none());
        assert!(resolve(&candidates, Some(40), Some(Gender::Other)).is_none());
    }

    #[test]
    fn unknown_patient_skips_checks() {
        let candidates = vec![range(Some(RangeGender::Male), (Some(60), Some(70)), (1.0, 2.0))];
        assert!(resolve(&candidates, None, None).is_some());
    }

    #[test]
    fn unset_min_age_sorts_last() {
        let candidates = vec![
            range(None, (None, Some(120)), (1.0, 2.0)),
            range(None, (Some(10), Some(120)), (3.0, 4.0)),
        ];
        let r = resolve(&candidates, Some(30), None).unwrap();
        assert_eq!(r.min_age, Some(10));
    }

    #[test]
    fn unset_gender_counts_as_both() {
        let candidates = vec![
            range(None, (Some(0), None), (1.0, 2.0)),
            range(Some(RangeGender::Male), (Some(5), None), (3.0, 4.0)),
        ];
        let r = resolve(&candidates, Some(30), Some(Gender::Male)).unwrap();
        assert_eq!(r.gender, Some(RangeGender::Male));
    }

    #[test]
    fn range_text_variants() {
        let fmt = DefaultFormatter::default();
        let test = TestDefinition {
            id: 1,
            test_name: "Glucose".into(),
            unit: Some("mg/dL".into()),
            department_name: None,
            min_range: Some(70.0),
            max_range: None,
        };
        assert_eq!(range_text(None, Some(&test), DisplaySite::Report, &fmt), "≥ 70");

        let upper_only = ReferenceRange {
            min_val: None,
            ..range(None, (None, None), (0.0, 5.5))
        };
        assert_eq!(
            range_text(Some(&upper_only), Some(&test), DisplaySite::Report, &fmt),
            "≤ 5.5"
        );
        assert_eq!(
            range_text(Some(&range(None, (None, None), (3.5, 11.0))), None, DisplaySite::Report, &fmt),
            "3.5 - 11"
        );
        assert_eq!(range_text(None, None, DisplaySite::Report, &fmt), "-");
        assert_eq!(range_text(None, None, DisplaySite::ResultEntry, &fmt), "N/A");
    }

    #[test]
    fn slice_source_filters_by_test() {
        let mut other = range(None, (None, None), (1.0, 2.0));
        other.test_id = 2;
        let all = vec![range(None, (None, None), (1.0, 2.0)), other];
        assert_eq!(all.ranges_for(2).len(), 1);
        assert!(all.ranges_for(3).is_empty());
    }
}

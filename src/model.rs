use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::config::read_json_file;
use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl TryFrom<String> for Gender {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" | "o" => Ok(Gender::Other),
            _ => Err(format!("unknown gender '{s}'")),
        }
    }
}

/// Gender partition of a reference range. Parsed case-insensitively, since
/// range tables are maintained by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum RangeGender {
    Male,
    Female,
    Both,
}

impl RangeGender {
    pub fn matches(self, gender: Gender) -> bool {
        matches!(
            (self, gender),
            (RangeGender::Male, Gender::Male) | (RangeGender::Female, Gender::Female)
        )
    }
}

impl TryFrom<String> for RangeGender {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(RangeGender::Male),
            "female" | "f" => Ok(RangeGender::Female),
            "both" | "any" | "all" => Ok(RangeGender::Both),
            _ => Err(format!("unknown range gender '{s}'")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Patient {
    pub id: u64,
    pub full_name: String,
    pub mrn: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<Gender>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Doctor {
    pub id: u64,
    pub full_name: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TestDefinition {
    pub id: u64,
    pub test_name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub department_name: Option<String>,
    // Static fallback, only used when no reference range matches
    #[serde(default)]
    pub min_range: Option<f64>,
    #[serde(default)]
    pub max_range: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ReferenceRange {
    pub test_id: u64,
    #[serde(default)]
    pub gender: Option<RangeGender>,
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub max_age: Option<u32>,
    #[serde(default)]
    pub min_val: Option<f64>,
    #[serde(default)]
    pub max_val: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LabResult {
    /// `None` when the result references a test definition that no longer
    /// exists; such rows are still printed.
    #[serde(default)]
    pub test: Option<TestDefinition>,
    #[serde(default)]
    pub result_value: Option<String>,
    #[serde(default)]
    pub is_abnormal: bool,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LabOrder {
    pub id: u64,
    pub patient: Patient,
    #[serde(default)]
    pub referring_doctor: Option<Doctor>,
    pub ordered_at: NaiveDateTime,
    #[serde(default)]
    pub results: Vec<LabResult>,
}

impl LabOrder {
    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        read_json_file(path)
    }
}

/// Load reference ranges stored as one flat JSON array.
pub fn load_ranges(path: &Path) -> Result<Vec<ReferenceRange>, Error> {
    read_json_file(path)
}

// Query filtering and sorting for visits

use crate::record::{Visit, VisitKind};
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Predicate for [`crate::Store::find`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Case-insensitive substring of the patient name
    PatientName(String),
    /// Case-insensitive substring of the doctor name
    DoctorName(String),
    /// Same calendar day, time ignored
    Date(NaiveDate),
    Kind(VisitKind),
}

impl Filter {
    pub fn matches(&self, visit: &Visit) -> bool {
        match self {
            Filter::PatientName(needle) => contains_ignore_case(&visit.patient_name, needle),
            Filter::DoctorName(needle) => contains_ignore_case(&visit.doctor_name, needle),
            Filter::Date(day) => visit.visit_date.date() == *day,
            Filter::Kind(kind) => visit.kind == *kind,
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::PatientName(s) => write!(f, "patient name: {}", s),
            Filter::DoctorName(s) => write!(f, "doctor name: {}", s),
            Filter::Date(d) => write!(f, "date: {}", d.format("%Y-%m-%d")),
            Filter::Kind(k) => write!(f, "visit type: {}", k),
        }
    }
}

/// Sort keys for [`crate::Store::sorted_by`], all ascending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Date,
    PatientName,
    DoctorName,
}

impl SortField {
    /// Byte-wise (case-sensitive) comparison for the name keys
    pub fn compare(self, a: &Visit, b: &Visit) -> Ordering {
        match self {
            SortField::Date => a.visit_date.cmp(&b.visit_date),
            SortField::PatientName => a.patient_name.cmp(&b.patient_name),
            SortField::DoctorName => a.doctor_name.cmp(&b.doctor_name),
        }
    }
}

impl std::fmt::Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortField::Date => write!(f, "date"),
            SortField::PatientName => write!(f, "patient name"),
            SortField::DoctorName => write!(f, "doctor name"),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

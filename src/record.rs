// Patient visit record, its kind tag, and the per-kind rules

use crate::error::ValidationError;
use crate::rates::RateTable;
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Emergency visits are never billed below this amount
pub const EMERGENCY_FEE_FLOOR: i64 = 2000;

pub const CONSULTATION_MIN_MINUTES: u32 = 15;
pub const FOLLOW_UP_MIN_MINUTES: u32 = 10;

/// Date format used for display and persistence
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Kind of visit; governs validation and fee rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VisitKind {
    Consultation,
    FollowUp,
    Emergency,
}

impl VisitKind {
    pub const ALL: [VisitKind; 3] = [VisitKind::Consultation, VisitKind::FollowUp, VisitKind::Emergency];

    pub fn as_str(self) -> &'static str {
        match self {
            VisitKind::Consultation => "Consultation",
            VisitKind::FollowUp => "FollowUp",
            VisitKind::Emergency => "Emergency",
        }
    }

    /// Minimum duration in minutes, if the kind has one
    pub fn min_duration(self) -> Option<u32> {
        match self {
            VisitKind::Consultation => Some(CONSULTATION_MIN_MINUTES),
            VisitKind::FollowUp => Some(FOLLOW_UP_MIN_MINUTES),
            VisitKind::Emergency => None,
        }
    }
}

impl fmt::Display for VisitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown visit kind: {0}")]
pub struct ParseVisitKindError(pub String);

impl FromStr for VisitKind {
    type Err = ParseVisitKindError;

    /// Exact enumeration names, as written to the data file
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Consultation" => Ok(VisitKind::Consultation),
            "FollowUp" => Ok(VisitKind::FollowUp),
            "Emergency" => Ok(VisitKind::Emergency),
            other => Err(ParseVisitKindError(other.to_string())),
        }
    }
}

/// Caller-supplied fields of a visit; the store assigns `id` and `fee`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitDraft {
    pub patient_name: String,
    pub visit_date: Option<NaiveDateTime>,
    pub kind: VisitKind,
    pub description: String,
    pub doctor_name: String,
    pub duration_minutes: u32,
}

/// One stored patient visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: u32,
    pub patient_name: String,
    pub visit_date: NaiveDateTime,
    pub kind: VisitKind,
    pub description: String,
    pub doctor_name: String,
    pub duration_minutes: u32,
    pub fee: i64,
}

impl Visit {
    /// Validate a draft and build the stored visit: date truncated to the
    /// minute, fee computed from the rate table.
    pub fn from_draft(id: u32, draft: VisitDraft, rates: &RateTable) -> Result<Self, ValidationError> {
        validate(&draft)?;

        let visit_date = draft.visit_date.ok_or(ValidationError::MissingVisitDate)?;
        let fee = fee_for(draft.kind, draft.duration_minutes, rates);

        Ok(Self {
            id,
            patient_name: draft.patient_name,
            visit_date: truncate_to_minute(visit_date),
            kind: draft.kind,
            description: draft.description,
            doctor_name: draft.doctor_name,
            duration_minutes: draft.duration_minutes,
            fee,
        })
    }

    pub fn to_draft(&self) -> VisitDraft {
        VisitDraft {
            patient_name: self.patient_name.clone(),
            visit_date: Some(self.visit_date),
            kind: self.kind,
            description: self.description.clone(),
            doctor_name: self.doctor_name.clone(),
            duration_minutes: self.duration_minutes,
        }
    }
}

impl fmt::Display for Visit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {}, Patient: {}, Date: {}, Type: {}, Doctor: {}, Duration: {}min, Fee: ${}",
            self.id,
            self.patient_name,
            self.visit_date.format(DATE_FORMAT),
            self.kind,
            self.doctor_name,
            self.duration_minutes,
            self.fee
        )
    }
}

/// Check a draft against the common rules and the rules of its kind
pub fn validate(draft: &VisitDraft) -> Result<(), ValidationError> {
    if draft.patient_name.trim().is_empty() {
        return Err(ValidationError::MissingPatientName);
    }
    if draft.duration_minutes == 0 {
        return Err(ValidationError::NonPositiveDuration);
    }
    if draft.visit_date.is_none() {
        return Err(ValidationError::MissingVisitDate);
    }

    for (field, value) in [
        ("patient name", &draft.patient_name),
        ("description", &draft.description),
        ("doctor name", &draft.doctor_name),
    ] {
        if value.contains(['\n', '\r']) {
            return Err(ValidationError::LineBreak { field });
        }
    }

    if let Some(minimum) = draft.kind.min_duration() {
        if draft.duration_minutes < minimum {
            return Err(ValidationError::DurationBelowMinimum {
                kind: draft.kind,
                minimum,
                actual: draft.duration_minutes,
            });
        }
    }

    if draft.kind == VisitKind::Emergency && draft.doctor_name.trim().is_empty() {
        return Err(ValidationError::MissingDoctorName);
    }

    Ok(())
}

/// Fee for a visit of the given kind and length
pub fn fee_for(kind: VisitKind, duration_minutes: u32, rates: &RateTable) -> i64 {
    let fee = i64::from(duration_minutes).saturating_mul(rates.rate(kind));
    match kind {
        VisitKind::Emergency => fee.max(EMERGENCY_FEE_FLOOR),
        VisitKind::Consultation | VisitKind::FollowUp => fee,
    }
}

fn truncate_to_minute(date: NaiveDateTime) -> NaiveDateTime {
    date.with_second(0).and_then(|d| d.with_nanosecond(0)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    fn draft(kind: VisitKind, duration_minutes: u32) -> VisitDraft {
        VisitDraft {
            patient_name: "Jane Doe".to_string(),
            visit_date: Some(at(2024, 3, 1, 9, 30)),
            kind,
            description: "Routine checkup".to_string(),
            doctor_name: "Dr. Anderson".to_string(),
            duration_minutes,
        }
    }

    #[test]
    fn test_fee_examples() {
        let rates = RateTable::default();
        assert_eq!(fee_for(VisitKind::Consultation, 20, &rates), 10_000);
        assert_eq!(fee_for(VisitKind::FollowUp, 10, &rates), 3_000);
        assert_eq!(fee_for(VisitKind::Emergency, 1, &rates), 2_000);
        assert_eq!(fee_for(VisitKind::Emergency, 3, &rates), 3_000);
    }

    #[test]
    fn test_fee_uses_rate_table() {
        let rates = RateTable {
            consultation: 100,
            follow_up: 50,
            emergency: 10,
        };
        assert_eq!(fee_for(VisitKind::Consultation, 20, &rates), 2_000);
        // Floor still applies to a cheap emergency rate
        assert_eq!(fee_for(VisitKind::Emergency, 30, &rates), EMERGENCY_FEE_FLOOR);
    }

    #[test]
    fn test_fee_saturates_instead_of_overflowing() {
        let rates = RateTable {
            consultation: i64::MAX / 2,
            ..RateTable::default()
        };
        assert_eq!(fee_for(VisitKind::Consultation, 20, &rates), i64::MAX);
    }

    #[test]
    fn test_follow_up_zero_minutes_fails_validation() {
        let err = validate(&draft(VisitKind::FollowUp, 0)).unwrap_err();
        assert_eq!(err, ValidationError::NonPositiveDuration);
    }

    #[test]
    fn test_minimum_durations() {
        assert_eq!(
            validate(&draft(VisitKind::Consultation, 14)),
            Err(ValidationError::DurationBelowMinimum {
                kind: VisitKind::Consultation,
                minimum: 15,
                actual: 14
            })
        );
        assert!(validate(&draft(VisitKind::Consultation, 15)).is_ok());
        assert!(validate(&draft(VisitKind::FollowUp, 9)).is_err());
        assert!(validate(&draft(VisitKind::FollowUp, 10)).is_ok());
        assert!(validate(&draft(VisitKind::Emergency, 1)).is_ok());
    }

    #[test]
    fn test_emergency_requires_doctor() {
        let mut d = draft(VisitKind::Emergency, 30);
        d.doctor_name = "   ".to_string();
        assert_eq!(validate(&d), Err(ValidationError::MissingDoctorName));

        // Other kinds accept an empty doctor name
        let mut d = draft(VisitKind::Consultation, 30);
        d.doctor_name.clear();
        assert!(validate(&d).is_ok());
    }

    #[test]
    fn test_missing_fields() {
        let mut d = draft(VisitKind::Consultation, 30);
        d.patient_name = " ".to_string();
        assert_eq!(validate(&d), Err(ValidationError::MissingPatientName));

        let mut d = draft(VisitKind::Consultation, 30);
        d.visit_date = None;
        assert_eq!(validate(&d), Err(ValidationError::MissingVisitDate));

        let mut d = draft(VisitKind::Consultation, 30);
        d.description = "line one\nline two".to_string();
        assert_eq!(validate(&d), Err(ValidationError::LineBreak { field: "description" }));
    }

    #[test]
    fn test_from_draft_truncates_seconds_and_sets_fee() {
        let mut d = draft(VisitKind::Consultation, 20);
        d.visit_date = Some(
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_milli_opt(9, 30, 45, 123)
                .unwrap(),
        );

        let visit = Visit::from_draft(4, d, &RateTable::default()).unwrap();
        assert_eq!(visit.id, 4);
        assert_eq!(visit.visit_date, at(2024, 3, 1, 9, 30));
        assert_eq!(visit.fee, 10_000);
        assert_eq!(visit.to_draft().visit_date, Some(at(2024, 3, 1, 9, 30)));
    }

    #[test]
    fn test_visit_kind_parse_and_display() {
        for kind in VisitKind::ALL {
            assert_eq!(kind.to_string().parse::<VisitKind>().unwrap(), kind);
        }
        assert!("Follow-up".parse::<VisitKind>().is_err());
        assert_eq!(
            "consultation".parse::<VisitKind>().unwrap_err().to_string(),
            "unknown visit kind: consultation"
        );
    }

    #[test]
    fn test_visit_display() {
        let visit = Visit::from_draft(1, draft(VisitKind::Consultation, 20), &RateTable::default()).unwrap();
        assert_eq!(
            visit.to_string(),
            "ID: 1, Patient: Jane Doe, Date: 2024-03-01 09:30, Type: Consultation, Doctor: Dr. Anderson, Duration: 20min, Fee: $10000"
        );
    }
}

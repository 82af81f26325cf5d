// Reports over a visit collection

use crate::record::{Visit, VisitKind};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Multi-line description of a single visit
pub fn visit_summary(visit: &Visit) -> Vec<String> {
    vec![
        "=== VISIT SUMMARY ===".to_string(),
        format!("Visit ID: {}", visit.id),
        format!("Patient Name: {}", visit.patient_name),
        format!("Visit Date: {}", visit.visit_date.format("%Y-%m-%d")),
        format!("Visit Type: {}", visit.kind),
        format!("Description: {}", visit.description),
        format!("Doctor: {}", visit.doctor_name),
        format!("Duration: {} minutes", visit.duration_minutes),
        format!("Fee: ${}", visit.fee),
        "=====================".to_string(),
    ]
}

/// Number of visits of each kind; every kind is present, possibly with 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub counts: BTreeMap<VisitKind, usize>,
}

impl KindCounts {
    pub fn get(&self, kind: VisitKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec!["=== VISIT COUNT BY TYPE ===".to_string()];
        for kind in VisitKind::ALL {
            lines.push(format!("{}: {} visits", kind, self.get(kind)));
        }
        lines.push("===========================".to_string());
        lines
    }
}

pub fn count_by_kind(visits: &[Visit]) -> KindCounts {
    let mut counts: BTreeMap<VisitKind, usize> = VisitKind::ALL.iter().map(|k| (*k, 0)).collect();
    for visit in visits {
        *counts.entry(visit.kind).or_default() += 1;
    }
    KindCounts { counts }
}

/// Visits in the Sunday-to-Saturday week containing a reference day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total: usize,
    /// Only days that had at least one visit, in date order
    pub days: Vec<(NaiveDate, usize)>,
}

impl WeeklySummary {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "=== WEEKLY SUMMARY ({} to {}) ===",
                self.week_start.format("%Y-%m-%d"),
                self.week_end.format("%Y-%m-%d")
            ),
            format!("Total visits this week: {}", self.total),
        ];
        for (day, count) in &self.days {
            lines.push(format!("{}: {} visits", day.format("%Y-%m-%d"), count));
        }
        lines.push("===========================================".to_string());
        lines
    }
}

pub fn weekly_summary(visits: &[Visit], reference: NaiveDate) -> WeeklySummary {
    let offset = i64::from(reference.weekday().num_days_from_sunday());
    let week_start = reference - Duration::days(offset);
    let week_end = week_start + Duration::days(6);

    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for visit in visits {
        let day = visit.visit_date.date();
        if day >= week_start && day <= week_end {
            *per_day.entry(day).or_default() += 1;
        }
    }

    WeeklySummary {
        week_start,
        week_end,
        total: per_day.values().sum(),
        days: per_day.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit(id: u32, date: &str, kind: VisitKind) -> Visit {
        Visit {
            id,
            patient_name: "Jane Doe".to_string(),
            visit_date: chrono::NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M").unwrap(),
            kind,
            description: "Checkup".to_string(),
            doctor_name: "Dr. Smith".to_string(),
            duration_minutes: 20,
            fee: 10_000,
        }
    }

    #[test]
    fn test_visit_summary() {
        let lines = visit_summary(&visit(3, "2024-03-01 09:30", VisitKind::Consultation));
        assert_eq!(lines[1], "Visit ID: 3");
        assert_eq!(lines[3], "Visit Date: 2024-03-01");
        assert_eq!(lines[8], "Fee: $10000");
    }

    #[test]
    fn test_count_by_kind_includes_zero_counts() {
        let visits = vec![
            visit(1, "2024-03-01 09:30", VisitKind::Consultation),
            visit(2, "2024-03-01 10:30", VisitKind::Consultation),
            visit(3, "2024-03-02 10:30", VisitKind::Emergency),
        ];

        let counts = count_by_kind(&visits);
        assert_eq!(counts.get(VisitKind::Consultation), 2);
        assert_eq!(counts.get(VisitKind::FollowUp), 0);
        assert_eq!(counts.get(VisitKind::Emergency), 1);
        assert_eq!(counts.lines()[2], "FollowUp: 0 visits");
    }

    #[test]
    fn test_weekly_summary_sunday_to_saturday() {
        // 2024-03-06 is a Wednesday; its week runs 03-03 (Sun) to 03-09 (Sat)
        let visits = vec![
            visit(1, "2024-03-02 23:59", VisitKind::FollowUp),
            visit(2, "2024-03-03 08:00", VisitKind::FollowUp),
            visit(3, "2024-03-06 09:00", VisitKind::FollowUp),
            visit(4, "2024-03-06 11:00", VisitKind::Emergency),
            visit(5, "2024-03-09 17:30", VisitKind::Consultation),
            visit(6, "2024-03-10 00:00", VisitKind::Consultation),
        ];

        let summary = weekly_summary(&visits, NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
        assert_eq!(summary.week_start, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert_eq!(summary.week_end, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(summary.total, 4);
        assert_eq!(
            summary.days,
            vec![
                (NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(), 1),
                (NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(), 2),
                (NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(), 1),
            ]
        );
        assert_eq!(summary.lines()[0], "=== WEEKLY SUMMARY (2024-03-03 to 2024-03-09) ===");
    }

    #[test]
    fn test_weekly_summary_on_sunday_starts_same_day() {
        let sunday = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let summary = weekly_summary(&[], sunday);
        assert_eq!(summary.week_start, sunday);
        assert_eq!(summary.total, 0);
        assert!(summary.days.is_empty());
    }
}

// Randomly generated sample visits for an empty store

use crate::record::{VisitDraft, VisitKind};
use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use rand::seq::SliceRandom;

const PATIENTS: &[&str] = &["John Smith", "Jane Doe", "Robert Johnson", "Emily Davis", "Michael Brown"];
const DOCTORS: &[&str] = &["Dr. Anderson", "Dr. Smith", "Dr. Johnson", "Dr. Williams"];
const DESCRIPTIONS: &[&str] = &["Routine checkup", "Follow-up examination", "Emergency treatment", "Consultation"];

/// Generate `count` valid drafts dated within the 30 days before `now`,
/// during working hours (08:00 to 17:59)
pub fn sample_drafts<R: Rng + ?Sized>(rng: &mut R, count: usize, now: NaiveDateTime) -> Vec<VisitDraft> {
    (0..count).map(|_| sample_draft(rng, now)).collect()
}

fn sample_draft<R: Rng + ?Sized>(rng: &mut R, now: NaiveDateTime) -> VisitDraft {
    let kind = VisitKind::ALL[rng.gen_range(0..VisitKind::ALL.len())];

    let day = now.date() - Duration::days(rng.gen_range(0..30));
    let visit_date = day.and_hms_opt(rng.gen_range(8..18), rng.gen_range(0..60), 0);

    VisitDraft {
        patient_name: pick(rng, PATIENTS),
        visit_date,
        kind,
        description: pick(rng, DESCRIPTIONS),
        doctor_name: pick(rng, DOCTORS),
        // Above every kind's minimum
        duration_minutes: rng.gen_range(15..120),
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, options: &[&str]) -> String {
    options.choose(rng).copied().unwrap_or_default().to_string()
}
